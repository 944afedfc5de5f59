use std::f32::consts::PI;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CuePosition {
    pub left: f32,
    pub top: f32,
}

impl CuePosition {
    /// Where the marker sits before its first move.
    pub const INITIAL: CuePosition = CuePosition {
        left: 50.0,
        top: 50.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

/// One relocation of the marker; the surface animates `from` → `to` over `duration`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueMotion {
    pub from: CuePosition,
    pub to: CuePosition,
    pub duration: Duration,
}

impl CueMotion {
    /// Eased position `elapsed` into the motion.
    pub fn position_at(&self, elapsed: Duration) -> CuePosition {
        let t = if self.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
        };
        let eased = ease_in_out(t);
        CuePosition {
            left: self.from.left + (self.to.left - self.from.left) * eased,
            top: self.from.top + (self.to.top - self.from.top) * eased,
        }
    }
}

/// Host-side rendering of the on-screen marker.
pub trait CueSurface: Send + Sync {
    fn viewport(&self) -> Viewport;

    /// Marker appears and starts pulsing with the given period.
    fn show(&self, pulse_period: Duration);

    fn move_to(&self, motion: CueMotion);

    fn hide(&self);
}

/// Surface for hosts that only want the audible alarm.
pub struct NoCue;

impl CueSurface for NoCue {
    fn viewport(&self) -> Viewport {
        Viewport {
            width: 0.0,
            height: 0.0,
        }
    }

    fn show(&self, _pulse_period: Duration) {}
    fn move_to(&self, _motion: CueMotion) {}
    fn hide(&self) {}
}

/// Cubic ease-in-out on `t` in [0, 1].
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Marker scale `elapsed` into the pulse: 1.0 at the ends of each period, 1.2 halfway.
pub fn pulse_scale(elapsed: Duration, period: Duration) -> f32 {
    if period.is_zero() {
        return 1.0;
    }
    let phase = (elapsed.as_secs_f32() / period.as_secs_f32()).fract();
    1.0 + 0.1 * (1.0 - (2.0 * PI * phase).cos())
}

/// Uniform position keeping `margin` clear of the right and bottom edges.
pub fn random_position<R: Rng>(rng: &mut R, viewport: Viewport, margin: f32) -> CuePosition {
    let max_left = (viewport.width - margin).max(0.0);
    let max_top = (viewport.height - margin).max(0.0);
    CuePosition {
        left: if max_left > 0.0 { rng.gen_range(0.0..max_left) } else { 0.0 },
        top: if max_top > 0.0 { rng.gen_range(0.0..max_top) } else { 0.0 },
    }
}
