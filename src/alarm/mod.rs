pub mod cue;
pub mod sound;

use std::sync::Arc;

use log::info;
use rand::{rngs::StdRng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::settings::DetectionSettings;

pub use cue::{CueMotion, CuePosition, CueSurface, NoCue, Viewport};
pub use sound::{default_alert_sound, AlertSound, SilentAlert};

#[derive(Debug, Clone, Copy)]
pub struct AlarmTiming {
    pub repeat: Duration,
    pub cue_move: Duration,
    pub cue_margin: f32,
    pub pulse_period: Duration,
}

impl From<&DetectionSettings> for AlarmTiming {
    fn from(settings: &DetectionSettings) -> Self {
        Self {
            repeat: settings.alarm_repeat(),
            cue_move: settings.cue_move(),
            cue_margin: settings.cue_margin_px,
            pulse_period: settings.cue_pulse_period(),
        }
    }
}

/// Both loops share one token and are only ever created and torn down together.
struct AlarmLoops {
    cancel_token: CancellationToken,
    sound: JoinHandle<()>,
    cue: JoinHandle<()>,
}

/// Repeating alert sound plus a wandering visual marker, driven by one flag.
///
/// [`set_active`](Self::set_active) is edge-triggered: only `false → true` starts
/// the loops and only `true → false` stops them.
pub struct AlarmSubsystem {
    sound: Arc<dyn AlertSound>,
    surface: Arc<dyn CueSurface>,
    timing: AlarmTiming,
    loops: Option<AlarmLoops>,
}

impl AlarmSubsystem {
    pub fn new(sound: Arc<dyn AlertSound>, surface: Arc<dyn CueSurface>, timing: AlarmTiming) -> Self {
        Self {
            sound,
            surface,
            timing,
            loops: None,
        }
    }

    /// Returns whether the call changed anything.
    pub fn set_active(&mut self, active: bool) -> bool {
        match (self.loops.is_some(), active) {
            (false, true) => {
                self.start_loops();
                true
            }
            (true, false) => {
                self.stop_loops();
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.loops.is_some()
    }

    fn start_loops(&mut self) {
        let cancel_token = CancellationToken::new();

        self.surface.show(self.timing.pulse_period);
        let sound = tokio::spawn(sound_loop(
            Arc::clone(&self.sound),
            self.timing.repeat,
            cancel_token.clone(),
        ));
        let cue = tokio::spawn(cue_loop(
            Arc::clone(&self.surface),
            self.timing,
            cancel_token.clone(),
        ));

        self.loops = Some(AlarmLoops {
            cancel_token,
            sound,
            cue,
        });
        info!("alarm raised");
    }

    fn stop_loops(&mut self) {
        if let Some(loops) = self.loops.take() {
            loops.cancel_token.cancel();
            loops.sound.abort();
            loops.cue.abort();
            self.surface.hide();
            info!("alarm cleared");
        }
    }
}

impl Drop for AlarmSubsystem {
    fn drop(&mut self) {
        self.stop_loops();
    }
}

async fn sound_loop(sound: Arc<dyn AlertSound>, repeat: Duration, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(repeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => sound.play(),
        }
    }
}

async fn cue_loop(surface: Arc<dyn CueSurface>, timing: AlarmTiming, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(timing.cue_move);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rng = StdRng::from_entropy();
    let mut current = CuePosition::INITIAL;

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                let next = cue::random_position(&mut rng, surface.viewport(), timing.cue_margin);
                surface.move_to(CueMotion {
                    from: current,
                    to: next,
                    duration: timing.cue_move,
                });
                current = next;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::*;

    #[derive(Default)]
    pub(crate) struct CountingSound {
        plays: AtomicUsize,
    }

    impl CountingSound {
        pub(crate) fn plays(&self) -> usize {
            self.plays.load(Ordering::SeqCst)
        }
    }

    impl AlertSound for CountingSound {
        fn play(&self) {
            self.plays.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum CueCall {
        Show,
        Move(CueMotion),
        Hide,
    }

    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        pub(crate) calls: Mutex<Vec<CueCall>>,
    }

    impl RecordingSurface {
        pub(crate) fn moves(&self) -> Vec<CueMotion> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|call| match call {
                    CueCall::Move(motion) => Some(*motion),
                    _ => None,
                })
                .collect()
        }

        pub(crate) fn visible(&self) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|call| !matches!(call, CueCall::Move(_)))
                .map(|call| *call == CueCall::Show)
                .unwrap_or(false)
        }
    }

    impl CueSurface for RecordingSurface {
        fn viewport(&self) -> Viewport {
            Viewport {
                width: 1280.0,
                height: 720.0,
            }
        }

        fn show(&self, _pulse_period: Duration) {
            self.calls.lock().unwrap().push(CueCall::Show);
        }

        fn move_to(&self, motion: CueMotion) {
            self.calls.lock().unwrap().push(CueCall::Move(motion));
        }

        fn hide(&self) {
            self.calls.lock().unwrap().push(CueCall::Hide);
        }
    }
}
