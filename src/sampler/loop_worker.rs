use std::sync::Arc;

use chrono::Utc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::media::VideoStream;

use super::encode::encode_frame;
use super::throttle::FrameThrottle;
use super::FrameCallback;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Throttled,
    StreamEnded,
    NoFrameYet,
    EncodeFailed,
    Emitted,
}

/// Polls once per refresh interval and hands at most one frame per
/// `frame_interval` to `on_frame`. Never waits on what `on_frame` starts.
pub async fn sampling_loop(
    stream: Arc<dyn VideoStream>,
    frame_interval: Duration,
    refresh_interval: Duration,
    on_frame: FrameCallback,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut throttle = FrameThrottle::new(frame_interval);
    let mut emitted: u64 = 0;
    let mut ended = false;

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("frame sampler shutting down after {} frames", emitted);
                break;
            }
            _ = ticker.tick() => {
                match sample_tick(Instant::now(), stream.as_ref(), &mut throttle, &on_frame) {
                    TickOutcome::Emitted => emitted += 1,
                    TickOutcome::StreamEnded if !ended => {
                        log_warn!("camera stream ended after {} frames", emitted);
                        ended = true;
                    }
                    _ => {}
                }
            }
        }
    }
}

pub(crate) fn sample_tick(
    now: Instant,
    stream: &dyn VideoStream,
    throttle: &mut FrameThrottle,
    on_frame: &FrameCallback,
) -> TickOutcome {
    if !throttle.ready(now) {
        return TickOutcome::Throttled;
    }

    if !stream.is_live() {
        return TickOutcome::StreamEnded;
    }

    let Some(frame) = stream.latest_frame() else {
        return TickOutcome::NoFrameYet;
    };

    match encode_frame(&frame, Utc::now()) {
        Ok(payload) => {
            throttle.mark_emitted(now);
            log_debug!(
                "emitting frame {}x{} ({} bytes)",
                payload.width,
                payload.height,
                payload.jpeg.len()
            );
            on_frame(payload);
            TickOutcome::Emitted
        }
        Err(err) => {
            log_warn!("skipping frame: {err:#}");
            TickOutcome::EncodeFailed
        }
    }
}
