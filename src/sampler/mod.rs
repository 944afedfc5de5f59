pub mod encode;
pub mod loop_worker;
pub mod throttle;

use std::sync::Arc;

use anyhow::{bail, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::media::VideoStream;

pub use encode::{encode_frame, FramePayload};
pub use throttle::FrameThrottle;

use loop_worker::sampling_loop;

/// Receives every emitted frame. Runs on the sampler task, so it must not block.
pub type FrameCallback = Arc<dyn Fn(FramePayload) + Send + Sync>;

pub struct FrameSampler {
    frame_interval: Duration,
    refresh_interval: Duration,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl FrameSampler {
    pub fn new(frame_interval: Duration, refresh_interval: Duration) -> Self {
        Self {
            frame_interval,
            refresh_interval,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start(&mut self, stream: Arc<dyn VideoStream>, on_frame: FrameCallback) -> Result<()> {
        if self.handle.is_some() {
            bail!("frame sampler already active");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sampling_loop(
            stream,
            self.frame_interval,
            self.refresh_interval,
            on_frame,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        info!(
            "frame sampler started (every {:?}, polled every {:?})",
            self.frame_interval, self.refresh_interval
        );
        Ok(())
    }

    /// Cancels the pending tick. No-op when not started.
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("frame sampler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.stop();
    }
}
