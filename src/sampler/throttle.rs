use tokio::time::{Duration, Instant};

/// Bounds frame emission to one per `interval`, independent of how often it is polled.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl FrameThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    pub fn ready(&self, now: Instant) -> bool {
        self.last_emit
            .map(|last| now.saturating_duration_since(last) >= self.interval)
            .unwrap_or(true)
    }

    /// Only emitted frames count; skipped captures leave the window open.
    pub fn mark_emitted(&mut self, now: Instant) {
        self.last_emit = Some(now);
    }
}
