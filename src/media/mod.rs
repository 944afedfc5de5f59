//! Camera acquisition and release.
//!
//! The host platform supplies the device ([`CameraDevice`]) and the preview
//! surface ([`PreviewSink`]); [`MediaSourceManager`] guarantees there is at
//! most one live stream and that releasing it is idempotent.

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};

use crate::error::DeviceError;

/// One decoded video frame in packed RGB8, at the stream's native resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// A live camera stream.
pub trait VideoStream: Send + Sync {
    /// Most recent frame, or `None` while the stream has not produced one yet.
    fn latest_frame(&self) -> Option<RawFrame>;

    /// Stops every underlying track. Called at most once per stream by the manager,
    /// but implementations should tolerate repeats.
    fn stop_tracks(&self);

    /// `false` once the tracks have stopped, including when the host revokes the camera.
    /// The sampler sends no frames from a dead stream.
    fn is_live(&self) -> bool;
}

#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Requests video-only access. May suspend on a permission prompt.
    async fn open_video(&self) -> Result<Arc<dyn VideoStream>, DeviceError>;
}

/// Where the live stream is shown to the user.
pub trait PreviewSink: Send + Sync {
    fn bind(&self, stream: Arc<dyn VideoStream>);
    fn unbind(&self);
}

/// Preview sink for hosts without a preview surface.
pub struct NoPreview;

impl PreviewSink for NoPreview {
    fn bind(&self, _stream: Arc<dyn VideoStream>) {}
    fn unbind(&self) {}
}

pub struct MediaSourceManager {
    device: Arc<dyn CameraDevice>,
    preview: Arc<dyn PreviewSink>,
    active: Option<Arc<dyn VideoStream>>,
}

impl MediaSourceManager {
    pub fn new(device: Arc<dyn CameraDevice>, preview: Arc<dyn PreviewSink>) -> Self {
        Self {
            device,
            preview,
            active: None,
        }
    }

    /// Opens the camera and binds it to the preview. Re-acquiring while a stream is
    /// already open returns the open stream instead of requesting a second one.
    pub async fn acquire(&mut self) -> Result<Arc<dyn VideoStream>, DeviceError> {
        if let Some(stream) = &self.active {
            warn!("camera already acquired; reusing open stream");
            return Ok(Arc::clone(stream));
        }

        let stream = self.device.open_video().await?;
        self.preview.bind(Arc::clone(&stream));
        self.active = Some(Arc::clone(&stream));
        info!("camera stream acquired");
        Ok(stream)
    }

    /// Stops all tracks and unbinds the preview. No-op when nothing is open.
    pub fn release(&mut self) {
        if let Some(stream) = self.active.take() {
            stream.stop_tracks();
            self.preview.unbind();
            info!("camera stream released");
        }
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for MediaSourceManager {
    fn drop(&mut self) {
        self.release();
    }
}
