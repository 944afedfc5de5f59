use thiserror::Error;

use crate::detection::DetectionState;

/// Camera could not be opened. Never fatal: the controller turns it into feedback text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera device available")]
    NotFound,
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {endpoint} timed out after {timeout_ms}ms")]
    Timeout {
        endpoint: &'static str,
        timeout_ms: u64,
    },
    #[error("{endpoint} responded with status {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("could not decode {endpoint} response: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("cannot {action} while {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: DetectionState,
    },
    #[error("frame sampler failed to start: {0}")]
    Sampler(String),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
