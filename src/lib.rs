//! Posture detection client.
//!
//! Samples webcam frames, sends them to the posture service, and raises an
//! audible and visual alarm while the service reports bad posture. The host UI
//! plugs in the camera, preview and cue surface through [`HostBindings`] and
//! drives everything through [`DetectionController`].

pub mod alarm;
pub mod detection;
pub mod error;
pub mod inference;
pub mod media;
pub mod report;
pub mod sampler;
pub mod session;
pub mod settings;
mod utils;

pub use detection::{
    DetectionController, DetectionEvent, DetectionSnapshot, DetectionState, HostBindings,
};
pub use error::{DetectionError, DeviceError, TransportError};
pub use inference::{HttpInferenceClient, InferenceApi, PostureVerdict, SessionSummary};
pub use report::{HistoryReport, SessionReport};
pub use session::{SessionContext, SessionStore};
pub use settings::{DetectionSettings, SettingsStore};
pub use utils::logging::init_logging;
