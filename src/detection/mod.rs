pub mod controller;
pub mod events;
pub mod state;

pub use controller::{DetectionController, DetectionSnapshot, HostBindings};
pub use events::DetectionEvent;
pub use state::{DetectionState, SessionState};
