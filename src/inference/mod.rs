pub mod client;
pub mod types;

pub use client::{HttpInferenceClient, InferenceApi};
pub use types::{PostureVerdict, SessionSummary};
