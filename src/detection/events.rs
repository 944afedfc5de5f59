use serde::Serialize;

use crate::report::SessionReport;

use super::DetectionState;

/// Notifications for the host UI, in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DetectionEvent {
    StateChanged { state: DetectionState },
    FeedbackChanged { text: String },
    AlarmChanged { active: bool },
    ReportReady { report: SessionReport },
}
