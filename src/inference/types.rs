use serde::{Deserialize, Serialize};

/// The service's judgment of one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostureVerdict {
    pub feedback_text: String,
    pub alarm_active: bool,
}

/// Per-session totals the service aggregated from the frames it saw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub good_seconds: f64,
    pub bad_seconds: f64,
    pub alarm_count: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeResponse {
    pub posture: String,
    pub alarm: bool,
}

impl From<AnalyzeResponse> for PostureVerdict {
    fn from(response: AnalyzeResponse) -> Self {
        Self {
            feedback_text: response.posture,
            alarm_active: response.alarm,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryResponse {
    #[serde(default)]
    pub good: f64,
    #[serde(default)]
    pub bad: f64,
    #[serde(default)]
    pub alarms: u32,
}

impl From<SummaryResponse> for SessionSummary {
    fn from(response: SummaryResponse) -> Self {
        Self {
            good_seconds: response.good.max(0.0),
            bad_seconds: response.bad.max(0.0),
            alarm_count: response.alarms,
        }
    }
}
