use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::SessionReport;

pub const IDLE_FEEDBACK: &str = "Press 'Start' to begin posture detection.";
pub const DETECTING_FEEDBACK: &str = "Detecting Posture...";
pub const WEBCAM_ERROR_FEEDBACK: &str = "Error accessing webcam.";
pub const BACKEND_ERROR_FEEDBACK: &str = "Error connecting to backend.";
pub const SUMMARY_ERROR_FEEDBACK: &str = "Error fetching session summary.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DetectionState {
    #[default]
    Idle,
    Detecting,
    StoppedPendingSummary,
    ViewingReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub state: DetectionState,
    pub feedback: String,
    pub alarm_active: bool,
    pub run_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    /// Most recently fetched report; kept after the report view closes.
    pub last_report: Option<SessionReport>,
    /// Bumped on every run start; verdicts tagged with an older value are stale.
    #[serde(skip)]
    pub generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            state: DetectionState::Idle,
            feedback: IDLE_FEEDBACK.to_string(),
            alarm_active: false,
            run_id: None,
            started_at: None,
            stopped_at: None,
            last_report: None,
            generation: 0,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters `Detecting` and returns the generation the new run's verdicts carry.
    pub fn begin_run(&mut self, run_id: String, now: DateTime<Utc>) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.state = DetectionState::Detecting;
        self.feedback = DETECTING_FEEDBACK.to_string();
        self.alarm_active = false;
        self.run_id = Some(run_id);
        self.started_at = Some(now);
        self.stopped_at = None;
        self.generation
    }

    pub fn end_run(&mut self, now: DateTime<Utc>) {
        self.state = DetectionState::StoppedPendingSummary;
        self.feedback = IDLE_FEEDBACK.to_string();
        self.alarm_active = false;
        self.stopped_at = Some(now);
    }

    pub fn accepts(&self, generation: u64) -> bool {
        self.state == DetectionState::Detecting && self.generation == generation
    }

    pub fn show_report(&mut self, report: SessionReport) {
        self.state = DetectionState::ViewingReport;
        self.last_report = Some(report);
    }

    /// Back to `Idle`, keeping the cached report.
    pub fn return_to_idle(&mut self) {
        self.state = DetectionState::Idle;
        self.feedback = IDLE_FEEDBACK.to_string();
        self.alarm_active = false;
        self.run_id = None;
    }
}
