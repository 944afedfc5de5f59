use std::sync::{Arc, Weak};

use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::{
    alarm::{AlarmSubsystem, AlarmTiming, AlertSound, CueSurface},
    error::{DetectionError, TransportError},
    inference::{HttpInferenceClient, InferenceApi, PostureVerdict},
    media::{CameraDevice, MediaSourceManager, PreviewSink},
    report::SessionReport,
    sampler::{FrameCallback, FramePayload, FrameSampler},
    session::SessionContext,
    settings::DetectionSettings,
};

use super::events::DetectionEvent;
use super::state::{
    SessionState, BACKEND_ERROR_FEEDBACK, SUMMARY_ERROR_FEEDBACK, WEBCAM_ERROR_FEEDBACK,
};
use super::DetectionState;

const EVENT_CAPACITY: usize = 64;

/// What the host platform plugs in.
#[derive(Clone)]
pub struct HostBindings {
    pub camera: Arc<dyn CameraDevice>,
    pub preview: Arc<dyn PreviewSink>,
    pub sound: Arc<dyn AlertSound>,
    pub surface: Arc<dyn CueSurface>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSnapshot {
    #[serde(flatten)]
    pub session: SessionState,
    pub camera_open: bool,
    pub sampling: bool,
}

struct Inner {
    session_state: SessionState,
    media: MediaSourceManager,
    sampler: FrameSampler,
    alarm: AlarmSubsystem,
}

impl Inner {
    /// Releases everything a run holds. Each step is idempotent on its own.
    fn teardown_run(&mut self) -> bool {
        self.sampler.stop();
        let alarm_changed = self.alarm.set_active(false);
        self.media.release();
        alarm_changed
    }
}

/// Owns one user's detection lifecycle:
/// `Idle → Detecting → StoppedPendingSummary → ViewingReport → Idle`.
#[derive(Clone)]
pub struct DetectionController {
    inner: Arc<Mutex<Inner>>,
    session: SessionContext,
    inference: Arc<dyn InferenceApi>,
    events: broadcast::Sender<DetectionEvent>,
}

impl DetectionController {
    pub fn new(
        settings: &DetectionSettings,
        session: SessionContext,
        inference: Arc<dyn InferenceApi>,
        host: HostBindings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Inner {
            session_state: SessionState::new(),
            media: MediaSourceManager::new(host.camera, host.preview),
            sampler: FrameSampler::new(settings.frame_interval(), settings.refresh_interval()),
            alarm: AlarmSubsystem::new(host.sound, host.surface, AlarmTiming::from(settings)),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            session,
            inference,
            events,
        }
    }

    /// Controller talking to the HTTP service at `settings.server_url`.
    pub fn with_http(
        settings: &DetectionSettings,
        session: SessionContext,
        host: HostBindings,
    ) -> Result<Self, TransportError> {
        let client = HttpInferenceClient::new(settings.server_url.clone(), settings.request_timeout())?;
        Ok(Self::new(settings, session, Arc::new(client), host))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DetectionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> DetectionSnapshot {
        let guard = self.inner.lock().await;
        DetectionSnapshot {
            session: guard.session_state.clone(),
            camera_open: guard.media.is_open(),
            sampling: guard.sampler.is_running(),
        }
    }

    pub async fn state(&self) -> DetectionState {
        self.inner.lock().await.session_state.state
    }

    pub async fn start_detection(&self) -> Result<DetectionSnapshot, DetectionError> {
        {
            let mut guard = self.inner.lock().await;
            require(&guard, DetectionState::Idle, "start detection")?;

            let stream = match guard.media.acquire().await {
                Ok(stream) => stream,
                Err(err) => {
                    warn!("Error accessing webcam: {}", err);
                    self.set_feedback(&mut guard, WEBCAM_ERROR_FEEDBACK);
                    return Err(err.into());
                }
            };

            let run_id = Uuid::new_v4().to_string();
            let generation = guard.session_state.begin_run(run_id.clone(), Utc::now());
            let callback = self.frame_callback(generation);

            if let Err(err) = guard.sampler.start(stream, callback) {
                error!("Failed to start frame sampler for run {}: {:#}", run_id, err);
                guard.teardown_run();
                guard.session_state.return_to_idle();
                self.emit(DetectionEvent::FeedbackChanged {
                    text: guard.session_state.feedback.clone(),
                });
                return Err(DetectionError::Sampler(err.to_string()));
            }

            info!("Detection run {} started", run_id);
            self.emit(DetectionEvent::StateChanged {
                state: DetectionState::Detecting,
            });
            self.emit(DetectionEvent::FeedbackChanged {
                text: guard.session_state.feedback.clone(),
            });
        }

        Ok(self.snapshot().await)
    }

    pub async fn stop_detection(&self) -> Result<DetectionSnapshot, DetectionError> {
        {
            let mut guard = self.inner.lock().await;
            require(&guard, DetectionState::Detecting, "stop detection")?;

            let alarm_changed = guard.teardown_run();
            guard.session_state.end_run(Utc::now());

            info!(
                "Detection run {} stopped",
                guard.session_state.run_id.as_deref().unwrap_or("?")
            );
            if alarm_changed {
                self.emit(DetectionEvent::AlarmChanged { active: false });
            }
            self.emit(DetectionEvent::StateChanged {
                state: DetectionState::StoppedPendingSummary,
            });
            self.emit(DetectionEvent::FeedbackChanged {
                text: guard.session_state.feedback.clone(),
            });
        }

        Ok(self.snapshot().await)
    }

    /// The single start/stop button.
    pub async fn toggle_detection(&self) -> Result<DetectionSnapshot, DetectionError> {
        match self.state().await {
            DetectionState::Detecting => self.stop_detection().await,
            _ => self.start_detection().await,
        }
    }

    /// Fetches the summary of the run that just stopped and opens the report view.
    pub async fn request_report(&self) -> Result<SessionReport, DetectionError> {
        let mut guard = self.inner.lock().await;
        require(&guard, DetectionState::StoppedPendingSummary, "request a report")?;

        match self.inference.fetch_summary(&self.session).await {
            Ok(summary) => {
                let report = SessionReport::from_summary(summary);
                guard.session_state.show_report(report.clone());
                info!(
                    "Session report ready: good {:.1}%, bad {:.1}%, {} alarms",
                    report.good_percent, report.bad_percent, report.summary.alarm_count
                );
                self.emit(DetectionEvent::ReportReady {
                    report: report.clone(),
                });
                self.emit(DetectionEvent::StateChanged {
                    state: DetectionState::ViewingReport,
                });
                Ok(report)
            }
            Err(err) => {
                error!("Error fetching session summary: {}", err);
                self.set_feedback(&mut guard, SUMMARY_ERROR_FEEDBACK);
                Err(err.into())
            }
        }
    }

    pub async fn dismiss_summary(&self) -> Result<(), DetectionError> {
        let mut guard = self.inner.lock().await;
        require(&guard, DetectionState::StoppedPendingSummary, "dismiss the summary")?;
        self.go_idle(&mut guard);
        Ok(())
    }

    pub async fn close_report(&self) -> Result<(), DetectionError> {
        let mut guard = self.inner.lock().await;
        require(&guard, DetectionState::ViewingReport, "close the report")?;
        self.go_idle(&mut guard);
        Ok(())
    }

    /// Host teardown: releases every resource from any state and returns to `Idle`.
    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        if guard.teardown_run() {
            self.emit(DetectionEvent::AlarmChanged { active: false });
        }
        if guard.session_state.state != DetectionState::Idle {
            self.go_idle(&mut guard);
        }
        info!("Detection controller shut down");
    }

    fn go_idle(&self, guard: &mut Inner) {
        let previous_feedback = std::mem::take(&mut guard.session_state.feedback);
        guard.session_state.return_to_idle();
        self.emit(DetectionEvent::StateChanged {
            state: DetectionState::Idle,
        });
        if guard.session_state.feedback != previous_feedback {
            self.emit(DetectionEvent::FeedbackChanged {
                text: guard.session_state.feedback.clone(),
            });
        }
    }

    fn set_feedback(&self, guard: &mut Inner, text: &str) {
        guard.session_state.feedback = text.to_string();
        self.emit(DetectionEvent::FeedbackChanged {
            text: text.to_string(),
        });
    }

    fn emit(&self, event: DetectionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Each emitted frame gets its own round-trip task so the sampler never waits
    /// on the network. The callback holds the controller weakly: the sampler task
    /// lives inside `Inner`.
    fn frame_callback(&self, generation: u64) -> FrameCallback {
        let inner: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        let inference = Arc::clone(&self.inference);
        let session = self.session.clone();
        let events = self.events.clone();

        Arc::new(move |payload: FramePayload| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let inference = Arc::clone(&inference);
            let session = session.clone();
            let events = events.clone();

            tokio::spawn(async move {
                let result = inference.analyze(payload, &session).await;
                apply_verdict(&inner, &events, generation, result).await;
            });
        })
    }
}

fn require(guard: &Inner, expected: DetectionState, action: &'static str) -> Result<(), DetectionError> {
    let state = guard.session_state.state;
    if state == expected {
        Ok(())
    } else {
        Err(DetectionError::InvalidTransition { action, state })
    }
}

/// Applies a verdict in arrival order, unless its run is over.
async fn apply_verdict(
    inner: &Mutex<Inner>,
    events: &broadcast::Sender<DetectionEvent>,
    generation: u64,
    result: Result<PostureVerdict, TransportError>,
) {
    let mut guard = inner.lock().await;
    if !guard.session_state.accepts(generation) {
        debug!(
            "Ignoring stale verdict from run generation {} (current {}, {:?})",
            generation, guard.session_state.generation, guard.session_state.state
        );
        return;
    }

    let text = match result {
        Ok(verdict) => {
            if guard.alarm.set_active(verdict.alarm_active) {
                let _ = events.send(DetectionEvent::AlarmChanged {
                    active: verdict.alarm_active,
                });
            }
            guard.session_state.alarm_active = verdict.alarm_active;
            verdict.feedback_text
        }
        Err(err) => {
            warn!("Error communicating with backend: {}", err);
            BACKEND_ERROR_FEEDBACK.to_string()
        }
    };

    if guard.session_state.feedback != text {
        guard.session_state.feedback = text.clone();
        let _ = events.send(DetectionEvent::FeedbackChanged { text });
    }
}
