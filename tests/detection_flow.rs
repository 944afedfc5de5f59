use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use postureease_lib::alarm::{AlertSound, CueMotion, CueSurface, Viewport};
use postureease_lib::media::{CameraDevice, NoPreview, RawFrame, VideoStream};
use postureease_lib::sampler::FramePayload;
use postureease_lib::{
    DetectionController, DetectionSettings, DetectionState, DeviceError, HostBindings,
    InferenceApi, PostureVerdict, SessionContext, SessionSummary, TransportError,
};

struct Webcam {
    live: AtomicBool,
    stops: AtomicUsize,
}

impl VideoStream for Webcam {
    fn latest_frame(&self) -> Option<RawFrame> {
        Some(RawFrame {
            width: 4,
            height: 4,
            rgb: vec![128; 4 * 4 * 3],
        })
    }

    fn stop_tracks(&self) {
        self.live.store(false, Ordering::SeqCst);
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct Camera {
    opened: Mutex<Vec<Arc<Webcam>>>,
}

impl Camera {
    fn live_streams(&self) -> usize {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|stream| stream.is_live())
            .count()
    }

    fn stops_per_stream(&self) -> Vec<usize> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .map(|stream| stream.stops.load(Ordering::SeqCst))
            .collect()
    }
}

#[async_trait]
impl CameraDevice for Camera {
    async fn open_video(&self) -> Result<Arc<dyn VideoStream>, DeviceError> {
        let stream = Arc::new(Webcam {
            live: AtomicBool::new(true),
            stops: AtomicUsize::new(0),
        });
        self.opened.lock().unwrap().push(stream.clone());
        Ok(stream)
    }
}

#[derive(Default)]
struct Beeper {
    plays: AtomicUsize,
}

impl AlertSound for Beeper {
    fn play(&self) {
        self.plays.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Marker {
    visible: AtomicBool,
    moves: AtomicUsize,
}

impl CueSurface for Marker {
    fn viewport(&self) -> Viewport {
        Viewport {
            width: 1440.0,
            height: 900.0,
        }
    }

    fn show(&self, _pulse_period: Duration) {
        self.visible.store(true, Ordering::SeqCst);
    }

    fn move_to(&self, _motion: CueMotion) {
        self.moves.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.visible.store(false, Ordering::SeqCst);
    }
}

/// Always reports slouching, like a service watching a user who never sits up.
struct SlouchService {
    frames: AtomicUsize,
}

#[async_trait]
impl InferenceApi for SlouchService {
    async fn analyze(
        &self,
        frame: FramePayload,
        session: &SessionContext,
    ) -> Result<PostureVerdict, TransportError> {
        assert_eq!(session.session_id(), "user-42");
        assert_eq!(&frame.jpeg[..2], &[0xFF, 0xD8]);
        self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(PostureVerdict {
            feedback_text: "Slouching".into(),
            alarm_active: true,
        })
    }

    async fn fetch_summary(
        &self,
        _session: &SessionContext,
    ) -> Result<SessionSummary, TransportError> {
        Ok(SessionSummary {
            good_seconds: 3.0,
            bad_seconds: 2.0,
            alarm_count: 1,
        })
    }
}

struct Host {
    camera: Arc<Camera>,
    sound: Arc<Beeper>,
    surface: Arc<Marker>,
}

impl Host {
    fn new() -> Self {
        Self {
            camera: Arc::new(Camera::default()),
            sound: Arc::new(Beeper::default()),
            surface: Arc::new(Marker::default()),
        }
    }

    fn bindings(&self) -> HostBindings {
        HostBindings {
            camera: self.camera.clone(),
            preview: Arc::new(NoPreview),
            sound: self.sound.clone(),
            surface: self.surface.clone(),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn slouching_session_from_start_to_report() {
    let host = Host::new();
    let service = Arc::new(SlouchService {
        frames: AtomicUsize::new(0),
    });
    let controller = DetectionController::new(
        &DetectionSettings::default(),
        SessionContext::new("user-42"),
        service.clone(),
        host.bindings(),
    );

    let started = controller.start_detection().await.unwrap();
    assert_eq!(started.session.state, DetectionState::Detecting);
    assert!(started.camera_open && started.sampling);

    tokio::time::sleep(Duration::from_millis(5_000)).await;

    let detecting = controller.snapshot().await;
    assert_eq!(detecting.session.feedback, "Slouching");
    assert!(detecting.session.alarm_active);
    assert!(host.surface.visible.load(Ordering::SeqCst));
    // 5 frames per second
    let frames = service.frames.load(Ordering::SeqCst);
    assert!((20..=26).contains(&frames), "{frames} frames");
    // beeps at 0, 2000, 4000
    assert_eq!(host.sound.plays.load(Ordering::SeqCst), 3);

    let stopped = controller.stop_detection().await.unwrap();
    assert_eq!(stopped.session.state, DetectionState::StoppedPendingSummary);
    assert!(!stopped.camera_open && !stopped.sampling);
    assert!(!stopped.session.alarm_active);
    assert_eq!(host.camera.live_streams(), 0);
    assert_eq!(host.camera.stops_per_stream(), vec![1]);
    assert!(!host.surface.visible.load(Ordering::SeqCst));

    let plays = host.sound.plays.load(Ordering::SeqCst);
    let moves = host.surface.moves.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(host.sound.plays.load(Ordering::SeqCst), plays);
    assert_eq!(host.surface.moves.load(Ordering::SeqCst), moves);

    let report = controller.request_report().await.unwrap();
    assert_eq!(report.good_label(), "Good Posture: 60.0% (3.00s)");
    assert_eq!(report.bad_label(), "Bad Posture: 40.0% (2.00s)");
    assert_eq!(report.alarms_label(), "Alarms Triggered: 1");
    assert_eq!(controller.state().await, DetectionState::ViewingReport);

    controller.close_report().await.unwrap();
    assert_eq!(controller.state().await, DetectionState::Idle);

    controller.shutdown().await;
    assert_eq!(host.camera.stops_per_stream(), vec![1]);
}

#[derive(Clone, Default)]
struct Backend {
    analyzed: Arc<Mutex<Vec<Option<String>>>>,
}

async fn analyze(State(backend): State<Backend>, headers: HeaderMap) -> Json<Value> {
    let user = headers
        .get("User-ID")
        .and_then(|value| value.to_str().ok())
        .map(String::from);
    backend.analyzed.lock().unwrap().push(user);
    Json(json!({ "posture": "Slouching", "alarm": true }))
}

async fn session_summary(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    match headers.get("User-ID").and_then(|value| value.to_str().ok()) {
        Some("user-42") => Ok(Json(json!({ "good": 3.0, "bad": 2.0, "alarms": 1 }))),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

#[tokio::test]
async fn http_service_drives_the_alarm() {
    let backend = Backend::default();
    let app = Router::new()
        .route("/analyze", post(analyze))
        .route("/session_summary", get(session_summary))
        .with_state(backend.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let settings = DetectionSettings {
        server_url: format!("http://{addr}"),
        ..DetectionSettings::default()
    };
    let host = Host::new();
    let controller =
        DetectionController::with_http(&settings, SessionContext::new("user-42"), host.bindings())
            .unwrap();

    controller.start_detection().await.unwrap();

    let mut raised = false;
    for _ in 0..60 {
        if controller.snapshot().await.session.alarm_active {
            raised = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(raised, "alarm never raised");
    assert!(host.sound.plays.load(Ordering::SeqCst) >= 1);

    controller.stop_detection().await.unwrap();
    assert_eq!(host.camera.live_streams(), 0);
    assert_eq!(host.camera.stops_per_stream(), vec![1]);

    let report = controller.request_report().await.unwrap();
    assert_eq!(report.good_percent, 60.0);
    assert_eq!(report.bad_percent, 40.0);

    let analyzed = backend.analyzed.lock().unwrap();
    assert!(!analyzed.is_empty());
    assert!(analyzed.iter().all(|user| user.as_deref() == Some("user-42")));
}
