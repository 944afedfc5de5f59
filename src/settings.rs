use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

const SERVER_URL_ENV: &str = "POSTUREEASE_SERVER_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionSettings {
    pub server_url: String,
    /// Minimum gap between two emitted frames.
    pub frame_interval_ms: u64,
    /// Scheduling tick of the sampler; one display refresh at 60 Hz.
    pub refresh_interval_us: u64,
    pub request_timeout_ms: u64,
    pub alarm_repeat_ms: u64,
    pub cue_move_ms: u64,
    pub cue_margin_px: f32,
    pub cue_pulse_period_ms: u64,
    pub alert_volume: f32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            frame_interval_ms: 200,
            refresh_interval_us: 16_667,
            request_timeout_ms: 5_000,
            alarm_repeat_ms: 2_000,
            cue_move_ms: 3_000,
            cue_margin_px: 200.0,
            cue_pulse_period_ms: 5_000,
            alert_volume: 0.8,
        }
    }
}

impl DetectionSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_micros(self.refresh_interval_us.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn alarm_repeat(&self) -> Duration {
        Duration::from_millis(self.alarm_repeat_ms.max(1))
    }

    pub fn cue_move(&self) -> Duration {
        Duration::from_millis(self.cue_move_ms.max(1))
    }

    pub fn cue_pulse_period(&self) -> Duration {
        Duration::from_millis(self.cue_pulse_period_ms.max(1))
    }

    /// Applies environment overrides on top of the stored values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                self.server_url = url.trim().to_string();
            }
        }
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<DetectionSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring malformed settings at {}: {}",
                    path.display(),
                    err
                );
                DetectionSettings::default()
            })
        } else {
            DetectionSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Stored settings with environment overrides applied.
    pub fn detection(&self) -> DetectionSettings {
        self.read().with_env_overrides()
    }

    pub fn update_detection(&self, settings: DetectionSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn read(&self) -> DetectionSettings {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn persist(&self, data: &DetectionSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
