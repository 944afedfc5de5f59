use std::sync::Arc;

use crate::settings::DetectionSettings;

/// Something that can play the alert once. Must return without waiting for playback.
pub trait AlertSound: Send + Sync {
    fn play(&self);
}

/// Alert sound for hosts without audio output.
pub struct SilentAlert;

impl AlertSound for SilentAlert {
    fn play(&self) {}
}

#[cfg(feature = "audio")]
pub use engine::{AlertTone, ToneAlert};

/// Synthesized beep when built with `audio`, silence otherwise.
pub fn default_alert_sound(settings: &DetectionSettings) -> Arc<dyn AlertSound> {
    #[cfg(feature = "audio")]
    {
        Arc::new(ToneAlert::new(settings.alert_volume))
    }

    #[cfg(not(feature = "audio"))]
    {
        let _ = settings;
        Arc::new(SilentAlert)
    }
}

#[cfg(feature = "audio")]
mod engine {
    use std::sync::{
        mpsc::{self, Sender},
        Mutex,
    };
    use std::thread;
    use std::time::Duration;

    use log::{error, warn};
    use rodio::{OutputStream, Sink, Source};

    use super::AlertSound;

    const SAMPLE_RATE: u32 = 44_100;
    const TONE_HZ: f32 = 880.0;
    const TONE_MS: u32 = 350;
    const FADE_MS: u32 = 15;

    /// Short sine beep with a linear fade at both ends to avoid clicks.
    pub struct AlertTone {
        sample_rate: u32,
        total_samples: u32,
        fade_samples: u32,
        position: u32,
        volume: f32,
    }

    impl AlertTone {
        pub fn new(volume: f32) -> Self {
            Self {
                sample_rate: SAMPLE_RATE,
                total_samples: SAMPLE_RATE * TONE_MS / 1000,
                fade_samples: SAMPLE_RATE * FADE_MS / 1000,
                position: 0,
                volume: volume.clamp(0.0, 1.0),
            }
        }

        fn envelope(&self) -> f32 {
            let remaining = self.total_samples - self.position;
            let edge = self.position.min(remaining);
            if edge >= self.fade_samples {
                1.0
            } else {
                edge as f32 / self.fade_samples as f32
            }
        }
    }

    impl Iterator for AlertTone {
        type Item = f32;

        fn next(&mut self) -> Option<Self::Item> {
            if self.position >= self.total_samples {
                return None;
            }
            let t = self.position as f32 / self.sample_rate as f32;
            let sample = (t * TONE_HZ * std::f32::consts::TAU).sin() * self.envelope();
            self.position += 1;
            Some(sample * self.volume)
        }
    }

    impl Source for AlertTone {
        fn current_frame_len(&self) -> Option<usize> {
            Some((self.total_samples - self.position) as usize)
        }

        fn channels(&self) -> u16 {
            1 // Mono
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn total_duration(&self) -> Option<Duration> {
            Some(Duration::from_millis(TONE_MS as u64))
        }
    }

    enum AlertCommand {
        Beep,
    }

    /// Plays [`AlertTone`] on a dedicated audio thread, since rodio's stream is not `Send`.
    pub struct ToneAlert {
        tx: Mutex<Option<Sender<AlertCommand>>>,
        volume: f32,
    }

    impl ToneAlert {
        pub fn new(volume: f32) -> Self {
            Self {
                tx: Mutex::new(None),
                volume,
            }
        }

        fn ensure_thread(&self) -> Result<Sender<AlertCommand>, String> {
            let mut guard = self.tx.lock().map_err(|e| e.to_string())?;
            if let Some(tx) = guard.as_ref() {
                return Ok(tx.clone());
            }

            let (tx, rx) = mpsc::channel::<AlertCommand>();
            let volume = self.volume;

            thread::Builder::new()
                .name("alert-audio".to_string())
                .spawn(move || {
                    let mut _stream: Option<OutputStream> = None;
                    let mut sink: Option<Sink> = None;

                    while let Ok(cmd) = rx.recv() {
                        match cmd {
                            AlertCommand::Beep => {
                                if sink.is_none() {
                                    match OutputStream::try_default() {
                                        Ok((stream, handle)) => match Sink::try_new(&handle) {
                                            Ok(new_sink) => {
                                                _stream = Some(stream);
                                                sink = Some(new_sink);
                                            }
                                            Err(e) => error!("Failed to create alert sink: {}", e),
                                        },
                                        Err(e) => {
                                            error!("Failed to open audio output for alert: {}", e)
                                        }
                                    }
                                }
                                if let Some(ref s) = sink {
                                    s.append(AlertTone::new(volume));
                                }
                            }
                        }
                    }
                })
                .map_err(|e| e.to_string())?;

            *guard = Some(tx.clone());
            Ok(tx)
        }
    }

    impl AlertSound for ToneAlert {
        fn play(&self) {
            match self.ensure_thread() {
                Ok(tx) => {
                    if tx.send(AlertCommand::Beep).is_err() {
                        warn!("alert audio thread has exited");
                    }
                }
                Err(e) => warn!("alert audio unavailable: {}", e),
            }
        }
    }

}
