//! Simulated media elements for the headless player.
//!
//! Nothing is decoded or rendered. The audio element pretends each track
//! lasts a fixed duration and reports the same events a browser media
//! element would, in the same order.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use avatar_teacher_core::MediaElement;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info};

/// Events a media element reports back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    Play,
    Pause,
    Ended,
    Loaded,
    Error(String),
}

#[derive(Debug, Default)]
struct MediaState {
    source: Option<String>,
    looping: bool,
    muted: bool,
    playing: bool,
    ended: bool,
    /// Bumped on every source change so a stale end timer does nothing.
    generation: u64,
    end_timer: Option<JoinHandle<()>>,
}

pub struct SimulatedMedia {
    label: &'static str,
    state: Arc<Mutex<MediaState>>,
    events: Option<mpsc::UnboundedSender<MediaEvent>>,
    track_duration: Duration,
}

impl SimulatedMedia {
    /// A looping video sink. It never ends and reports no events.
    pub fn video() -> Self {
        Self {
            label: "video",
            state: Arc::default(),
            events: None,
            track_duration: Duration::ZERO,
        }
    }

    /// A narration sink that ends each track after `track_duration`.
    pub fn audio(track_duration: Duration, events: mpsc::UnboundedSender<MediaEvent>) -> Self {
        Self {
            label: "audio",
            state: Arc::default(),
            events: Some(events),
            track_duration,
        }
    }

    pub fn is_muted(&self) -> bool {
        self.lock().muted
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MediaState> {
        // A poisoned lock only means a panicking test; the state is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: MediaEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Stops playback and cancels a pending end-of-track.
    fn halt(&self, state: &mut MediaState) -> bool {
        if let Some(timer) = state.end_timer.take() {
            timer.abort();
        }
        std::mem::replace(&mut state.playing, false)
    }
}

#[async_trait]
impl MediaElement for SimulatedMedia {
    fn set_source(&self, url: &str) {
        let was_playing = {
            let mut state = self.lock();
            let was_playing = self.halt(&mut state);
            state.generation += 1;
            state.source = Some(url.to_string());
            state.ended = false;
            was_playing
        };
        debug!(element = self.label, url, "Source set");
        if was_playing {
            self.emit(MediaEvent::Pause);
        }
    }

    fn source(&self) -> Option<String> {
        self.lock().source.clone()
    }

    fn set_loop(&self, looping: bool) {
        self.lock().looping = looping;
    }

    fn is_looping(&self) -> bool {
        self.lock().looping
    }

    fn set_muted(&self, muted: bool) {
        self.lock().muted = muted;
    }

    fn load(&self) {
        let source = self.lock().source.clone();
        match source {
            Some(url) if !url.trim().is_empty() => {
                debug!(element = self.label, url, "Loaded");
                self.emit(MediaEvent::Loaded);
            }
            _ => self.emit(MediaEvent::Error("no source to load".to_string())),
        }
    }

    async fn play(&self) -> Result<()> {
        let mut state = self.lock();
        let source = state
            .source
            .clone()
            .ok_or_else(|| anyhow!("{} has no source", self.label))?;
        if state.playing {
            return Ok(());
        }

        state.playing = true;
        state.ended = false;
        info!(element = self.label, url = %source, muted = state.muted, "Playing");

        if !state.looping {
            if let Some(events) = self.events.clone() {
                let shared = self.state.clone();
                let generation = state.generation;
                let duration = self.track_duration;
                state.end_timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    {
                        let mut state = shared.lock().unwrap_or_else(|e| e.into_inner());
                        if state.generation != generation || !state.playing {
                            return;
                        }
                        state.playing = false;
                        state.ended = true;
                        state.end_timer = None;
                    }
                    // Browsers report the implicit pause before `ended`.
                    let _ = events.send(MediaEvent::Pause);
                    let _ = events.send(MediaEvent::Ended);
                }));
            }
        }
        drop(state);

        self.emit(MediaEvent::Play);
        Ok(())
    }

    fn pause(&self) {
        let was_playing = {
            let mut state = self.lock();
            self.halt(&mut state)
        };
        if was_playing {
            self.emit(MediaEvent::Pause);
        }
    }

    fn is_ended(&self) -> bool {
        self.lock().ended
    }
}
