//! Single-slot read-aloud playback.
//!
//! [`PlaybackController`] owns the one speech session that may exist at a
//! time, keyed by the index of the content item being voiced. Starting a
//! session always cancels the previous one first, and completions for
//! sessions that are no longer active are ignored.
//!
//! The speech engine is injected through [`SpeechEngine`]; engines report
//! natural completion out of band (see [`command::CommandSpeechEngine`]) and
//! the owner forwards it to [`PlaybackController::on_complete`].

pub mod command;

use thiserror::Error;

pub use command::CommandSpeechEngine;

/// Opaque identifier for one utterance issued to an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeechHandle(pub u64);

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Speech synthesis is not available on this system")]
    Unavailable,
    #[error("Failed to start speech: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Host speech capability.
pub trait SpeechEngine: Send {
    /// Whether the engine can currently speak at all.
    fn is_available(&self) -> bool;

    /// Start voicing `text`, returning a handle for cancellation and
    /// completion matching.
    fn speak(&mut self, text: &str) -> Result<SpeechHandle, SpeechError>;

    /// Stop the utterance behind `handle`. Cancelled utterances do not
    /// report completion. Unknown or finished handles are ignored.
    fn cancel(&mut self, handle: SpeechHandle);
}

impl<E: SpeechEngine + ?Sized> SpeechEngine for Box<E> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn speak(&mut self, text: &str) -> Result<SpeechHandle, SpeechError> {
        (**self).speak(text)
    }

    fn cancel(&mut self, handle: SpeechHandle) {
        (**self).cancel(handle)
    }
}

/// Engine for hosts without speech, e.g. `--no-speech`.
#[derive(Debug, Default)]
pub struct NoSpeech;

impl SpeechEngine for NoSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&mut self, _text: &str) -> Result<SpeechHandle, SpeechError> {
        Err(SpeechError::Unavailable)
    }

    fn cancel(&mut self, _handle: SpeechHandle) {}
}

/// Result of a [`PlaybackController::toggle`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Started { index: usize },
    Stopped { index: usize },
    /// No speech capability. `first_report` is true only the first time,
    /// so callers surface it once.
    Unavailable { first_report: bool },
    /// The engine refused to start; playback is idle.
    Failed { index: usize, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveSession {
    index: usize,
    handle: SpeechHandle,
}

pub struct PlaybackController<E> {
    engine: E,
    active: Option<ActiveSession>,
    unavailable_reported: bool,
}

impl<E: SpeechEngine> PlaybackController<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            active: None,
            unavailable_reported: false,
        }
    }

    /// Toggle playback of item `index`.
    ///
    /// - same index active: stop it
    /// - other index active: stop it, then start `index`
    /// - idle: start `index`
    pub fn toggle(&mut self, index: usize, text: &str) -> ToggleOutcome {
        if !self.engine.is_available() {
            return self.report_unavailable();
        }

        if let Some(active) = self.active {
            self.stop_all();
            if active.index == index {
                return ToggleOutcome::Stopped { index };
            }
        }

        match self.engine.speak(text) {
            Ok(handle) => {
                tracing::debug!(index, handle = handle.0, "Speech started");
                self.active = Some(ActiveSession { index, handle });
                ToggleOutcome::Started { index }
            }
            Err(SpeechError::Unavailable) => self.report_unavailable(),
            Err(e) => {
                tracing::warn!(index, error = %e, "Failed to start speech");
                ToggleOutcome::Failed {
                    index,
                    error: e.to_string(),
                }
            }
        }
    }

    /// End any active session. Idempotent.
    pub fn stop_all(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(index = active.index, handle = active.handle.0, "Speech cancelled");
            self.engine.cancel(active.handle);
        }
    }

    /// Engine reported natural completion of `handle`. Returns `true` if it
    /// ended the active session; completions of superseded sessions are
    /// ignored.
    pub fn on_complete(&mut self, handle: SpeechHandle) -> bool {
        match self.active {
            Some(active) if active.handle == handle => {
                tracing::debug!(index = active.index, handle = handle.0, "Speech finished");
                self.active = None;
                true
            }
            _ => {
                tracing::debug!(handle = handle.0, "Ignoring completion for inactive speech");
                false
            }
        }
    }

    /// Index of the item being voiced, if any.
    pub fn playback_index(&self) -> Option<usize> {
        self.active.map(|a| a.index)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn report_unavailable(&mut self) -> ToggleOutcome {
        let first_report = !self.unavailable_reported;
        if first_report {
            tracing::warn!("Speech synthesis unavailable; playback disabled");
        }
        self.unavailable_reported = true;
        self.active = None;
        ToggleOutcome::Unavailable { first_report }
    }
}
