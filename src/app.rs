use crate::content::{ContentRecord, ContentStore, FetchErrorKind, QuoteRecord, StoreError};
use crate::menu::Selection;
use crate::playback::{PlaybackController, SpeechEngine, SpeechHandle, ToggleOutcome};
use crate::sync::{FeedPhase, FeedSynchronizer, FetchEpoch, FetchTicket};
use crate::tasks::{spawn_content_fetch, spawn_quote_fetch};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// How long a status line stays visible.
const STATUS_TTL: Duration = Duration::from_secs(3);

// ============================================================================
// Events
// ============================================================================

/// Events from background tasks
pub enum AppEvent {
    /// A content fetch finished.
    ///
    /// Fields:
    /// - `epoch`: The fetch epoch the request was issued under
    /// - `selection`: The selection that was fetched (for logging)
    /// - `result`: The newest record, `None` when the store has none, or the failure
    ContentFetched {
        epoch: FetchEpoch,
        selection: Selection,
        result: Result<Option<ContentRecord>, StoreError>,
    },
    /// The start-up quote fetch finished.
    QuoteFetched(Result<Option<QuoteRecord>, StoreError>),
    /// A background task panicked.
    ///
    /// `epoch` is set when the task was a content fetch, so the pending
    /// selection can leave the loading state.
    TaskPanicked {
        task: &'static str,
        epoch: Option<FetchEpoch>,
        error: String,
    },
}

// ============================================================================
// Quote State
// ============================================================================

/// Quote lifecycle. Independent of selection changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteState {
    Idle,
    Loading,
    Loaded(QuoteRecord),
    Empty,
    Failed(FetchErrorKind),
}

// ============================================================================
// View Model
// ============================================================================

/// Read-only snapshot handed to presentation.
#[derive(Debug, Clone, Copy)]
pub struct ViewModel<'a> {
    pub selection: &'a Selection,
    pub phase: FeedPhase,
    pub loading: bool,
    pub content: Option<&'a ContentRecord>,
    pub error: Option<FetchErrorKind>,
    pub quote: Option<&'a QuoteRecord>,
    pub playback_index: Option<usize>,
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state.
///
/// Owns the feed synchronizer and the playback controller; the only path
/// from selection changes into playback is `stop_all`.
pub struct App {
    pub store: Arc<dyn ContentStore>,
    pub feed: FeedSynchronizer,
    pub playback: PlaybackController<Box<dyn SpeechEngine>>,
    pub quote: QuoteState,

    /// Handle to the in-flight content fetch. Aborted when a newer selection
    /// supersedes it; the epoch check still guards results already queued.
    pub fetch_handle: Option<tokio::task::JoinHandle<()>>,

    /// Status line and when it was set.
    pub status_message: Option<(Cow<'static, str>, Instant)>,

    /// Set whenever visible state changed since the last print.
    pub needs_redraw: bool,
}

impl App {
    pub fn new(
        store: Arc<dyn ContentStore>,
        feed: FeedSynchronizer,
        speech: Box<dyn SpeechEngine>,
    ) -> Self {
        Self {
            store,
            feed,
            playback: PlaybackController::new(speech),
            quote: QuoteState::Idle,
            fetch_handle: None,
            status_message: None,
            needs_redraw: true,
        }
    }

    /// Kick off the quote fetch and the fetch for the initial selection.
    pub fn start(&mut self, event_tx: &mpsc::Sender<AppEvent>) {
        self.quote = QuoteState::Loading;
        spawn_quote_fetch(Arc::clone(&self.store), event_tx.clone());
        self.refresh(event_tx);
    }

    /// Switch to `selection`.
    ///
    /// Invalid selections leave all state untouched and only set the status
    /// line. Accepted selections stop playback and issue a fresh fetch, even
    /// when `selection` equals the current one.
    pub fn select(&mut self, selection: Selection, event_tx: &mpsc::Sender<AppEvent>) {
        match self.feed.select(selection) {
            Ok(ticket) => self.begin_fetch(ticket, event_tx),
            Err(e) => self.set_status(e.to_string()),
        }
    }

    /// Switch the main axis; the sub axis resets to the group's first leaf.
    pub fn select_main(&mut self, main: &str, event_tx: &mpsc::Sender<AppEvent>) {
        match self.feed.select_main(main) {
            Ok(ticket) => self.begin_fetch(ticket, event_tx),
            Err(e) => self.set_status(e.to_string()),
        }
    }

    /// Re-fetch the current selection.
    pub fn refresh(&mut self, event_tx: &mpsc::Sender<AppEvent>) {
        let ticket = self.feed.reselect();
        self.begin_fetch(ticket, event_tx);
    }

    fn begin_fetch(&mut self, ticket: FetchTicket, event_tx: &mpsc::Sender<AppEvent>) {
        self.playback.stop_all();

        if let Some(handle) = self.fetch_handle.take() {
            handle.abort();
            tracing::debug!("Aborted superseded content fetch");
        }

        tracing::debug!(epoch = ticket.epoch, selection = %ticket.selection, "Starting content fetch");
        self.fetch_handle = Some(spawn_content_fetch(
            ticket,
            Arc::clone(&self.store),
            event_tx.clone(),
        ));
        self.needs_redraw = true;
    }

    /// Toggle read-aloud for item `index` with the given text.
    pub fn toggle_playback(&mut self, index: usize, text: &str) {
        match self.playback.toggle(index, text) {
            ToggleOutcome::Started { index } => {
                self.set_status(format!("Reading item {} aloud", index));
            }
            ToggleOutcome::Stopped { .. } => self.set_status("Playback stopped"),
            ToggleOutcome::Unavailable { first_report: true } => {
                self.set_status("Speech is not available on this system");
            }
            ToggleOutcome::Unavailable {
                first_report: false,
            } => {}
            ToggleOutcome::Failed { error, .. } => {
                self.set_status(format!("Playback failed: {}", error));
            }
        }
        self.needs_redraw = true;
    }

    /// Toggle read-aloud for item `index` of the displayed record.
    pub fn toggle_item(&mut self, index: usize) {
        let lookup = self
            .feed
            .content()
            .map(|c| (c.item_text(index), c.item_count()));
        match lookup {
            Some((Some(text), _)) => self.toggle_playback(index, &text),
            Some((None, count)) => {
                self.set_status(format!("No item {} (items 0-{})", index, count - 1));
            }
            None => self.set_status(format!("No item {}", index)),
        }
    }

    /// Apply a background task event. Returns `true` when visible state changed.
    pub fn handle_event(&mut self, event: AppEvent) -> bool {
        let changed = match event {
            AppEvent::ContentFetched {
                epoch,
                selection,
                result,
            } => self.handle_content_fetched(epoch, selection, result),
            AppEvent::QuoteFetched(result) => {
                self.quote = match result {
                    Ok(Some(quote)) => QuoteState::Loaded(quote),
                    Ok(None) => QuoteState::Empty,
                    Err(e) => {
                        tracing::warn!(error = %e, "Quote fetch failed");
                        QuoteState::Failed(e.kind())
                    }
                };
                true
            }
            AppEvent::TaskPanicked { task, epoch, error } => {
                tracing::error!(task, error = %error, "Background task panicked");
                self.set_status(format!("Internal error in {} task", task));
                match epoch {
                    Some(epoch) => {
                        self.feed.on_fetch_failed(epoch, FetchErrorKind::Internal);
                    }
                    // The quote task is the only epoch-less fetch
                    None if self.quote == QuoteState::Loading => {
                        self.quote = QuoteState::Failed(FetchErrorKind::Internal);
                    }
                    None => {}
                }
                true
            }
        };
        if changed {
            self.needs_redraw = true;
        }
        changed
    }

    fn handle_content_fetched(
        &mut self,
        epoch: FetchEpoch,
        selection: Selection,
        result: Result<Option<ContentRecord>, StoreError>,
    ) -> bool {
        let applied = match result {
            Ok(record) => {
                let found = record.is_some();
                let applied = self.feed.on_fetch_resolved(epoch, record);
                if applied {
                    tracing::debug!(epoch, selection = %selection, found, "Content fetched");
                }
                applied
            }
            Err(e) => {
                let applied = self.feed.on_fetch_failed(epoch, e.kind());
                if applied {
                    tracing::warn!(epoch, selection = %selection, error = %e, "Content fetch failed");
                    self.set_status(format!("Unable to load {}: {}", selection, e));
                }
                applied
            }
        };
        if applied {
            self.fetch_handle = None;
        }
        applied
    }

    /// Speech engine reported natural completion of `handle`.
    pub fn on_speech_complete(&mut self, handle: SpeechHandle) -> bool {
        let changed = self.playback.on_complete(handle);
        if changed {
            self.needs_redraw = true;
        }
        changed
    }

    pub fn view(&self) -> ViewModel<'_> {
        ViewModel {
            selection: self.feed.selection(),
            phase: self.feed.phase(),
            loading: self.feed.is_loading(),
            content: self.feed.content(),
            error: self.feed.error(),
            quote: match &self.quote {
                QuoteState::Loaded(quote) => Some(quote),
                _ => None,
            },
            playback_index: self.playback.playback_index(),
        }
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear the status message once it has expired. Returns `true` if cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, set_at)) = &self.status_message {
            if set_at.elapsed() >= STATUS_TTL {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.fetch_handle.take() {
            handle.abort();
        }
        self.playback.stop_all();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::menu::{Menu, MenuGroup};
    use crate::playback::NoSpeech;
    use async_trait::async_trait;

    /// Store that never answers; events are injected by hand.
    pub(crate) struct SilentStore;

    #[async_trait]
    impl ContentStore for SilentStore {
        async fn fetch_latest_quote(&self) -> Result<Option<QuoteRecord>, StoreError> {
            std::future::pending().await
        }

        async fn fetch_latest_content(
            &self,
            _selection: &Selection,
        ) -> Result<Option<ContentRecord>, StoreError> {
            std::future::pending().await
        }
    }

    /// 国内[AI, 科技] / 国际[AI], starting on 国内/AI, without speech.
    pub(crate) fn test_app() -> App {
        let menu = Menu::nested(vec![
            MenuGroup::new("国内", &["AI", "科技"]),
            MenuGroup::new("国际", &["AI"]),
        ])
        .unwrap();
        let feed = FeedSynchronizer::new(menu, Selection::pair("国内", "AI")).unwrap();
        App::new(Arc::new(SilentStore), feed, Box::new(NoSpeech))
    }
}
