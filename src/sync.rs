//! Feed synchronizer: selection → displayed content under out-of-order fetches.
//!
//! Every accepted `select` mints a new fetch epoch. A fetch outcome is applied
//! only when it carries the current epoch; anything older is dropped without
//! touching visible state. There is no externally visible "stale" state.
//!
//! ```text
//! Idle ──select──▶ Loading ──resolved(Some)──▶ Loaded
//!                     │  ───resolved(None)──▶ Empty
//!                     └───failed──────────▶ Failed
//! any ──select──▶ Loading
//! ```
//!
//! This type performs no I/O. The owner issues the fetch described by the
//! returned [`FetchTicket`] and feeds the outcome back.

use crate::content::{ContentRecord, FetchErrorKind};
use crate::menu::{Menu, MenuError, Selection};
use std::sync::Arc;

/// Monotonic fetch generation.
pub type FetchEpoch = u64;

/// Lifecycle of the content for the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    Idle,
    Loading,
    Loaded,
    /// The store had no record for the selection.
    Empty,
    Failed(FetchErrorKind),
}

/// Fetch the owner must issue after an accepted selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub epoch: FetchEpoch,
    pub selection: Selection,
}

pub struct FeedSynchronizer {
    menu: Menu,
    selection: Selection,
    epoch: FetchEpoch,
    phase: FeedPhase,
    /// Last accepted record. Kept while a reselect of the same selection is
    /// loading so it never flickers through empty; dropped as soon as the
    /// selection changes.
    content: Option<Arc<ContentRecord>>,
}

impl FeedSynchronizer {
    /// Create an idle synchronizer. `initial` must be a leaf of `menu`.
    pub fn new(menu: Menu, initial: Selection) -> Result<Self, MenuError> {
        menu.validate(&initial)?;
        Ok(Self {
            menu,
            selection: initial,
            epoch: 0,
            phase: FeedPhase::Idle,
            content: None,
        })
    }

    /// Accept a new selection and mint the epoch for its fetch.
    ///
    /// Invalid selections are rejected before any state changes. Reselecting
    /// the current selection is allowed and starts an independent cycle.
    pub fn select(&mut self, selection: Selection) -> Result<FetchTicket, MenuError> {
        if let Err(e) = self.menu.validate(&selection) {
            tracing::debug!(selection = %selection, "Rejected selection not in menu");
            return Err(e);
        }

        self.epoch = self.epoch.wrapping_add(1);
        self.phase = FeedPhase::Loading;
        if selection != self.selection {
            // The old record belongs to another selection; never show it under this one
            self.content = None;
        }
        self.selection = selection.clone();
        tracing::debug!(epoch = self.epoch, selection = %selection, "Selection changed");

        Ok(FetchTicket {
            epoch: self.epoch,
            selection,
        })
    }

    /// Switch the main axis; the sub axis lands on the group's first leaf.
    pub fn select_main(&mut self, main: &str) -> Result<FetchTicket, MenuError> {
        let selection = self.menu.select_main(main)?;
        self.select(selection)
    }

    /// Reissue the fetch for the current selection.
    pub fn reselect(&mut self) -> FetchTicket {
        self.epoch = self.epoch.wrapping_add(1);
        self.phase = FeedPhase::Loading;
        FetchTicket {
            epoch: self.epoch,
            selection: self.selection.clone(),
        }
    }

    /// Apply a successful fetch outcome. Returns `false` (and changes
    /// nothing) when `epoch` is not current.
    pub fn on_fetch_resolved(&mut self, epoch: FetchEpoch, record: Option<ContentRecord>) -> bool {
        if epoch != self.epoch {
            tracing::debug!(
                expected = self.epoch,
                got = epoch,
                "Ignoring stale content fetch (epoch mismatch)"
            );
            return false;
        }

        match record {
            Some(record) => {
                self.content = Some(Arc::new(record));
                self.phase = FeedPhase::Loaded;
            }
            None => {
                self.content = None;
                self.phase = FeedPhase::Empty;
            }
        }
        true
    }

    /// Apply a failed fetch outcome. Same epoch guard as
    /// [`on_fetch_resolved`](Self::on_fetch_resolved). Content is cleared so a
    /// failure never leaves the previous selection's record on screen.
    pub fn on_fetch_failed(&mut self, epoch: FetchEpoch, kind: FetchErrorKind) -> bool {
        if epoch != self.epoch {
            tracing::debug!(
                expected = self.epoch,
                got = epoch,
                error = %kind,
                "Ignoring stale fetch failure (epoch mismatch)"
            );
            return false;
        }

        self.content = None;
        self.phase = FeedPhase::Failed(kind);
        true
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn epoch(&self) -> FetchEpoch {
        self.epoch
    }

    pub fn phase(&self) -> FeedPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == FeedPhase::Loading
    }

    pub fn content(&self) -> Option<&ContentRecord> {
        self.content.as_deref()
    }

    pub fn error(&self) -> Option<FetchErrorKind> {
        match self.phase {
            FeedPhase::Failed(kind) => Some(kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuGroup;
    use proptest::prelude::*;

    fn menu() -> Menu {
        Menu::nested(vec![
            MenuGroup::new("国内", &["AI", "科技"]),
            MenuGroup::new("国际", &["AI"]),
        ])
        .unwrap()
    }

    fn sync() -> FeedSynchronizer {
        FeedSynchronizer::new(menu(), Selection::pair("国内", "AI")).unwrap()
    }

    #[test]
    fn test_new_starts_idle() {
        let feed = sync();
        assert_eq!(feed.phase(), FeedPhase::Idle);
        assert_eq!(feed.epoch(), 0);
        assert!(feed.content().is_none());
    }

    #[test]
    fn test_new_rejects_invalid_initial() {
        assert!(FeedSynchronizer::new(menu(), Selection::pair("国际", "科技")).is_err());
    }

    #[test]
    fn test_select_bumps_epoch_and_loads() {
        let mut feed = sync();
        let ticket = feed.select(Selection::pair("国际", "AI")).unwrap();
        assert_eq!(ticket.epoch, 1);
        assert_eq!(ticket.selection, Selection::pair("国际", "AI"));
        assert!(feed.is_loading());
        assert_eq!(feed.selection(), &Selection::pair("国际", "AI"));
    }

    #[test]
    fn test_invalid_select_leaves_state_unchanged() {
        let mut feed = sync();
        let ticket = feed.select(Selection::pair("国内", "AI")).unwrap();
        feed.on_fetch_resolved(ticket.epoch, Some(ContentRecord::text("A")));

        let err = feed.select(Selection::pair("创意", "每日一笑")).unwrap_err();
        assert!(matches!(err, MenuError::InvalidSelection(_)));
        assert_eq!(feed.epoch(), 1);
        assert_eq!(feed.phase(), FeedPhase::Loaded);
        assert_eq!(feed.selection(), &Selection::pair("国内", "AI"));
        assert_eq!(feed.content().map(|c| c.content.as_str()), Some("A"));
    }

    #[test]
    fn test_stale_resolution_discarded() {
        let mut feed = sync();
        let a = feed.select(Selection::pair("国内", "AI")).unwrap();
        let b = feed.select(Selection::pair("国际", "AI")).unwrap();

        assert!(feed.on_fetch_resolved(b.epoch, Some(ContentRecord::text("B"))));
        assert!(!feed.on_fetch_resolved(a.epoch, Some(ContentRecord::text("A"))));

        assert_eq!(feed.content().map(|c| c.content.as_str()), Some("B"));
        assert_eq!(feed.phase(), FeedPhase::Loaded);
    }

    #[test]
    fn test_stale_resolution_does_not_clear_loading() {
        let mut feed = sync();
        let a = feed.select(Selection::pair("国内", "AI")).unwrap();
        let _b = feed.select(Selection::pair("国际", "AI")).unwrap();

        assert!(!feed.on_fetch_resolved(a.epoch, None));
        assert!(!feed.on_fetch_failed(a.epoch, FetchErrorKind::Transport));
        assert!(feed.is_loading());
        assert!(feed.error().is_none());
    }

    #[test]
    fn test_not_found_is_empty_not_error() {
        let mut feed = sync();
        let ticket = feed.select(Selection::pair("国内", "科技")).unwrap();
        assert!(feed.on_fetch_resolved(ticket.epoch, None));
        assert_eq!(feed.phase(), FeedPhase::Empty);
        assert!(!feed.is_loading());
        assert!(feed.error().is_none());
        assert!(feed.content().is_none());
    }

    #[test]
    fn test_failure_sets_error_and_clears_content() {
        let mut feed = sync();
        let first = feed.select(Selection::pair("国内", "AI")).unwrap();
        feed.on_fetch_resolved(first.epoch, Some(ContentRecord::text("A")));

        let second = feed.select(Selection::pair("国际", "AI")).unwrap();
        assert!(feed.on_fetch_failed(second.epoch, FetchErrorKind::Status(500)));
        assert_eq!(feed.error(), Some(FetchErrorKind::Status(500)));
        assert!(!feed.is_loading());
        assert!(feed.content().is_none());
    }

    #[test]
    fn test_reselect_after_failure_recovers() {
        let mut feed = sync();
        let first = feed.select(Selection::pair("国内", "AI")).unwrap();
        feed.on_fetch_failed(first.epoch, FetchErrorKind::Timeout);

        let retry = feed.select(Selection::pair("国内", "AI")).unwrap();
        assert_ne!(retry.epoch, first.epoch);
        assert!(feed.on_fetch_resolved(retry.epoch, Some(ContentRecord::text("A"))));
        assert_eq!(feed.phase(), FeedPhase::Loaded);
        assert!(feed.error().is_none());
    }

    #[test]
    fn test_same_selection_twice_keeps_content_while_loading() {
        let mut feed = sync();
        let first = feed.select(Selection::pair("国内", "AI")).unwrap();
        feed.on_fetch_resolved(first.epoch, Some(ContentRecord::text("v1")));

        let second = feed.select(Selection::pair("国内", "AI")).unwrap();
        assert!(feed.is_loading());
        assert_eq!(feed.content().map(|c| c.content.as_str()), Some("v1"));

        feed.on_fetch_resolved(second.epoch, Some(ContentRecord::text("v2")));
        assert_eq!(feed.content().map(|c| c.content.as_str()), Some("v2"));
    }

    #[test]
    fn test_switching_selection_drops_previous_content() {
        let mut feed = sync();
        let first = feed.select(Selection::pair("国内", "AI")).unwrap();
        feed.on_fetch_resolved(first.epoch, Some(ContentRecord::text("A")));

        feed.select(Selection::pair("国际", "AI")).unwrap();
        assert!(feed.is_loading());
        assert!(feed.content().is_none());
    }

    #[test]
    fn test_reselect_keeps_content_while_loading() {
        let mut feed = sync();
        let first = feed.select(Selection::pair("国内", "AI")).unwrap();
        feed.on_fetch_resolved(first.epoch, Some(ContentRecord::text("A")));

        feed.reselect();
        assert_eq!(feed.content().map(|c| c.content.as_str()), Some("A"));
    }

    #[test]
    fn test_select_main_resets_sub() {
        let mut feed = sync();
        feed.select(Selection::pair("国内", "科技")).unwrap();
        let ticket = feed.select_main("国际").unwrap();
        assert_eq!(ticket.selection, Selection::pair("国际", "AI"));
        assert!(feed.select_main("创意").is_err());
        assert_eq!(feed.selection(), &Selection::pair("国际", "AI"));
    }

    #[test]
    fn test_reselect_mints_new_epoch() {
        let mut feed = sync();
        let first = feed.select(Selection::pair("国内", "AI")).unwrap();
        let again = feed.reselect();
        assert_eq!(again.epoch, first.epoch + 1);
        assert_eq!(again.selection, first.selection);
        assert!(!feed.on_fetch_resolved(first.epoch, None));
    }

    proptest! {
        /// Whatever order fetches resolve in, only the last selection's
        /// outcome is visible.
        #[test]
        fn prop_only_last_epoch_applies(
            picks in proptest::collection::vec(0usize..3, 1..12),
            order_seed in proptest::collection::vec(any::<u32>(), 12),
        ) {
            let leaves = menu().leaves();
            let mut feed = sync();
            let tickets: Vec<FetchTicket> = picks
                .iter()
                .map(|&i| feed.select(leaves[i].clone()).unwrap())
                .collect();

            let mut order: Vec<usize> = (0..tickets.len()).collect();
            order.sort_by_key(|&i| order_seed[i]);

            let last_epoch = tickets.last().unwrap().epoch;
            for i in order {
                let ticket = &tickets[i];
                let applied = feed.on_fetch_resolved(
                    ticket.epoch,
                    Some(ContentRecord::text(format!("epoch-{}", ticket.epoch))),
                );
                prop_assert_eq!(applied, ticket.epoch == last_epoch);
            }

            let expected = format!("epoch-{}", last_epoch);
            prop_assert_eq!(feed.content().map(|c| c.content.clone()), Some(expected));
            prop_assert_eq!(feed.phase(), FeedPhase::Loaded);
        }
    }
}
