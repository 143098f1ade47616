//! dailybrief: a terminal client for a daily-curated news and quote feed.
//!
//! The core is two state machines driven by the [`app::App`] owner:
//!
//! - [`sync::FeedSynchronizer`] keeps the displayed record consistent with
//!   the latest menu selection even when fetches resolve out of order.
//! - [`playback::PlaybackController`] keeps at most one read-aloud session
//!   alive and stops it whenever the selection changes.
//!
//! The remote store sits behind [`content::ContentStore`]; the speech host
//! behind [`playback::SpeechEngine`].

pub mod app;
pub mod config;
pub mod content;
pub mod menu;
pub mod playback;
pub mod sync;
pub mod tasks;
pub mod ui;
pub mod util;
