//! Background fetch tasks.
//!
//! Fetches run on spawned tokio tasks and report back to the event loop as
//! [`AppEvent`]s. Content fetches carry the epoch they were issued under so
//! the receiver can discard superseded results.

use crate::app::AppEvent;
use crate::content::ContentStore;
use crate::sync::FetchTicket;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Wraps a future to catch panics and convert them to errors.
///
/// Panics inside spawned tasks would otherwise vanish into the runtime and
/// leave the UI waiting on a result that never arrives.
///
/// # Returns
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Spawn the fetch described by `ticket`.
///
/// Sends `AppEvent::ContentFetched` tagged with the ticket's epoch, or
/// `AppEvent::TaskPanicked` carrying the epoch if the fetch panics.
///
/// Returns the JoinHandle so the caller can abort the task once a newer
/// selection supersedes it.
pub fn spawn_content_fetch(
    ticket: FetchTicket,
    store: Arc<dyn ContentStore>,
    tx: mpsc::Sender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let FetchTicket { epoch, selection } = ticket;
        let outcome = catch_task_panic(store.fetch_latest_content(&selection)).await;

        let event = match outcome {
            Ok(result) => AppEvent::ContentFetched {
                epoch,
                selection,
                result,
            },
            Err(panic_msg) => {
                tracing::error!(task = "content_fetch", epoch, error = %panic_msg, "Background task panicked");
                AppEvent::TaskPanicked {
                    task: "content_fetch",
                    epoch: Some(epoch),
                    error: panic_msg,
                }
            }
        };

        if let Err(e) = tx.send(event).await {
            tracing::warn!(error = %e, event = "ContentFetched", "Channel send failed (receiver dropped)");
        }
    })
}

/// Spawn the one-off quote fetch.
pub fn spawn_quote_fetch(store: Arc<dyn ContentStore>, tx: mpsc::Sender<AppEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let event = match catch_task_panic(store.fetch_latest_quote()).await {
            Ok(result) => AppEvent::QuoteFetched(result),
            Err(panic_msg) => {
                tracing::error!(task = "quote_fetch", error = %panic_msg, "Background task panicked");
                AppEvent::TaskPanicked {
                    task: "quote_fetch",
                    epoch: None,
                    error: panic_msg,
                }
            }
        };

        if let Err(e) = tx.send(event).await {
            tracing::warn!(error = %e, event = "QuoteFetched", "Channel send failed (receiver dropped)");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catch_task_panic_ok() {
        let result = catch_task_panic(async { 42 }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_catch_task_panic_message() {
        let result: Result<(), String> = catch_task_panic(async { panic!("boom") }).await;
        assert_eq!(result, Err("boom".to_string()));

        let result: Result<(), String> =
            catch_task_panic(async { panic!("code {}", 7) }).await;
        assert_eq!(result, Err("code 7".to_string()));
    }
}
