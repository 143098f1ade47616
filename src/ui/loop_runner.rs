//! Main event loop for the terminal front-end.
//!
//! Multiplexes stdin command lines, background task events, speech
//! completions, a periodic tick, and shutdown signals.

use crate::app::{App, AppEvent, QuoteState};
use crate::playback::SpeechHandle;
use anyhow::Result;
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::input::{handle_command, parse_command};
use super::render::{render_help, render_view};

/// Result of handling one command line.
pub enum Action {
    /// Continue the event loop and process more events.
    Continue,
    /// Print this text, then continue.
    Print(String),
    /// Exit the application.
    Quit,
}

/// Runs the interactive loop until `q`, end of input, or a signal.
///
/// Uses `tokio::select!` to multiplex:
/// - **Signals**: SIGTERM/SIGINT end the loop (highest priority)
/// - **Background tasks**: fetch results via the `AppEvent` channel
/// - **Speech completions**: handles from the speech engine
/// - **Stdin**: one command per line
/// - **Periodic tick**: 250ms timer for status expiry
///
/// The view is reprinted after any change that marks `needs_redraw`.
pub async fn run(
    app: &mut App,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
    mut speech_rx: mpsc::UnboundedReceiver<SpeechHandle>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick_interval = tokio::time::interval(Duration::from_millis(250));

    // On non-Unix platforms these become pending futures that never complete
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    print(render_help())?;
    app.start(&event_tx);

    loop {
        if app.needs_redraw {
            print(&render_view(app))?;
            app.needs_redraw = false;
        }

        // Drain pending events so a burst of results prints once
        while let Ok(event) = event_rx.try_recv() {
            app.handle_event(event);
        }
        if app.needs_redraw {
            continue;
        }

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            Some(event) = event_rx.recv() => {
                app.handle_event(event);
            }

            Some(handle) = speech_rx.recv() => {
                app.on_speech_complete(handle);
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::debug!("Stdin closed");
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(command)) => match handle_command(app, command, &event_tx) {
                        Action::Continue => app.needs_redraw = true,
                        Action::Print(text) => print(&text)?,
                        Action::Quit => break,
                    },
                    Ok(None) => {}
                    Err(msg) => print(&format!("{}\n", msg))?,
                }
            }

            _ = tick_interval.tick() => {
                // Expiry only affects the next print; no reprint needed
                app.clear_expired_status();
            }
        }
    }

    app.playback.stop_all();
    Ok(())
}

/// Wait for the start-up fetches, print the view once, and return.
///
/// Gives up after `timeout` and prints whatever state was reached.
pub async fn run_once(
    app: &mut App,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
    timeout: Duration,
) -> Result<()> {
    app.start(&event_tx);
    drop(event_tx);

    let settle = async {
        while app.feed.is_loading() || app.quote == QuoteState::Loading {
            match event_rx.recv().await {
                Some(event) => {
                    app.handle_event(event);
                }
                None => break,
            }
        }
    };
    if tokio::time::timeout(timeout, settle).await.is_err() {
        tracing::warn!(timeout_secs = timeout.as_secs(), "Timed out waiting for start-up fetches");
    }

    print(&render_view(app))?;
    Ok(())
}

fn print(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
