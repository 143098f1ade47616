//! Speech engine backed by a system text-to-speech command.
//!
//! Each utterance is one child process (`say` on macOS, `espeak-ng`
//! elsewhere by default) with the text as its final argument. A watcher task
//! waits for the child and sends its handle on the completion channel when
//! it exits on its own. Cancelling kills the child and suppresses the
//! completion.

use super::{SpeechEngine, SpeechError, SpeechHandle};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

/// Default TTS program for this platform.
pub fn default_program() -> &'static str {
    if cfg!(target_os = "macos") {
        "say"
    } else {
        "espeak-ng"
    }
}

pub struct CommandSpeechEngine {
    program: String,
    args: Vec<String>,
    next_handle: u64,
    /// Kill switches for children that may still be running.
    running: HashMap<SpeechHandle, oneshot::Sender<()>>,
    completions: mpsc::UnboundedSender<SpeechHandle>,
    /// Cleared once the program turns out to be missing.
    available: bool,
}

impl CommandSpeechEngine {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        completions: mpsc::UnboundedSender<SpeechHandle>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            next_handle: 0,
            running: HashMap::new(),
            completions,
            available: true,
        }
    }
}

impl SpeechEngine for CommandSpeechEngine {
    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&mut self, text: &str) -> Result<SpeechHandle, SpeechError> {
        // Watchers drop their receiver when the child exits
        self.running.retain(|_, kill| !kill.is_closed());

        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(program = %self.program, "Speech program not found");
                self.available = false;
                return Err(SpeechError::Unavailable);
            }
            Err(e) => return Err(SpeechError::Spawn(e)),
        };

        self.next_handle += 1;
        let handle = SpeechHandle(self.next_handle);
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        self.running.insert(handle, kill_tx);

        let completions = self.completions.clone();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    match status {
                        Ok(status) if !status.success() => {
                            tracing::debug!(handle = handle.0, %status, "Speech program exited with failure");
                        }
                        Err(e) => {
                            tracing::warn!(handle = handle.0, error = %e, "Failed to wait for speech program");
                        }
                        Ok(_) => {}
                    }
                    if completions.send(handle).is_err() {
                        tracing::debug!(handle = handle.0, "Completion receiver dropped");
                    }
                }
                _ = kill_rx => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(handle = handle.0, error = %e, "Failed to stop speech program");
                    }
                }
            }
        });

        Ok(handle)
    }

    fn cancel(&mut self, handle: SpeechHandle) {
        if let Some(kill) = self.running.remove(&handle) {
            // Err means the child already exited; nothing to stop
            let _ = kill.send(());
        }
    }
}
