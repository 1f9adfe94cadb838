//! Child-process plumbing shared by the command-line speech backends.

use log::{debug, trace};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::errors::SpeechError;

/// Runs one synthesizer process at a time and lets another task interrupt it.
///
/// Every `cancel` bumps an epoch, so a cancel that arrives while the child is
/// still being spawned or fed its text is seen before waiting on it.
#[derive(Debug, Default)]
pub(crate) struct ProcessRunner {
    epoch: AtomicU64,
    cancel: Notify,
}

impl ProcessRunner {
    /// Spawn `cmd`, feed `text` on stdin and wait for exit or cancellation
    pub async fn run(&self, backend: &str, cmd: Command, text: &str) -> Result<(), SpeechError> {
        let epoch = self.begin();
        self.run_from(epoch, backend, cmd, text).await
    }

    /// Epoch a run started in; a later `cancel` interrupts it
    pub fn begin(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn cancelled_since(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) != epoch
    }

    pub async fn run_from(&self, epoch: u64, backend: &str, mut cmd: Command, text: &str) -> Result<(), SpeechError> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| SpeechError::SpawnFailed {
            backend: backend.to_string(),
            source: e,
        })?;

        // Drained while the child runs so a chatty synthesizer cannot fill the pipe
        let stderr_reader: Option<JoinHandle<String>> = child.stderr.take().map(|mut err| {
            tokio::spawn(async move {
                let mut message = String::new();
                let _ = err.read_to_string(&mut message).await;
                message
            })
        });

        if let Some(mut stdin) = child.stdin.take() {
            if !self.cancelled_since(epoch) {
                stdin
                    .write_all(text.as_bytes())
                    .await
                    .map_err(|e| SpeechError::ProcessFailed {
                        backend: backend.to_string(),
                        stderr: format!("failed to write text: {}", e),
                    })?;
            }
            // EOF tells the synthesizer the text is complete
            drop(stdin);
        }

        let cancelled = self.cancel.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();

        let finished = if self.cancelled_since(epoch) {
            None
        } else {
            tokio::select! {
                status = child.wait() => Some(status),
                _ = &mut cancelled => None,
            }
        };

        let Some(status) = finished else {
            debug!("Cancelling {} utterance", backend);
            let _ = child.kill().await;
            if let Some(reader) = stderr_reader {
                reader.abort();
            }
            return Err(SpeechError::Cancelled);
        };

        let status = status.map_err(|e| SpeechError::ProcessFailed {
            backend: backend.to_string(),
            stderr: e.to_string(),
        })?;

        if status.success() {
            trace!("{} finished utterance", backend);
            return Ok(());
        }

        let message = match stderr_reader {
            Some(reader) => reader.await.unwrap_or_default(),
            None => String::new(),
        };
        Err(SpeechError::ProcessFailed {
            backend: backend.to_string(),
            stderr: if message.trim().is_empty() {
                format!("exited with {}", status)
            } else {
                message.trim().to_string()
            },
        })
    }

    /// Interrupt the process currently being waited on, if any
    pub fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.cancel.notify_waiters();
    }
}

/// Run a listing command and return its stdout
pub(crate) async fn capture(backend: &str, mut cmd: Command) -> Result<String, SpeechError> {
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| SpeechError::VoiceEnumerationFailed {
            backend: backend.to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(SpeechError::VoiceEnumerationFailed {
            backend: backend.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
