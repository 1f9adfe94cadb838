//! macOS `say` speech backend.

use async_trait::async_trait;
use log::{debug, trace};
use tokio::process::Command;

use super::process::{ProcessRunner, capture};
use super::{SpeechEngine, Utterance, rate_to_wpm};
use crate::errors::SpeechError;
use crate::voices::Voice;

/// Speaks through the built-in `say` command.
///
/// Voices are selected by name with `-v`, speed with `-r` in words per minute.
/// `say` has no pitch control, so the utterance pitch is ignored.
#[derive(Debug, Default)]
pub struct SayEngine {
    runner: ProcessRunner,
}

impl SayEngine {
    const BACKEND: &'static str = "say";

    pub fn new() -> Self {
        Self::default()
    }

    fn command(utterance: &Utterance) -> Command {
        let mut cmd = Command::new(Self::BACKEND);
        if let Some(voice) = &utterance.voice {
            cmd.arg("-v").arg(&voice.name);
        }
        cmd.arg("-r").arg(rate_to_wpm(utterance.rate).to_string());
        cmd
    }

    /// Parse one line of `say -v '?'` output:
    ///
    /// ```text
    /// Samantha (Enhanced) en_US    # Hello, my name is Samantha.
    /// ```
    pub(crate) fn parse_voice_line(line: &str) -> Option<Voice> {
        let metadata = line.split('#').next()?.trim();
        if metadata.is_empty() {
            return None;
        }

        let locale = metadata.split_whitespace().last()?;
        let name = metadata[..metadata.rfind(locale)?].trim();
        if name.is_empty() || !locale.contains('_') {
            trace!("Skipping say voice line: {}", line);
            return None;
        }

        Some(Voice::new(name, locale))
    }
}

#[async_trait]
impl SpeechEngine for SayEngine {
    async fn list_voices(&self) -> Result<Vec<Voice>, SpeechError> {
        if !cfg!(target_os = "macos") {
            return Err(SpeechError::Unavailable("say is only available on macOS".to_string()));
        }

        let mut cmd = Command::new(Self::BACKEND);
        cmd.arg("-v").arg("?");
        let stdout = capture(Self::BACKEND, cmd).await?;
        let voices: Vec<Voice> = stdout.lines().filter_map(Self::parse_voice_line).collect();

        debug!("say offers {} voice(s)", voices.len());
        Ok(voices)
    }

    async fn speak(&self, utterance: Utterance) -> Result<(), SpeechError> {
        let cmd = Self::command(&utterance);
        self.runner.run(Self::BACKEND, cmd, &utterance.text).await
    }

    fn cancel_all(&self) {
        self.runner.cancel();
    }

    fn name(&self) -> &str {
        Self::BACKEND
    }
}
