//! eSpeak NG speech backend.

use async_trait::async_trait;
use log::{debug, trace};
use tokio::process::Command;

use super::process::{ProcessRunner, capture};
use super::{SpeechEngine, Utterance, rate_to_wpm};
use crate::drill::model::Language;
use crate::errors::SpeechError;
use crate::voices::Voice;

/// Default binary name
pub const DEFAULT_ESPEAK_BINARY: &str = "espeak-ng";

/// Speaks through `espeak-ng` (or a compatible `espeak` binary)
#[derive(Debug)]
pub struct ESpeakEngine {
    binary: String,
    runner: ProcessRunner,
}

impl Default for ESpeakEngine {
    fn default() -> Self {
        Self::with_binary(DEFAULT_ESPEAK_BINARY)
    }
}

impl ESpeakEngine {
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            runner: ProcessRunner::default(),
        }
    }

    /// eSpeak pitch runs 0..=99 with 50 as neutral
    fn pitch_arg(pitch: f32) -> u32 {
        (50.0 * pitch).round().clamp(0.0, 99.0) as u32
    }

    fn voice_arg(utterance: &Utterance) -> String {
        match &utterance.voice {
            Some(voice) => voice.identifier.clone().unwrap_or_else(|| voice.name.clone()),
            None => match utterance.language {
                Language::English => "en-us".to_string(),
                Language::Mandarin => "cmn".to_string(),
            },
        }
    }

    fn command(&self, utterance: &Utterance) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-v")
            .arg(Self::voice_arg(utterance))
            .arg("-s")
            .arg(rate_to_wpm(utterance.rate).to_string())
            .arg("-p")
            .arg(Self::pitch_arg(utterance.pitch).to_string());
        cmd
    }

    /// Parse one line of `espeak-ng --voices`:
    ///
    /// ```text
    /// Pty Language       Age/Gender VoiceName          File
    ///  5  cmn             --/M      Chinese_(Mandarin) sit/cmn
    /// ```
    pub(crate) fn parse_voice_line(line: &str) -> Option<Voice> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 || parts[0].parse::<u32>().is_err() {
            trace!("Skipping espeak voice line: {}", line);
            return None;
        }

        let language = parts[1];
        let name = parts[3].replace('_', " ");
        Some(Voice::new(name, language).with_identifier(language))
    }
}

#[async_trait]
impl SpeechEngine for ESpeakEngine {
    async fn list_voices(&self) -> Result<Vec<Voice>, SpeechError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--voices");
        let stdout = capture(&self.binary, cmd).await?;
        let voices: Vec<Voice> = stdout.lines().filter_map(Self::parse_voice_line).collect();

        debug!("{} offers {} voice(s)", self.binary, voices.len());
        Ok(voices)
    }

    async fn speak(&self, utterance: Utterance) -> Result<(), SpeechError> {
        let cmd = self.command(&utterance);
        self.runner.run(&self.binary, cmd, &utterance.text).await
    }

    fn cancel_all(&self) {
        self.runner.cancel();
    }

    fn name(&self) -> &str {
        &self.binary
    }
}
