/*!
 * Voice directory.
 *
 * Enumerates the voices a speech backend offers, groups them per drill
 * language and picks a default for each language from a ranked rule table.
 * Selection is idempotent; running it again after the backend's voice list
 * changes simply supersedes the previous choice.
 */

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::drill::model::Language;
use crate::speech::SpeechEngine;

/// A synthetic voice offered by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Display name, also the handle the user picks by
    pub name: String,
    /// Normalised language tag, e.g. `en-US`
    pub lang: String,
    /// Backend-specific identifier when it differs from the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: &str) -> Self {
        Self {
            name: name.into(),
            lang: normalize_lang_tag(lang),
            identifier: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Whether this voice speaks `language`
    pub fn speaks(&self, language: Language) -> bool {
        primary_subtag(&self.lang) == language.primary_subtag()
    }
}

/// Normalise platform locale spellings (`en_US`, `en-us`, `cmn`) to `en-US` / `zh-CN` form
pub fn normalize_lang_tag(tag: &str) -> String {
    let tag = tag.trim().replace('_', "-");
    let mut parts = tag.split('-').filter(|p| !p.is_empty());

    let primary = match parts.next() {
        Some(p) => p.to_ascii_lowercase(),
        None => return String::new(),
    };
    let region = parts.next().map(|r| {
        if r.len() == 2 {
            r.to_ascii_uppercase()
        } else {
            r.to_ascii_lowercase()
        }
    });

    // espeak names Mandarin by its ISO 639-3 code
    match (primary.as_str(), region) {
        ("cmn", None) => "zh-CN".to_string(),
        ("cmn", Some(r)) if r.len() == 2 => format!("zh-{}", r),
        ("cmn", Some(_)) => "zh-CN".to_string(),
        (_, Some(r)) => format!("{}-{}", primary, r),
        (_, None) => primary,
    }
}

fn primary_subtag(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag)
}

/// One entry of a ranked selection table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceRule {
    /// Name contains the needle, case-insensitively
    NameContains(&'static str),
    /// Language tag equals the given tag exactly
    LangExact(&'static str),
    /// Language tag starts with the given prefix
    LangPrefix(&'static str),
}

impl VoiceRule {
    pub fn matches(&self, voice: &Voice) -> bool {
        match self {
            Self::NameContains(needle) => voice.name.to_lowercase().contains(needle),
            Self::LangExact(tag) => voice.lang == *tag,
            Self::LangPrefix(prefix) => voice.lang.starts_with(prefix),
        }
    }
}

/// English preference: enhanced > premium > neural > en-US > any en
pub const ENGLISH_RULES: &[VoiceRule] = &[
    VoiceRule::NameContains("enhanced"),
    VoiceRule::NameContains("premium"),
    VoiceRule::NameContains("neural"),
    VoiceRule::LangExact("en-US"),
    VoiceRule::LangPrefix("en"),
];

/// Mandarin preference: enhanced > premium > Ting-Ting > Sin-ji > zh-CN > any zh
pub const MANDARIN_RULES: &[VoiceRule] = &[
    VoiceRule::NameContains("enhanced"),
    VoiceRule::NameContains("premium"),
    VoiceRule::NameContains("ting-ting"),
    VoiceRule::NameContains("sin-ji"),
    VoiceRule::LangExact("zh-CN"),
    VoiceRule::LangPrefix("zh"),
];

pub fn rules_for(language: Language) -> &'static [VoiceRule] {
    match language {
        Language::English => ENGLISH_RULES,
        Language::Mandarin => MANDARIN_RULES,
    }
}

/// First candidate matched by the earliest rule in `rules`
pub fn select_by_rules<'a>(candidates: &'a [Voice], rules: &[VoiceRule]) -> Option<&'a Voice> {
    rules
        .iter()
        .find_map(|rule| candidates.iter().find(|v| rule.matches(v)))
}

/// Voices grouped by drill language
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceList {
    pub english: Vec<Voice>,
    pub mandarin: Vec<Voice>,
}

impl VoiceList {
    pub fn from_voices(voices: &[Voice]) -> Self {
        Self {
            english: voices.iter().filter(|v| v.speaks(Language::English)).cloned().collect(),
            mandarin: voices.iter().filter(|v| v.speaks(Language::Mandarin)).cloned().collect(),
        }
    }

    pub fn for_language(&self, language: Language) -> &[Voice] {
        match language {
            Language::English => &self.english,
            Language::Mandarin => &self.mandarin,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.english.is_empty() && self.mandarin.is_empty()
    }
}

/// Default choice per language; `None` means "use the platform default"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultVoices {
    pub english: Option<Voice>,
    pub mandarin: Option<Voice>,
}

impl DefaultVoices {
    pub fn for_language(&self, language: Language) -> Option<&Voice> {
        match language {
            Language::English => self.english.as_ref(),
            Language::Mandarin => self.mandarin.as_ref(),
        }
    }
}

/// Apply the ranked rule tables to each language's candidates
pub fn select_default(voices: &VoiceList) -> DefaultVoices {
    DefaultVoices {
        english: select_by_rules(&voices.english, ENGLISH_RULES).cloned(),
        mandarin: select_by_rules(&voices.mandarin, MANDARIN_RULES).cloned(),
    }
}

/// Chosen voice plus picker candidates for one language
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceSelection {
    pub chosen: Option<Voice>,
    pub candidates: Vec<Voice>,
    /// Name the user picked; kept across refreshes while it is still offered
    pub pinned: Option<String>,
}

/// Tracks the backend's voices and the current selection per language
#[derive(Debug)]
pub struct VoiceDirectory {
    engine: Arc<dyn SpeechEngine>,
    english: VoiceSelection,
    mandarin: VoiceSelection,
}

impl VoiceDirectory {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            english: VoiceSelection::default(),
            mandarin: VoiceSelection::default(),
        }
    }

    /// Enumerate voices from the backend. A missing or failing backend is
    /// reported as "no voices", never as an error.
    pub async fn list_voices(&self) -> VoiceList {
        match self.engine.list_voices().await {
            Ok(voices) => VoiceList::from_voices(&voices),
            Err(e) => {
                warn!(
                    "Voice enumeration unavailable for {}, using platform default voices: {}",
                    self.engine.name(),
                    e
                );
                VoiceList::default()
            }
        }
    }

    /// Re-enumerate and re-select. Safe to call any number of times.
    pub async fn refresh(&mut self) -> &Self {
        let voices = self.list_voices().await;
        self.apply(voices);
        self
    }

    /// Re-run selection against an already enumerated list
    pub fn apply(&mut self, voices: VoiceList) {
        let defaults = select_default(&voices);
        Self::reselect(&mut self.english, voices.english, defaults.english);
        Self::reselect(&mut self.mandarin, voices.mandarin, defaults.mandarin);

        info!(
            "Selected English voice: {}",
            self.english.chosen.as_ref().map_or("Default", |v| v.name.as_str())
        );
        info!(
            "Selected Mandarin voice: {}",
            self.mandarin.chosen.as_ref().map_or("Default", |v| v.name.as_str())
        );
    }

    fn reselect(selection: &mut VoiceSelection, candidates: Vec<Voice>, default: Option<Voice>) {
        let pinned = selection
            .pinned
            .as_ref()
            .and_then(|name| candidates.iter().find(|v| &v.name == name).cloned());
        selection.chosen = pinned.or(default);
        selection.candidates = candidates;
    }

    /// Pin a voice by name. Returns false when the name is not among the
    /// current candidates; the current choice then stays as it is.
    pub fn choose(&mut self, language: Language, name: &str) -> bool {
        let selection = self.selection_mut(language);
        match selection.candidates.iter().find(|v| v.name == name).cloned() {
            Some(voice) => {
                debug!("Pinned {} voice '{}'", language.display_name(), voice.name);
                selection.pinned = Some(voice.name.clone());
                selection.chosen = Some(voice);
                true
            }
            None => {
                // Remember the preference so a later refresh can honour it
                selection.pinned = Some(name.to_string());
                false
            }
        }
    }

    pub fn selection(&self, language: Language) -> &VoiceSelection {
        match language {
            Language::English => &self.english,
            Language::Mandarin => &self.mandarin,
        }
    }

    fn selection_mut(&mut self, language: Language) -> &mut VoiceSelection {
        match language {
            Language::English => &mut self.english,
            Language::Mandarin => &mut self.mandarin,
        }
    }

    pub fn chosen(&self) -> DefaultVoices {
        DefaultVoices {
            english: self.english.chosen.clone(),
            mandarin: self.mandarin.chosen.clone(),
        }
    }

    /// Change notifications from the backend, if it publishes any
    pub fn subscribe(&self) -> Option<watch::Receiver<u64>> {
        self.engine.voice_changes()
    }
}
