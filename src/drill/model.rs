/*!
 * Drill data model.
 *
 * Phrase pairs come from the catalog; drill items and sequences are derived
 * from them and never mutated once built.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Catalog-assigned, opaque phrase identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhraseId(String);

impl PhraseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhraseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PhraseId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One English/Mandarin pairing drilled together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhrasePair {
    pub id: PhraseId,
    pub english: String,
    pub chinese: String,
    #[serde(default)]
    pub pinyin: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
}

impl PhrasePair {
    pub fn new(id: impl Into<PhraseId>, english: impl Into<String>, chinese: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            english: english.into(),
            chinese: chinese.into(),
            pinyin: None,
            category: None,
            example: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_pinyin(mut self, pinyin: impl Into<String>) -> Self {
        self.pinyin = Some(pinyin.into());
        self
    }

    /// Both texts must be non-blank for the pair to enter a sequence
    pub fn is_drillable(&self) -> bool {
        !self.english.trim().is_empty() && !self.chinese.trim().is_empty()
    }
}

impl From<String> for PhraseId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Spoken language of a drill item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Mandarin,
}

impl Language {
    /// Language tag handed to the speech backend
    pub fn tag(&self) -> &'static str {
        match self {
            Self::English => "en-US",
            Self::Mandarin => "zh-CN",
        }
    }

    /// Primary subtag used to group candidate voices
    pub fn primary_subtag(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Mandarin => "zh",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Mandarin => "Mandarin",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One step of a drill sequence
#[derive(Debug, Clone, PartialEq)]
pub struct DrillItem {
    text: String,
    language: Language,
    phrase_id: PhraseId,
}

impl DrillItem {
    pub fn new(text: impl Into<String>, language: Language, phrase_id: PhraseId) -> Self {
        Self {
            text: text.into(),
            language,
            phrase_id,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The label shown while the item is spoken is the text itself
    pub fn label(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn phrase_id(&self) -> &PhraseId {
        &self.phrase_id
    }

    pub fn is_mandarin(&self) -> bool {
        self.language == Language::Mandarin
    }
}

/// Ordered, finite, read-only list of drill items.
///
/// Cloning is cheap: the items are shared, and a rebuild always produces a new
/// sequence rather than touching an existing one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrillSequence {
    items: Arc<[DrillItem]>,
}

impl DrillSequence {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DrillItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[DrillItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DrillItem> {
        self.items.iter()
    }
}

impl From<Vec<DrillItem>> for DrillSequence {
    fn from(items: Vec<DrillItem>) -> Self {
        Self { items: items.into() }
    }
}
