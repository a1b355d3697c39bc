//! Database models
//!
//! Row types for both stores plus [`EntryPatch`], the fixed set of patchable
//! `dictionary` columns. Every write path that fills in entry fields goes
//! through a patch, and a patch only ever targets empty fields.

use serde::{Deserialize, Serialize};

/// Provenance tag for entries created from CC-CEDICT
pub const CEDICT_SOURCE: &str = "CC-CEDICT";

/// Provenance tag for example sentences synthesized by the generative API
pub const AI_SOURCE: &str = "ai";

/// Primary Store `dictionary` row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LexicalEntry {
    pub id: i64,
    /// Lexical identity (simplified or canonical written form)
    pub word: String,
    pub traditional: Option<String>,
    pub simplified: Option<String>,
    pub pinyin: Option<String>,
    pub zhuyin: Option<String>,
    /// Vietnamese meaning; empty for entries awaiting enrichment
    pub vi_meaning: Option<String>,
    pub en_meaning: Option<String>,
    pub part_of_speech: Option<String>,
    pub hsk_level: Option<i64>,
    pub tocfl_level: Option<i64>,
    pub frequency_rank: Option<i64>,
    /// Sino-Vietnamese (Hán-Việt) reading
    pub hanviet_reading: Option<String>,
    /// Serialized CC-CEDICT definition list
    pub cedict_definitions: Option<String>,
    /// Provenance tag
    pub source: Option<String>,
    /// Serialized grammar metadata
    pub grammar_info: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Column list matching [`LexicalEntry`] field order
pub const ENTRY_COLUMNS: &str = "id, word, traditional, simplified, pinyin, zhuyin, vi_meaning, \
     en_meaning, part_of_speech, hsk_level, tocfl_level, frequency_rank, hanviet_reading, \
     cedict_definitions, source, grammar_info, \
     CAST(created_at AS TEXT) AS created_at, CAST(updated_at AS TEXT) AS updated_at";

/// Source Store `cedict_entries` row
///
/// Identity is the (traditional, simplified, pinyin) triple.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SourceEntry {
    pub id: i64,
    pub traditional: String,
    pub simplified: String,
    pub pinyin: String,
    /// Definitions joined with "; "
    pub english: String,
    /// JSON array of discrete definitions
    pub definitions: String,
}

impl SourceEntry {
    /// Discrete definitions; falls back to the combined gloss when the
    /// serialized list is unreadable
    pub fn definition_list(&self) -> Vec<String> {
        match serde_json::from_str::<Vec<String>>(&self.definitions) {
            Ok(list) => list,
            Err(_) if self.english.trim().is_empty() => Vec::new(),
            Err(_) => vec![self.english.clone()],
        }
    }

    /// Traditional form, only when it differs from the simplified one
    pub fn distinct_traditional(&self) -> Option<&str> {
        (self.traditional != self.simplified).then_some(self.traditional.as_str())
    }
}

/// Example sentence row (child of an entry)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExampleSentence {
    pub chinese: String,
    #[serde(default)]
    pub pinyin: Option<String>,
    #[serde(default)]
    pub vietnamese: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Topic tag row (child of an entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub tag: String,
    pub category: Option<String>,
}

/// True when a text field counts as unpopulated
pub fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Candidate value survives only if it is non-blank and the target is blank
fn fill_only(candidate: &Option<String>, current: &Option<String>) -> Option<String> {
    if is_blank(current) && !is_blank(candidate) {
        candidate.clone()
    } else {
        None
    }
}

/// Typed field patch for a `dictionary` row
///
/// One optional value per patchable column. `None` means "leave alone".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
    pub pinyin: Option<String>,
    pub zhuyin: Option<String>,
    pub hanviet_reading: Option<String>,
    pub vi_meaning: Option<String>,
    pub en_meaning: Option<String>,
    pub traditional: Option<String>,
    pub simplified: Option<String>,
    pub part_of_speech: Option<String>,
    pub cedict_definitions: Option<String>,
    pub grammar_info: Option<String>,
}

impl EntryPatch {
    /// Drop every value whose target field is already populated, and every
    /// blank candidate
    pub fn restricted_to_empty(&self, entry: &LexicalEntry) -> EntryPatch {
        EntryPatch {
            pinyin: fill_only(&self.pinyin, &entry.pinyin),
            zhuyin: fill_only(&self.zhuyin, &entry.zhuyin),
            hanviet_reading: fill_only(&self.hanviet_reading, &entry.hanviet_reading),
            vi_meaning: fill_only(&self.vi_meaning, &entry.vi_meaning),
            en_meaning: fill_only(&self.en_meaning, &entry.en_meaning),
            traditional: fill_only(&self.traditional, &entry.traditional),
            simplified: fill_only(&self.simplified, &entry.simplified),
            part_of_speech: fill_only(&self.part_of_speech, &entry.part_of_speech),
            cedict_definitions: fill_only(&self.cedict_definitions, &entry.cedict_definitions),
            grammar_info: fill_only(&self.grammar_info, &entry.grammar_info),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }

    /// Names of the columns this patch writes
    pub fn field_names(&self) -> Vec<&'static str> {
        [
            ("pinyin", &self.pinyin),
            ("zhuyin", &self.zhuyin),
            ("hanviet_reading", &self.hanviet_reading),
            ("vi_meaning", &self.vi_meaning),
            ("en_meaning", &self.en_meaning),
            ("traditional", &self.traditional),
            ("simplified", &self.simplified),
            ("part_of_speech", &self.part_of_speech),
            ("cedict_definitions", &self.cedict_definitions),
            ("grammar_info", &self.grammar_info),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_some())
        .map(|(name, _)| name)
        .collect()
    }
}
