//! Enrichment client
//!
//! Synthesizes missing entry fields through a generative completion API.
//! Each [`FieldRequest`] becomes one rate-limited call with its own prompt
//! and token budget. Structured answers are pulled out of the free-form
//! reply with [`extract_json`].
//!
//! Every failure (network, HTTP status, unusable reply) is soft: it is
//! logged with the word and field kind and yields [`Enrichment::Empty`].
//! Nothing is retried within a call.

use cvdict_common::db::{ExampleSentence, AI_SOURCE};
use cvdict_common::pinyin::numbered_to_marked;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::completion_backend::{CompletionBackend, CompletionRequest, DeepSeekBackend};
use super::rate_limiter::RateLimiter;
use super::response_extractor::{extract_json, Bracket, ExtractError};
use crate::config::EnrichmentSettings;

const SYSTEM_PROMPT: &str = "You are a Chinese language expert specializing in \
Chinese-Vietnamese dictionaries. Answer only with accurate, verifiable linguistic \
information about Chinese words: pronunciations, meanings, example sentences and usage. \
Leave out anything you are not confident about.";

/// Enrichment client errors
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Empty response")]
    EmptyResponse,

    #[error("Reply is not a translation: {0}")]
    NotATranslation(String),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),
}

/// Kind of content requested; selects the token budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Pronunciation,
    Translation,
    Examples,
    Grammar,
}

impl FieldKind {
    pub fn max_tokens(self) -> u32 {
        match self {
            FieldKind::Pronunciation | FieldKind::Grammar => 400,
            FieldKind::Translation => 200,
            FieldKind::Examples => 800,
        }
    }
}

/// One enrichment request for a word, with optional grounding context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRequest<'a> {
    Pronunciation,
    /// English gloss helps disambiguate the Vietnamese translation
    Translation { english: Option<&'a str> },
    /// Vietnamese meaning grounds the example sentences
    Examples { translation: Option<&'a str> },
    Grammar,
}

impl FieldRequest<'_> {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldRequest::Pronunciation => FieldKind::Pronunciation,
            FieldRequest::Translation { .. } => FieldKind::Translation,
            FieldRequest::Examples { .. } => FieldKind::Examples,
            FieldRequest::Grammar => FieldKind::Grammar,
        }
    }

    pub fn prompt(&self, word: &str) -> String {
        match self {
            FieldRequest::Pronunciation => format!(
                "For the Chinese word or phrase \"{word}\", provide:\n\
                 1. Pinyin with tone marks (e.g. nǐ hǎo)\n\
                 2. Pinyin with tone numbers (e.g. ni3 hao3)\n\
                 3. Zhuyin/Bopomofo (e.g. ㄋㄧˇ ㄏㄠˇ)\n\
                 4. Sino-Vietnamese (Hán-Việt) reading if applicable\n\n\
                 Answer as JSON:\n\
                 {{\"pinyin_tones\": \"...\", \"pinyin_numbers\": \"...\", \"zhuyin\": \"...\", \"hanviet\": \"...\"}}\n\n\
                 Omit any field you are not confident about."
            ),
            FieldRequest::Translation { english } => {
                let context = english
                    .filter(|e| !e.trim().is_empty())
                    .map(|e| format!(" (English meaning: {e})"))
                    .unwrap_or_default();
                format!(
                    "Give an accurate Vietnamese translation of the Chinese word or phrase \
                     \"{word}\"{context}.\n\
                     Use the most common equivalent and cover multiple meanings if the word has them.\n\
                     Reply with only the Vietnamese translation(s), separated by semicolons, \
                     without explanations.\n\
                     Example: xin chào; chào hỏi"
                )
            }
            FieldRequest::Examples { translation } => {
                let context = translation
                    .filter(|t| !t.trim().is_empty())
                    .map(|t| format!(" (Vietnamese meaning: {t})"))
                    .unwrap_or_default();
                format!(
                    "Give 2-3 practical example sentences using the Chinese word or phrase \
                     \"{word}\"{context}.\n\
                     Answer as a JSON array:\n\
                     [{{\"chinese\": \"...\", \"pinyin\": \"pinyin with tone marks\", \
                     \"vietnamese\": \"...\", \"english\": \"...\"}}]\n\
                     Keep the translations accurate."
                )
            }
            FieldRequest::Grammar => format!(
                "For the Chinese word or phrase \"{word}\", provide grammar and usage information:\n\
                 1. Part of speech\n\
                 2. Usage notes or grammar patterns\n\
                 3. Common collocations\n\
                 4. Formality (formal, informal, neutral)\n\n\
                 Answer as JSON:\n\
                 {{\"part_of_speech\": \"...\", \"usage_notes\": \"...\", \"collocations\": \"...\", \"formality\": \"...\"}}\n\n\
                 Only include fields you have reliable information for."
            ),
        }
    }
}

/// Pronunciation fields returned by the model
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Pronunciation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub pinyin_tones: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pinyin_numbers: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub zhuyin: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hanviet: Option<String>,
}

impl Pronunciation {
    /// Tone-marked pinyin, derived from the numbered form when needed
    pub fn marked_pinyin(&self) -> Option<String> {
        self.pinyin_tones
            .clone()
            .or_else(|| self.pinyin_numbers.as_deref().map(numbered_to_marked))
    }

    pub fn is_empty(&self) -> bool {
        self.pinyin_tones.is_none()
            && self.pinyin_numbers.is_none()
            && self.zhuyin.is_none()
            && self.hanviet.is_none()
    }
}

/// Grammar metadata, stored serialized in `dictionary.grammar_info`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarInfo {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub part_of_speech: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub usage_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub collocations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub formality: Option<String>,
}

impl GrammarInfo {
    pub fn is_empty(&self) -> bool {
        self.part_of_speech.is_none()
            && self.usage_notes.is_none()
            && self.collocations.is_none()
            && self.formality.is_none()
    }
}

/// Accepts strings, numbers and string arrays; blank values become None
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| value_text(&v)))
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(value_text)
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

/// Result of one enrichment call
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Empty,
    Pronunciation(Pronunciation),
    Translation(String),
    Examples(Vec<ExampleSentence>),
    Grammar(GrammarInfo),
}

/// Turn raw completion text into a typed result
///
/// Empty structures collapse to [`Enrichment::Empty`]; unusable text is an
/// error.
pub fn parse_response(kind: FieldKind, text: &str) -> Result<Enrichment, EnrichError> {
    let result = match kind {
        FieldKind::Pronunciation => {
            let pronunciation: Pronunciation = extract_json(text, Bracket::Object)?;
            (!pronunciation.is_empty()).then_some(Enrichment::Pronunciation(pronunciation))
        }
        FieldKind::Translation => {
            let translation = clean_translation(text);
            if translation.is_empty() {
                return Err(EnrichError::EmptyResponse);
            }
            if !looks_like_translation(&translation) {
                let preview: String = translation.chars().take(60).collect();
                return Err(EnrichError::NotATranslation(preview));
            }
            Some(Enrichment::Translation(translation))
        }
        FieldKind::Examples => {
            let items: Vec<Value> = extract_json(text, Bracket::Array)?;
            let examples: Vec<ExampleSentence> = items.iter().filter_map(example_from_value).collect();
            (!examples.is_empty()).then_some(Enrichment::Examples(examples))
        }
        FieldKind::Grammar => {
            let grammar: GrammarInfo = extract_json(text, Bracket::Object)?;
            (!grammar.is_empty()).then_some(Enrichment::Grammar(grammar))
        }
    };

    Ok(result.unwrap_or(Enrichment::Empty))
}

/// Trim and strip quotes the model sometimes wraps around the answer
fn clean_translation(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| matches!(c, '"' | '“' | '”' | '\''))
        .trim()
        .to_string()
}

/// Longest reply accepted as a dictionary gloss
const MAX_TRANSLATION_CHARS: usize = 200;

/// English phrases that mark a refusal or an apology instead of an answer
const REFUSAL_MARKERS: &[&str] = &[
    "sorry",
    "cannot",
    "can't",
    "unable to",
    "as an ai",
    "i don't know",
];

/// A gloss is one short line with no refusal wording
fn looks_like_translation(text: &str) -> bool {
    if text.contains('\n') || text.chars().count() > MAX_TRANSLATION_CHARS {
        return false;
    }
    let lower = text.to_lowercase();
    !REFUSAL_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Items without a Chinese sentence are dropped
fn example_from_value(value: &Value) -> Option<ExampleSentence> {
    let object: &Map<String, Value> = value.as_object()?;
    let field = |name: &str| object.get(name).and_then(value_text);

    Some(ExampleSentence {
        chinese: field("chinese")?,
        pinyin: field("pinyin"),
        vietnamese: field("vietnamese"),
        english: field("english"),
        source: Some(AI_SOURCE.to_string()),
    })
}

/// Rate-limited, soft-failing wrapper around a [`CompletionBackend`]
pub struct EnrichmentClient {
    backend: Arc<dyn CompletionBackend>,
    rate_limiter: RateLimiter,
    temperature: f32,
}

impl EnrichmentClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, request_interval: Duration, temperature: f32) -> Self {
        Self {
            backend,
            rate_limiter: RateLimiter::new(request_interval),
            temperature,
        }
    }

    /// Client backed by the DeepSeek HTTP API
    pub fn from_settings(settings: &EnrichmentSettings) -> Result<Self, EnrichError> {
        let backend = DeepSeekBackend::new(settings)?;
        Ok(Self::new(
            Arc::new(backend),
            settings.request_interval,
            settings.temperature,
        ))
    }

    /// One enrichment call; any failure is logged and yields `Empty`
    pub async fn enrich(&self, word: &str, request: FieldRequest<'_>) -> Enrichment {
        let kind = request.kind();

        match self.try_enrich(word, &request).await {
            Ok(Enrichment::Empty) => {
                debug!(word = %word, field = ?kind, "Model returned no usable content");
                Enrichment::Empty
            }
            Ok(result) => result,
            Err(e) => {
                warn!(word = %word, field = ?kind, "Enrichment failed: {}", e);
                Enrichment::Empty
            }
        }
    }

    async fn try_enrich(&self, word: &str, request: &FieldRequest<'_>) -> Result<Enrichment, EnrichError> {
        let kind = request.kind();
        let completion = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt: request.prompt(word),
            max_tokens: kind.max_tokens(),
            temperature: self.temperature,
        };

        self.rate_limiter.wait().await;
        let text = self.backend.complete(&completion).await?;
        parse_response(kind, &text)
    }

    pub async fn pronunciation(&self, word: &str) -> Option<Pronunciation> {
        match self.enrich(word, FieldRequest::Pronunciation).await {
            Enrichment::Pronunciation(p) => Some(p),
            _ => None,
        }
    }

    pub async fn translation(&self, word: &str, english: Option<&str>) -> Option<String> {
        match self.enrich(word, FieldRequest::Translation { english }).await {
            Enrichment::Translation(t) => Some(t),
            _ => None,
        }
    }

    pub async fn examples(&self, word: &str, translation: Option<&str>) -> Vec<ExampleSentence> {
        match self.enrich(word, FieldRequest::Examples { translation }).await {
            Enrichment::Examples(examples) => examples,
            _ => Vec::new(),
        }
    }

    pub async fn grammar(&self, word: &str) -> Option<GrammarInfo> {
        match self.enrich(word, FieldRequest::Grammar).await {
            Enrichment::Grammar(g) => Some(g),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed result and records every request
    struct FixedBackend {
        reply: Result<String, u16>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FixedBackend {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(status),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for FixedBackend {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, EnrichError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(EnrichError::Api(*status, "unavailable".to_string())),
            }
        }
    }

    fn client(backend: Arc<FixedBackend>) -> EnrichmentClient {
        EnrichmentClient::new(backend, Duration::ZERO, 0.3)
    }

    #[tokio::test]
    async fn test_pronunciation_from_prose_wrapped_json() {
        let backend = FixedBackend::replying(
            "Sure!\n```json\n{\"pinyin_numbers\": \"ni3 hao3\", \"zhuyin\": \"ㄋㄧˇ ㄏㄠˇ\", \"hanviet\": \"nhĩ hảo\"}\n```",
        );
        let result = client(backend.clone()).pronunciation("你好").await.unwrap();

        assert_eq!(result.zhuyin.as_deref(), Some("ㄋㄧˇ ㄏㄠˇ"));
        assert_eq!(result.hanviet.as_deref(), Some("nhĩ hảo"));
        assert_eq!(result.marked_pinyin().as_deref(), Some("nǐ hǎo"));

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, 400);
        assert!(requests[0].prompt.contains("你好"));
    }

    #[tokio::test]
    async fn test_malformed_output_yields_empty() {
        let client = client(FixedBackend::replying("I'm not sure about this word."));

        assert_eq!(client.enrich("你好", FieldRequest::Grammar).await, Enrichment::Empty);
        assert!(client.examples("你好", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_yields_empty() {
        let client = client(FixedBackend::failing(503));

        assert!(client.translation("你好", Some("hello")).await.is_none());
    }

    #[tokio::test]
    async fn test_translation_strips_quotes_and_passes_english_context() {
        let backend = FixedBackend::replying("  \"xin chào; chào hỏi\"\n");
        let result = client(backend.clone()).translation("你好", Some("hello")).await;

        assert_eq!(result.as_deref(), Some("xin chào; chào hỏi"));
        let requests = backend.requests.lock().unwrap();
        assert!(requests[0].prompt.contains("English meaning: hello"));
        assert_eq!(requests[0].max_tokens, 200);
    }

    #[test]
    fn test_examples_are_parsed_leniently() {
        let text = r#"[
            {"chinese": "你好！", "pinyin": "nǐ hǎo!", "vietnamese": "Xin chào!", "english": "Hello!"},
            {"pinyin": "missing chinese"},
            "not an object",
            {"chinese": "你好吗？", "vietnamese": "Bạn khỏe không?"}
        ]"#;

        let Enrichment::Examples(examples) = parse_response(FieldKind::Examples, text).unwrap() else {
            panic!("expected examples");
        };

        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].chinese, "你好！");
        assert_eq!(examples[1].english, None);
        assert!(examples.iter().all(|e| e.source.as_deref() == Some(AI_SOURCE)));
    }

    #[test]
    fn test_grammar_accepts_list_values() {
        let text = r#"{"part_of_speech": "interjection", "collocations": ["你好吗", "你好啊"], "formality": ""}"#;

        let Enrichment::Grammar(grammar) = parse_response(FieldKind::Grammar, text).unwrap() else {
            panic!("expected grammar");
        };

        assert_eq!(grammar.part_of_speech.as_deref(), Some("interjection"));
        assert_eq!(grammar.collocations.as_deref(), Some("你好吗, 你好啊"));
        assert_eq!(grammar.formality, None);
        assert_eq!(
            serde_json::to_string(&grammar).unwrap(),
            r#"{"part_of_speech":"interjection","collocations":"你好吗, 你好啊"}"#
        );
    }

    #[test]
    fn test_empty_structures_collapse_to_empty() {
        assert_eq!(parse_response(FieldKind::Pronunciation, "{}").unwrap(), Enrichment::Empty);
        assert_eq!(parse_response(FieldKind::Examples, "[]").unwrap(), Enrichment::Empty);
        assert!(matches!(
            parse_response(FieldKind::Translation, "  \"\" "),
            Err(EnrichError::EmptyResponse)
        ));
    }

    #[test]
    fn test_refusals_and_prose_are_not_translations() {
        for reply in [
            "Sorry, I cannot translate this word.",
            "I'm unable to help with that",
            "học sinh\n\nThis word means a pupil at school.",
        ] {
            assert!(matches!(
                parse_response(FieldKind::Translation, reply),
                Err(EnrichError::NotATranslation(_))
            ));
        }

        let long = "từ ".repeat(100);
        assert!(parse_response(FieldKind::Translation, &long).is_err());

        assert_eq!(
            parse_response(FieldKind::Translation, "học sinh; sinh viên").unwrap(),
            Enrichment::Translation("học sinh; sinh viên".to_string())
        );
    }

    #[test]
    fn test_examples_prompt_carries_translation() {
        let prompt = FieldRequest::Examples {
            translation: Some("xin chào"),
        }
        .prompt("你好");
        assert!(prompt.contains("Vietnamese meaning: xin chào"));

        let prompt = FieldRequest::Examples { translation: Some("  ") }.prompt("你好");
        assert!(!prompt.contains("Vietnamese meaning"));
    }
}
