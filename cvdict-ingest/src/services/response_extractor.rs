//! JSON extraction from free-form model output
//!
//! Generative models wrap structured answers in prose or code fences. The
//! extractor takes the span from the first opening bracket of the expected
//! kind to the last closing bracket of that kind and parses it.
//!
//! Known fragility: stray brackets in the surrounding prose widen the span
//! and can make an otherwise valid answer fail to parse (or, rarely, parse
//! into the wrong structure). Such failures are soft: callers log them and
//! move on.

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Bracket kind expected around the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    /// `{ ... }` for scalar field sets
    Object,
    /// `[ ... ]` for lists of examples
    Array,
}

impl Bracket {
    fn delimiters(self) -> (char, char) {
        match self {
            Bracket::Object => ('{', '}'),
            Bracket::Array => ('[', ']'),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no {0:?} structure in response")]
    NoStructure(Bracket),

    #[error("malformed JSON: {0}")]
    Malformed(String),
}

/// Bracketed substring, first open to last close
pub fn bracketed_span(text: &str, bracket: Bracket) -> Option<&str> {
    let (open, close) = bracket.delimiters();
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Extract and deserialize the bracketed payload
pub fn extract_json<T: DeserializeOwned>(text: &str, bracket: Bracket) -> Result<T, ExtractError> {
    let span = bracketed_span(text, bracket).ok_or(ExtractError::NoStructure(bracket))?;
    serde_json::from_str(span).map_err(|e| ExtractError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_extracts_object_from_prose() {
        let text = "Here you go:\n```json\n{\"zhuyin\": \"ㄋㄧˇ ㄏㄠˇ\"}\n```\nHope this helps.";
        let value: Value = extract_json(text, Bracket::Object).unwrap();

        assert_eq!(value["zhuyin"], "ㄋㄧˇ ㄏㄠˇ");
    }

    #[test]
    fn test_extracts_array() {
        let text = "[{\"chinese\": \"你好！\"}, {\"chinese\": \"你好吗？\"}]";
        let value: Vec<Value> = extract_json(text, Bracket::Array).unwrap();

        assert_eq!(value.len(), 2);
    }

    #[test]
    fn test_no_structure() {
        let result: Result<Value, _> = extract_json("I am not sure about this word.", Bracket::Object);
        assert_eq!(result, Err(ExtractError::NoStructure(Bracket::Object)));

        let result: Result<Value, _> = extract_json("} backwards {", Bracket::Object);
        assert_eq!(result, Err(ExtractError::NoStructure(Bracket::Object)));
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        let result: Result<Value, _> = extract_json("{\"zhuyin\": \"ㄋㄧˇ\", \"hanviet\": }", Bracket::Object);
        assert!(matches!(result, Err(ExtractError::Malformed(_))));
    }

    #[test]
    fn test_stray_bracket_in_prose_widens_span() {
        let text = "{\"a\": 1} and also {note}";
        let result: Result<Value, _> = extract_json(text, Bracket::Object);

        assert!(matches!(result, Err(ExtractError::Malformed(_))));
    }
}
