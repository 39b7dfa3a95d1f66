//! Per-language editing configuration
//!
//! Comment syntax and bracket pairs, in the shape of VS Code's
//! `language-configuration.json` (TOML documents use the same keys).

use serde::Deserialize;

use crate::document;
use crate::error::Result;

/// Comment syntax of a language
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRule {
    #[serde(default)]
    pub line_comment: Option<String>,
    #[serde(default)]
    pub block_comment: Option<(String, String)>,
}

/// An opening/closing pair such as `(` and `)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterPair {
    pub open: String,
    pub close: String,
}

/// Auxiliary settings for one language, keyed by scope name in the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageConfiguration {
    pub comments: CommentRule,
    pub brackets: Vec<CharacterPair>,
    pub auto_closing_pairs: Vec<CharacterPair>,
    pub surrounding_pairs: Vec<CharacterPair>,
}

impl LanguageConfiguration {
    /// Parse a language configuration document
    pub fn parse(path: &str, text: &str) -> Result<Self> {
        let raw: RawConfiguration = document::parse(path, text)?;
        Ok(Self {
            comments: raw.comments,
            brackets: raw.brackets.into_iter().map(Into::into).collect(),
            auto_closing_pairs: raw.auto_closing_pairs.into_iter().map(Into::into).collect(),
            surrounding_pairs: raw.surrounding_pairs.into_iter().map(Into::into).collect(),
        })
    }

    /// Closing counterpart of an opening bracket
    pub fn closing_bracket(&self, open: &str) -> Option<&str> {
        self.brackets
            .iter()
            .find(|pair| pair.open == open)
            .map(|pair| pair.close.as_str())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfiguration {
    #[serde(default)]
    comments: CommentRule,
    #[serde(default)]
    brackets: Vec<RawPair>,
    #[serde(default)]
    auto_closing_pairs: Vec<RawPair>,
    #[serde(default)]
    surrounding_pairs: Vec<RawPair>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPair {
    Tuple(String, String),
    Object { open: String, close: String },
}

impl From<RawPair> for CharacterPair {
    fn from(raw: RawPair) -> Self {
        match raw {
            RawPair::Tuple(open, close) | RawPair::Object { open, close } => Self { open, close },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vscode_json() {
        let config = LanguageConfiguration::parse(
            "rust.language-configuration.json",
            r#"{
  "comments": { "lineComment": "//", "blockComment": ["/*", "*/"] },
  "brackets": [["{", "}"], ["[", "]"], ["(", ")"]],
  "autoClosingPairs": [
    { "open": "{", "close": "}" },
    { "open": "\"", "close": "\"", "notIn": ["string"] },
    ["(", ")"]
  ],
  "surroundingPairs": [["(", ")"]]
}"#,
        )
        .unwrap();

        assert_eq!(config.comments.line_comment.as_deref(), Some("//"));
        assert_eq!(
            config.comments.block_comment,
            Some(("/*".to_string(), "*/".to_string()))
        );
        assert_eq!(config.brackets.len(), 3);
        assert_eq!(config.closing_bracket("["), Some("]"));
        assert_eq!(config.auto_closing_pairs.len(), 3);
        assert_eq!(config.auto_closing_pairs[1].open, "\"");
        assert_eq!(config.surrounding_pairs.len(), 1);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let config = LanguageConfiguration::parse("plain.toml", "").unwrap();
        assert_eq!(config, LanguageConfiguration::default());
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(LanguageConfiguration::parse("x.json", r#"{"brackets": 3}"#).is_err());
    }
}
