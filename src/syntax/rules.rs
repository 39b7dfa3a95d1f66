//! Pattern rules for syntax highlighting
//!
//! This module defines the rule types used to match and tokenize
//! source code. Every rule searches the whole line from an offset so
//! `^` and `$` keep their line-start and line-end meaning.

use std::sync::Arc;

use regex::Regex;

use crate::registry::ScopeId;

/// A single-line pattern rule
///
/// Matches a regex pattern and assigns a scope to the match.
/// Rules are tried in priority order (highest first).
#[derive(Debug)]
pub struct PatternRule {
    /// Name for debugging
    pub name: String,
    /// Compiled regex pattern
    pub pattern: Regex,
    /// Scope assigned to matches
    pub scope: Arc<str>,
    /// Priority (higher = matched first)
    pub priority: i32,
}

impl PatternRule {
    /// Create a new pattern rule
    pub fn new(name: &str, pattern: &str, scope: &str, priority: i32) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            pattern: Regex::new(pattern)?,
            scope: Arc::from(scope),
            priority,
        })
    }

    /// Find the first non-empty match in text at or after `start`
    pub fn find_at(&self, text: &str, start: usize) -> Option<(usize, usize)> {
        find_non_empty(&self.pattern, text, start)
    }
}

/// Content of a block that is tokenized by another grammar
#[derive(Debug, Clone)]
pub struct Embed {
    /// Scope name of the grammar that tokenizes the content
    pub include: String,
    /// Scope for the content when that grammar is not loaded
    pub content_scope: Arc<str>,
    /// Language id assigned to content tokens, if the definition maps one
    pub language: Option<ScopeId>,
}

/// A multi-line construct rule (block comments, strings, fenced code)
///
/// These rules track state across lines for constructs that
/// can span multiple lines.
#[derive(Debug)]
pub struct MultilineRule {
    /// Name for debugging
    pub name: String,
    /// Pattern that starts the construct
    pub start: Regex,
    /// Pattern that ends the construct
    pub end: Regex,
    /// Scope for the delimiters (and the content unless embedded)
    pub scope: Arc<str>,
    /// Escape character that suppresses the end pattern
    pub escape_char: Option<char>,
    /// Unique ID for this multiline state (1-255, 0 = normal)
    pub state_id: u8,
    /// Embedded grammar for the content
    pub embed: Option<Embed>,
}

impl MultilineRule {
    /// Create a new multiline rule
    pub fn new(
        name: &str,
        start_pattern: &str,
        end_pattern: &str,
        scope: &str,
        state_id: u8,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            start: Regex::new(start_pattern)?,
            end: Regex::new(end_pattern)?,
            scope: Arc::from(scope),
            escape_char: None,
            state_id,
            embed: None,
        })
    }

    /// Builder: honour an escape character before the end pattern
    pub fn with_escape(mut self, escape_char: char) -> Self {
        self.escape_char = Some(escape_char);
        self
    }

    /// Builder: tokenize the content with another grammar
    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }

    /// Find start of this construct in text
    pub fn find_start(&self, text: &str, start: usize) -> Option<(usize, usize)> {
        find_non_empty(&self.start, text, start)
    }

    /// Find end of this construct in text, respecting escapes
    ///
    /// Returns the byte range of the end delimiter. Escapes before
    /// `start` are not counted.
    pub fn find_end(&self, text: &str, start: usize) -> Option<(usize, usize)> {
        if start > text.len() {
            return None;
        }

        let mut from = start;
        loop {
            let m = self.end.find_at(text, from)?;
            if let Some(escape) = self.escape_char {
                let escape_count = text[start..m.start()]
                    .chars()
                    .rev()
                    .take_while(|&c| c == escape)
                    .count();
                if escape_count % 2 == 1 {
                    // Odd number of escapes = escaped
                    from = if m.is_empty() { next_boundary(text, m.end())? } else { m.end() };
                    continue;
                }
            }
            return Some((m.start(), m.end()));
        }
    }
}

fn find_non_empty(regex: &Regex, text: &str, start: usize) -> Option<(usize, usize)> {
    let mut from = start;
    while from < text.len() {
        let m = regex.find_at(text, from)?;
        if !m.is_empty() {
            return Some((m.start(), m.end()));
        }
        from = next_boundary(text, m.start())?;
    }
    None
}

/// Byte offset of the char boundary after `pos`, if any
fn next_boundary(text: &str, pos: usize) -> Option<usize> {
    text[pos..].chars().next().map(|c| pos + c.len_utf8())
}

/// Line state for tracking multi-line constructs
///
/// This is stored per-line to track whether we're inside a
/// multi-line comment, string, etc. Embedded content keeps the
/// embedded grammar's own state alongside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineState {
    /// 0 = normal, non-zero = inside multiline rule with this ID
    pub multiline_id: u8,
    embedded: Option<Box<LineState>>,
}

impl LineState {
    /// Create state for being inside a multiline construct
    pub fn inside(state_id: u8) -> Self {
        Self {
            multiline_id: state_id,
            embedded: None,
        }
    }

    /// Create state for being inside an embedding construct
    pub fn inside_embedded(state_id: u8, embedded: Option<LineState>) -> Self {
        Self {
            multiline_id: state_id,
            embedded: embedded.map(Box::new),
        }
    }

    /// State of the embedded grammar, if inside embedded content
    pub fn embedded(&self) -> Option<&LineState> {
        self.embedded.as_deref()
    }

    /// Check if we're inside a multiline construct
    pub fn is_inside_multiline(&self) -> bool {
        self.multiline_id != 0
    }

    /// Check if we're in normal (no multiline) state
    pub fn is_normal(&self) -> bool {
        self.multiline_id == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_rule() {
        let rule = PatternRule::new("number", r"\d+", "constant.numeric", 50).unwrap();
        assert_eq!(rule.find_at("abc 123 def", 0), Some((4, 7)));
        assert_eq!(rule.find_at("abc 123 def", 5), Some((5, 7)));
        assert_eq!(rule.find_at("no numbers", 0), None);
    }

    #[test]
    fn test_caret_anchors_to_line_start() {
        let rule = PatternRule::new("header", r"^#+", "markup.heading", 50).unwrap();
        assert_eq!(rule.find_at("## title", 0), Some((0, 2)));
        assert_eq!(rule.find_at("a # not header", 2), None);
    }

    #[test]
    fn test_empty_matches_are_skipped() {
        let rule = PatternRule::new("maybe", r"x*", "keyword", 1).unwrap();
        assert_eq!(rule.find_at("abxx", 0), Some((2, 4)));
        assert_eq!(rule.find_at("ab", 0), None);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(PatternRule::new("bad", r"(unclosed", "keyword", 1).is_err());
    }

    #[test]
    fn test_multiline_rule() {
        let rule = MultilineRule::new("block_comment", r"/\*", r"\*/", "comment.block", 1).unwrap();

        assert_eq!(rule.find_start("/* comment */", 0), Some((0, 2)));
        assert_eq!(rule.find_end("/* comment */", 2), Some((11, 13)));
    }

    #[test]
    fn test_multiline_with_escape() {
        let rule = MultilineRule::new("string", r#"""#, r#"""#, "string.quoted.double", 2)
            .unwrap()
            .with_escape('\\');

        assert_eq!(rule.find_end(r#"hello""#, 0), Some((5, 6)));
        assert_eq!(rule.find_end(r#"hello\"world""#, 0), Some((12, 13)));
        assert_eq!(rule.find_end(r#"hello\\"rest"#, 0), Some((7, 8)));
        assert_eq!(rule.find_end(r#"open \""#, 0), None);
    }

    #[test]
    fn test_line_state() {
        let normal = LineState::default();
        assert!(normal.is_normal());
        assert!(!normal.is_inside_multiline());

        let inside = LineState::inside(1);
        assert!(!inside.is_normal());
        assert!(inside.is_inside_multiline());
        assert!(inside.embedded().is_none());

        let nested = LineState::inside_embedded(2, Some(LineState::inside(1)));
        assert_eq!(nested.embedded(), Some(&LineState::inside(1)));
    }
}
