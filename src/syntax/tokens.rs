//! Token types for syntax highlighting
//!
//! This module defines the semantic token categories derived from
//! scope names, their fallback visual styles, and the token values
//! grammars produce for each line.

use std::sync::Arc;

use super::rules::LineState;
use super::style::{Color, Span, Style};
use crate::registry::ScopeId;

/// Semantic token types for syntax highlighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Source code comments
    Comment,
    /// String literals
    String,
    /// Character literals
    Char,
    /// Numeric literals (integers, floats)
    Number,
    /// Language keywords (if, else, fn, let, etc.)
    Keyword,
    /// Type names (String, i32, etc.)
    Type,
    /// Function names
    Function,
    /// Operators (+, -, *, /, etc.)
    Operator,
    /// Punctuation (, ; : etc.)
    Punctuation,
    /// Preprocessor directives (#include, #define)
    Preprocessor,
    /// Macros (println!, vec!)
    Macro,
    /// Constants and enum variants
    Constant,
    /// Special tokens (escape sequences, markup emphasis)
    Special,
    /// Attributes (#[derive], @decorator)
    Attribute,
    /// Lifetime annotations ('a)
    Lifetime,
    /// Module/namespace names
    Module,
    /// Labels and gotos
    Label,
    /// Default/plain text (no special highlighting)
    Default,
}

impl TokenType {
    /// Classify a dotted scope name
    ///
    /// The most specific known prefix wins, so `constant.numeric.float`
    /// is a `Number` while `constant.language` is a `Constant`.
    pub fn from_scope(scope: &str) -> Self {
        const PREFIXES: &[(&str, TokenType)] = &[
            ("comment", TokenType::Comment),
            ("string.quoted.single.char", TokenType::Char),
            ("constant.character.escape", TokenType::Special),
            ("constant.character", TokenType::Char),
            ("string", TokenType::String),
            ("constant.numeric", TokenType::Number),
            ("constant", TokenType::Constant),
            ("keyword.operator", TokenType::Operator),
            ("keyword.control.directive", TokenType::Preprocessor),
            ("keyword", TokenType::Keyword),
            ("storage.modifier.lifetime", TokenType::Lifetime),
            ("storage.type", TokenType::Type),
            ("storage", TokenType::Keyword),
            ("entity.name.type", TokenType::Type),
            ("support.type", TokenType::Type),
            ("entity.name.function.macro", TokenType::Macro),
            ("entity.name.function", TokenType::Function),
            ("support.function", TokenType::Function),
            ("entity.name.namespace", TokenType::Module),
            ("entity.name.label", TokenType::Label),
            ("entity.name.section", TokenType::Keyword),
            ("entity.other.attribute-name", TokenType::Attribute),
            ("meta.attribute", TokenType::Attribute),
            ("meta.preprocessor", TokenType::Preprocessor),
            ("markup.heading", TokenType::Keyword),
            ("markup.bold", TokenType::Type),
            ("markup.italic", TokenType::Special),
            ("markup.raw", TokenType::String),
            ("markup.quote", TokenType::Comment),
            ("markup.underline.link", TokenType::Function),
            ("markup.list", TokenType::Operator),
            ("punctuation", TokenType::Punctuation),
            ("variable.language", TokenType::Keyword),
        ];

        PREFIXES
            .iter()
            .filter(|(prefix, _)| scope_matches(prefix, scope))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, token_type)| *token_type)
            .unwrap_or(TokenType::Default)
    }

    /// Get the fallback style for this token type
    pub fn default_style(&self) -> Style {
        match self {
            TokenType::Comment => Style::fg(Color::BrightBlack).with_italic(),
            TokenType::String => Style::fg(Color::Green),
            TokenType::Char => Style::fg(Color::Green),
            TokenType::Number => Style::fg(Color::Cyan),
            TokenType::Keyword => Style::fg(Color::Magenta).with_bold(),
            TokenType::Type => Style::fg(Color::Yellow),
            TokenType::Function => Style::fg(Color::Blue),
            TokenType::Operator => Style::fg(Color::BrightWhite),
            TokenType::Punctuation => Style::default(),
            TokenType::Preprocessor => Style::fg(Color::BrightMagenta),
            TokenType::Macro => Style::fg(Color::BrightCyan),
            TokenType::Constant => Style::fg(Color::BrightRed),
            TokenType::Special => Style::fg(Color::BrightYellow),
            TokenType::Attribute => Style::fg(Color::BrightBlue),
            TokenType::Lifetime => Style::fg(Color::BrightMagenta),
            TokenType::Module => Style::fg(Color::BrightBlue),
            TokenType::Label => Style::fg(Color::Yellow).with_underline(),
            TokenType::Default => Style::default(),
        }
    }
}

/// Whether a dotted scope selector matches a scope name
///
/// `comment.line` matches `comment.line` and `comment.line.double-slash`
/// but not `comment.lines`.
pub fn scope_matches(selector: &str, scope: &str) -> bool {
    match scope.strip_prefix(selector) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// A token produced for a line of text
///
/// A token extends from `start` to the start of the next token (or
/// the end of the line for the last one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Byte offset where this token starts
    pub start: usize,
    /// Scope name assigned by the grammar rule
    pub scope: Arc<str>,
    /// Semantic category of `scope`
    pub token_type: TokenType,
    /// Scope id of the language that produced this token
    pub language: ScopeId,
}

/// Tokens for a single line plus the state carried into the next line
#[derive(Debug, Clone)]
pub struct LineTokens {
    pub tokens: Vec<Token>,
    pub end_state: LineState,
}

impl LineTokens {
    /// Byte range of each token within a line of `line_len` bytes
    pub fn ranges(&self, line_len: usize) -> impl Iterator<Item = (std::ops::Range<usize>, &Token)> {
        self.tokens.iter().enumerate().map(move |(i, token)| {
            let end = self.tokens.get(i + 1).map_or(line_len, |next| next.start);
            (token.start..end, token)
        })
    }
}

/// Result of highlighting a single line
#[derive(Debug)]
pub struct HighlightResult {
    /// Spans of styled text in this line
    pub spans: Vec<Span>,
    /// State at end of line (for next line)
    pub end_state: LineState,
}
