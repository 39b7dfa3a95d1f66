//! Syntax and styling module
//!
//! This module provides the tokenizer side of highlighting:
//! - Grammar documents and their compiled rules
//! - Per-line tokenization with state carried across lines
//! - Themes, styles and language configurations
//! - Builtin grammars and themes

mod style;
mod tokens;
mod rules;
mod grammar;
mod theme;
mod language_config;
pub mod builtin;

pub use style::{Color, Span, Style};
pub use tokens::{scope_matches, HighlightResult, LineTokens, Token, TokenType};
pub use rules::{Embed, LineState, MultilineRule, PatternRule};
pub use grammar::{Grammar, GrammarLookup, GrammarSource, MAX_EMBED_DEPTH};
pub use theme::{Theme, ThemeRule};
pub use language_config::{CharacterPair, CommentRule, LanguageConfiguration};
