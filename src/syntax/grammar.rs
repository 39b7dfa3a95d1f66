//! Grammar documents and compiled grammars
//!
//! A grammar document lists single-line pattern rules and multi-line
//! block rules, each assigning a dotted scope name. Compiling it yields a
//! [`Grammar`] that tokenizes one line at a time, carrying a
//! [`LineState`] between lines.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use super::rules::{Embed, LineState, MultilineRule, PatternRule};
use super::tokens::{LineTokens, Token, TokenType};
use crate::error::{RegistryError, Result};
use crate::registry::ScopeId;

/// Embedding deeper than this tokenizes the content as a single token
pub const MAX_EMBED_DEPTH: usize = 8;

/// Raw grammar document as read from TOML or JSON
#[derive(Debug, Clone, Deserialize)]
pub struct GrammarSource {
    pub name: String,
    #[serde(alias = "scopeName")]
    pub scope_name: String,
    #[serde(default, alias = "fileTypes")]
    pub file_extensions: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<PatternSource>,
    #[serde(default)]
    pub blocks: Vec<BlockSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternSource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "match")]
    pub pattern: String,
    pub scope: String,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockSource {
    #[serde(default)]
    pub name: Option<String>,
    pub begin: String,
    pub end: String,
    pub scope: String,
    #[serde(default)]
    pub escape: Option<char>,
    /// Scope name or language name of a grammar for the content
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default, alias = "contentName")]
    pub content_scope: Option<String>,
}

/// Looks up loaded grammars by scope name while tokenizing
pub trait GrammarLookup {
    fn grammar(&self, scope_name: &str) -> Option<Arc<Grammar>>;
}

/// A compiled grammar for one scope name
#[derive(Debug)]
pub struct Grammar {
    /// Language name (e.g., "Rust", "Python")
    pub name: String,
    /// Top-level scope assigned to unmatched text
    pub scope_name: Arc<str>,
    /// Id allocated for `scope_name`
    pub scope_id: ScopeId,
    /// File extensions declared by the grammar document
    pub file_extensions: Vec<String>,
    /// Single-line pattern rules, sorted by priority (highest first)
    patterns: Vec<PatternRule>,
    /// Multi-line rules for comments, strings, etc.
    multiline_rules: Vec<MultilineRule>,
}

impl Grammar {
    /// Compile a grammar document
    ///
    /// `resolve_include` maps a block's `include` reference to the scope
    /// name of the grammar that tokenizes its content, and
    /// `embedded_ids` maps content scopes to language ids.
    pub fn compile(
        path: &str,
        source: GrammarSource,
        scope_id: ScopeId,
        resolve_include: &dyn Fn(&str) -> String,
        embedded_ids: &HashMap<String, ScopeId>,
    ) -> Result<Self> {
        if source.blocks.len() > u8::MAX as usize {
            return Err(RegistryError::load(
                path,
                format!("at most {} blocks are supported", u8::MAX),
            ));
        }

        let mut patterns = Vec::with_capacity(source.patterns.len());
        for (idx, p) in source.patterns.iter().enumerate() {
            let name = p.name.clone().unwrap_or_else(|| format!("pattern{}", idx));
            let rule = PatternRule::new(&name, &p.pattern, &p.scope, p.priority)
                .map_err(|e| RegistryError::load(path, format!("pattern `{}`: {}", name, e)))?;
            patterns.push(rule);
        }
        // Keep sorted by priority (highest first), stable for equal priorities
        patterns.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut multiline_rules = Vec::with_capacity(source.blocks.len());
        for (idx, b) in source.blocks.iter().enumerate() {
            let name = b.name.clone().unwrap_or_else(|| format!("block{}", idx));
            let state_id = (idx + 1) as u8;
            let mut rule = MultilineRule::new(&name, &b.begin, &b.end, &b.scope, state_id)
                .map_err(|e| RegistryError::load(path, format!("block `{}`: {}", name, e)))?;
            if let Some(escape) = b.escape {
                rule = rule.with_escape(escape);
            }
            if let Some(include) = &b.include {
                let content_scope = b.content_scope.clone().unwrap_or_else(|| b.scope.clone());
                rule = rule.with_embed(Embed {
                    include: resolve_include(include),
                    language: embedded_ids.get(&content_scope).copied(),
                    content_scope: Arc::from(content_scope),
                });
            }
            multiline_rules.push(rule);
        }

        Ok(Self {
            name: source.name,
            scope_name: Arc::from(source.scope_name),
            scope_id,
            file_extensions: source.file_extensions,
            patterns,
            multiline_rules,
        })
    }

    /// Get multiline rule by state ID
    fn get_multiline_rule(&self, state_id: u8) -> Option<&MultilineRule> {
        self.multiline_rules.iter().find(|r| r.state_id == state_id)
    }

    /// Tokenize a single line of text
    ///
    /// Takes the line text and the state from the previous line.
    /// Returns tokens covering the whole line and the state for the
    /// next line.
    pub fn tokenize_line(
        &self,
        text: &str,
        prev_state: &LineState,
        lookup: &dyn GrammarLookup,
    ) -> LineTokens {
        let mut sink = TokenSink::default();
        let end_state = self.tokenize_range(text, 0, prev_state, lookup, 0, self.scope_id, &mut sink);
        LineTokens {
            tokens: sink.finish(text.len(), &self.scope_name, self.scope_id),
            end_state,
        }
    }

    /// Tokenize `text[pos..]`, emitting tokens tagged with `language`
    #[allow(clippy::too_many_arguments)]
    fn tokenize_range(
        &self,
        text: &str,
        mut pos: usize,
        state: &LineState,
        lookup: &dyn GrammarLookup,
        depth: usize,
        language: ScopeId,
        sink: &mut TokenSink,
    ) -> LineState {
        let mut current = state.clone();

        if !current.is_inside_multiline() {
            sink.push(pos, &self.scope_name, language);
        }

        loop {
            // If inside a multiline construct, look for its end
            if current.is_inside_multiline() {
                let Some(rule) = self.get_multiline_rule(current.multiline_id) else {
                    // Invalid state - reset
                    current = LineState::default();
                    sink.push(pos, &self.scope_name, language);
                    continue;
                };

                let close = rule.find_end(text, pos);
                let content_end = close.map_or(text.len(), |(start, _)| start);
                let inner = self.tokenize_content(
                    rule,
                    text,
                    pos,
                    content_end,
                    current.embedded(),
                    lookup,
                    depth,
                    language,
                    sink,
                );

                match close {
                    Some((start, end)) => {
                        sink.push(start, &rule.scope, language);
                        pos = end;
                        current = LineState::default();
                        sink.push(pos, &self.scope_name, language);
                    }
                    None => return LineState::inside_embedded(rule.state_id, inner),
                }
            }

            if pos >= text.len() {
                break;
            }

            // Earliest multiline start; first rule wins at equal offsets
            let block = self
                .multiline_rules
                .iter()
                .filter_map(|rule| rule.find_start(text, pos).map(|(s, e)| (s, e, rule)))
                .min_by_key(|(s, _, _)| *s);

            if let Some((start, end, rule)) = block {
                if start == pos {
                    sink.push(start, &rule.scope, language);
                    pos = end;
                    current = LineState::inside(rule.state_id);
                    continue;
                }
            }

            // Single-line patterns: highest priority match at pos, else earliest
            let mut best_match: Option<(usize, usize, &PatternRule)> = None;
            for rule in &self.patterns {
                if let Some((start, end)) = rule.find_at(text, pos) {
                    if start == pos {
                        best_match = Some((start, end, rule));
                        break;
                    }
                    if best_match.map_or(true, |(s, _, _)| start < s) {
                        best_match = Some((start, end, rule));
                    }
                }
            }

            if let Some((start, end, rule)) = best_match {
                if start == pos {
                    sink.push(start, &rule.scope, language);
                    sink.push(end, &self.scope_name, language);
                    pos = end;
                    continue;
                }
            }

            // Skip to whichever construct starts next
            let next_block = block.map(|(s, _, _)| s);
            let next_pattern = best_match.map(|(s, _, _)| s);
            match next_block.into_iter().chain(next_pattern).min() {
                Some(next) => pos = next,
                None => break,
            }
        }

        current
    }

    /// Emit tokens for block content in `text[from..to]`
    ///
    /// Returns the embedded grammar's end state when the content was
    /// tokenized by an embedded grammar.
    #[allow(clippy::too_many_arguments)]
    fn tokenize_content(
        &self,
        rule: &MultilineRule,
        text: &str,
        from: usize,
        to: usize,
        inner: Option<&LineState>,
        lookup: &dyn GrammarLookup,
        depth: usize,
        language: ScopeId,
        sink: &mut TokenSink,
    ) -> Option<LineState> {
        let Some(embed) = &rule.embed else {
            sink.push(from, &rule.scope, language);
            return None;
        };

        let grammar = if depth < MAX_EMBED_DEPTH {
            lookup.grammar(&embed.include)
        } else {
            None
        };

        match grammar {
            Some(grammar) => {
                let embedded_language = embed.language.unwrap_or(grammar.scope_id);
                let inner_state = inner.cloned().unwrap_or_default();
                Some(grammar.tokenize_range(
                    &text[..to],
                    from,
                    &inner_state,
                    lookup,
                    depth + 1,
                    embedded_language,
                    sink,
                ))
            }
            None => {
                sink.push(from, &embed.content_scope, embed.language.unwrap_or(language));
                None
            }
        }
    }
}

/// Accumulates tokens, merging neighbours with the same scope
#[derive(Default)]
struct TokenSink {
    tokens: Vec<Token>,
}

impl TokenSink {
    fn push(&mut self, start: usize, scope: &Arc<str>, language: ScopeId) {
        // A token starting where the previous one starts replaces it
        if self.tokens.last().is_some_and(|last| last.start >= start) {
            self.tokens.pop();
        }
        if let Some(last) = self.tokens.last() {
            if last.scope == *scope && last.language == language {
                return;
            }
        }
        self.tokens.push(Token {
            start,
            scope: Arc::clone(scope),
            token_type: TokenType::from_scope(scope),
            language,
        });
    }

    fn finish(mut self, line_len: usize, root: &Arc<str>, language: ScopeId) -> Vec<Token> {
        while self.tokens.len() > 1 && self.tokens.last().is_some_and(|t| t.start >= line_len) {
            self.tokens.pop();
        }
        if self.tokens.is_empty() {
            self.push(0, root, language);
        }
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoGrammars;

    impl GrammarLookup for NoGrammars {
        fn grammar(&self, _scope_name: &str) -> Option<Arc<Grammar>> {
            None
        }
    }

    struct Grammars(HashMap<String, Arc<Grammar>>);

    impl GrammarLookup for Grammars {
        fn grammar(&self, scope_name: &str) -> Option<Arc<Grammar>> {
            self.0.get(scope_name).cloned()
        }
    }

    fn compile(doc: &str, id: u32) -> Grammar {
        let source: GrammarSource = toml::from_str(doc).unwrap();
        Grammar::compile("test.toml", source, ScopeId(id), &|s: &str| s.to_string(), &HashMap::new())
            .unwrap()
    }

    fn create_test_grammar() -> Grammar {
        compile(
            r#"
name = "Test"
scope_name = "source.test"

[[patterns]]
name = "line_comment"
match = '//.*$'
scope = "comment.line"
priority = 100

[[patterns]]
name = "number"
match = '\b\d+\b'
scope = "constant.numeric"
priority = 50

[[blocks]]
name = "block_comment"
begin = '/\*'
end = '\*/'
scope = "comment.block"
"#,
            2,
        )
    }

    fn scopes(tokens: &LineTokens) -> Vec<(usize, &str)> {
        tokens.tokens.iter().map(|t| (t.start, &*t.scope)).collect()
    }

    #[test]
    fn test_simple_tokenizing() {
        let grammar = create_test_grammar();
        let result = grammar.tokenize_line("let x = 42;", &LineState::default(), &NoGrammars);

        assert!(result.end_state.is_normal());
        assert_eq!(
            scopes(&result),
            vec![(0, "source.test"), (8, "constant.numeric"), (10, "source.test")]
        );
        assert_eq!(result.tokens[1].token_type, TokenType::Number);
    }

    #[test]
    fn test_line_comment() {
        let grammar = create_test_grammar();
        let result = grammar.tokenize_line("code // comment 12", &LineState::default(), &NoGrammars);

        assert!(result.end_state.is_normal());
        assert_eq!(scopes(&result), vec![(0, "source.test"), (5, "comment.line")]);
    }

    #[test]
    fn test_block_before_later_pattern_is_not_skipped() {
        let grammar = create_test_grammar();
        let result = grammar.tokenize_line("a /* b */ 7", &LineState::default(), &NoGrammars);

        assert_eq!(
            scopes(&result),
            vec![
                (0, "source.test"),
                (2, "comment.block"),
                (9, "source.test"),
                (10, "constant.numeric"),
            ]
        );
    }

    #[test]
    fn test_multiline_start() {
        let grammar = create_test_grammar();
        let result = grammar.tokenize_line("code /* comment", &LineState::default(), &NoGrammars);

        assert!(result.end_state.is_inside_multiline());
        assert_eq!(result.end_state.multiline_id, 1);
        assert_eq!(scopes(&result), vec![(0, "source.test"), (5, "comment.block")]);
    }

    #[test]
    fn test_multiline_continue() {
        let grammar = create_test_grammar();
        let result = grammar.tokenize_line("still 42 in comment", &LineState::inside(1), &NoGrammars);

        assert!(result.end_state.is_inside_multiline());
        assert_eq!(scopes(&result), vec![(0, "comment.block")]);
    }

    #[test]
    fn test_multiline_end() {
        let grammar = create_test_grammar();
        let result = grammar.tokenize_line("end */ 5", &LineState::inside(1), &NoGrammars);

        assert!(result.end_state.is_normal());
        assert_eq!(
            scopes(&result),
            vec![(0, "comment.block"), (6, "source.test"), (7, "constant.numeric")]
        );
    }

    #[test]
    fn test_empty_line_has_one_token() {
        let grammar = create_test_grammar();
        let result = grammar.tokenize_line("", &LineState::default(), &NoGrammars);
        assert_eq!(scopes(&result), vec![(0, "source.test")]);

        let inside = grammar.tokenize_line("", &LineState::inside(1), &NoGrammars);
        assert_eq!(scopes(&inside), vec![(0, "comment.block")]);
        assert!(inside.end_state.is_inside_multiline());
    }

    #[test]
    fn test_invalid_regex_reports_rule() {
        let source: GrammarSource = toml::from_str(
            r#"
name = "Bad"
scope_name = "source.bad"
[[patterns]]
name = "broken"
match = '(oops'
scope = "keyword"
"#,
        )
        .unwrap();
        let err = Grammar::compile("bad.toml", source, ScopeId(2), &|s: &str| s.to_string(), &HashMap::new())
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bad.toml"));
        assert!(msg.contains("broken"));
    }

    fn embedding_pair() -> Grammars {
        let inner = compile(
            r#"
name = "Inner"
scope_name = "source.inner"
[[patterns]]
match = 'let'
scope = "keyword.other"
[[blocks]]
begin = '/\*'
end = '\*/'
scope = "comment.block"
"#,
            3,
        );
        let outer = compile(
            r#"
name = "Outer"
scope_name = "text.outer"
[[blocks]]
begin = '^```inner$'
end = '^```'
scope = "markup.fenced"
include = "source.inner"
content_scope = "meta.embedded.inner"
"#,
            2,
        );
        let mut map = HashMap::new();
        map.insert("source.inner".to_string(), Arc::new(inner));
        map.insert("text.outer".to_string(), Arc::new(outer));
        Grammars(map)
    }

    #[test]
    fn test_embedded_content_uses_embedded_grammar() {
        let grammars = embedding_pair();
        let outer = grammars.grammar("text.outer").unwrap();

        let first = outer.tokenize_line("```inner", &LineState::default(), &grammars);
        assert!(first.end_state.is_inside_multiline());

        let body = outer.tokenize_line("let /* open", &first.end_state, &grammars);
        assert_eq!(
            scopes(&body),
            vec![(0, "keyword.other"), (3, "source.inner"), (4, "comment.block")]
        );
        assert!(body.tokens.iter().all(|t| t.language == ScopeId(3)));
        let nested = body.end_state.embedded().unwrap();
        assert!(nested.is_inside_multiline());

        let close = outer.tokenize_line("*/", &body.end_state, &grammars);
        assert_eq!(scopes(&close), vec![(0, "comment.block")]);

        let fence = outer.tokenize_line("```", &close.end_state, &grammars);
        assert!(fence.end_state.is_normal());
        assert_eq!(scopes(&fence), vec![(0, "markup.fenced")]);
        assert_eq!(fence.tokens[0].language, ScopeId(2));
    }

    #[test]
    fn test_embedded_content_without_grammar_is_one_token() {
        let grammars = embedding_pair();
        let outer = grammars.grammar("text.outer").unwrap();
        let result = outer.tokenize_line("let x", &LineState::inside(1), &NoGrammars);
        assert_eq!(scopes(&result), vec![(0, "meta.embedded.inner")]);
    }

    #[test]
    fn test_self_embedding_is_bounded() {
        let grammar = compile(
            r#"
name = "Loop"
scope_name = "source.loop"
[[blocks]]
begin = '\('
end = '\)'
scope = "meta.group"
include = "source.loop"
"#,
            2,
        );
        let mut map = HashMap::new();
        map.insert("source.loop".to_string(), Arc::new(grammar));
        let grammars = Grammars(map);
        let grammar = grammars.grammar("source.loop").unwrap();

        let line = "((((((((((((x))))))))))))";
        let result = grammar.tokenize_line(line, &LineState::default(), &grammars);
        assert!(!result.tokens.is_empty());
        assert!(result.tokens.windows(2).all(|w| w[0].start < w[1].start));
    }
}
