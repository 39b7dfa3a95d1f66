//! Per-document highlighting cache
//!
//! Tokenizing a line needs the state the previous line ended in, so the
//! cache keeps the end state of every line it has seen plus the styled
//! spans of each line. Editing a line invalidates it and everything
//! after it. A theme change keeps the states and only restyles.

use std::sync::Arc;

use crate::registry::LoadedGrammar;
use crate::syntax::{LineState, Span, Theme};

/// Highlighting state for one document
#[derive(Debug, Default)]
pub struct HighlightCache {
    /// Grammar for this document (None if no highlighting)
    grammar: Option<LoadedGrammar>,
    /// End state of lines `0..line_states.len()`
    line_states: Vec<LineState>,
    /// Cached spans per line (None = not computed)
    line_spans: Vec<Option<Vec<Span>>>,
    /// Theme the cached spans were styled with
    theme: Option<Arc<Theme>>,
}

impl HighlightCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grammar(grammar: LoadedGrammar) -> Self {
        Self {
            grammar: Some(grammar),
            ..Self::default()
        }
    }

    pub fn grammar(&self) -> Option<&LoadedGrammar> {
        self.grammar.as_ref()
    }

    /// Switch grammars; drops everything cached
    pub fn set_grammar(&mut self, grammar: Option<LoadedGrammar>) {
        self.grammar = grammar;
        self.invalidate_all();
    }

    /// Invalidate cache from a specific line onwards
    pub fn invalidate_from(&mut self, line: usize) {
        self.line_states.truncate(line);
        for spans in self.line_spans.iter_mut().skip(line) {
            *spans = None;
        }
    }

    pub fn invalidate_all(&mut self) {
        self.line_states.clear();
        self.line_spans.clear();
        self.theme = None;
    }

    /// Number of lines whose end state is known
    pub fn valid_lines(&self) -> usize {
        self.line_states.len()
    }

    /// Highlight `lines[line_idx]`, computing earlier line states as needed
    ///
    /// Returns an empty vec without a grammar or for an out-of-range line.
    pub fn highlight_line<S: AsRef<str>>(&mut self, lines: &[S], line_idx: usize) -> Vec<Span> {
        let Some(grammar) = self.grammar.clone() else {
            return Vec::new();
        };
        let Some(line) = lines.get(line_idx) else {
            return Vec::new();
        };
        let text: &str = line.as_ref();

        self.sync_theme(&grammar);
        if self.line_spans.len() < lines.len() {
            self.line_spans.resize(lines.len(), None);
        }

        let prev_state = self.state_before(&grammar, lines, line_idx);
        if let Some(spans) = &self.line_spans[line_idx] {
            return spans.clone();
        }

        let result = grammar.highlight_line(text, &prev_state);
        if self.line_states.len() == line_idx {
            self.line_states.push(result.end_state);
        }
        self.line_spans[line_idx] = Some(result.spans.clone());
        result.spans
    }

    /// Highlight every line in order
    pub fn highlight_all<S: AsRef<str>>(&mut self, lines: &[S]) -> Vec<Vec<Span>> {
        (0..lines.len()).map(|i| self.highlight_line(lines, i)).collect()
    }

    /// Drop styled spans if the active theme changed since they were made
    fn sync_theme(&mut self, grammar: &LoadedGrammar) {
        let theme = grammar.theme();
        let unchanged = self.theme.as_ref().is_some_and(|t| Arc::ptr_eq(t, &theme));
        if !unchanged {
            self.line_spans.iter_mut().for_each(|spans| *spans = None);
            self.theme = Some(theme);
        }
    }

    /// State at the start of `line_idx`
    fn state_before<S: AsRef<str>>(
        &mut self,
        grammar: &LoadedGrammar,
        lines: &[S],
        line_idx: usize,
    ) -> LineState {
        while self.line_states.len() < line_idx {
            let i = self.line_states.len();
            let prev = self.line_states.last().cloned().unwrap_or_default();
            let tokens = grammar.tokenize_line(lines[i].as_ref(), &prev);
            self.line_states.push(tokens.end_state);
        }
        match line_idx {
            0 => LineState::default(),
            n => self.line_states[n - 1].clone(),
        }
    }
}
