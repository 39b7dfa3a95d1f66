//! Terminal output of highlighted text using crossterm

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{
    Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetBackgroundColor,
    SetForegroundColor,
};

use crate::highlighter::HighlightCache;
use crate::syntax::{Color, Span, Style};

/// Map a theme color onto the terminal palette
pub fn term_color(color: Color) -> TermColor {
    match color {
        Color::Default => TermColor::Reset,
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::White => TermColor::Grey,
        Color::BrightBlack => TermColor::DarkGrey,
        Color::BrightRed => TermColor::Red,
        Color::BrightGreen => TermColor::Green,
        Color::BrightYellow => TermColor::Yellow,
        Color::BrightBlue => TermColor::Blue,
        Color::BrightMagenta => TermColor::Magenta,
        Color::BrightCyan => TermColor::Cyan,
        Color::BrightWhite => TermColor::White,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
    }
}

/// Writes highlighted lines to a terminal stream
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    /// Style for text outside every span
    default_style: Style,
    /// Whether to show line numbers
    line_numbers: bool,
}

impl Renderer {
    pub fn new(default_style: Style) -> Self {
        Self {
            default_style,
            line_numbers: false,
        }
    }

    pub fn with_line_numbers(mut self, enabled: bool) -> Self {
        self.line_numbers = enabled;
        self
    }

    fn set_style<W: Write>(&self, out: &mut W, style: Style) -> io::Result<()> {
        let style = style.or(self.default_style);
        queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
        if style.fg != Color::Default {
            queue!(out, SetForegroundColor(term_color(style.fg)))?;
        }
        if style.bg != Color::Default {
            queue!(out, SetBackgroundColor(term_color(style.bg)))?;
        }
        if style.bold {
            queue!(out, SetAttribute(Attribute::Bold))?;
        }
        if style.italic {
            queue!(out, SetAttribute(Attribute::Italic))?;
        }
        if style.underline {
            queue!(out, SetAttribute(Attribute::Underlined))?;
        }
        Ok(())
    }

    /// Write one line and its newline
    ///
    /// `number` is the 1-based line number, right-aligned to `width`
    /// columns when line numbers are enabled.
    pub fn write_line<W: Write>(
        &self,
        out: &mut W,
        number: usize,
        width: usize,
        text: &str,
        spans: &[Span],
    ) -> io::Result<()> {
        if self.line_numbers {
            queue!(
                out,
                SetAttribute(Attribute::Dim),
                Print(format!("{:>width$} ", number, width = width)),
                SetAttribute(Attribute::NormalIntensity)
            )?;
        }

        let mut pos = 0;
        for span in spans {
            let (start, end) = (span.start.min(text.len()), span.end.min(text.len()));
            if start < pos || start >= end {
                continue;
            }
            if start > pos {
                self.set_style(out, Style::default())?;
                queue!(out, Print(&text[pos..start]))?;
            }
            self.set_style(out, span.style)?;
            queue!(out, Print(&text[start..end]))?;
            pos = end;
        }
        if pos < text.len() {
            self.set_style(out, Style::default())?;
            queue!(out, Print(&text[pos..]))?;
        }

        queue!(out, SetAttribute(Attribute::Reset), ResetColor, Print("\n"))?;
        Ok(())
    }

    /// Highlight and write a whole document
    pub fn write_document<W: Write, S: AsRef<str>>(
        &self,
        out: &mut W,
        lines: &[S],
        cache: &mut HighlightCache,
    ) -> io::Result<()> {
        let width = lines.len().to_string().len();
        for (idx, line) in lines.iter().enumerate() {
            let spans = cache.highlight_line(lines, idx);
            self.write_line(out, idx + 1, width, line.as_ref(), &spans)?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{GrammarDefinition, GrammarRegistry, MemoryResolver};

    fn strip_ansi(bytes: &[u8]) -> String {
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        regex::Regex::new(r"\x1b\[[0-9;]*m")
            .unwrap()
            .replace_all(&text, "")
            .into_owned()
    }

    #[test]
    fn test_term_color() {
        assert_eq!(term_color(Color::Default), TermColor::Reset);
        assert_eq!(term_color(Color::Red), TermColor::DarkRed);
        assert_eq!(term_color(Color::BrightRed), TermColor::Red);
        assert_eq!(term_color(Color::BrightBlack), TermColor::DarkGrey);
        assert_eq!(term_color(Color::White), TermColor::Grey);
        assert_eq!(
            term_color(Color::Rgb(10, 20, 30)),
            TermColor::Rgb { r: 10, g: 20, b: 30 }
        );
    }

    #[test]
    fn test_write_line_keeps_text() {
        let renderer = Renderer::default();
        let mut out = Vec::new();
        let spans = [
            Span::new(0, 3, Style::fg(Color::Magenta).with_bold()),
            Span::new(4, 5, Style::fg(Color::Cyan)),
        ];
        renderer.write_line(&mut out, 1, 1, "let 1;", &spans).unwrap();

        assert_eq!(strip_ansi(&out), "let 1;\n");
        assert!(out.len() > "let 1;\n".len());
    }

    #[test]
    fn test_line_numbers() {
        let renderer = Renderer::default().with_line_numbers(true);
        let mut out = Vec::new();
        renderer.write_line(&mut out, 7, 3, "x", &[]).unwrap();
        assert_eq!(strip_ansi(&out), "  7 x\n");
    }

    #[test]
    fn test_write_document() {
        let registry = GrammarRegistry::new(MemoryResolver::new().with_file(
            "t.toml",
            "name = \"T\"\nscope_name = \"source.t\"\n\n[[patterns]]\nmatch = '\\d+'\nscope = \"constant.numeric\"\n",
        ));
        let grammar = registry
            .load_grammar(&GrammarDefinition::new("t", "source.t", "t.toml"))
            .unwrap();
        let mut cache = HighlightCache::with_grammar(grammar);

        let mut out = Vec::new();
        Renderer::default()
            .write_document(&mut out, &["a 1", "", "22"], &mut cache)
            .unwrap();
        assert_eq!(strip_ansi(&out), "a 1\n\n22\n");
    }
}
