//! Color themes
//!
//! A theme maps dotted scope selectors to styles. Two document shapes
//! are accepted: the native one (`default` table plus `[[rules]]`) and
//! the TextMate/VS Code one (`tokenColors` with `settings`).

use serde::Deserialize;

use super::style::{Color, Style};
use super::tokens::{scope_matches, Token};
use crate::document;
use crate::error::{RegistryError, Result};

/// A style rule for one scope selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeRule {
    pub scope: String,
    pub style: Style,
}

/// A color theme
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Theme {
    /// Theme name
    pub name: String,
    /// Style for text no rule matches
    pub default_style: Style,
    rules: Vec<ThemeRule>,
}

impl Theme {
    /// Create an empty theme
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Builder: add a rule
    pub fn with_rule(mut self, scope: &str, style: Style) -> Self {
        self.rules.push(ThemeRule {
            scope: scope.to_string(),
            style,
        });
        self
    }

    /// Parse a theme document
    pub fn parse(path: &str, text: &str) -> Result<Self> {
        match document::parse::<ThemeDocument>(path, text)? {
            ThemeDocument::TextMate(doc) => doc.into_theme(path),
            ThemeDocument::Native(doc) => doc.into_theme(path),
        }
    }

    pub fn rules(&self) -> &[ThemeRule] {
        &self.rules
    }

    /// Style of the most specific selector matching `scope`
    ///
    /// Longer selectors win; among equal selectors the later rule wins.
    pub fn style_for(&self, scope: &str) -> Option<Style> {
        let mut best: Option<&ThemeRule> = None;
        for rule in &self.rules {
            if scope_matches(&rule.scope, scope)
                && best.map_or(true, |b| rule.scope.len() >= b.scope.len())
            {
                best = Some(rule);
            }
        }
        best.map(|rule| rule.style)
    }

    /// Final style of a token: theme rule, else token type fallback
    pub fn style_token(&self, token: &Token) -> Style {
        self.style_for(&token.scope)
            .unwrap_or_else(|| token.token_type.default_style())
            .or(self.default_style)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ThemeDocument {
    TextMate(TextMateTheme),
    Native(NativeTheme),
}

#[derive(Deserialize)]
struct NativeTheme {
    name: String,
    #[serde(default)]
    default: Option<StyleSource>,
    #[serde(default)]
    rules: Vec<NativeRule>,
}

#[derive(Deserialize)]
struct NativeRule {
    #[serde(alias = "scopes")]
    scope: Scopes,
    #[serde(flatten)]
    style: StyleSource,
}

#[derive(Deserialize, Default)]
struct StyleSource {
    #[serde(default)]
    fg: Option<String>,
    #[serde(default)]
    bg: Option<String>,
    #[serde(default)]
    bold: bool,
    #[serde(default)]
    italic: bool,
    #[serde(default)]
    underline: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextMateTheme {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    colors: std::collections::HashMap<String, String>,
    token_colors: Vec<TextMateRule>,
}

#[derive(Deserialize)]
struct TextMateRule {
    #[serde(default)]
    scope: Option<Scopes>,
    settings: TextMateSettings,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TextMateSettings {
    #[serde(default)]
    foreground: Option<String>,
    #[serde(default)]
    background: Option<String>,
    #[serde(default)]
    font_style: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scopes {
    One(String),
    Many(Vec<String>),
}

impl Scopes {
    fn into_vec(self) -> Vec<String> {
        let list = match self {
            Scopes::One(s) => s.split(',').map(str::to_string).collect(),
            Scopes::Many(v) => v,
        };
        list.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn color(path: &str, value: Option<&str>) -> Result<Color> {
    match value {
        None => Ok(Color::Default),
        Some(v) => Color::parse(v).ok_or_else(|| RegistryError::load(path, format!("invalid color `{}`", v))),
    }
}

impl StyleSource {
    fn to_style(&self, path: &str) -> Result<Style> {
        Ok(Style {
            fg: color(path, self.fg.as_deref())?,
            bg: color(path, self.bg.as_deref())?,
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
        })
    }
}

impl NativeTheme {
    fn into_theme(self, path: &str) -> Result<Theme> {
        let mut theme = Theme::new(&self.name);
        if let Some(default) = &self.default {
            theme.default_style = default.to_style(path)?;
        }
        for rule in self.rules {
            let style = rule.style.to_style(path)?;
            for scope in rule.scope.into_vec() {
                theme = theme.with_rule(&scope, style);
            }
        }
        Ok(theme)
    }
}

impl TextMateSettings {
    fn to_style(&self, path: &str) -> Result<Style> {
        let font_style = self.font_style.as_deref().unwrap_or("");
        Ok(Style {
            fg: color(path, self.foreground.as_deref())?,
            bg: color(path, self.background.as_deref())?,
            bold: font_style.split_whitespace().any(|s| s == "bold"),
            italic: font_style.split_whitespace().any(|s| s == "italic"),
            underline: font_style.split_whitespace().any(|s| s == "underline"),
        })
    }
}

impl TextMateTheme {
    fn into_theme(self, path: &str) -> Result<Theme> {
        let mut theme = Theme::new(self.name.as_deref().unwrap_or(path));
        theme.default_style = Style {
            fg: color(path, self.colors.get("editor.foreground").map(String::as_str))?,
            bg: color(path, self.colors.get("editor.background").map(String::as_str))?,
            ..Default::default()
        };
        for rule in self.token_colors {
            let style = rule.settings.to_style(path)?;
            match rule.scope {
                // A rule without scope sets the defaults
                None => theme.default_style = style.or(theme.default_style),
                Some(scopes) => {
                    for scope in scopes.into_vec() {
                        theme = theme.with_rule(&scope, style);
                    }
                }
            }
        }
        Ok(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_selector_wins() {
        let theme = Theme::new("t")
            .with_rule("comment", Style::fg(Color::Green))
            .with_rule("comment.line", Style::fg(Color::Red))
            .with_rule("keyword", Style::fg(Color::Blue));

        assert_eq!(theme.style_for("comment.line.double-slash").map(|s| s.fg), Some(Color::Red));
        assert_eq!(theme.style_for("comment.block").map(|s| s.fg), Some(Color::Green));
        assert_eq!(theme.style_for("string"), None);
    }

    #[test]
    fn test_later_rule_wins_tie() {
        let theme = Theme::new("t")
            .with_rule("string", Style::fg(Color::Green))
            .with_rule("string", Style::fg(Color::Yellow));
        assert_eq!(theme.style_for("string.quoted").map(|s| s.fg), Some(Color::Yellow));
    }

    #[test]
    fn test_parse_native_toml() {
        let theme = Theme::parse(
            "dark.toml",
            r##"
name = "Dark"

[default]
fg = "#d4d4d4"
bg = "#1e1e1e"

[[rules]]
scope = "comment"
fg = "#6a9955"
italic = true

[[rules]]
scopes = ["keyword", "storage"]
fg = "magenta"
bold = true
"##,
        )
        .unwrap();

        assert_eq!(theme.name, "Dark");
        assert_eq!(theme.default_style.bg, Color::Rgb(0x1e, 0x1e, 0x1e));
        assert_eq!(theme.rules().len(), 3);
        let comment = theme.style_for("comment.line").unwrap();
        assert!(comment.italic);
        assert_eq!(comment.fg, Color::Rgb(0x6a, 0x99, 0x55));
        assert!(theme.style_for("storage.type").unwrap().bold);
    }

    #[test]
    fn test_parse_textmate_json() {
        let theme = Theme::parse(
            "light.json",
            r##"{
  "name": "Light",
  "colors": { "editor.foreground": "#000000", "editor.background": "#ffffff" },
  "tokenColors": [
    { "settings": { "foreground": "#333333" } },
    { "scope": "comment, punctuation.definition.comment",
      "settings": { "foreground": "#008000", "fontStyle": "italic" } },
    { "scope": ["keyword", "storage"], "settings": { "foreground": "#0000ff", "fontStyle": "bold underline" } }
  ]
}"##,
        )
        .unwrap();

        assert_eq!(theme.name, "Light");
        assert_eq!(theme.default_style.fg, Color::Rgb(0x33, 0x33, 0x33));
        assert_eq!(theme.default_style.bg, Color::Rgb(0xff, 0xff, 0xff));
        assert!(theme.style_for("punctuation.definition.comment.rust").unwrap().italic);
        let keyword = theme.style_for("keyword.control").unwrap();
        assert!(keyword.bold && keyword.underline);
    }

    #[test]
    fn test_invalid_color_is_load_error() {
        let err = Theme::parse(
            "bad.toml",
            r#"
name = "Bad"
[[rules]]
scope = "comment"
fg = "not-a-color"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::Load { .. }));
    }

    #[test]
    fn test_style_token_falls_back_to_token_type() {
        use crate::registry::ScopeId;
        use crate::syntax::TokenType;
        use std::sync::Arc;

        let theme = Theme::new("t").with_rule("keyword", Style::fg(Color::Red));
        let token = Token {
            start: 0,
            scope: Arc::from("comment.line"),
            token_type: TokenType::Comment,
            language: ScopeId(2),
        };
        assert_eq!(theme.style_token(&token), TokenType::Comment.default_style());
    }
}
