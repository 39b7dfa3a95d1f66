//! Builtin grammars and themes
//!
//! The documents under the crate's `grammars/` and `themes/` directories
//! are compiled into the binary and served by [`BuiltinResolver`] under
//! the same logical paths, so a filesystem resolver placed in front of
//! it can override any of them.

use std::io;

use crate::registry::FileResolver;

/// Catalog listing the builtin grammars
pub const CATALOG: &str = "grammars/catalog.toml";

/// Theme applied when none is configured
pub const DEFAULT_THEME: &str = "themes/dark.toml";

pub const LIGHT_THEME: &str = "themes/light.json";

const DOCUMENTS: &[(&str, &str)] = &[
    (CATALOG, include_str!("../../../grammars/catalog.toml")),
    ("grammars/rust.toml", include_str!("../../../grammars/rust.toml")),
    (
        "grammars/rust.language-configuration.json",
        include_str!("../../../grammars/rust.language-configuration.json"),
    ),
    ("grammars/c.toml", include_str!("../../../grammars/c.toml")),
    (
        "grammars/c.language-configuration.json",
        include_str!("../../../grammars/c.language-configuration.json"),
    ),
    ("grammars/python.toml", include_str!("../../../grammars/python.toml")),
    (
        "grammars/python.language-configuration.json",
        include_str!("../../../grammars/python.language-configuration.json"),
    ),
    ("grammars/toml.toml", include_str!("../../../grammars/toml.toml")),
    (
        "grammars/toml.language-configuration.json",
        include_str!("../../../grammars/toml.language-configuration.json"),
    ),
    ("grammars/markdown.toml", include_str!("../../../grammars/markdown.toml")),
    (
        "grammars/markdown.language-configuration.json",
        include_str!("../../../grammars/markdown.language-configuration.json"),
    ),
    (DEFAULT_THEME, include_str!("../../../themes/dark.toml")),
    (LIGHT_THEME, include_str!("../../../themes/light.json")),
];

/// Serves the documents bundled with the crate
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinResolver;

impl BuiltinResolver {
    pub fn new() -> Self {
        Self
    }

    /// Text of a bundled document
    pub fn get(path: &str) -> Option<&'static str> {
        DOCUMENTS
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, text)| *text)
    }

    /// Logical paths of every bundled document
    pub fn paths() -> impl Iterator<Item = &'static str> {
        DOCUMENTS.iter().map(|(path, _)| *path)
    }
}

impl FileResolver for BuiltinResolver {
    fn read(&self, path: &str) -> io::Result<Option<String>> {
        Ok(Self::get(path).map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{GrammarDefinition, GrammarRegistry, LoadedGrammar, ThemeModel};
    use crate::syntax::{Color, LineState, LineTokens, Theme};

    const LANGUAGES: &[(&str, &str)] = &[
        ("rust", "source.rust"),
        ("c", "source.c"),
        ("python", "source.python"),
        ("toml", "source.toml"),
    ];

    fn definition(name: &str, scope_name: &str) -> GrammarDefinition {
        GrammarDefinition::new(name, scope_name, &format!("grammars/{}.toml", name))
            .with_language_configuration(&format!("grammars/{}.language-configuration.json", name))
    }

    fn load(registry: &GrammarRegistry, name: &str) -> LoadedGrammar {
        let scope_name = match name {
            "markdown" => "text.html.markdown",
            other => LANGUAGES
                .iter()
                .find(|(n, _)| *n == other)
                .map(|(_, scope)| *scope)
                .unwrap(),
        };
        registry.load_grammar(&definition(name, scope_name)).unwrap()
    }

    /// Scope of the token covering byte `offset`
    fn scope_at(tokens: &LineTokens, offset: usize) -> &str {
        &tokens
            .tokens
            .iter()
            .rev()
            .find(|t| t.start <= offset)
            .unwrap()
            .scope
    }

    #[test]
    fn test_every_path_resolves() {
        let resolver = BuiltinResolver::new();
        for path in BuiltinResolver::paths() {
            assert!(resolver.read(path).unwrap().is_some(), "{}", path);
        }
        assert_eq!(resolver.read("grammars/cobol.toml").unwrap(), None);
    }

    #[test]
    fn test_every_grammar_loads_with_configuration() {
        let registry = GrammarRegistry::new(BuiltinResolver);
        for (name, scope_name) in LANGUAGES {
            let (grammar, configuration) = registry
                .load_grammar_and_configuration(&definition(name, scope_name))
                .unwrap();
            assert_eq!(grammar.scope_name(), *scope_name);
            assert!(configuration.is_some(), "{}", name);
        }
        load(&registry, "markdown");
        assert_eq!(registry.loaded_languages().len(), 5);
    }

    #[test]
    fn test_rust_line() {
        let registry = GrammarRegistry::new(BuiltinResolver);
        let rust = load(&registry, "rust");

        let line = r#"let s = "h\"i"; // done"#;
        let tokens = rust.tokenize_line(line, &LineState::default());
        assert_eq!(scope_at(&tokens, 0), "keyword.other.rust");
        assert_eq!(scope_at(&tokens, 4), "source.rust");
        assert_eq!(scope_at(&tokens, 6), "keyword.operator.rust");
        assert_eq!(scope_at(&tokens, 8), "string.quoted.double.rust");
        assert_eq!(scope_at(&tokens, 11), "string.quoted.double.rust");
        assert_eq!(scope_at(&tokens, 14), "source.rust");
        assert_eq!(scope_at(&tokens, 16), "comment.line.double-slash.rust");
        assert!(tokens.end_state.is_normal());
    }

    #[test]
    fn test_rust_macros_attributes_lifetimes() {
        let registry = GrammarRegistry::new(BuiltinResolver);
        let rust = load(&registry, "rust");

        let tokens = rust.tokenize_line("#[derive(Debug)]", &LineState::default());
        assert_eq!(scope_at(&tokens, 0), "meta.attribute.rust");
        assert_eq!(tokens.tokens.len(), 1);

        let tokens = rust.tokenize_line("println!('a', x: &'a str);", &LineState::default());
        assert_eq!(scope_at(&tokens, 0), "entity.name.function.macro.rust");
        assert_eq!(scope_at(&tokens, 9), "constant.character.rust");
        assert_eq!(scope_at(&tokens, 18), "storage.modifier.lifetime.rust");
        assert_eq!(scope_at(&tokens, 21), "support.type.rust");
    }

    #[test]
    fn test_rust_block_comment_spans_lines() {
        let registry = GrammarRegistry::new(BuiltinResolver);
        let rust = load(&registry, "rust");

        let first = rust.tokenize_line("/* start", &LineState::default());
        assert!(first.end_state.is_inside_multiline());

        let second = rust.tokenize_line("end */ fn", &first.end_state);
        assert_eq!(scope_at(&second, 0), "comment.block.rust");
        assert_eq!(scope_at(&second, 5), "comment.block.rust");
        assert_eq!(scope_at(&second, 7), "keyword.other.rust");
        assert!(second.end_state.is_normal());
    }

    #[test]
    fn test_other_languages() {
        let registry = GrammarRegistry::new(BuiltinResolver);

        let c = load(&registry, "c");
        let tokens = c.tokenize_line("#include <stdio.h>", &LineState::default());
        assert_eq!(scope_at(&tokens, 0), "keyword.control.directive.c");

        let python = load(&registry, "python");
        let tokens = python.tokenize_line("def f(): return \"\"\"doc", &LineState::default());
        assert_eq!(scope_at(&tokens, 0), "keyword.control.python");
        assert_eq!(scope_at(&tokens, 16), "string.quoted.docstring.python");
        assert!(tokens.end_state.is_inside_multiline());

        let toml = load(&registry, "toml");
        let tokens = toml.tokenize_line("[package]", &LineState::default());
        assert_eq!(scope_at(&tokens, 0), "entity.name.section.table.toml");
        let tokens = toml.tokenize_line("name = \"x\" # c", &LineState::default());
        assert_eq!(scope_at(&tokens, 0), "support.type.property-name.toml");
        assert_eq!(scope_at(&tokens, 7), "string.quoted.double.basic.toml");
        assert_eq!(scope_at(&tokens, 11), "comment.line.number-sign.toml");
    }

    #[test]
    fn test_markdown_embeds_rust() {
        let registry = GrammarRegistry::new(BuiltinResolver);
        let rust = load(&registry, "rust");
        let markdown = registry
            .load_grammar(
                &definition("markdown", "text.html.markdown")
                    .with_embedded_languages([("meta.embedded.block.rust", "rust")]),
            )
            .unwrap();

        let fence = markdown.tokenize_line("```rust", &LineState::default());
        assert_eq!(scope_at(&fence, 0), "markup.fenced_code.block.markdown");
        assert!(fence.end_state.is_inside_multiline());

        let code = markdown.tokenize_line("fn main() {}", &fence.end_state);
        assert_eq!(scope_at(&code, 0), "keyword.other.rust");
        assert!(code.tokens.iter().all(|t| t.language == rust.scope_id()));

        let close = markdown.tokenize_line("```", &code.end_state);
        assert_eq!(scope_at(&close, 0), "markup.fenced_code.block.markdown");
        assert_eq!(close.tokens[0].language, markdown.scope_id());
        assert!(close.end_state.is_normal());
    }

    #[test]
    fn test_builtin_themes_parse() {
        let registry = GrammarRegistry::new(BuiltinResolver);

        let mut dark = ThemeModel::new(DEFAULT_THEME);
        registry.set_theme(&mut dark).unwrap();
        let theme = registry.current_theme();
        assert_eq!(theme.name, "Dark");
        let comment = theme.style_for("comment.line.double-slash.rust").unwrap();
        assert!(comment.italic);
        assert_eq!(comment.fg, Color::BrightBlack);

        let light = Theme::parse(LIGHT_THEME, BuiltinResolver::get(LIGHT_THEME).unwrap()).unwrap();
        assert_eq!(light.name, "Light");
        assert_eq!(light.default_style.bg, Color::Rgb(0xfa, 0xfa, 0xfa));
        assert!(light.style_for("markup.heading.markdown").unwrap().bold);
    }
}
