//! tmregistry - print a file with syntax highlighting
//!
//! Grammars come from the catalog, themes from the configured theme or
//! `--theme`. Documents under `grammar-root` override the builtins.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use tmregistry::syntax::builtin::BuiltinResolver;
use tmregistry::syntax::Theme;
use tmregistry::{
    logging, Config, FsResolver, GrammarCatalog, GrammarRegistry, HighlightCache, Renderer,
    ResolverChain, Result, ThemeModel, ThemeRegistry,
};

/// What the command line asked for
#[derive(Debug, Default)]
struct Options {
    theme: Option<PathBuf>,
    list: bool,
    file: Option<PathBuf>,
}

enum Command {
    Help,
    Version,
    Run(Options),
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(Command::Help) => {
            print_usage();
            return;
        }
        Ok(Command::Version) => {
            print_version();
            return;
        }
        Ok(Command::Run(options)) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!("Try 'tmregistry --help' for more information.");
            process::exit(2);
        }
    };

    if let Err(e) = run(options) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> std::result::Result<Command, String> {
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            "--list" => options.list = true,
            "--theme" => {
                let path = iter.next().ok_or("--theme needs a path")?;
                options.theme = Some(PathBuf::from(path));
            }
            s if s.starts_with('-') => return Err(format!("unknown option '{}'", s)),
            s => {
                if options.file.is_some() {
                    return Err("only one FILE may be given".to_string());
                }
                options.file = Some(PathBuf::from(s));
            }
        }
    }

    if options.file.is_none() && !options.list {
        return Err("missing FILE".to_string());
    }
    Ok(Command::Run(options))
}

fn run(options: Options) -> Result<()> {
    let config = Config::load();
    logging::init_tracing(&config);

    let mut chain = ResolverChain::new();
    if let Some(root) = &config.grammar_root {
        chain = chain.with(FsResolver::new(root));
    }
    let registry = Arc::new(GrammarRegistry::new(chain.with(BuiltinResolver)));

    let themes = ThemeRegistry::new();
    let _subscription = registry.attach(&themes)?;
    themes.set_theme(theme_model(&config, options.theme.as_deref())?)?;

    let catalog = GrammarCatalog::load(registry.resolver().as_ref(), &config.catalog)?;
    catalog.reserve_scope_ids(&registry);

    if options.list {
        for entry in catalog.entries() {
            println!(
                "{:<12} {:<24} {}",
                entry.name,
                entry.scope_name,
                entry.file_extensions.join(", ")
            );
        }
    }

    let Some(path) = options.file else {
        return Ok(());
    };
    let text = fs::read_to_string(&path)?;
    let lines: Vec<&str> = text.lines().collect();

    let grammar = match catalog.find_for_path(&path) {
        Some(entry) => Some(catalog.register(&registry, entry)?),
        None => {
            tracing::info!(path = %path.display(), "no grammar for file, printing plain text");
            None
        }
    };
    let mut cache = HighlightCache::new();
    cache.set_grammar(grammar);

    let renderer = Renderer::new(registry.current_theme().default_style)
        .with_line_numbers(config.show_line_numbers);
    let stdout = io::stdout();
    renderer.write_document(&mut stdout.lock(), &lines, &mut cache)?;

    Ok(())
}

/// `--theme` names a file on disk; the configured theme is a logical path
fn theme_model(config: &Config, cli_theme: Option<&Path>) -> Result<ThemeModel> {
    match cli_theme {
        Some(path) => {
            let name = path.to_string_lossy();
            let text = fs::read_to_string(path)?;
            Ok(ThemeModel::from_theme(Theme::parse(&name, &text)?))
        }
        None => Ok(ThemeModel::new(&config.theme)),
    }
}

fn print_usage() {
    println!("tmregistry {} - syntax highlighting from grammar documents", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: tmregistry [OPTIONS] FILE");
    println!();
    println!("Options:");
    println!("  -h, --help      Show this help message");
    println!("  -V, --version   Show version information");
    println!("      --theme PATH  Use the theme file at PATH");
    println!("      --list      List the languages in the catalog");
    println!();
    println!("Settings are read from ~/.tmregistry.conf:");
    println!("  grammar-root, catalog, theme, trace-level, line-numbers");
}

fn print_version() {
    println!("tmregistry {}", env!("CARGO_PKG_VERSION"));
}
