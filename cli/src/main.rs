mod config;
mod test_runner;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use ivm::frontmatter::{self, Frontmatter};
use ivm::journal::{self, FenceKind};
use ivm::link::Link;
use ivm::parser::ParseWarning;
use renderer::{Config, Converter};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const SUBCOMMANDS: &[&str] = &["render", "check", "test", "help"];

/// Global flags that take a separate value.
const VALUE_FLAGS: &[&str] = &["--config", "--templates"];

#[derive(Parser)]
#[command(name = "ivm", version, about = "Iron Vault mechanics renderer")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// TOML configuration file (defaults to ./ivm.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Template directory, overriding the configured one
    #[arg(long, global = true)]
    templates: Option<PathBuf>,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a journal page to HTML
    Render(RenderArgs),

    /// Parse mechanics fences and report warnings
    Check(CheckArgs),

    /// Run .test.md fixtures
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Markdown journal page
    file: PathBuf,

    /// Write HTML here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Wrap the result in a complete HTML page
    #[arg(long)]
    standalone: bool,

    /// Print collected links to stderr
    #[arg(long)]
    links: bool,

    /// Print front matter to stderr as YAML
    #[arg(long)]
    frontmatter: bool,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Markdown journal page
    file: PathBuf,

    /// Dump the parsed mechanics of every fence
    #[arg(long)]
    ast: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // `ivm page.md` is short for `ivm render page.md`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = first_positional(&args) {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "render".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose, cli.no_color);

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Render(ref render_args) => {
            let config = load_config(&cli);
            do_render(render_args, config);
        }
        Command::Check(ref check_args) => do_check(check_args, color_choice),
        Command::Test(ref test_args) => {
            if test_args.list_categories {
                test_runner::list_categories(&test_args.path);
                return;
            }
            let config = load_config(&cli);
            let exit_code =
                test_runner::run_tests(&test_args.path, &config, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn first_positional(args: &[String]) -> Option<usize> {
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        if VALUE_FLAGS.contains(&arg) {
            i += 2;
        } else if arg.starts_with('-') {
            i += 1;
        } else {
            return Some(i);
        }
    }
    None
}

fn init_logging(verbose: bool, no_color: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!no_color)
                .without_time(),
        )
        .init();
}

fn load_config(cli: &Cli) -> Config {
    let mut config = config::load(cli.config.as_deref()).unwrap_or_else(|e| fail(e));
    if let Some(dir) = &cli.templates {
        config.template_path = Some(dir.clone());
    }
    config
}

fn fail(error: impl std::fmt::Display) -> ! {
    eprintln!("error: {error}");
    process::exit(1);
}

fn read_page(path: &Path) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("cannot read '{}': {}", path.display(), e)))
}

fn do_render(args: &RenderArgs, config: Config) {
    let source = read_page(&args.file);
    let mut converter = Converter::new(config).unwrap_or_else(|e| fail(e));

    let mut links = Vec::new();
    let mut frontmatter = Frontmatter::new();
    let html = converter
        .convert(&source, Some(&mut links), Some(&mut frontmatter))
        .unwrap_or_else(|e| fail(e));
    debug!(
        warnings = converter.warnings().len(),
        links = links.len(),
        "page converted"
    );

    let html = if args.standalone {
        standalone(&html, page_title(&args.file, &frontmatter))
    } else {
        html
    };

    match &args.output {
        Some(out) => fs::write(out, html)
            .unwrap_or_else(|e| fail(format!("cannot write '{}': {}", out.display(), e))),
        None => print!("{html}"),
    }

    if args.links {
        print_links(&links);
    }
    if args.frontmatter && !frontmatter.is_empty() {
        match serde_yaml::to_string(&frontmatter) {
            Ok(yaml) => eprint!("{yaml}"),
            Err(e) => fail(e),
        }
    }
}

fn print_links(links: &[Link]) {
    for link in links {
        let anchor = if link.anchor.is_empty() {
            String::new()
        } else {
            format!("#{}", link.anchor)
        };
        eprintln!("{}{} ({})", link.reference, anchor, link.label);
    }
}

fn page_title(path: &Path, frontmatter: &Frontmatter) -> String {
    frontmatter
        .get("title")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
}

fn standalone(body: &str, title: String) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        html_escape::encode_text(&title),
        body
    )
}

fn do_check(args: &CheckArgs, color_choice: ColorChoice) {
    let source = read_page(&args.file);

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.display().to_string(), source.clone());

    let split = frontmatter::split(&source).unwrap_or_else(|e| fail(e));
    if let Err(e) = split.parse() {
        fail(e);
    }

    let mut warnings: Vec<ParseWarning> = Vec::new();
    let mut fence_count = 0;
    for fence in journal::fences(split.body, split.body_offset) {
        if fence.kind != FenceKind::Mechanics {
            continue;
        }
        fence_count += 1;
        let (document, fence_warnings) = fence.parse(file_id);
        if args.ast {
            println!("{:#?}", document);
        }
        warnings.extend(fence_warnings);
    }

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    for warning in &warnings {
        let diagnostic = warning.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
    }

    eprintln!(
        "ok: {} mechanics block(s), {} warning(s) in {}",
        fence_count,
        warnings.len(),
        args.file.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn finds_the_page_after_flags() {
        assert_eq!(first_positional(&args("ivm page.md")), Some(1));
        assert_eq!(first_positional(&args("ivm --no-color page.md")), Some(2));
        assert_eq!(first_positional(&args("ivm --config x.toml page.md")), Some(3));
        assert_eq!(first_positional(&args("ivm --config=x.toml check page.md")), Some(2));
        assert_eq!(first_positional(&args("ivm --verbose")), None);
    }

    #[test]
    fn title_prefers_front_matter() {
        let mut frontmatter = Frontmatter::new();
        assert_eq!(page_title(Path::new("notes/Session 3.md"), &frontmatter), "Session 3");
        frontmatter.insert("title".into(), "Into the Void".into());
        assert_eq!(page_title(Path::new("notes/Session 3.md"), &frontmatter), "Into the Void");
    }

    #[test]
    fn standalone_page_escapes_title() {
        let page = standalone("<p>x</p>\n", "A & B".to_string());
        assert!(page.contains("<title>A &amp; B</title>"));
        assert!(page.contains("<body>\n<p>x</p>\n</body>"));
    }
}
