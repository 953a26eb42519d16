use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ivm::link::Link;
use ivm::parser::ParseWarning;
use renderer::{Config, Converter};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning's span must start on this 1-based line of the page.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Template overrides layered over the configured ones.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,

    /// Expected HTML (trimmed comparison).
    #[serde(default)]
    pub expect_html: Option<String>,

    /// Substrings the HTML must contain.
    #[serde(default)]
    pub expect_contains: Vec<String>,

    /// Substrings the HTML must not contain.
    #[serde(default)]
    pub expect_absent: Vec<String>,

    /// Expected link references, in order.
    #[serde(default)]
    pub expect_links: Option<Vec<String>>,

    /// Expected conversion error; its message must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// Expected parse warnings. If present (even empty), count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,
}

/// Split a `.test.md` file into its TOML header and the journal page.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    if !content.starts_with("+++") {
        return Err("missing opening +++ header delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n+++")
        .ok_or("missing closing +++ header delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let page = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, page))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path, base: &Config) -> TestResult {
    let (description, outcome) = match std::fs::read_to_string(path) {
        Err(e) => (None, Err(format!("cannot read file: {}", e))),
        Ok(content) => match parse_test_file(&content) {
            Err(e) => (None, Err(format!("header error: {}", e))),
            Ok((config, page)) => (config.description.clone(), check_page(&config, page, base)),
        },
    };

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: match outcome {
            Ok(()) => TestOutcome::Pass,
            Err(reason) => TestOutcome::Fail(reason),
        },
    }
}

fn check_page(config: &TestConfig, page: &str, base: &Config) -> Result<(), String> {
    let mut settings = base.clone();
    settings
        .template_overrides
        .extend(config.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

    let mut links = Vec::new();
    let result = Converter::new(settings).and_then(|mut converter| {
        let html = converter.convert(page, Some(&mut links), None)?;
        Ok((html, converter.warnings().to_vec()))
    });

    let (html, warnings) = match (&config.expect_error, result) {
        (Some(expected), Err(err)) => {
            let message = err.to_string();
            return if message.contains(expected.as_str()) {
                Ok(())
            } else {
                Err(format!(
                    "expected error containing \"{}\", got: {}",
                    expected, message
                ))
            };
        }
        (Some(expected), Ok(_)) => {
            return Err(format!(
                "expected error containing \"{}\", but conversion succeeded",
                expected
            ));
        }
        (None, Err(err)) => return Err(format!("unexpected error: {}", err)),
        (None, Ok(pair)) => pair,
    };
    debug!(bytes = html.len(), warnings = warnings.len(), "fixture converted");

    if let Some(expected) = &config.expect_html {
        let (expected, actual) = (expected.trim(), html.trim());
        if expected != actual {
            return Err(format!(
                "html mismatch\n  expected: {}\n  actual:   {}",
                expected, actual
            ));
        }
    }

    for needle in &config.expect_contains {
        if !html.contains(needle.as_str()) {
            return Err(format!("expected html to contain \"{}\"\n  actual: {}", needle, html.trim()));
        }
    }

    for needle in &config.expect_absent {
        if html.contains(needle.as_str()) {
            return Err(format!("expected html not to contain \"{}\"", needle));
        }
    }

    if let Some(expected) = &config.expect_links {
        check_links(&links, expected)?;
    }

    if let Some(expected) = &config.expect_warnings {
        check_warnings(page, &warnings, expected)?;
    }

    Ok(())
}

fn check_links(links: &[Link], expected: &[String]) -> Result<(), String> {
    let actual: Vec<&str> = links.iter().map(|l| l.reference.as_str()).collect();
    if actual == expected {
        Ok(())
    } else {
        Err(format!(
            "link mismatch\n  expected: [{}]\n  actual:   [{}]",
            expected.join(", "),
            actual.join(", ")
        ))
    }
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

fn check_warnings(
    page: &str,
    warnings: &[ParseWarning],
    expected: &[ExpectedWarning],
) -> Result<(), String> {
    if warnings.len() != expected.len() {
        let actual_msgs: Vec<String> = warnings
            .iter()
            .map(|w| format!("  - {}", w.message))
            .collect();
        return Err(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            warnings.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in warnings.iter().zip(expected.iter()).enumerate() {
        if !actual.message.contains(&expected.contains) {
            return Err(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, actual.message
            ));
        }

        if let Some(expected_line) = expected.line {
            let actual_line = byte_offset_to_line(page, actual.span.start);
            if actual_line != expected_line {
                return Err(format!(
                    "warning[{}]: expected on line {}, but span is on line {}",
                    i, expected_line, actual_line
                ));
            }
        }
    }

    Ok(())
}

/// `.test.md` files grouped by their folder relative to `root`; files
/// directly in `root` have the empty category.
fn discover(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    if root.is_file() {
        categories.insert(String::new(), vec![root.to_path_buf()]);
        return categories;
    }
    collect_tests(root, root, &mut categories);
    categories.values_mut().for_each(|files| files.sort());
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            collect_tests(&path, root, out);
            continue;
        }
        let is_fixture = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".test.md"));
        if is_fixture {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }
    let categories = discover(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }
    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

/// Keep the categories named in `wanted`, including their subfolders.
fn select<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    wanted: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if wanted.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }
    let mut selected = BTreeMap::new();
    for requested in wanted {
        let req = requested.trim_matches('/');
        let prefix = format!("{req}/");
        let before = selected.len();
        for (category, files) in all {
            if category == req || category.starts_with(&prefix) {
                selected.insert(category.as_str(), files.as_slice());
            }
        }
        if selected.len() == before {
            let available: Vec<&str> = all.keys().map(|k| category_label(k)).collect();
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                available.join(", ")
            );
        }
    }
    selected
}

struct Style {
    color: bool,
}

impl Style {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn pass(&self) -> String {
        self.paint("32", "PASS")
    }

    fn fail(&self) -> String {
        self.paint("31", "FAIL")
    }
}

/// Run every fixture under `path` (or the single file `path`) against
/// `config`. Returns the process exit code.
pub fn run_tests(path: &Path, config: &Config, no_color: bool, categories: &[String]) -> i32 {
    let style = Style { color: !no_color };
    let all = discover(path);
    if all.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return 1;
    }

    let selected = select(&all, if path.is_file() { &[] } else { categories });
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &selected {
        if !path.is_file() {
            eprintln!();
            eprintln!("{}", style.paint("1", category_label(category)));
        }
        for file in files.iter() {
            let result = run_single_test(file, config);
            let label = result.description.clone().unwrap_or_else(|| {
                file.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            match result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", style.pass(), label);
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", style.fail(), label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                reason.lines().for_each(|line| eprintln!("  {line}"));
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", style.paint("32", "ok"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("31", "FAILED"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}
