mod defaults;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ivm::block::BlockKind;
use ivm::node::NodeKind;
use minijinja::{AutoEscape, Environment, Error, ErrorKind, Output, State, Value};
use serde::Serialize;
use tracing::debug;

use crate::error::RenderError;

/// Something that renders through its own template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    Node(NodeKind),
    Block(BlockKind),
    /// Wrapper around the whole content of a mechanics fence.
    Mechanics,
    /// Blocks whose parameters matched none of the kind's forms.
    FallbackBlock,
    /// Nodes whose arguments matched none of the kind's forms.
    FallbackNode,
    /// Summary appended to a move block that contains a roll.
    RollResult,
    Link,
}

impl TemplateKey {
    pub fn all() -> impl Iterator<Item = TemplateKey> {
        NodeKind::ALL
            .into_iter()
            .map(TemplateKey::Node)
            .chain(BlockKind::ALL.into_iter().map(TemplateKey::Block))
            .chain([
                TemplateKey::Mechanics,
                TemplateKey::FallbackBlock,
                TemplateKey::FallbackNode,
                TemplateKey::RollResult,
                TemplateKey::Link,
            ])
    }

    /// Key in `template_overrides`.
    pub fn override_key(self) -> String {
        match self {
            TemplateKey::Node(kind) => kind.template_name().to_string(),
            TemplateKey::Block(kind) => format!("{}_block", kind.template_name()),
            TemplateKey::Mechanics => "mechanics_block".to_string(),
            TemplateKey::FallbackBlock => "block_block".to_string(),
            TemplateKey::FallbackNode => "node".to_string(),
            TemplateKey::RollResult => "roll_result".to_string(),
            TemplateKey::Link => "link".to_string(),
        }
    }

    /// Path relative to the template directory. Doubles as the template's
    /// name, whose `.html` suffix turns on auto-escaping.
    pub fn file_name(self) -> String {
        match self {
            TemplateKey::Node(kind) => format!("nodes/{}.html", kind.template_name()),
            TemplateKey::Block(kind) => format!("blocks/{}.html", kind.template_name()),
            TemplateKey::Mechanics => "blocks/mechanics.html".to_string(),
            TemplateKey::FallbackBlock => "blocks/block.html".to_string(),
            TemplateKey::FallbackNode => "nodes/node.html".to_string(),
            TemplateKey::RollResult => "nodes/roll_result.html".to_string(),
            TemplateKey::Link => "link.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Override,
    File,
    Default,
}

/// The compiled templates of one configuration.
///
/// Immutable once built; rebuilding is the only way to change it.
#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
    suppressed: HashSet<TemplateKey>,
}

impl Templates {
    /// Resolve and compile every template. Each key takes the first of: its
    /// entry in `overrides`, its file under `template_path`, the built-in
    /// default. An empty or whitespace-only source suppresses the element.
    pub fn new(
        template_path: Option<&Path>,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Self, RenderError> {
        let keys: Vec<TemplateKey> = TemplateKey::all().collect();
        let known: HashSet<String> = keys.iter().map(|k| k.override_key()).collect();
        if let Some(unknown) = overrides.keys().find(|key| !known.contains(*key)) {
            return Err(RenderError::UnknownOverride(unknown.clone()));
        }

        let mut env = Environment::new();
        env.set_formatter(escape_html);
        let mut suppressed = HashSet::new();

        for key in keys {
            let (source, origin) = resolve(key, template_path, overrides)?;
            let name = key.file_name();
            if source.trim().is_empty() {
                debug!(template = %name, ?origin, "template suppressed");
                suppressed.insert(key);
                continue;
            }
            debug!(template = %name, ?origin, "template resolved");
            env.add_template_owned(name.clone(), source)
                .map_err(|source| RenderError::TemplateCompile { name, source })?;
        }

        Ok(Templates { env, suppressed })
    }

    /// Built-in templates only.
    pub fn builtin() -> Result<Self, RenderError> {
        Templates::new(None, &BTreeMap::new())
    }

    pub fn is_suppressed(&self, key: TemplateKey) -> bool {
        self.suppressed.contains(&key)
    }

    /// Render `key` with `ctx`. Suppressed templates render as nothing.
    pub fn render<S: Serialize>(&self, key: TemplateKey, ctx: S) -> Result<String, RenderError> {
        if self.is_suppressed(key) {
            return Ok(String::new());
        }
        let name = key.file_name();
        let template = self
            .env
            .get_template(&name)
            .map_err(|source| RenderError::Render {
                name: name.clone(),
                source,
            })?;
        template
            .render(ctx)
            .map_err(|source| RenderError::Render { name, source })
    }
}

/// Auto-escaping that leaves `/` and `'` alone, so escaped text never
/// contains `#` and wiki links in rendered output stay recognizable.
/// Templates must quote attributes with `"`.
fn escape_html(out: &mut Output<'_>, state: &State<'_, '_>, value: &Value) -> Result<(), Error> {
    match value.as_str() {
        Some(text) if matches!(state.auto_escape(), AutoEscape::Html) && !value.is_safe() => out
            .write_str(&html_escape::encode_double_quoted_attribute(text))
            .map_err(|err| Error::new(ErrorKind::WriteFailure, err.to_string())),
        _ => minijinja::escape_formatter(out, state, value),
    }
}

fn resolve(
    key: TemplateKey,
    template_path: Option<&Path>,
    overrides: &BTreeMap<String, String>,
) -> Result<(String, Origin), RenderError> {
    if let Some(source) = overrides.get(&key.override_key()) {
        return Ok((source.clone(), Origin::Override));
    }

    if let Some(dir) = template_path {
        let path: PathBuf = dir.join(key.file_name());
        match fs::read_to_string(&path) {
            Ok(source) => return Ok((source, Origin::File)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(RenderError::TemplateRead { path, source }),
        }
    }

    Ok((defaults::source(key).to_string(), Origin::Default))
}
