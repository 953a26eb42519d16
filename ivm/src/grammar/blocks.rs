use once_cell::sync::Lazy;
use regex::Regex;

use crate::block::BlockKind;
use crate::grammar::nodes::match_node;
use crate::grammar::params::parse_params;
use crate::grammar::text::convert_link_name;
use crate::node::{FieldValue, Fields, NodeKind};

static ACTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^name="\[\[(?:[^\]|]*\|)?(?P<name>[^\]|]+)\]\]"$"#).unwrap()
});
static MOVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^"\[(?P<name>[^\]]+)\]\((?P<link>[^)]+)\)"$"#).unwrap());
static PROMPT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^"(?P<prompt>.*)"$"#).unwrap());

/// Match the parameters of a block opener.
///
/// Returns the extracted parameters and whether any form of the kind
/// accepted them. An opener without parameters is accepted as-is.
pub fn match_block(kind: BlockKind, raw: &str) -> (Fields, bool) {
    let raw = raw.trim();
    if raw.is_empty() {
        return (Fields::new(), true);
    }

    let params = match kind {
        BlockKind::Actor => ACTOR
            .captures(raw)
            .and_then(|caps| caps.name("name"))
            .map(|m| Fields::new().with("name", m.as_str()))
            .or_else(|| generic(raw)),
        BlockKind::Move => MOVE
            .captures(raw)
            .map(|caps| {
                let mut fields = Fields::new();
                if let Some(name) = caps.name("name") {
                    fields.insert("name", convert_link_name(name.as_str()));
                }
                if let Some(link) = caps.name("link") {
                    fields.insert("link", link.as_str());
                }
                fields
            })
            .or_else(|| generic(raw)),
        BlockKind::OracleGroup => generic(raw),
        BlockKind::Oracle => {
            let node = match_node(NodeKind::Oracle, raw);
            node.matched.then(|| {
                let mut fields = node.fields;
                fields.extend(node.extra);
                fields
            })
        }
        BlockKind::OraclePrompt => PROMPT
            .captures(raw)
            .and_then(|caps| caps.name("prompt"))
            .map(|m| Fields::new().with("prompt", m.as_str().replace("\\\"", "\""))),
    };

    match params {
        Some(params) => (params, true),
        None => (Fields::new(), false),
    }
}

fn generic(raw: &str) -> Option<Fields> {
    let mut fields = parse_params(raw);
    if fields.is_empty() {
        return None;
    }
    if let Some(name) = fields.get("name").map(FieldValue::to_string) {
        fields.insert("name", convert_link_name(&name));
    }
    Some(fields)
}
