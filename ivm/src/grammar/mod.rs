pub mod blocks;
pub mod nodes;
pub mod params;
pub mod text;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::block::BlockKind;
use crate::node::{Fields, Node, NodeKind};

pub use text::convert_link_name;

static BLOCK_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<kind>actor|move|oracle-group|oracle|-)(?:\s+(?P<params>.*?))?\s*\{$").unwrap()
});
static BLOCK_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\}\s*(?P<label>[\w-]+)?$").unwrap());
static NODE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<keyword>[\w-]+)(?:\s+(?P<args>.*))?$").unwrap());
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^- "(?P<text>.*)"$"#).unwrap());
static COMMENT_START: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^- "(?P<text>.*)$"#).unwrap());

/// What a single trimmed fence line is.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Open {
        kind: BlockKind,
        params: Fields,
        raw: String,
        matched: bool,
    },
    Close {
        label: Option<String>,
    },
    Node(Node),
    /// First line of a comment whose closing quote is on a later line.
    CommentStart(String),
}

/// Classify one line as a node. Returns `None` for anything that is not a
/// recognized node kind, including block openers and closers.
pub fn classify(line: &str) -> Option<Node> {
    match classify_line(line)? {
        Line::Node(node) => Some(node),
        _ => None,
    }
}

/// Classify one fence line in full: a block opener, a block closer, a node,
/// or the start of a multi-line comment. Node kinds try their dedicated
/// patterns before the generic `key=value` clause.
pub fn classify_line(line: &str) -> Option<Line> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(caps) = BLOCK_OPEN.captures(line) {
        let kind = caps
            .name("kind")
            .and_then(|m| BlockKind::from_keyword(m.as_str()))?;
        let raw = caps.name("params").map_or("", |m| m.as_str());
        let (params, matched) = blocks::match_block(kind, raw);
        return Some(Line::Open {
            kind,
            params,
            raw: raw.to_string(),
            matched,
        });
    }

    if let Some(caps) = BLOCK_CLOSE.captures(line) {
        return Some(Line::Close {
            label: caps.name("label").map(|m| m.as_str().to_string()),
        });
    }

    if let Some(caps) = COMMENT.captures(line) {
        let text = caps.name("text").map_or("", |m| m.as_str());
        if !text.ends_with('\\') {
            return Some(Line::Node(nodes::comment_node(text)));
        }
    }
    if let Some(caps) = COMMENT_START.captures(line) {
        return Some(Line::CommentStart(
            caps.name("text").map_or("", |m| m.as_str()).to_string(),
        ));
    }

    let caps = NODE_LINE.captures(line)?;
    let kind = caps
        .name("keyword")
        .and_then(|m| NodeKind::from_keyword(m.as_str()))?;
    if kind == NodeKind::Comment {
        return None;
    }
    let args = caps.name("args").map_or("", |m| m.as_str().trim());
    Some(Line::Node(nodes::match_node(kind, args)))
}

/// True when `line` ends a multi-line comment, i.e. it ends in an
/// unescaped quote.
pub fn ends_comment(line: &str) -> bool {
    let line = line.trim_end();
    line.ends_with('"') && !line.ends_with("\\\"")
}
