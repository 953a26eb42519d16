use std::ops::Range;

use crate::Entry;
use crate::node::Fields;
use crate::outcome::Outcome;

/// Container kinds that open with `<kind> <params> {` and close with `}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Actor,
    Move,
    OracleGroup,
    Oracle,
    /// An oracle consulted with a free-text prompt: `- "prompt" {`.
    OraclePrompt,
}

impl BlockKind {
    pub const ALL: [BlockKind; 5] = [
        BlockKind::Actor,
        BlockKind::Move,
        BlockKind::OracleGroup,
        BlockKind::Oracle,
        BlockKind::OraclePrompt,
    ];

    pub fn from_keyword(word: &str) -> Option<Self> {
        BlockKind::ALL.into_iter().find(|k| k.keyword() == word)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            BlockKind::Actor => "actor",
            BlockKind::Move => "move",
            BlockKind::OracleGroup => "oracle-group",
            BlockKind::Oracle => "oracle",
            BlockKind::OraclePrompt => "-",
        }
    }

    /// Name used for `<name>_block` override keys and `blocks/<name>.html` lookups.
    pub fn template_name(self) -> &'static str {
        match self {
            BlockKind::Actor => "actor",
            BlockKind::Move => "move",
            BlockKind::OracleGroup => "oracle_group",
            BlockKind::Oracle => "oracle",
            BlockKind::OraclePrompt => "oracle_prompt",
        }
    }
}

/// A container entry and everything nested inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    /// Declared parameters, in source order.
    pub params: Fields,
    /// Parameter text between the keyword and the opening brace.
    pub raw: String,
    /// False when the parameters matched no form of this kind.
    pub matched: bool,
    pub children: Vec<Entry>,
    /// Set on move blocks once their children are complete.
    pub outcome: Option<Outcome>,
    /// True when the fence ended before this block was closed.
    pub force_closed: bool,
    pub span: Range<usize>,
}

impl Block {
    /// Nodes directly inside this block, skipping nested blocks.
    pub fn nodes(&self) -> impl Iterator<Item = &crate::node::Node> {
        self.children.iter().filter_map(|entry| match entry {
            Entry::Node(node) => Some(node),
            Entry::Block(_) => None,
        })
    }
}
