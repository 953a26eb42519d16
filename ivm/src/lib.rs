pub mod block;
pub mod frontmatter;
pub mod grammar;
pub mod journal;
pub mod link;
pub mod node;
pub mod outcome;
pub mod parser;

use std::ops::Range;

use crate::block::Block;
use crate::node::Node;

/// The parsed content of one `iron-vault-mechanics` fence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MechanicsDocument {
    /// Top-level entries in source order.
    pub entries: Vec<Entry>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

/// One element of a fence: a container block or a leaf node.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Block(Block),
    Node(Node),
}

impl Entry {
    pub fn span(&self) -> Range<usize> {
        match self {
            Entry::Block(block) => block.span.clone(),
            Entry::Node(node) => node.span.clone(),
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Entry::Block(block) => Some(block),
            Entry::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Entry::Node(node) => Some(node),
            Entry::Block(_) => None,
        }
    }
}

impl MechanicsDocument {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
