pub mod value;

use std::ops::Range;

pub use value::{FieldValue, Fields};

use crate::outcome::RollSnapshot;

/// Leaf annotation kinds recognized inside a mechanics fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Add,
    Burn,
    Clock,
    /// Out-of-character comment, written as `- "text"`.
    Comment,
    Impact,
    Initiative,
    Meter,
    Move,
    Oracle,
    Position,
    Progress,
    ProgressRoll,
    Reroll,
    Roll,
    Rolls,
    Track,
    Xp,
}

impl NodeKind {
    pub const ALL: [NodeKind; 17] = [
        NodeKind::Add,
        NodeKind::Burn,
        NodeKind::Clock,
        NodeKind::Comment,
        NodeKind::Impact,
        NodeKind::Initiative,
        NodeKind::Meter,
        NodeKind::Move,
        NodeKind::Oracle,
        NodeKind::Position,
        NodeKind::Progress,
        NodeKind::ProgressRoll,
        NodeKind::Reroll,
        NodeKind::Roll,
        NodeKind::Rolls,
        NodeKind::Track,
        NodeKind::Xp,
    ];

    /// Resolve the leading keyword of a node line.
    pub fn from_keyword(word: &str) -> Option<Self> {
        NodeKind::ALL.into_iter().find(|k| k.keyword() == word)
    }

    /// The keyword as written in journals.
    pub fn keyword(self) -> &'static str {
        match self {
            NodeKind::Add => "add",
            NodeKind::Burn => "burn",
            NodeKind::Clock => "clock",
            NodeKind::Comment => "-",
            NodeKind::Impact => "impact",
            NodeKind::Initiative => "initiative",
            NodeKind::Meter => "meter",
            NodeKind::Move => "move",
            NodeKind::Oracle => "oracle",
            NodeKind::Position => "position",
            NodeKind::Progress => "progress",
            NodeKind::ProgressRoll => "progress-roll",
            NodeKind::Reroll => "reroll",
            NodeKind::Roll => "roll",
            NodeKind::Rolls => "rolls",
            NodeKind::Track => "track",
            NodeKind::Xp => "xp",
        }
    }

    /// Name used for override keys and `nodes/<name>.html` lookups.
    pub fn template_name(self) -> &'static str {
        match self {
            NodeKind::Comment => "ooc",
            NodeKind::ProgressRoll => "progress_roll",
            other => other.keyword(),
        }
    }

    /// Kinds that feed the roll state of their enclosing block.
    pub fn is_roll_event(self) -> bool {
        matches!(
            self,
            NodeKind::Roll | NodeKind::ProgressRoll | NodeKind::Reroll | NodeKind::Burn
        )
    }
}

/// A single parsed mechanics line.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Fields the kind's grammar knows about, plus derived values.
    pub fields: Fields,
    /// Generic parameters the grammar does not know about.
    pub extra: Fields,
    /// Argument text after the keyword, as written.
    pub raw: String,
    /// False when the keyword was recognized but its arguments were not.
    /// Such nodes render through the generic fallback template.
    pub matched: bool,
    /// Roll state right after this node, for roll events.
    pub roll: Option<RollSnapshot>,
    /// Byte span in the fence source.
    pub span: Range<usize>,
}

impl Node {
    pub fn new(kind: NodeKind, fields: Fields, raw: impl Into<String>) -> Self {
        Node {
            kind,
            fields,
            extra: Fields::new(),
            raw: raw.into(),
            matched: true,
            roll: None,
            span: 0..0,
        }
    }

    pub fn unmatched(kind: NodeKind, raw: impl Into<String>) -> Self {
        Node {
            matched: false,
            ..Node::new(kind, Fields::new(), raw)
        }
    }

    pub fn with_extra(mut self, extra: Fields) -> Self {
        self.extra = extra;
        self
    }
}
