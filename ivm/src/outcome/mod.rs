pub mod progress;

use serde::Serialize;

use crate::Entry;
use crate::node::{Fields, Node, NodeKind};

/// Result of comparing a score against the two challenge dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HitMiss {
    Strong,
    Weak,
    Miss,
}

impl HitMiss {
    pub fn compare(score: i64, vs1: i64, vs2: i64) -> Self {
        match (score > vs1, score > vs2) {
            (true, true) => HitMiss::Strong,
            (true, false) | (false, true) => HitMiss::Weak,
            (false, false) => HitMiss::Miss,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HitMiss::Strong => "strong",
            HitMiss::Weak => "weak",
            HitMiss::Miss => "miss",
        }
    }
}

/// The roll values that decided a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RollSnapshot {
    pub score: i64,
    pub vs1: i64,
    pub vs2: i64,
    pub hitmiss: HitMiss,
    #[serde(rename = "match")]
    pub is_match: bool,
    /// True when the score came from a progress track rather than an action die.
    pub progress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RollMode {
    Action,
    Progress,
}

/// Running roll state of one block.
///
/// Each roll, progress-roll, reroll or burn node is folded in with
/// [`RollState::step`]. The same fold drives both the per-node snapshots
/// taken while parsing and [`Outcome::compute`].
#[derive(Debug, Clone, Default)]
pub struct RollState {
    mode: Option<RollMode>,
    action: i64,
    /// Everything added to the action die: stat plus adds, or whatever an
    /// explicit total implies.
    modifier: i64,
    score: i64,
    vs1: i64,
    vs2: i64,
    burned: bool,
    rerolled: bool,
}

/// What a single step changed, for annotating the node that caused it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Step {
    /// Previous value of a rerolled die.
    pub old_value: Option<i64>,
    /// Score before a burn replaced it.
    pub old_score: Option<i64>,
}

impl RollState {
    pub fn new() -> Self {
        RollState::default()
    }

    /// Fold one node into the state. Non-roll nodes and roll nodes without
    /// usable numbers leave it untouched.
    pub fn step(&mut self, kind: NodeKind, fields: &Fields) -> Step {
        match kind {
            NodeKind::Roll => {
                self.roll(fields);
                Step::default()
            }
            NodeKind::ProgressRoll => {
                self.progress_roll(fields);
                Step::default()
            }
            NodeKind::Reroll => self.reroll(fields),
            NodeKind::Burn => self.burn(fields),
            _ => Step::default(),
        }
    }

    fn roll(&mut self, fields: &Fields) {
        let (Some(score), Some(vs1), Some(vs2)) = (
            fields.get_int("score"),
            fields.get_int("vs1"),
            fields.get_int("vs2"),
        ) else {
            return;
        };
        let action = fields.get_int("action").unwrap_or(0);
        self.mode = Some(RollMode::Action);
        self.action = action;
        self.modifier = match (fields.get_int("stat"), fields.get_int("adds")) {
            (Some(stat), adds) if !fields.contains_key("total") => {
                stat.saturating_add(adds.unwrap_or(0))
            }
            _ => score.saturating_sub(action),
        };
        self.score = score;
        self.vs1 = vs1;
        self.vs2 = vs2;
        self.burned = false;
    }

    fn progress_roll(&mut self, fields: &Fields) {
        let (Some(score), Some(vs1), Some(vs2)) = (
            fields.get_int("score"),
            fields.get_int("vs1"),
            fields.get_int("vs2"),
        ) else {
            return;
        };
        self.mode = Some(RollMode::Progress);
        self.action = 0;
        self.modifier = 0;
        self.score = score;
        self.vs1 = vs1;
        self.vs2 = vs2;
        self.burned = false;
    }

    fn reroll(&mut self, fields: &Fields) -> Step {
        let (Some(die), Some(value)) = (fields.get_str("die"), fields.get_int("value")) else {
            return Step::default();
        };
        let old = match die {
            // The progress score has no die to reroll.
            "action" if self.mode == Some(RollMode::Progress) => return Step::default(),
            "action" => {
                let old = self.action;
                self.action = value;
                self.score = self.action.saturating_add(self.modifier).min(10);
                old
            }
            "vs1" => std::mem::replace(&mut self.vs1, value),
            "vs2" => std::mem::replace(&mut self.vs2, value),
            _ => return Step::default(),
        };
        self.rerolled = true;
        Step {
            old_value: Some(old),
            old_score: None,
        }
    }

    fn burn(&mut self, fields: &Fields) -> Step {
        if self.mode != Some(RollMode::Action) {
            return Step::default();
        }
        let Some(new_score) = fields.get_int("score") else {
            return Step::default();
        };
        let old = std::mem::replace(&mut self.score, new_score);
        self.burned = true;
        Step {
            old_value: None,
            old_score: Some(old),
        }
    }

    /// The current result, if a roll has happened.
    pub fn snapshot(&self) -> Option<RollSnapshot> {
        let mode = self.mode?;
        Some(RollSnapshot {
            score: self.score,
            vs1: self.vs1,
            vs2: self.vs2,
            hitmiss: HitMiss::compare(self.score, self.vs1, self.vs2),
            is_match: self.vs1 == self.vs2,
            progress: mode == RollMode::Progress,
        })
    }

    pub fn burned(&self) -> bool {
        self.burned
    }

    pub fn rerolled(&self) -> bool {
        self.rerolled
    }

    /// Fold a node in and record the result on it.
    pub fn annotate(&mut self, node: &mut Node) {
        if !node.kind.is_roll_event() || !node.matched {
            return;
        }
        let step = self.step(node.kind, &node.fields);
        if let Some(old) = step.old_value {
            node.fields.insert("old_value", old);
        }
        if let Some(old) = step.old_score {
            node.fields.insert("old_score", old);
        }
        node.roll = self.snapshot();
    }
}

/// Derived result of a move block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// `None` when no roll happened.
    pub hitmiss: Option<HitMiss>,
    #[serde(rename = "match")]
    pub is_match: bool,
    pub burned: bool,
    pub rerolled: bool,
    pub roll: Option<RollSnapshot>,
}

impl Outcome {
    pub fn undetermined() -> Self {
        Outcome {
            hitmiss: None,
            is_match: false,
            burned: false,
            rerolled: false,
            roll: None,
        }
    }

    /// Fold the roll events among `entries`, in order. Nested blocks are
    /// not looked into.
    pub fn compute<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Self {
        let mut state = RollState::new();
        for entry in entries {
            if let Entry::Node(node) = entry {
                if node.matched {
                    state.step(node.kind, &node.fields);
                }
            }
        }
        Outcome::from_state(&state)
    }

    pub fn from_state(state: &RollState) -> Self {
        match state.snapshot() {
            Some(snapshot) => Outcome {
                hitmiss: Some(snapshot.hitmiss),
                is_match: snapshot.is_match,
                burned: state.burned(),
                rerolled: state.rerolled(),
                roll: Some(snapshot),
            },
            None => Outcome::undetermined(),
        }
    }

    pub fn is_determined(&self) -> bool {
        self.hitmiss.is_some()
    }

    /// CSS classes for the enclosing move block. Empty when undetermined.
    pub fn css_classes(&self) -> Vec<String> {
        let Some(hitmiss) = self.hitmiss else {
            return Vec::new();
        };
        let mut classes = vec![format!("ivm-move-result-{}", hitmiss.as_str())];
        if self.is_match {
            classes.push("ivm-move-result-match".to_string());
        }
        if self.burned {
            classes.push("ivm-move-result-burned".to_string());
        }
        if self.rerolled {
            classes.push("ivm-move-result-rerolled".to_string());
        }
        classes
    }
}
