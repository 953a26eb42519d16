use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::grammar::params::{parse_params, partition};
use crate::grammar::text::{convert_link_name, initiative_slug, position_slug};
use crate::node::{FieldValue, Fields, Node, NodeKind};
use crate::outcome::progress;

// ---------------------------------------------------------------------------
// Grammar table
// ---------------------------------------------------------------------------

/// How one node kind recognizes its arguments.
///
/// The dedicated pattern is tried first. Only when it fails is the generic
/// `key=value` clause consulted, restricted to kinds that accept one.
struct NodeRule {
    kind: NodeKind,
    dedicated: Option<&'static Lazy<Regex>>,
    /// Keys kept in `fields`; other generic keys go to `extra`.
    generic: Option<&'static [&'static str]>,
    /// Fill in defaults and derived values.
    finish: fn(&mut Fields),
}

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: Lazy<Regex> = Lazy::new(|| Regex::new($re).unwrap());
    };
}

pattern!(ADD, r#"^(?P<add>\d+)(?: "(?P<reason>.+)")?$"#);
pattern!(FROM_TO, r"^from=(?P<from>\d+) to=(?P<to>\d+)$");
pattern!(IMPACT, r#"^"(?P<impact>[^"]+)" (?P<marked>true|false)$"#);
pattern!(FROM_TO_QUOTED, r#"^from="(?P<from>.+)" to="(?P<to>.+)"$"#);
pattern!(METER, r#"^"(?P<name>[^"]+)" from=(?P<from>\d+) to=(?P<to>\d+)$"#);
pattern!(MOVE, r#"^"\[(?P<name>[^\]]+)\]\((?P<link>[^)]+)\)"$"#);
pattern!(
    ORACLE,
    r#"^name="(?:\[(?P<linked>[^\]]+)\]\(datasworn:[^)]+\)|(?P<name>[^"]+))" result="(?P<result>[^"]+)" roll=(?P<roll>\d+)$"#
);
pattern!(
    PROGRESS,
    r#"^from=(?P<from>\d+) name="(?P<name>[^"]*)" rank="(?P<rank>\w+)" steps=(?P<steps>\d+)$"#
);
pattern!(REROLL, r#"^(?P<die>action|vs1|vs2)="?(?P<value>\d+)"?$"#);
pattern!(
    ROLL,
    r#"^"(?P<stat_name>[^"]+)" action=(?P<action>\d+) adds=(?P<adds>\d+) stat=(?P<stat>\d+) vs1=(?P<vs1>\d+) vs2=(?P<vs2>\d+)$"#
);
pattern!(ROLLS, r#"^(?P<values>\d+(?: \d+)*) dice="(?P<dice>\d*d\d+)"$"#);

static RULES: &[NodeRule] = &[
    NodeRule {
        kind: NodeKind::Add,
        dedicated: Some(&ADD),
        generic: Some(&["add", "reason"]),
        finish: |_| {},
    },
    NodeRule {
        kind: NodeKind::Burn,
        dedicated: Some(&FROM_TO),
        generic: Some(&["from", "to", "newtotal"]),
        finish: finish_burn,
    },
    NodeRule {
        kind: NodeKind::Clock,
        dedicated: None,
        generic: Some(&["name", "from", "to", "out-of", "segments", "status"]),
        finish: finish_clock,
    },
    NodeRule {
        kind: NodeKind::Impact,
        dedicated: Some(&IMPACT),
        generic: Some(&["impact", "marked"]),
        finish: finish_impact,
    },
    NodeRule {
        kind: NodeKind::Initiative,
        dedicated: Some(&FROM_TO_QUOTED),
        generic: Some(&["from", "to"]),
        finish: finish_initiative,
    },
    NodeRule {
        kind: NodeKind::Meter,
        dedicated: Some(&METER),
        generic: Some(&["name", "from", "to"]),
        finish: finish_meter,
    },
    NodeRule {
        kind: NodeKind::Move,
        dedicated: Some(&MOVE),
        generic: None,
        finish: finish_move,
    },
    NodeRule {
        kind: NodeKind::Oracle,
        dedicated: Some(&ORACLE),
        generic: Some(&["name", "result", "roll", "cursed", "replaced"]),
        finish: finish_oracle,
    },
    NodeRule {
        kind: NodeKind::Position,
        dedicated: Some(&FROM_TO_QUOTED),
        generic: Some(&["from", "to"]),
        finish: finish_position,
    },
    NodeRule {
        kind: NodeKind::Progress,
        dedicated: Some(&PROGRESS),
        generic: Some(&["from", "name", "rank", "steps", "track", "delta"]),
        finish: finish_progress,
    },
    NodeRule {
        kind: NodeKind::ProgressRoll,
        dedicated: None,
        generic: Some(&["name", "score", "vs1", "vs2"]),
        finish: finish_progress_roll,
    },
    NodeRule {
        kind: NodeKind::Reroll,
        dedicated: Some(&REROLL),
        generic: None,
        finish: |_| {},
    },
    NodeRule {
        kind: NodeKind::Roll,
        dedicated: Some(&ROLL),
        generic: Some(&["stat_name", "action", "stat", "adds", "vs1", "vs2", "total"]),
        finish: finish_roll,
    },
    NodeRule {
        kind: NodeKind::Rolls,
        dedicated: Some(&ROLLS),
        generic: None,
        finish: finish_rolls,
    },
    NodeRule {
        kind: NodeKind::Track,
        dedicated: None,
        generic: Some(&["name", "status"]),
        finish: finish_track,
    },
    NodeRule {
        kind: NodeKind::Xp,
        dedicated: Some(&FROM_TO),
        generic: Some(&["from", "to"]),
        finish: finish_diff,
    },
];

/// Match the arguments of a node line whose keyword is already known.
///
/// Returns an unmatched node (rendered as opaque text) when no form of the
/// kind accepts `args`.
pub fn match_node(kind: NodeKind, args: &str) -> Node {
    let Some(rule) = RULES.iter().find(|r| r.kind == kind) else {
        return Node::unmatched(kind, args);
    };

    if let Some(caps) = rule.dedicated.and_then(|re| re.captures(args)) {
        let mut fields = captures_to_fields(rule.dedicated_names(), &caps);
        (rule.finish)(&mut fields);
        return Node::new(kind, fields, args);
    }

    if let Some(known) = rule.generic {
        let all = parse_params(args);
        if !all.is_empty() {
            let (mut fields, extra) = partition(all, known);
            (rule.finish)(&mut fields);
            return Node::new(kind, fields, args).with_extra(extra);
        }
    }

    Node::unmatched(kind, args)
}

impl NodeRule {
    fn dedicated_names(&self) -> Vec<&'static str> {
        self.dedicated
            .map(|re| re.capture_names().flatten().collect())
            .unwrap_or_default()
    }
}

fn captures_to_fields(names: Vec<&'static str>, caps: &Captures<'_>) -> Fields {
    let mut fields = Fields::new();
    for name in names {
        if let Some(m) = caps.name(name) {
            fields.insert(name, FieldValue::from_raw(m.as_str()));
        }
    }
    fields
}

/// Comment text with escaped quotes resolved. Multi-line comments keep
/// their lines separately for templates.
pub fn comment_node(text: &str) -> Node {
    let text = text.replace("\\\"", "\"");
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    let fields = Fields::new()
        .with("comment", text.clone())
        .with("lines", lines);
    Node::new(NodeKind::Comment, fields, text)
}

// ---------------------------------------------------------------------------
// Derived fields
// ---------------------------------------------------------------------------

fn link_name(fields: &mut Fields, key: &str, default: &str) {
    let name = fields
        .get(key)
        .map(|v| convert_link_name(&v.to_string()))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string());
    fields.insert(key, name);
}

fn finish_burn(fields: &mut Fields) {
    if let Some(score) = fields.get_int("newtotal").or_else(|| fields.get_int("from")) {
        fields.insert("score", score);
    }
}

fn finish_clock(fields: &mut Fields) {
    if let Some(segments) = fields.remove("out-of") {
        fields.insert("segments", segments);
    }
    link_name(fields, "name", "unknown");
}

fn finish_impact(fields: &mut Fields) {
    if let Some(marked) = fields.get_bool("marked") {
        fields.insert("marked", marked);
    }
}

fn slugs(fields: &mut Fields, slug: fn(&str) -> &'static str) {
    for (key, slug_key) in [("from", "from_slug"), ("to", "to_slug")] {
        if let Some(state) = fields.get(key).map(|v| v.to_string()) {
            fields.insert(slug_key, slug(&state));
        }
    }
}

fn finish_initiative(fields: &mut Fields) {
    slugs(fields, initiative_slug);
}

fn finish_position(fields: &mut Fields) {
    slugs(fields, position_slug);
}

fn finish_diff(fields: &mut Fields) {
    if let (Some(from), Some(to)) = (fields.get_int("from"), fields.get_int("to")) {
        fields.insert("diff", to.saturating_sub(from));
    }
}

fn finish_meter(fields: &mut Fields) {
    link_name(fields, "name", "unknown");
    finish_diff(fields);
    if let Some(diff) = fields.get_int("diff") {
        let direction = if diff < 0 { "decrease" } else { "increase" };
        fields.insert("direction", direction);
    }
}

fn finish_move(fields: &mut Fields) {
    link_name(fields, "name", "unknown");
}

fn finish_oracle(fields: &mut Fields) {
    if let Some(linked) = fields.remove("linked") {
        fields.insert("name", linked);
    }
    link_name(fields, "name", "unknown");
    if !fields.contains_key("result") {
        fields.insert("result", "unknown");
    }
}

fn finish_progress(fields: &mut Fields) {
    if let Some(track) = fields.remove("track") {
        if !fields.contains_key("name") {
            fields.insert("name", track);
        }
    }
    link_name(fields, "name", "unknown");

    let from = fields.get_int("from").unwrap_or(0);
    let ticks = match fields.get("rank").map(|v| v.to_string()) {
        Some(rank) => progress::ticks_for(&rank, fields.get_int("steps").unwrap_or(1)),
        None => fields.get_int("delta").unwrap_or(0),
    };
    let to = progress::advance(from, ticks);
    let (from_boxes, from_rest) = progress::boxes(from);
    let (to_boxes, to_rest) = progress::boxes(to);

    fields.insert("ticks", ticks);
    fields.insert("from_ticks", from);
    fields.insert("to_ticks", to);
    fields.insert("from_boxes", from_boxes);
    fields.insert("from_remaining", from_rest);
    fields.insert("to_boxes", to_boxes);
    fields.insert("to_remaining", to_rest);
    fields.insert("from_fract", progress::fract(from));
    fields.insert("to_fract", progress::fract(to));
}

fn finish_progress_roll(fields: &mut Fields) {
    link_name(fields, "name", "undefined");
}

fn finish_roll(fields: &mut Fields) {
    // `action="Face Danger" stat=iron` names the move and stat instead of
    // giving numbers.
    if let Some(FieldValue::Text(label)) = fields.get("action").cloned() {
        if fields.get_int("action").is_none() {
            fields.remove("action");
            fields.insert("move", label);
        }
    }
    if let Some(FieldValue::Text(stat)) = fields.get("stat").cloned() {
        if fields.get_int("stat").is_none() {
            fields.remove("stat");
            fields.insert("stat_name", stat);
        }
    }

    let score = fields.get_int("total").or_else(|| {
        let action = fields.get_int("action")?;
        let stat = fields.get_int("stat")?;
        let adds = fields.get_int("adds").unwrap_or(0);
        Some(action.saturating_add(stat).saturating_add(adds).min(10))
    });
    if let Some(score) = score {
        fields.insert("score", score);
    }
}

fn finish_rolls(fields: &mut Fields) {
    let values: Vec<i64> = fields
        .get("values")
        .map(|v| v.to_string())
        .unwrap_or_default()
        .split_whitespace()
        .filter_map(|n| n.parse().ok())
        .collect();
    fields.insert("values", values);
}

fn finish_track(fields: &mut Fields) {
    link_name(fields, "name", "unknown");
}
