use ivm::block::BlockKind;
use ivm::node::NodeKind;

use super::TemplateKey;

/// Built-in source for `key`, bundled from `renderer/templates/`.
pub(super) fn source(key: TemplateKey) -> &'static str {
    match key {
        TemplateKey::Node(kind) => node(kind),
        TemplateKey::Block(kind) => block(kind),
        TemplateKey::Mechanics => include_str!("../../templates/blocks/mechanics.html"),
        TemplateKey::FallbackBlock => include_str!("../../templates/blocks/block.html"),
        TemplateKey::FallbackNode => include_str!("../../templates/nodes/node.html"),
        TemplateKey::RollResult => include_str!("../../templates/nodes/roll_result.html"),
        TemplateKey::Link => include_str!("../../templates/link.html"),
    }
}

fn node(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Add => include_str!("../../templates/nodes/add.html"),
        NodeKind::Burn => include_str!("../../templates/nodes/burn.html"),
        NodeKind::Clock => include_str!("../../templates/nodes/clock.html"),
        NodeKind::Comment => include_str!("../../templates/nodes/ooc.html"),
        NodeKind::Impact => include_str!("../../templates/nodes/impact.html"),
        NodeKind::Initiative => include_str!("../../templates/nodes/initiative.html"),
        NodeKind::Meter => include_str!("../../templates/nodes/meter.html"),
        NodeKind::Move => include_str!("../../templates/nodes/move.html"),
        NodeKind::Oracle => include_str!("../../templates/nodes/oracle.html"),
        NodeKind::Position => include_str!("../../templates/nodes/position.html"),
        NodeKind::Progress => include_str!("../../templates/nodes/progress.html"),
        NodeKind::ProgressRoll => include_str!("../../templates/nodes/progress_roll.html"),
        NodeKind::Reroll => include_str!("../../templates/nodes/reroll.html"),
        NodeKind::Roll => include_str!("../../templates/nodes/roll.html"),
        NodeKind::Rolls => include_str!("../../templates/nodes/rolls.html"),
        NodeKind::Track => include_str!("../../templates/nodes/track.html"),
        NodeKind::Xp => include_str!("../../templates/nodes/xp.html"),
    }
}

fn block(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Actor => include_str!("../../templates/blocks/actor.html"),
        BlockKind::Move => include_str!("../../templates/blocks/move.html"),
        BlockKind::OracleGroup => include_str!("../../templates/blocks/oracle_group.html"),
        BlockKind::Oracle => include_str!("../../templates/blocks/oracle.html"),
        BlockKind::OraclePrompt => include_str!("../../templates/blocks/oracle_prompt.html"),
    }
}
