use tracing::warn;

/// A track holds 10 boxes of 4 ticks each.
pub const TICKS_PER_BOX: i64 = 4;
pub const MAX_TICKS: i64 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Troublesome,
    Dangerous,
    Formidable,
    Extreme,
    Epic,
}

impl Rank {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "troublesome" => Some(Rank::Troublesome),
            "dangerous" => Some(Rank::Dangerous),
            "formidable" => Some(Rank::Formidable),
            "extreme" => Some(Rank::Extreme),
            "epic" => Some(Rank::Epic),
            _ => None,
        }
    }

    pub fn ticks_per_step(self) -> i64 {
        match self {
            Rank::Troublesome => 12,
            Rank::Dangerous => 8,
            Rank::Formidable => 4,
            Rank::Extreme => 2,
            Rank::Epic => 1,
        }
    }
}

/// Ticks gained by marking progress `steps` times on a track of `rank`.
/// Unknown ranks gain nothing.
pub fn ticks_for(rank: &str, steps: i64) -> i64 {
    match Rank::parse(rank) {
        Some(rank) => rank.ticks_per_step().saturating_mul(steps),
        None => {
            warn!(rank, "unknown progress rank, no ticks marked");
            0
        }
    }
}

/// New tick total after gaining `ticks`, capped at a full track.
pub fn advance(current: i64, ticks: i64) -> i64 {
    current.saturating_add(ticks).min(MAX_TICKS)
}

/// Split a tick total into full boxes and leftover ticks.
pub fn boxes(total_ticks: i64) -> (i64, i64) {
    (total_ticks / TICKS_PER_BOX, total_ticks % TICKS_PER_BOX)
}

/// Tick total as fractional boxes, e.g. 7 ticks is 1.75.
pub fn fract(total_ticks: i64) -> f64 {
    let (full, rest) = boxes(total_ticks);
    full as f64 + rest as f64 * 0.25
}
