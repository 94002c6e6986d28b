use std::collections::VecDeque;

use crate::model::SessionRecord;

/// Sessions averaged for a full mastery reading.
pub const MASTERY_WINDOW: usize = 5;

/// Level at which a pair counts as mastered.
pub const MASTERY_THRESHOLD: f64 = 80.0;

/// Cap on the partial-credit ramp before the window fills.
pub const RAMP_CAP: f64 = 50.0;

/// Mean accuracy of the newest `MASTERY_WINDOW` records, or `None` if empty.
pub(crate) fn recent_average(history: &VecDeque<SessionRecord>) -> Option<f64> {
    let take = history.len().min(MASTERY_WINDOW);
    if take == 0 {
        return None;
    }
    let sum: f64 = history.iter().rev().take(take).map(|r| r.accuracy).sum();
    #[allow(clippy::cast_precision_loss)]
    let n = take as f64;
    Some(sum / n)
}

/// 0–100 mastery for one pair's history.
///
/// With fewer than `MASTERY_WINDOW` sessions the level ramps 10 points per
/// session, capped at `RAMP_CAP`.
pub(crate) fn level_for(history: &VecDeque<SessionRecord>) -> f64 {
    if history.len() < MASTERY_WINDOW {
        #[allow(clippy::cast_precision_loss)]
        let ramp = history.len() as f64 * 10.0;
        return ramp.min(RAMP_CAP);
    }
    recent_average(history).unwrap_or(0.0).clamp(0.0, 100.0)
}
