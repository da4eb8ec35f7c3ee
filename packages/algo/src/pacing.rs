//! Pacing Calculator
//!
//! Converts a corpus size and a daily pace into a unit count and the plan
//! horizon. One new unit is introduced per day, in unit-number order, so the
//! last review of the last unit defines how long the plan runs.

use serde::{Deserialize, Serialize};

use crate::sanitize::{sanitize_total_words, sanitize_words_per_day};
use crate::types::{ReviewOffsets, ValidationWarning};

/// Pacing of a plan
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pacing {
    pub units_count: u32,
    pub learning_days: u32,
    pub total_days: u32,
}

/// `ceil(total_items / items_per_day)`; a zero pace is treated as one.
pub fn units_for(total_items: u32, items_per_day: u32) -> u32 {
    total_items.div_ceil(items_per_day.max(1))
}

/// Last day on which any review of the last unit falls due
pub fn horizon(units_count: u32, offsets: &ReviewOffsets) -> u32 {
    units_count.saturating_add(offsets.max())
}

pub fn compute_pacing(total_items: u32, items_per_day: u32, offsets: &ReviewOffsets) -> Pacing {
    let units_count = units_for(total_items, items_per_day);
    Pacing {
        units_count,
        learning_days: units_count,
        total_days: horizon(units_count, offsets),
    }
}

/// Pacing from unchecked caller input.
///
/// Negative totals count as zero and a non-positive pace is clamped to one;
/// both corrections are returned as warnings so the caller can surface them.
pub fn compute_pacing_checked(
    total_items: i64,
    items_per_day: i64,
    offsets: &ReviewOffsets,
) -> (Pacing, Vec<ValidationWarning>) {
    let (total, total_warning) = sanitize_total_words(total_items);
    let (per_day, pace_warning) = sanitize_words_per_day(items_per_day);
    let warnings = total_warning.into_iter().chain(pace_warning).collect();
    (compute_pacing(total, per_day, offsets), warnings)
}
