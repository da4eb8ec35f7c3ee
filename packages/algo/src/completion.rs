//! Completion Resolver
//!
//! Decides, for every schedule cell, whether that step has been completed.
//! The resolver is a pure function of the matrix and a snapshot of the
//! persisted unit records: it performs no writes and keeps nothing between
//! calls.
//!
//! Out-of-order inference: with [`InferencePolicy::HigherRoundImpliesLower`]
//! a unit that has any review record of round `> k` counts round `k` as
//! completed even when round `k`'s own flag was never set.

use std::collections::HashMap;

use crate::matrix::ScheduleMatrix;
use crate::types::{
    CellKind, CellStyle, DataQualityIssue, InferencePolicy, LearningUnit, ResolvedCell,
    ResolvedRow, ReviewOffsets, ScheduleCell,
};

#[derive(Clone, Copy, Debug, Default)]
struct RoundRecord {
    exists: bool,
    completed: bool,
}

#[derive(Debug)]
struct IndexedUnit {
    is_learned: bool,
    /// Indexed by `round - 1`
    rounds: Vec<RoundRecord>,
    highest_round: u32,
}

impl IndexedUnit {
    fn round_completed(&self, round: u32, policy: InferencePolicy) -> bool {
        let Some(record) = round
            .checked_sub(1)
            .and_then(|index| self.rounds.get(index as usize))
        else {
            return false;
        };

        if record.exists && record.completed {
            return true;
        }

        match policy {
            InferencePolicy::HigherRoundImpliesLower => self.highest_round > round,
            InferencePolicy::Strict => false,
        }
    }
}

/// Typed `unit_number → unit` lookup, built once per resolve call.
///
/// Records that cannot be placed in the grid (unit number 0, review orders
/// outside the offset sequence, duplicates) are skipped and reported through
/// [`UnitIndex::issues`].
#[derive(Debug)]
pub struct UnitIndex {
    units: HashMap<u32, IndexedUnit>,
    issues: Vec<DataQualityIssue>,
}

impl UnitIndex {
    pub fn build(units: &[LearningUnit], offsets: &ReviewOffsets) -> Self {
        let mut index = HashMap::with_capacity(units.len());
        let mut issues = Vec::new();

        for unit in units {
            if unit.unit_number == 0 {
                issues.push(DataQualityIssue::UnitNumberOutOfRange {
                    unit_number: unit.unit_number,
                });
                continue;
            }
            if index.contains_key(&unit.unit_number) {
                issues.push(DataQualityIssue::DuplicateUnitNumber {
                    unit_number: unit.unit_number,
                });
                continue;
            }

            let mut rounds = vec![RoundRecord::default(); offsets.len()];
            let mut highest_round = 0;

            for review in &unit.reviews {
                let order = review.review_order;
                if !offsets.is_valid_round(order) {
                    issues.push(DataQualityIssue::ReviewOrderOutOfRange {
                        unit_number: unit.unit_number,
                        review_order: order,
                    });
                    continue;
                }

                let record = &mut rounds[order as usize - 1];
                if record.exists {
                    issues.push(DataQualityIssue::DuplicateReviewOrder {
                        unit_number: unit.unit_number,
                        review_order: order,
                    });
                }
                record.exists = true;
                record.completed |= review.is_completed;
                highest_round = highest_round.max(order);
            }

            index.insert(
                unit.unit_number,
                IndexedUnit {
                    is_learned: unit.is_learned,
                    rounds,
                    highest_round,
                },
            );
        }

        Self {
            units: index,
            issues,
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn issues(&self) -> &[DataQualityIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<DataQualityIssue> {
        self.issues
    }

    pub fn is_learned(&self, unit_number: u32) -> bool {
        self.units
            .get(&unit_number)
            .map(|unit| unit.is_learned)
            .unwrap_or(false)
    }

    pub fn is_round_completed(&self, unit_number: u32, round: u32, policy: InferencePolicy) -> bool {
        self.units
            .get(&unit_number)
            .map(|unit| unit.round_completed(round, policy))
            .unwrap_or(false)
    }
}

/// Resolve one round of a single unit without building a full index.
pub fn is_round_completed(
    unit: &LearningUnit,
    round: u32,
    offsets: &ReviewOffsets,
    policy: InferencePolicy,
) -> bool {
    UnitIndex::build(std::slice::from_ref(unit), offsets).is_round_completed(
        unit.unit_number,
        round,
        policy,
    )
}

pub fn resolve_cell(cell: &ScheduleCell, index: &UnitIndex, policy: InferencePolicy) -> ResolvedCell {
    let kind = cell.kind();
    let completed = match cell.round() {
        None => index.is_learned(cell.unit_number),
        Some(round) => index.is_round_completed(cell.unit_number, round, policy),
    };

    let style = match (kind, completed) {
        (CellKind::New, true) => CellStyle::Learned,
        (CellKind::New, false) => CellStyle::NotStarted,
        (CellKind::Review, true) => CellStyle::Reviewed,
        (CellKind::Review, false) => CellStyle::PendingReview,
    };

    ResolvedCell {
        day: cell.day,
        unit_number: cell.unit_number,
        column: cell.column,
        kind,
        interval: cell.interval,
        completed,
        unused: false,
        interactive: true,
        style,
    }
}

pub fn resolve_matrix(
    matrix: &ScheduleMatrix,
    index: &UnitIndex,
    policy: InferencePolicy,
) -> Vec<ResolvedRow> {
    matrix
        .rows()
        .iter()
        .map(|row| ResolvedRow {
            day: row.day,
            cells: row
                .cells
                .iter()
                .map(|cell| resolve_cell(cell, index, policy))
                .collect(),
        })
        .collect()
}
