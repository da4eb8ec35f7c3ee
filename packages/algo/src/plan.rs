//! Schedule Pipeline
//!
//! End-to-end composition of the four scheduler stages:
//! pacing → matrix → completion → capacity. Every call recomputes from its
//! input; callers may memoize on the input but nothing here depends on it.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::capacity::{derive_capacity, reconcile};
use crate::completion::{resolve_matrix, UnitIndex};
use crate::matrix::build_schedule_matrix;
use crate::pacing::compute_pacing;
use crate::sanitize::{
    sanitize_display_days, sanitize_review_offsets, sanitize_total_words, sanitize_words_per_day,
};
use crate::types::{
    CapacitySignals, CellKind, DataQualityIssue, InferencePolicy, LearningUnit, PlanCapacity,
    ResolvedCell, ResolvedRow, ReviewOffsets, ValidationWarning,
};

/// Scheduler input as handed over by the surrounding application
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInput {
    pub total_words: i64,
    pub words_per_day: i64,
    /// `None` selects the default Ebbinghaus offsets
    #[serde(default)]
    pub review_offsets: Option<Vec<i64>>,
    #[serde(default, flatten)]
    pub capacity: CapacitySignals,
    #[serde(default)]
    pub minimum_display_days: Option<u32>,
    #[serde(default)]
    pub learning_units: Vec<LearningUnit>,
}

/// Rendering-ready schedule with per-cell completion state
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePlan {
    pub rows: Vec<ResolvedRow>,
    pub total_days: u32,
    pub units_count: u32,
    pub display_days: u32,
    pub column_count: usize,
    pub review_offsets: ReviewOffsets,
    pub capacity: PlanCapacity,
    pub inference_policy: InferencePolicy,
    pub warnings: Vec<ValidationWarning>,
    pub data_quality: Vec<DataQualityIssue>,
}

/// Why a cell selection did not translate into a store mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IgnoreReason {
    NoSuchCell,
    Unused,
    OutOfRange,
    AlreadyCompleted,
}

/// Click target of a schedule cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CellActivation {
    MarkLearned { unit_number: u32 },
    CompleteReview { unit_number: u32, review_order: u32 },
    Ignored { reason: IgnoreReason },
}

/// Aggregate progress over the interactive part of a plan
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanProgress {
    pub actual_units: u32,
    pub learned_units: u32,
    pub total_reviews: u32,
    pub completed_reviews: u32,
    pub completion_ratio: f64,
    pub first_pending_day: Option<u32>,
}

impl SchedulePlan {
    pub fn cell_at(&self, day: u32, column: usize) -> Option<&ResolvedCell> {
        let index = self.rows.binary_search_by_key(&day, |row| row.day).ok()?;
        self.rows[index].cells.iter().find(|cell| cell.column == column)
    }

    pub fn cells(&self) -> impl Iterator<Item = &ResolvedCell> + '_ {
        self.rows.iter().flat_map(|row| row.cells.iter())
    }

    /// Map a cell selection to the store mutation it stands for.
    ///
    /// Unused cells, cells outside the structure and already-completed cells
    /// are client-side no-ops.
    pub fn activate(&self, day: u32, column: usize) -> CellActivation {
        let Some(cell) = self.cell_at(day, column) else {
            return CellActivation::Ignored {
                reason: IgnoreReason::NoSuchCell,
            };
        };

        if cell.unused || self.capacity.is_unused(cell.unit_number) {
            return CellActivation::Ignored {
                reason: IgnoreReason::Unused,
            };
        }
        if !self.capacity.can_activate(cell.unit_number) {
            return CellActivation::Ignored {
                reason: IgnoreReason::OutOfRange,
            };
        }
        if cell.completed {
            return CellActivation::Ignored {
                reason: IgnoreReason::AlreadyCompleted,
            };
        }

        match cell.round() {
            None => CellActivation::MarkLearned {
                unit_number: cell.unit_number,
            },
            Some(review_order) => CellActivation::CompleteReview {
                unit_number: cell.unit_number,
                review_order,
            },
        }
    }
}

/// Run the full pipeline on one input.
pub fn build_schedule(input: &ScheduleInput, policy: InferencePolicy) -> SchedulePlan {
    let mut warnings = Vec::new();

    let (total_words, warning) = sanitize_total_words(input.total_words);
    warnings.extend(warning);
    let (words_per_day, warning) = sanitize_words_per_day(input.words_per_day);
    warnings.extend(warning);
    let review_offsets = match input.review_offsets.as_deref() {
        Some(raw) => {
            let (offsets, warning) = sanitize_review_offsets(raw);
            warnings.extend(warning);
            offsets
        }
        None => ReviewOffsets::default(),
    };

    let (minimum_display_days, warning) = sanitize_display_days(input.minimum_display_days);
    warnings.extend(warning);

    let pacing = compute_pacing(total_words, words_per_day, &review_offsets);
    let (capacity, capacity_warnings) = derive_capacity(pacing.units_count, &input.capacity);
    warnings.extend(capacity_warnings);

    let matrix = build_schedule_matrix(
        capacity.units_count_for_structure,
        &review_offsets,
        minimum_display_days,
    );
    let index = UnitIndex::build(&input.learning_units, &review_offsets);
    let mut rows = resolve_matrix(&matrix, &index, policy);
    reconcile(&mut rows, &capacity);

    SchedulePlan {
        rows,
        total_days: pacing.total_days,
        units_count: pacing.units_count,
        display_days: matrix.display_days(),
        column_count: matrix.column_count(),
        review_offsets,
        capacity,
        inference_policy: policy,
        warnings,
        data_quality: index.into_issues(),
    }
}

/// Build many schedules in parallel; output order matches input order.
pub fn build_schedules(inputs: &[ScheduleInput], policy: InferencePolicy) -> Vec<SchedulePlan> {
    inputs
        .par_iter()
        .map(|input| build_schedule(input, policy))
        .collect()
}

pub fn plan_progress(plan: &SchedulePlan) -> PlanProgress {
    let mut progress = PlanProgress {
        actual_units: if plan.capacity.has_unused_lists {
            plan.capacity
                .max_actual_unit_number
                .min(plan.capacity.units_count_for_structure)
        } else {
            plan.capacity.units_count_for_structure
        },
        ..PlanProgress::default()
    };

    let mut interactive = 0u32;
    let mut completed = 0u32;

    for cell in plan.cells().filter(|cell| cell.interactive) {
        interactive += 1;
        if cell.completed {
            completed += 1;
        } else if progress.first_pending_day.is_none() {
            progress.first_pending_day = Some(cell.day);
        }

        match cell.kind {
            CellKind::New => {
                if cell.completed {
                    progress.learned_units += 1;
                }
            }
            CellKind::Review => {
                progress.total_reviews += 1;
                if cell.completed {
                    progress.completed_reviews += 1;
                }
            }
        }
    }

    progress.completion_ratio = if interactive == 0 {
        0.0
    } else {
        f64::from(completed) / f64::from(interactive)
    };

    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellStyle, MAX_DISPLAY_DAYS, MAX_SCHEDULE_UNITS};

    fn input(total_words: i64, words_per_day: i64) -> ScheduleInput {
        ScheduleInput {
            total_words,
            words_per_day,
            ..ScheduleInput::default()
        }
    }

    #[test]
    fn test_pipeline_basic_shape() {
        let plan = build_schedule(&input(120, 50), InferencePolicy::default());
        assert_eq!(plan.units_count, 3);
        assert_eq!(plan.total_days, 18);
        assert_eq!(plan.display_days, 18);
        assert_eq!(plan.column_count, 6);
        assert!(plan.warnings.is_empty());
        assert!(plan.data_quality.is_empty());
        assert!(plan.cells().all(|c| c.unit_number <= 3));
    }

    #[test]
    fn test_huge_corpus_is_capped() {
        let plan = build_schedule(&input(4_000_000_000, 1), InferencePolicy::default());
        assert_eq!(plan.units_count, 4_000_000_000);
        assert_eq!(plan.capacity.units_count_for_structure, MAX_SCHEDULE_UNITS);
        assert_eq!(plan.display_days, MAX_SCHEDULE_UNITS + 15);
        assert_eq!(
            plan.warnings,
            vec![ValidationWarning::UnitsClamped {
                requested: 4_000_000_000,
                max: MAX_SCHEDULE_UNITS
            }]
        );
    }

    #[test]
    fn test_huge_minimum_display_days_is_capped() {
        let plan = build_schedule(
            &ScheduleInput {
                minimum_display_days: Some(u32::MAX),
                ..input(20, 20)
            },
            InferencePolicy::default(),
        );
        assert_eq!(plan.display_days, MAX_DISPLAY_DAYS);
        assert_eq!(plan.rows.len(), 6);
        assert_eq!(
            plan.warnings,
            vec![ValidationWarning::DisplayDaysClamped {
                requested: u32::MAX,
                max: MAX_DISPLAY_DAYS
            }]
        );
    }

    #[test]
    fn test_zero_pace_still_renders() {
        let plan = build_schedule(&input(5, 0), InferencePolicy::default());
        assert_eq!(plan.units_count, 5);
        assert!(!plan.rows.is_empty());
        assert_eq!(
            plan.warnings,
            vec![ValidationWarning::PaceClamped {
                requested: "0".to_string()
            }]
        );
    }

    #[test]
    fn test_unused_cells_with_stray_record() {
        let plan = build_schedule(
            &ScheduleInput {
                total_words: 60,
                words_per_day: 20,
                capacity: CapacitySignals {
                    estimated_unit_count: Some(5),
                    max_actual_unit_number: Some(3),
                    has_unused_lists: Some(true),
                },
                learning_units: vec![LearningUnit::learned(4).with_review(1, true)],
                ..ScheduleInput::default()
            },
            InferencePolicy::default(),
        );

        assert_eq!(plan.capacity.units_count_for_structure, 5);
        let unused: Vec<_> = plan.cells().filter(|c| c.unit_number >= 4).collect();
        assert!(!unused.is_empty());
        assert!(unused.iter().all(|c| c.unused && !c.completed && !c.interactive));
        assert_eq!(plan.activate(4, 0), CellActivation::Ignored { reason: IgnoreReason::Unused });
        assert_eq!(plan.activate(5, 1), CellActivation::Ignored { reason: IgnoreReason::Unused });
    }

    #[test]
    fn test_activation_targets() {
        let plan = build_schedule(
            &ScheduleInput {
                learning_units: vec![LearningUnit::learned(1)],
                ..input(40, 20)
            },
            InferencePolicy::default(),
        );

        assert_eq!(
            plan.activate(1, 0),
            CellActivation::Ignored { reason: IgnoreReason::AlreadyCompleted }
        );
        assert_eq!(plan.activate(2, 0), CellActivation::MarkLearned { unit_number: 2 });
        assert_eq!(
            plan.activate(2, 1),
            CellActivation::CompleteReview { unit_number: 1, review_order: 1 }
        );
        assert_eq!(
            plan.activate(2, 3),
            CellActivation::Ignored { reason: IgnoreReason::NoSuchCell }
        );
    }

    #[test]
    fn test_invalid_offsets_fall_back() {
        let plan = build_schedule(
            &ScheduleInput {
                review_offsets: Some(vec![]),
                ..input(10, 10)
            },
            InferencePolicy::default(),
        );
        assert_eq!(plan.review_offsets, ReviewOffsets::default());
        assert!(matches!(
            plan.warnings.as_slice(),
            [ValidationWarning::InvalidReviewOffsets { .. }]
        ));
    }

    #[test]
    fn test_batch_matches_sequential() {
        let inputs: Vec<_> = (0..20).map(|i| input(i * 17, 1 + i % 7)).collect();
        let batch = build_schedules(&inputs, InferencePolicy::Strict);
        assert_eq!(batch.len(), inputs.len());
        for (input, plan) in inputs.iter().zip(&batch) {
            assert_eq!(plan, &build_schedule(input, InferencePolicy::Strict));
        }
    }

    #[test]
    fn test_progress_summary() {
        let plan = build_schedule(
            &ScheduleInput {
                learning_units: vec![
                    LearningUnit::learned(1).with_review(2, true),
                    LearningUnit::learned(2),
                ],
                ..input(3, 1)
            },
            InferencePolicy::default(),
        );
        let progress = plan_progress(&plan);
        assert_eq!(progress.actual_units, 3);
        assert_eq!(progress.learned_units, 2);
        assert_eq!(progress.total_reviews, 15);
        // round 2 explicit, round 1 inferred
        assert_eq!(progress.completed_reviews, 2);
        assert_eq!(progress.first_pending_day, Some(3));
        assert!((progress.completion_ratio - 4.0 / 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_input_wire_format() {
        let json = r#"{
            "totalWords": 120,
            "wordsPerDay": 50,
            "reviewOffsets": [1, 2, 4, 7, 15],
            "estimatedUnitCount": 5,
            "maxActualUnitNumber": 3,
            "hasUnusedLists": true,
            "learningUnits": [
                { "unitNumber": 2, "isLearned": true,
                  "reviews": [{ "reviewOrder": 1, "isCompleted": false }] }
            ]
        }"#;
        let input: ScheduleInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.capacity.estimated_unit_count, Some(5));
        assert_eq!(input.learning_units[0].reviews[0].review_order, 1);

        let plan = build_schedule(&input, InferencePolicy::default());
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["unitsCount"], 3);
        assert_eq!(value["totalDays"], 18);
        let first = &value["rows"][0]["cells"][0];
        assert_eq!(first["kind"], "new");
        assert_eq!(first["style"], "not-started");
        assert_eq!(first["unused"], false);
        assert!(plan.cells().any(|c| c.style == CellStyle::Unused));
    }
}
