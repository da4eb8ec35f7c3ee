use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ebbinghaus_algo::sanitize::{
    sanitize_review_offsets, sanitize_total_words, sanitize_total_words_f64,
    sanitize_words_per_day, sanitize_words_per_day_f64,
};
use ebbinghaus_algo::{
    build_schedule, compute_pacing, plan_progress, units_for, CellActivation, InferencePolicy,
    LearningUnit, Pacing, PlanCapacity, PlanProgress, ReviewOffsets, ScheduleError,
    ScheduleInput, SchedulePlan, ValidationWarning, MAX_SCHEDULE_UNITS,
};

use crate::db::{EbbinghausPlan, LearningUnitStore, NewPlan, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("userId is required")]
    MissingUser,
    #[error("invalid review offsets: {0}")]
    InvalidOffsets(#[from] ScheduleError),
    #[error("plan needs {units} units, at most {max} are supported")]
    PlanTooLarge { units: u32, max: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleQuery {
    pub min_days: Option<u32>,
    pub policy: InferencePolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanInput {
    pub user_id: String,
    #[serde(default)]
    pub wordbook_id: Option<String>,
    pub total_words: i64,
    #[serde(default)]
    pub target_words: Option<i64>,
    pub words_per_day: i64,
    #[serde(default)]
    pub review_offsets: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: EbbinghausPlan,
    pub max_actual_unit_number: u32,
    pub estimated_unit_count: Option<i64>,
    pub capacity: PlanCapacity,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ValidationWarning>,
}

impl PlanDetail {
    pub fn new(plan: EbbinghausPlan, warnings: Vec<ValidationWarning>) -> Self {
        Self {
            max_actual_unit_number: plan.max_actual_unit_number(),
            estimated_unit_count: plan.estimated_unit_count(),
            capacity: plan.capacity(),
            plan,
            warnings,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView {
    pub plan_id: String,
    #[serde(flatten)]
    pub schedule: SchedulePlan,
    pub progress: PlanProgress,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub activation: CellActivation,
    /// Unit as stored after the mutation; absent when the selection was a no-op
    pub unit: Option<LearningUnit>,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PacingPreview {
    #[serde(flatten)]
    pub pacing: Pacing,
    pub review_offsets: ReviewOffsets,
    pub warnings: Vec<ValidationWarning>,
}

/// Create a plan, falling back to `default_offsets` when none are given.
///
/// Explicit offsets must be valid; a non-positive pace is clamped and
/// reported back as a warning.
pub async fn create_plan(
    store: &LearningUnitStore,
    input: CreatePlanInput,
    default_offsets: &ReviewOffsets,
) -> Result<PlanDetail, ServiceError> {
    let user_id = input.user_id.trim();
    if user_id.is_empty() {
        return Err(ServiceError::MissingUser);
    }

    let review_offsets = match input.review_offsets.as_deref() {
        Some(raw) => ReviewOffsets::new(raw)?,
        None => default_offsets.clone(),
    };

    let mut warnings = Vec::new();
    warnings.extend(sanitize_total_words(input.total_words).1);
    warnings.extend(sanitize_words_per_day(input.words_per_day).1);
    ensure_schedulable(input.total_words, input.words_per_day)?;
    if let Some(target_words) = input.target_words {
        ensure_schedulable(target_words, input.words_per_day)?;
    }

    let plan = store
        .create_plan(NewPlan {
            user_id: user_id.to_string(),
            wordbook_id: input.wordbook_id,
            total_words: input.total_words,
            target_words: input.target_words,
            words_per_day: input.words_per_day,
            review_offsets,
        })
        .await?;

    Ok(PlanDetail::new(plan, warnings))
}

pub async fn get_plan(store: &LearningUnitStore, plan_id: &str) -> Result<PlanDetail, ServiceError> {
    let plan = store.require_plan(plan_id).await?;
    Ok(PlanDetail::new(plan, Vec::new()))
}

pub async fn update_provisioned_words(
    store: &LearningUnitStore,
    plan_id: &str,
    total_words: i64,
) -> Result<PlanDetail, ServiceError> {
    let current = store.require_plan(plan_id).await?;
    ensure_schedulable(total_words, current.words_per_day)?;
    let warnings = sanitize_total_words(total_words).1.into_iter().collect();
    let plan = store.update_provisioned_words(plan_id, total_words).await?;
    tracing::info!(
        plan_id,
        total_words = plan.total_words,
        max_actual_unit_number = plan.max_actual_unit_number(),
        "provisioned words updated"
    );
    Ok(PlanDetail::new(plan, warnings))
}

/// Reject word counts whose unit count exceeds what a schedule grid holds.
fn ensure_schedulable(words: i64, words_per_day: i64) -> Result<(), ServiceError> {
    let units = units_for(
        sanitize_total_words(words).0,
        sanitize_words_per_day(words_per_day).0,
    );
    if units > MAX_SCHEDULE_UNITS {
        return Err(ServiceError::PlanTooLarge {
            units,
            max: MAX_SCHEDULE_UNITS,
        });
    }
    Ok(())
}

/// Scheduler input for a plan and a snapshot of its units
pub fn schedule_input(
    plan: &EbbinghausPlan,
    units: Vec<LearningUnit>,
    min_days: Option<u32>,
) -> ScheduleInput {
    ScheduleInput {
        total_words: plan.total_words,
        words_per_day: plan.words_per_day,
        review_offsets: Some(
            plan.review_offsets
                .as_slice()
                .iter()
                .map(|&offset| i64::from(offset))
                .collect(),
        ),
        capacity: plan.capacity_signals(),
        minimum_display_days: min_days,
        learning_units: units,
    }
}

/// Build the schedule of a plan from a fresh store snapshot.
pub async fn load_schedule(
    store: &LearningUnitStore,
    plan_id: &str,
    query: &ScheduleQuery,
) -> Result<ScheduleView, ServiceError> {
    let schedule = compute_schedule(store, plan_id, query).await?;

    for issue in &schedule.data_quality {
        tracing::warn!(plan_id, ?issue, "inconsistent learning unit record ignored");
    }
    for warning in &schedule.warnings {
        tracing::warn!(plan_id, ?warning, "schedule input corrected");
    }

    let progress = plan_progress(&schedule);
    Ok(ScheduleView {
        plan_id: plan_id.to_string(),
        schedule,
        progress,
    })
}

/// Apply a cell selection: mark the unit learned, complete the review round,
/// or report why nothing was written.
pub async fn toggle_cell(
    store: &LearningUnitStore,
    plan_id: &str,
    day: u32,
    column: usize,
    policy: InferencePolicy,
) -> Result<ToggleOutcome, ServiceError> {
    let query = ScheduleQuery {
        min_days: None,
        policy,
    };
    let schedule = compute_schedule(store, plan_id, &query).await?;
    let activation = schedule.activate(day, column);

    let outcome = match activation {
        CellActivation::MarkLearned { unit_number } => {
            Some(store.mark_unit_learned(plan_id, unit_number, Utc::now()).await?)
        }
        CellActivation::CompleteReview {
            unit_number,
            review_order,
        } => Some(
            store
                .complete_review(plan_id, unit_number, review_order, Utc::now())
                .await?,
        ),
        CellActivation::Ignored { reason } => {
            tracing::debug!(plan_id, day, column, ?reason, "cell selection ignored");
            None
        }
    };

    Ok(match outcome {
        Some(outcome) => ToggleOutcome {
            activation,
            changed: outcome.changed,
            unit: Some(outcome.unit),
        },
        None => ToggleOutcome {
            activation,
            unit: None,
            changed: false,
        },
    })
}

/// Stateless pacing preview for a pace the learner is still editing.
pub fn preview_pacing(
    total_words: f64,
    words_per_day: f64,
    review_offsets: Option<&[i64]>,
) -> PacingPreview {
    let mut warnings = Vec::new();

    let (total, warning) = sanitize_total_words_f64(total_words);
    warnings.extend(warning);
    let (per_day, warning) = sanitize_words_per_day_f64(words_per_day);
    warnings.extend(warning);
    let review_offsets = match review_offsets {
        Some(raw) => {
            let (offsets, warning) = sanitize_review_offsets(raw);
            warnings.extend(warning);
            offsets
        }
        None => ReviewOffsets::default(),
    };

    PacingPreview {
        pacing: compute_pacing(total, per_day, &review_offsets),
        review_offsets,
        warnings,
    }
}

async fn compute_schedule(
    store: &LearningUnitStore,
    plan_id: &str,
    query: &ScheduleQuery,
) -> Result<SchedulePlan, ServiceError> {
    let plan = store.require_plan(plan_id).await?;
    let units = store.list_units(plan_id).await?;
    let input = schedule_input(&plan, units, query.min_days);
    Ok(build_schedule(&input, query.policy))
}
