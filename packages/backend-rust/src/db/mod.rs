pub mod config;
pub mod memory;
pub mod sqlite;
pub mod sqlite_schema;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ebbinghaus_algo::sanitize::{sanitize_total_words, sanitize_words_per_day};
use ebbinghaus_algo::{
    derive_capacity, units_for, CapacitySignals, LearningUnit, PlanCapacity, ReviewOffsets,
    UnitReview,
};

pub use memory::MemoryStore;
pub use sqlite::{SqliteInitError, SqliteStore};

/// A learner's Ebbinghaus plan over one vocabulary book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EbbinghausPlan {
    pub id: String,
    pub user_id: String,
    pub wordbook_id: Option<String>,
    /// Words actually provisioned with content
    pub total_words: i64,
    /// Size of the book the plan targets, when known; drives the unit estimate
    pub target_words: Option<i64>,
    pub words_per_day: i64,
    pub review_offsets: ReviewOffsets,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EbbinghausPlan {
    fn pace(&self) -> u32 {
        sanitize_words_per_day(self.words_per_day).0
    }

    /// Highest unit number backed by provisioned content
    pub fn max_actual_unit_number(&self) -> u32 {
        units_for(sanitize_total_words(self.total_words).0, self.pace())
    }

    pub fn estimated_unit_count(&self) -> Option<i64> {
        self.target_words
            .map(|target| i64::from(units_for(sanitize_total_words(target).0, self.pace())))
    }

    pub fn capacity_signals(&self) -> CapacitySignals {
        CapacitySignals {
            estimated_unit_count: self.estimated_unit_count(),
            max_actual_unit_number: Some(i64::from(self.max_actual_unit_number())),
            has_unused_lists: None,
        }
    }

    pub fn capacity(&self) -> PlanCapacity {
        derive_capacity(self.max_actual_unit_number(), &self.capacity_signals()).0
    }
}

#[derive(Debug, Clone)]
pub struct NewPlan {
    pub user_id: String,
    pub wordbook_id: Option<String>,
    pub total_words: i64,
    pub target_words: Option<i64>,
    pub words_per_day: i64,
    pub review_offsets: ReviewOffsets,
}

impl NewPlan {
    pub(crate) fn into_plan(self, now: DateTime<Utc>) -> EbbinghausPlan {
        EbbinghausPlan {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: self.user_id,
            wordbook_id: self.wordbook_id,
            total_words: self.total_words.max(0),
            target_words: self.target_words,
            words_per_day: i64::from(sanitize_words_per_day(self.words_per_day).0),
            review_offsets: self.review_offsets,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of an idempotent mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub unit: LearningUnit,
    /// `false` when the target was already complete
    pub changed: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("plan not found: {0}")]
    PlanNotFound(String),
    #[error("unit {unit_number} is outside the plan (1..={max})")]
    UnitOutOfRange { unit_number: u32, max: u32 },
    #[error("unit {unit_number} has no provisioned content yet")]
    UnusedUnit { unit_number: u32 },
    #[error("review order {review_order} is outside 1..={max}")]
    ReviewOrderOutOfRange { review_order: u32, max: usize },
    #[error("invalid stored data: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persists plans, learning units and unit reviews.
///
/// Every mutation is idempotent and visible to the next read issued after it
/// returns.
#[derive(Clone)]
pub enum LearningUnitStore {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl LearningUnitStore {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sqlite(_) => "sqlite",
        }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Sqlite(store) => store.ping().await,
        }
    }

    pub async fn create_plan(&self, input: NewPlan) -> Result<EbbinghausPlan, StoreError> {
        let plan = input.into_plan(Utc::now());
        match self {
            Self::Memory(store) => store.insert_plan(plan.clone()),
            Self::Sqlite(store) => store.insert_plan(&plan).await?,
        }
        tracing::info!(plan_id = %plan.id, user_id = %plan.user_id, store = self.kind(), "ebbinghaus plan created");
        Ok(plan)
    }

    pub async fn get_plan(&self, plan_id: &str) -> Result<Option<EbbinghausPlan>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.get_plan(plan_id)),
            Self::Sqlite(store) => store.get_plan(plan_id).await,
        }
    }

    pub async fn require_plan(&self, plan_id: &str) -> Result<EbbinghausPlan, StoreError> {
        self.get_plan(plan_id)
            .await?
            .ok_or_else(|| StoreError::PlanNotFound(plan_id.to_string()))
    }

    pub async fn update_provisioned_words(
        &self,
        plan_id: &str,
        total_words: i64,
    ) -> Result<EbbinghausPlan, StoreError> {
        let total_words = total_words.max(0);
        match self {
            Self::Memory(store) => store.update_provisioned_words(plan_id, total_words, Utc::now()),
            Self::Sqlite(store) => {
                store
                    .update_provisioned_words(plan_id, total_words, Utc::now())
                    .await
            }
        }
    }

    /// Highest unit number backed by provisioned content
    pub async fn max_actual_unit_number(&self, plan_id: &str) -> Result<u32, StoreError> {
        Ok(self.require_plan(plan_id).await?.max_actual_unit_number())
    }

    /// Snapshot of every unit of a plan, with reviews, ordered by unit number
    pub async fn list_units(&self, plan_id: &str) -> Result<Vec<LearningUnit>, StoreError> {
        match self {
            Self::Memory(store) => store.list_units(plan_id),
            Self::Sqlite(store) => store.list_units(plan_id).await,
        }
    }

    pub async fn mark_unit_learned(
        &self,
        plan_id: &str,
        unit_number: u32,
        at: DateTime<Utc>,
    ) -> Result<MutationOutcome, StoreError> {
        match self {
            Self::Memory(store) => store.mutate_unit(plan_id, unit_number, None, at),
            Self::Sqlite(store) => store.mutate_unit(plan_id, unit_number, None, at).await,
        }
    }

    /// Complete round `review_order`, backfilling every lower round.
    pub async fn complete_review(
        &self,
        plan_id: &str,
        unit_number: u32,
        review_order: u32,
        at: DateTime<Utc>,
    ) -> Result<MutationOutcome, StoreError> {
        match self {
            Self::Memory(store) => store.mutate_unit(plan_id, unit_number, Some(review_order), at),
            Self::Sqlite(store) => {
                store
                    .mutate_unit(plan_id, unit_number, Some(review_order), at)
                    .await
            }
        }
    }
}

/// Reject writes the schedule could never display or that have no content.
pub(crate) fn check_target(
    plan: &EbbinghausPlan,
    unit_number: u32,
    review_order: Option<u32>,
) -> Result<(), StoreError> {
    let capacity = plan.capacity();
    if unit_number == 0 || unit_number > capacity.units_count_for_structure {
        return Err(StoreError::UnitOutOfRange {
            unit_number,
            max: capacity.units_count_for_structure,
        });
    }
    if capacity.is_unused(unit_number) {
        return Err(StoreError::UnusedUnit { unit_number });
    }
    if let Some(order) = review_order {
        if !plan.review_offsets.is_valid_round(order) {
            return Err(StoreError::ReviewOrderOutOfRange {
                review_order: order,
                max: plan.review_offsets.len(),
            });
        }
    }
    Ok(())
}

/// Mark a unit learned; returns whether anything changed.
pub(crate) fn apply_learned(unit: &mut LearningUnit, at: DateTime<Utc>) -> bool {
    if unit.is_learned {
        return false;
    }
    unit.is_learned = true;
    unit.learned_at = Some(at);
    true
}

/// Complete `review_order` and every lower round of a unit.
///
/// Missing review records are created with their scheduled date derived from
/// the learning date; completing a review implies the unit was learned.
pub(crate) fn apply_review_completion(
    unit: &mut LearningUnit,
    review_order: u32,
    offsets: &ReviewOffsets,
    at: DateTime<Utc>,
) -> bool {
    let mut changed = apply_learned(unit, at);
    let learned_on = unit.learned_at.unwrap_or(at).date_naive();

    for (round, offset) in offsets.rounds().take_while(|(round, _)| *round <= review_order) {
        match unit.reviews.iter_mut().find(|r| r.review_order == round) {
            Some(review) if review.is_completed => {}
            Some(review) => {
                review.is_completed = true;
                review.completed_at = Some(at);
                changed = true;
            }
            None => {
                unit.reviews.push(UnitReview {
                    review_order: round,
                    scheduled_date: Some(learned_on + Duration::days(i64::from(offset))),
                    is_completed: true,
                    completed_at: Some(at),
                });
                changed = true;
            }
        }
    }

    unit.reviews.sort_by_key(|r| r.review_order);
    changed
}
