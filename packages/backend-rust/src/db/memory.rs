use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use ebbinghaus_algo::LearningUnit;

use crate::db::{
    apply_learned, apply_review_completion, check_target, EbbinghausPlan, MutationOutcome,
    StoreError,
};

#[derive(Default)]
struct Inner {
    plans: HashMap<String, EbbinghausPlan>,
    /// plan id → unit number → unit
    units: HashMap<String, BTreeMap<u32, LearningUnit>>,
}

/// Process-local store for tests and single-user desktop mode.
///
/// One lock guards plans and units, so a read after a write always observes it.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_plan(&self, plan: EbbinghausPlan) {
        let mut inner = self.inner.write();
        inner.units.entry(plan.id.clone()).or_default();
        inner.plans.insert(plan.id.clone(), plan);
    }

    pub(crate) fn get_plan(&self, plan_id: &str) -> Option<EbbinghausPlan> {
        self.inner.read().plans.get(plan_id).cloned()
    }

    pub(crate) fn update_provisioned_words(
        &self,
        plan_id: &str,
        total_words: i64,
        now: DateTime<Utc>,
    ) -> Result<EbbinghausPlan, StoreError> {
        let mut inner = self.inner.write();
        let plan = inner
            .plans
            .get_mut(plan_id)
            .ok_or_else(|| StoreError::PlanNotFound(plan_id.to_string()))?;
        plan.total_words = total_words;
        plan.updated_at = now;
        Ok(plan.clone())
    }

    pub(crate) fn list_units(&self, plan_id: &str) -> Result<Vec<LearningUnit>, StoreError> {
        let inner = self.inner.read();
        if !inner.plans.contains_key(plan_id) {
            return Err(StoreError::PlanNotFound(plan_id.to_string()));
        }
        Ok(inner
            .units
            .get(plan_id)
            .map(|units| units.values().cloned().collect())
            .unwrap_or_default())
    }

    pub(crate) fn mutate_unit(
        &self,
        plan_id: &str,
        unit_number: u32,
        review_order: Option<u32>,
        at: DateTime<Utc>,
    ) -> Result<MutationOutcome, StoreError> {
        let mut inner = self.inner.write();
        let plan = inner
            .plans
            .get(plan_id)
            .cloned()
            .ok_or_else(|| StoreError::PlanNotFound(plan_id.to_string()))?;
        check_target(&plan, unit_number, review_order)?;

        let unit = inner
            .units
            .entry(plan_id.to_string())
            .or_default()
            .entry(unit_number)
            .or_insert_with(|| LearningUnit::new(unit_number));

        let changed = match review_order {
            None => apply_learned(unit, at),
            Some(order) => apply_review_completion(unit, order, &plan.review_offsets, at),
        };

        Ok(MutationOutcome {
            unit: unit.clone(),
            changed,
        })
    }
}
