//! Common Types and Constants
//!
//! Shared data structures used across all scheduler modules.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ==================== Constants ====================

/// Default Ebbinghaus review offsets (days after initial learning)
pub const DEFAULT_REVIEW_OFFSETS: [u32; 5] = [1, 2, 4, 7, 15];

/// Column index of the "new learning" cell
pub const NEW_COLUMN: usize = 0;

/// Largest accepted single review offset (days)
pub const MAX_REVIEW_OFFSET: u32 = 3650;

/// Largest unit count a schedule grid is built for (one new unit a day for a century)
pub const MAX_SCHEDULE_UNITS: u32 = 36_500;

/// Largest number of days a schedule grid may span
pub const MAX_DISPLAY_DAYS: u32 = MAX_SCHEDULE_UNITS + MAX_REVIEW_OFFSET;

// ==================== Errors ====================

/// Errors raised by fallible constructors of scheduler types.
///
/// The scheduling pipeline itself never fails; raw caller input goes
/// through [`crate::sanitize`] and degrades to warnings instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("review offsets must not be empty")]
    EmptyOffsets,
    #[error("review offset #{index} must be at least 1 day, got {value}")]
    NonPositiveOffset { index: usize, value: i64 },
    #[error("review offset #{index} exceeds {max} days, got {value}")]
    OffsetTooLarge { index: usize, value: i64, max: u32 },
    #[error("review offsets must be strictly ascending, got {previous} before {value}")]
    NotAscending { previous: u32, value: u32 },
}

// ==================== Review Offsets ====================

/// Ordered Ebbinghaus review offsets.
///
/// Round `k` (1-based) is due `offsets[k - 1]` days after the unit was first
/// learned. The sequence is non-empty, strictly ascending and every element
/// is at least one day; it is immutable for the lifetime of a plan.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<u32>")]
pub struct ReviewOffsets(Vec<u32>);

impl ReviewOffsets {
    pub fn new(values: &[i64]) -> Result<Self, ScheduleError> {
        if values.is_empty() {
            return Err(ScheduleError::EmptyOffsets);
        }

        let mut offsets = Vec::with_capacity(values.len());
        for (index, &value) in values.iter().enumerate() {
            if value < 1 {
                return Err(ScheduleError::NonPositiveOffset { index, value });
            }
            if value > i64::from(MAX_REVIEW_OFFSET) {
                return Err(ScheduleError::OffsetTooLarge {
                    index,
                    value,
                    max: MAX_REVIEW_OFFSET,
                });
            }
            let value = value as u32;
            if let Some(&previous) = offsets.last() {
                if value <= previous {
                    return Err(ScheduleError::NotAscending { previous, value });
                }
            }
            offsets.push(value);
        }

        Ok(Self(offsets))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed sequence; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Largest offset, which defines the schedule horizon.
    pub fn max(&self) -> u32 {
        self.0.last().copied().unwrap_or(0)
    }

    /// 1-based round number of an offset.
    pub fn round_of(&self, offset: u32) -> Option<u32> {
        self.0
            .iter()
            .position(|&o| o == offset)
            .map(|index| index as u32 + 1)
    }

    /// Offset of a 1-based round number.
    pub fn offset_of(&self, round: u32) -> Option<u32> {
        if round == 0 {
            return None;
        }
        self.0.get(round as usize - 1).copied()
    }

    /// Grid column for a review offset; column 0 is reserved for new learning.
    pub fn column_of(&self, offset: u32) -> Option<usize> {
        self.round_of(offset).map(|round| round as usize)
    }

    pub fn is_valid_round(&self, round: u32) -> bool {
        round >= 1 && (round as usize) <= self.0.len()
    }

    /// `(round, offset)` pairs in round order.
    pub fn rounds(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(index, &offset)| (index as u32 + 1, offset))
    }
}

impl Default for ReviewOffsets {
    fn default() -> Self {
        Self(DEFAULT_REVIEW_OFFSETS.to_vec())
    }
}

impl TryFrom<Vec<i64>> for ReviewOffsets {
    type Error = ScheduleError;

    fn try_from(values: Vec<i64>) -> Result<Self, Self::Error> {
        Self::new(&values)
    }
}

impl From<ReviewOffsets> for Vec<u32> {
    fn from(offsets: ReviewOffsets) -> Self {
        offsets.0
    }
}

// ==================== Persisted Records ====================

/// One scheduled review occurrence of a learning unit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitReview {
    /// 1-based index into the review offsets
    pub review_order: u32,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    pub is_completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl UnitReview {
    pub fn new(review_order: u32, is_completed: bool) -> Self {
        Self {
            review_order,
            scheduled_date: None,
            is_completed,
            completed_at: None,
        }
    }
}

/// One pacing slice of a vocabulary book, together with its reviews
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningUnit {
    /// 1-based, dense within a plan
    pub unit_number: u32,
    pub is_learned: bool,
    #[serde(default)]
    pub learned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviews: Vec<UnitReview>,
}

impl LearningUnit {
    pub fn new(unit_number: u32) -> Self {
        Self {
            unit_number,
            is_learned: false,
            learned_at: None,
            reviews: Vec::new(),
        }
    }

    pub fn learned(unit_number: u32) -> Self {
        Self {
            is_learned: true,
            ..Self::new(unit_number)
        }
    }

    pub fn with_review(mut self, review_order: u32, is_completed: bool) -> Self {
        self.reviews.push(UnitReview::new(review_order, is_completed));
        self
    }

    pub fn review(&self, review_order: u32) -> Option<&UnitReview> {
        self.reviews.iter().find(|r| r.review_order == review_order)
    }
}

// ==================== Schedule Cells ====================

/// Which column family a cell belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    New,
    Review,
}

/// A computed (never persisted) projection of the schedule grid.
///
/// `interval == None` is the "new learning" column; otherwise the cell is the
/// review falling due `interval` days after `unit_number` was learned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCell {
    pub day: u32,
    pub unit_number: u32,
    pub interval: Option<u32>,
    pub column: usize,
}

impl ScheduleCell {
    pub fn kind(&self) -> CellKind {
        match self.interval {
            None => CellKind::New,
            Some(_) => CellKind::Review,
        }
    }

    /// Review round for review cells; the round equals the column index.
    pub fn round(&self) -> Option<u32> {
        self.interval.map(|_| self.column as u32)
    }
}

/// Display style-class of a resolved cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CellStyle {
    NotStarted,
    Learned,
    PendingReview,
    Reviewed,
    Unused,
}

/// A schedule cell with its completion state resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCell {
    pub day: u32,
    pub unit_number: u32,
    pub column: usize,
    pub kind: CellKind,
    pub interval: Option<u32>,
    pub completed: bool,
    pub unused: bool,
    pub interactive: bool,
    pub style: CellStyle,
}

impl ResolvedCell {
    pub fn round(&self) -> Option<u32> {
        self.interval.map(|_| self.column as u32)
    }
}

/// All resolved cells due on one day
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRow {
    pub day: u32,
    pub cells: Vec<ResolvedCell>,
}

// ==================== Policies & Capacity ====================

/// How a missing completion flag is interpreted when a later round exists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InferencePolicy {
    /// Reaching round `k + 1` implies every round `<= k` was passed through
    #[default]
    HigherRoundImpliesLower,
    /// Only a round's own completion flag counts
    Strict,
}

impl InferencePolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "infer" | "higher_round_implies_lower" | "higherroundimplieslower" => {
                Some(Self::HigherRoundImpliesLower)
            }
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HigherRoundImpliesLower => "infer",
            Self::Strict => "strict",
        }
    }
}

/// Capacity signals as received from the backing store; all optional
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySignals {
    #[serde(default)]
    pub estimated_unit_count: Option<i64>,
    #[serde(default)]
    pub max_actual_unit_number: Option<i64>,
    #[serde(default)]
    pub has_unused_lists: Option<bool>,
}

/// Reconciled plan capacity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCapacity {
    /// How many units the matrix displays
    pub units_count_for_structure: u32,
    /// How many units actually have provisioned content
    pub max_actual_unit_number: u32,
    pub has_unused_lists: bool,
}

impl PlanCapacity {
    pub fn is_unused(&self, unit_number: u32) -> bool {
        self.has_unused_lists && unit_number > self.max_actual_unit_number
    }

    /// Whether a click on a cell of this unit may reach the store.
    pub fn can_activate(&self, unit_number: u32) -> bool {
        unit_number >= 1
            && unit_number <= self.units_count_for_structure
            && !self.is_unused(unit_number)
    }
}

// ==================== Diagnostics ====================

/// Recoverable input problems, reported to the caller instead of failing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ValidationWarning {
    /// Pace was below one item per day (or not a number) and has been clamped to one
    PaceClamped { requested: String },
    /// Total item count was negative (or not a number) and has been treated as zero
    TotalClamped { requested: String },
    /// Review offsets were rejected; the default sequence is used instead
    InvalidReviewOffsets { reason: String },
    /// Backend unit estimate was not positive and has been ignored
    EstimateIgnored { requested: i64 },
    /// Backend unit estimate is smaller than the locally derived count
    EstimateBelowLocal { estimate: u32, local: u32 },
    /// Structure unit count exceeded the grid limit and has been capped
    UnitsClamped { requested: u32, max: u32 },
    /// Requested minimum display window exceeded the grid limit and has been capped
    DisplayDaysClamped { requested: u32, max: u32 },
}

/// Inconsistencies found in persisted unit/review records.
///
/// Offending records are ignored for matrix purposes; the store layer is
/// expected to log them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DataQualityIssue {
    UnitNumberOutOfRange { unit_number: u32 },
    DuplicateUnitNumber { unit_number: u32 },
    ReviewOrderOutOfRange { unit_number: u32, review_order: u32 },
    DuplicateReviewOrder { unit_number: u32, review_order: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_offsets() {
        let offsets = ReviewOffsets::default();
        assert_eq!(offsets.as_slice(), &[1, 2, 4, 7, 15]);
        assert_eq!(offsets.max(), 15);
        assert_eq!(offsets.len(), 5);
    }

    #[test]
    fn test_offsets_rejects_bad_input() {
        assert_eq!(ReviewOffsets::new(&[]), Err(ScheduleError::EmptyOffsets));
        assert!(matches!(
            ReviewOffsets::new(&[1, 0, 4]),
            Err(ScheduleError::NonPositiveOffset { index: 1, value: 0 })
        ));
        assert!(matches!(
            ReviewOffsets::new(&[1, 4, 4]),
            Err(ScheduleError::NotAscending { previous: 4, value: 4 })
        ));
        assert!(matches!(
            ReviewOffsets::new(&[1, 5000]),
            Err(ScheduleError::OffsetTooLarge { .. })
        ));
    }

    #[test]
    fn test_round_and_column_mapping() {
        let offsets = ReviewOffsets::default();
        assert_eq!(offsets.round_of(1), Some(1));
        assert_eq!(offsets.round_of(7), Some(4));
        assert_eq!(offsets.round_of(3), None);
        assert_eq!(offsets.offset_of(5), Some(15));
        assert_eq!(offsets.offset_of(0), None);
        assert_eq!(offsets.offset_of(6), None);
        assert_eq!(offsets.column_of(15), Some(5));
        assert!(offsets.is_valid_round(1));
        assert!(!offsets.is_valid_round(6));
    }

    #[test]
    fn test_offsets_serde() {
        let offsets: ReviewOffsets = serde_json::from_str("[1,3,9]").unwrap();
        assert_eq!(offsets.as_slice(), &[1, 3, 9]);
        assert_eq!(serde_json::to_string(&offsets).unwrap(), "[1,3,9]");
        assert!(serde_json::from_str::<ReviewOffsets>("[3,1]").is_err());
    }

    #[test]
    fn test_capacity_unused() {
        let capacity = PlanCapacity {
            units_count_for_structure: 5,
            max_actual_unit_number: 3,
            has_unused_lists: true,
        };
        assert!(!capacity.is_unused(3));
        assert!(capacity.is_unused(4));
        assert!(capacity.can_activate(3));
        assert!(!capacity.can_activate(4));
        assert!(!capacity.can_activate(0));
        assert!(!capacity.can_activate(6));
    }

    #[test]
    fn test_warning_wire_format() {
        let warning = ValidationWarning::PaceClamped {
            requested: "0.5".to_string(),
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["type"], "paceClamped");
        assert_eq!(json["requested"], "0.5");

        let warning = ValidationWarning::DisplayDaysClamped {
            requested: u32::MAX,
            max: MAX_DISPLAY_DAYS,
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["type"], "displayDaysClamped");
        assert_eq!(json["max"], MAX_DISPLAY_DAYS);

        let issue = DataQualityIssue::ReviewOrderOutOfRange {
            unit_number: 2,
            review_order: 9,
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["unitNumber"], 2);
        assert_eq!(json["reviewOrder"], 9);
    }
}
