//! Capacity Reconciler
//!
//! The unit count the matrix displays may come from a backend estimate based
//! on a target pace, and can outrun the units that actually have content
//! (a partially imported book, for instance). Cells of such units are
//! "unused": they override any completion state, are non-interactive and
//! never reach the store.

use crate::sanitize::{non_negative, sanitize_unit_count};
use crate::types::{CellStyle, CapacitySignals, PlanCapacity, ResolvedRow, ValidationWarning};

/// Reconcile the locally derived unit count with the backend's signals.
///
/// - structure size: the backend estimate when present and positive, else
///   the local count;
/// - actual maximum: the backend value when present, else the structure size;
/// - unused lists: the backend flag when present, else derived from the two
///   counts when an actual maximum was supplied, else `false`.
///
/// The structure size is capped at [`crate::types::MAX_SCHEDULE_UNITS`].
pub fn derive_capacity(
    local_units: u32,
    signals: &CapacitySignals,
) -> (PlanCapacity, Vec<ValidationWarning>) {
    let mut warnings = Vec::new();

    let units_count_for_structure = match signals.estimated_unit_count {
        Some(estimate) if estimate > 0 => {
            let estimate = non_negative(estimate);
            if estimate < local_units {
                warnings.push(ValidationWarning::EstimateBelowLocal {
                    estimate,
                    local: local_units,
                });
            }
            estimate
        }
        Some(estimate) => {
            warnings.push(ValidationWarning::EstimateIgnored {
                requested: estimate,
            });
            local_units
        }
        None => local_units,
    };
    let (units_count_for_structure, clamped) = sanitize_unit_count(units_count_for_structure);
    warnings.extend(clamped);

    let max_actual_unit_number = signals
        .max_actual_unit_number
        .map(non_negative)
        .unwrap_or(units_count_for_structure);

    let has_unused_lists = match (signals.has_unused_lists, signals.max_actual_unit_number) {
        (Some(flag), _) => flag,
        (None, Some(_)) => units_count_for_structure > max_actual_unit_number,
        (None, None) => false,
    };

    (
        PlanCapacity {
            units_count_for_structure,
            max_actual_unit_number,
            has_unused_lists,
        },
        warnings,
    )
}

/// Apply the unused override to resolved rows in place.
pub fn reconcile(rows: &mut [ResolvedRow], capacity: &PlanCapacity) {
    for cell in rows.iter_mut().flat_map(|row| row.cells.iter_mut()) {
        if capacity.is_unused(cell.unit_number) {
            cell.unused = true;
            cell.completed = false;
            cell.interactive = false;
            cell.style = CellStyle::Unused;
        }
    }
}
