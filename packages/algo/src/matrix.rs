//! Schedule Matrix Builder
//!
//! Produces the day × column grid of "new" and "review" cells. Column 0 is
//! new learning; column `k` is review round `k`. Downstream consumers key UI
//! columns by this index, so the mapping never depends on which cells exist.

use serde::{Deserialize, Serialize};

use crate::pacing::horizon;
use crate::types::{ReviewOffsets, ScheduleCell, MAX_DISPLAY_DAYS, MAX_SCHEDULE_UNITS, NEW_COLUMN};

/// All cells falling on one day
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRow {
    pub day: u32,
    pub cells: Vec<ScheduleCell>,
}

/// The full schedule grid of a plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleMatrix {
    units_count: u32,
    review_offsets: ReviewOffsets,
    display_days: u32,
    rows: Vec<DayRow>,
}

impl ScheduleMatrix {
    pub fn units_count(&self) -> u32 {
        self.units_count
    }

    pub fn review_offsets(&self) -> &ReviewOffsets {
        &self.review_offsets
    }

    /// Number of days the grid spans, empty days included
    pub fn display_days(&self) -> u32 {
        self.display_days
    }

    /// One "new" column plus one column per review round
    pub fn column_count(&self) -> usize {
        1 + self.review_offsets.len()
    }

    /// Non-empty rows, ascending by day
    pub fn rows(&self) -> &[DayRow] {
        &self.rows
    }

    /// Every day in `1..=display_days`, with an empty slice for days without cells
    pub fn dense_rows(&self) -> impl Iterator<Item = (u32, &[ScheduleCell])> + '_ {
        let mut rows = self.rows.iter().peekable();
        (1..=self.display_days).map(move |day| {
            match rows.next_if(|row| row.day == day) {
                Some(row) => (day, row.cells.as_slice()),
                None => (day, &[][..]),
            }
        })
    }

    pub fn row(&self, day: u32) -> Option<&DayRow> {
        self.rows
            .binary_search_by_key(&day, |row| row.day)
            .ok()
            .map(|index| &self.rows[index])
    }

    pub fn cell_at(&self, day: u32, column: usize) -> Option<&ScheduleCell> {
        self.row(day)?.cells.iter().find(|cell| cell.column == column)
    }

    pub fn cells(&self) -> impl Iterator<Item = &ScheduleCell> + '_ {
        self.rows.iter().flat_map(|row| row.cells.iter())
    }
}

/// Build the schedule grid for `units_count` units.
///
/// The grid spans `max(minimum_display_days, units_count + max(offset))`
/// days. Day `d` carries the "new" cell of unit `d` (while `d` is within the
/// unit count) followed by one review cell for every offset `o` whose origin
/// unit `d - o` exists. Days without cells produce no row.
///
/// `units_count` is capped at [`MAX_SCHEDULE_UNITS`] and the day span at
/// [`MAX_DISPLAY_DAYS`]; callers that need a warning sanitize first.
pub fn build_schedule_matrix(
    units_count: u32,
    offsets: &ReviewOffsets,
    minimum_display_days: Option<u32>,
) -> ScheduleMatrix {
    let units_count = units_count.min(MAX_SCHEDULE_UNITS);
    let last_busy_day = horizon(units_count, offsets);
    let minimum_display_days = minimum_display_days.unwrap_or(0).min(MAX_DISPLAY_DAYS);
    let display_days = last_busy_day.max(minimum_display_days);
    // nothing lands after the horizon, padding days stay implicit
    let mut rows = Vec::with_capacity(last_busy_day as usize);

    for day in 1..=last_busy_day {
        let cells = cells_for_day(day, units_count, offsets);
        if !cells.is_empty() {
            rows.push(DayRow { day, cells });
        }
    }

    ScheduleMatrix {
        units_count,
        review_offsets: offsets.clone(),
        display_days,
        rows,
    }
}

fn cells_for_day(day: u32, units_count: u32, offsets: &ReviewOffsets) -> Vec<ScheduleCell> {
    let mut cells = Vec::with_capacity(1 + offsets.len());

    if day <= units_count {
        cells.push(ScheduleCell {
            day,
            unit_number: day,
            interval: None,
            column: NEW_COLUMN,
        });
    }

    for (round, offset) in offsets.rounds() {
        let Some(origin) = day.checked_sub(offset) else {
            continue;
        };
        if origin >= 1 && origin <= units_count {
            cells.push(ScheduleCell {
                day,
                unit_number: origin,
                interval: Some(offset),
                column: round as usize,
            });
        }
    }

    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellKind;

    #[test]
    fn test_three_units_default_offsets() {
        let matrix = build_schedule_matrix(3, &ReviewOffsets::default(), None);
        assert_eq!(matrix.display_days(), 18);
        assert_eq!(matrix.column_count(), 6);

        let day1: Vec<_> = matrix.row(1).unwrap().cells.clone();
        assert_eq!(day1.len(), 1);
        assert_eq!(day1[0].kind(), CellKind::New);
        assert_eq!(day1[0].unit_number, 1);

        // day 3: new unit 3, review of unit 2 (+1), review of unit 1 (+2)
        let day3 = &matrix.row(3).unwrap().cells;
        let summary: Vec<_> = day3.iter().map(|c| (c.unit_number, c.interval, c.column)).collect();
        assert_eq!(summary, vec![(3, None, 0), (2, Some(1), 1), (1, Some(2), 2)]);
    }

    #[test]
    fn test_oversized_requests_are_capped() {
        let matrix = build_schedule_matrix(1, &ReviewOffsets::default(), Some(u32::MAX));
        assert_eq!(matrix.display_days(), MAX_DISPLAY_DAYS);
        assert_eq!(matrix.rows().len(), 6);

        let matrix = build_schedule_matrix(u32::MAX, &ReviewOffsets::default(), None);
        assert_eq!(matrix.units_count(), MAX_SCHEDULE_UNITS);
        assert_eq!(matrix.display_days(), MAX_SCHEDULE_UNITS + 15);
    }

    #[test]
    fn test_last_review_on_horizon() {
        let matrix = build_schedule_matrix(3, &ReviewOffsets::default(), None);
        let last = matrix.rows().last().unwrap();
        assert_eq!(last.day, 18);
        assert_eq!(last.cells.len(), 1);
        assert_eq!(last.cells[0].unit_number, 3);
        assert_eq!(last.cells[0].interval, Some(15));
        assert_eq!(last.cells[0].column, 5);
    }

    #[test]
    fn test_empty_days_are_omitted_but_counted() {
        let matrix = build_schedule_matrix(3, &ReviewOffsets::default(), None);
        // unit 3's +7 review lands on day 10, +15 review of unit 1 on day 16
        assert!(matrix.row(11).is_none());
        assert!(matrix.row(15).is_none());
        assert!(matrix.row(16).is_some());
        assert_eq!(matrix.dense_rows().count(), 18);
        let empty: Vec<u32> = matrix
            .dense_rows()
            .filter(|(_, cells)| cells.is_empty())
            .map(|(day, _)| day)
            .collect();
        assert_eq!(empty, vec![11, 12, 13, 14, 15]);
    }

    #[test]
    fn test_minimum_display_days_widens_grid() {
        let matrix = build_schedule_matrix(2, &ReviewOffsets::default(), Some(30));
        assert_eq!(matrix.display_days(), 30);
        assert_eq!(matrix.dense_rows().count(), 30);
        assert_eq!(matrix.rows().last().unwrap().day, 17);

        let narrow = build_schedule_matrix(2, &ReviewOffsets::default(), Some(5));
        assert_eq!(narrow.display_days(), 17);
    }

    #[test]
    fn test_zero_units_is_empty_but_valid() {
        let matrix = build_schedule_matrix(0, &ReviewOffsets::default(), None);
        assert!(matrix.rows().is_empty());
        assert_eq!(matrix.display_days(), 15);
        assert_eq!(matrix.cells().count(), 0);
    }

    #[test]
    fn test_every_unit_gets_every_round() {
        let offsets = ReviewOffsets::default();
        let matrix = build_schedule_matrix(10, &offsets, None);
        for unit in 1..=10 {
            let cells: Vec<_> = matrix.cells().filter(|c| c.unit_number == unit).collect();
            assert_eq!(cells.len(), 1 + offsets.len());
            for cell in cells {
                match cell.interval {
                    None => assert_eq!(cell.day, unit),
                    Some(offset) => assert_eq!(cell.day, unit + offset),
                }
            }
        }
    }

    #[test]
    fn test_cell_at_lookup() {
        let matrix = build_schedule_matrix(5, &ReviewOffsets::default(), None);
        let cell = matrix.cell_at(8, 4).unwrap();
        assert_eq!(cell.unit_number, 1);
        assert_eq!(cell.round(), Some(4));
        assert!(matrix.cell_at(8, 0).is_none());
        assert!(matrix.cell_at(100, 0).is_none());
    }
}
