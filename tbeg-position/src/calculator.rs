//! PURPOSE: Maps template coordinates to expanded output coordinates in the
//! presence of multiple independent repeat regions, spec.md §4.4.

use crate::bands::{build_down_bands, build_right_bands, Band};
use tbeg_model::{CellArea, CellCoord, CollectionSizes, RepeatDirection, RepeatExpansion, RepeatRegionSpec};

/// Precomputed expansion geometry for one sheet's repeats. Built once per
/// render and queried for every cell, formula reference, and derived
/// artifact on that sheet.
pub struct PositionCalculator {
    repeats: Vec<RepeatRegionSpec>,
    row_expansion: Vec<u32>,
    col_expansion: Vec<u32>,
    item_count: Vec<usize>,
    down_bands: Vec<Band>,
    right_bands: Vec<Band>,
}

impl PositionCalculator {
    pub fn new(repeats: &[RepeatRegionSpec], sizes: &CollectionSizes) -> Self {
        let item_count: Vec<usize> = repeats.iter().map(|r| sizes.get(&r.collection)).collect();

        let row_expansion: Vec<u32> = repeats
            .iter()
            .zip(&item_count)
            .map(|(r, &n)| match r.direction {
                RepeatDirection::Down => (n.saturating_sub(1) as u32) * r.area.row_span(),
                RepeatDirection::Right => 0,
            })
            .collect();

        let col_expansion: Vec<u32> = repeats
            .iter()
            .zip(&item_count)
            .map(|(r, &n)| match r.direction {
                RepeatDirection::Right => (n.saturating_sub(1) as u32) * r.area.col_span(),
                RepeatDirection::Down => 0,
            })
            .collect();

        let down_indices: Vec<(usize, &RepeatRegionSpec)> = repeats
            .iter()
            .enumerate()
            .filter(|(_, r)| r.direction == RepeatDirection::Down)
            .collect();
        let right_indices: Vec<(usize, &RepeatRegionSpec)> = repeats
            .iter()
            .enumerate()
            .filter(|(_, r)| r.direction == RepeatDirection::Right)
            .collect();

        let down_bands = build_down_bands(&down_indices, &row_expansion);
        let right_bands = build_right_bands(&right_indices, &col_expansion);

        PositionCalculator {
            repeats: repeats.to_vec(),
            row_expansion,
            col_expansion,
            item_count,
            down_bands,
            right_bands,
        }
    }

    /// The precomputed expansion info for repeat `index` (in the order it
    /// was passed to [`PositionCalculator::new`]).
    pub fn expansion(&self, index: usize) -> RepeatExpansion {
        let repeat = &self.repeats[index];
        let (final_start_row, final_start_col) = self.final_origin(index);
        RepeatExpansion {
            final_start_row,
            final_start_col,
            row_expansion: self.row_expansion[index],
            col_expansion: self.col_expansion[index],
            item_count: self.item_count[index],
        }
    }

    fn final_origin(&self, index: usize) -> (u32, u32) {
        let area = self.repeats[index].area;
        self.get_final_position(area.start)
    }

    fn axis_shift(bands: &[Band], cross_value: u32, along_value: u32) -> u32 {
        if let Some(band) = bands.iter().find(|b| b.contains_cross(cross_value)) {
            band.shift_before(along_value)
        } else {
            // No band owns this column/row: it's shared downstream of every
            // band, so the point must clear the tallest/widest of them.
            bands.iter().map(|b| b.shift_before(along_value)).max().unwrap_or(0)
        }
    }

    /// Projects a single template coordinate through every repeat's
    /// expansion, per spec.md §4.4 step 4.
    pub fn get_final_position(&self, coord: CellCoord) -> CellCoord {
        let (row, col) = coord;
        let row_shift = Self::axis_shift(&self.down_bands, col, row);
        let col_shift = Self::axis_shift(&self.right_bands, row, col);
        (row + row_shift, col + col_shift)
    }

    /// Finds the repeat whose template area fully contains `area`, if any.
    fn enclosing_repeat(&self, area: &CellArea) -> Option<usize> {
        self.repeats.iter().position(|r| {
            r.area.start.0 <= area.start.0
                && r.area.start.1 <= area.start.1
                && area.end.0 <= r.area.end.0
                && area.end.1 <= r.area.end.1
        })
    }

    /// Projects a range, per spec.md §4.4 step 5: if it's entirely inside a
    /// single repeat's template area, its span along that repeat's growth
    /// axis is multiplied by the item count; otherwise both corners project
    /// independently.
    pub fn get_final_range(&self, area: CellArea) -> CellArea {
        if let Some(index) = self.enclosing_repeat(&area) {
            let repeat = &self.repeats[index];
            let factor = self.item_count[index].max(1) as u32;
            let start = self.get_final_position(area.start);
            let (end_row, end_col) = match repeat.direction {
                RepeatDirection::Down => {
                    let span = area.row_span() * factor;
                    (start.0 + span - 1, start.1 + area.col_span() - 1)
                }
                RepeatDirection::Right => {
                    let span = area.col_span() * factor;
                    (start.0 + area.row_span() - 1, start.1 + span - 1)
                }
            };
            return CellArea::new(start, (end_row, end_col));
        }

        let start = self.get_final_position(area.start);
        let end = self.get_final_position(area.end);
        CellArea::from_corners(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbeg_model::CellArea;

    fn repeat(collection: &str, area: &str, direction: RepeatDirection) -> RepeatRegionSpec {
        RepeatRegionSpec {
            collection: collection.to_string(),
            sheet: "Sheet1".to_string(),
            area: CellArea::parse(area).unwrap(),
            variable: "it".to_string(),
            direction,
            empty_area: None,
        }
    }

    #[test]
    fn single_down_repeat_shifts_rows_below_it() {
        let repeats = vec![repeat("items", "A2:B2", RepeatDirection::Down)];
        let mut sizes = CollectionSizes::new();
        sizes.set("items", 3);
        let calc = PositionCalculator::new(&repeats, &sizes);

        // Row 2 item body expands to rows 2-4; row 5 in the template (e.g. a
        // footer) should land at row 7.
        assert_eq!(calc.get_final_position((4, 0)), (6, 0));
    }

    #[test]
    fn independent_bands_in_different_columns_do_not_affect_each_other() {
        let repeats = vec![
            repeat("left", "A2:A2", RepeatDirection::Down),
            repeat("right", "D2:D2", RepeatDirection::Down),
        ];
        let mut sizes = CollectionSizes::new();
        sizes.set("left", 2);
        sizes.set("right", 5);
        let calc = PositionCalculator::new(&repeats, &sizes);

        // Column A is only affected by `left` (expansion = 1 extra row).
        assert_eq!(calc.get_final_position((3, 0)), (4, 0));
        // Column D is only affected by `right` (expansion = 4 extra rows).
        assert_eq!(calc.get_final_position((3, 3)), (7, 3));
    }

    #[test]
    fn shared_downstream_point_takes_max_of_both_bands() {
        let repeats = vec![
            repeat("left", "A2:A2", RepeatDirection::Down),
            repeat("right", "D2:D2", RepeatDirection::Down),
        ];
        let mut sizes = CollectionSizes::new();
        sizes.set("left", 2);
        sizes.set("right", 5);
        let calc = PositionCalculator::new(&repeats, &sizes);

        // A footer in column F (outside both bands) must clear the taller
        // (right) table, not the sum of both.
        assert_eq!(calc.get_final_position((3, 5)), (7, 5));
    }

    #[test]
    fn range_inside_repeat_expands_by_item_count() {
        let repeats = vec![repeat("items", "A2:B2", RepeatDirection::Down)];
        let mut sizes = CollectionSizes::new();
        sizes.set("items", 4);
        let calc = PositionCalculator::new(&repeats, &sizes);

        let projected = calc.get_final_range(CellArea::parse("A2:B2").unwrap());
        assert_eq!(projected.to_a1(), "A2:B5");
    }

    #[test]
    fn empty_collection_contributes_no_expansion() {
        let repeats = vec![repeat("items", "A2:B2", RepeatDirection::Down)];
        let sizes = CollectionSizes::new();
        let calc = PositionCalculator::new(&repeats, &sizes);
        assert_eq!(calc.get_final_position((4, 0)), (4, 0));
    }
}
