//! PURPOSE: Groups same-direction repeats into disjoint bands, spec.md §4.4
//! step 1. `Down` repeats are grouped by overlapping column ranges (they
//! stack vertically within a shared set of columns); `Right` repeats are
//! grouped, symmetrically, by overlapping row ranges.

use tbeg_model::{CellArea, RepeatRegionSpec};

/// One repeat's position within a band, plus the expansion it contributes
/// along the band's axis.
#[derive(Debug, Clone, Copy)]
pub struct RepeatEntry {
    pub repeat_index: usize,
    pub area: CellArea,
    pub expansion: u32,
}

/// A group of same-direction repeats whose cross-axis extents overlap.
pub struct Band {
    /// Column extent (`Down` bands) or row extent (`Right` bands),
    /// inclusive.
    pub cross_extent: (u32, u32),
    /// Entries sorted by their along-axis start position.
    entries: Vec<RepeatEntry>,
    /// `cumulative_before[i]` is the sum of expansions of every entry before
    /// index `i` in `entries`.
    cumulative_before: Vec<u32>,
    along_is_row: bool,
}

impl Band {
    fn along_end(&self, area: &CellArea) -> u32 {
        if self.along_is_row {
            area.end.0
        } else {
            area.end.1
        }
    }

    /// Sum of expansions of every entry in this band whose area ends before
    /// `along` — i.e. entries strictly upstream of the query point.
    pub fn shift_before(&self, along: u32) -> u32 {
        let mut total = 0;
        for (i, entry) in self.entries.iter().enumerate() {
            if self.along_end(&entry.area) < along {
                total = self.cumulative_before[i] + entry.expansion;
            }
        }
        total
    }

    pub fn contains_cross(&self, value: u32) -> bool {
        value >= self.cross_extent.0 && value <= self.cross_extent.1
    }

    pub fn entries(&self) -> &[RepeatEntry] {
        &self.entries
    }
}

fn build_bands(
    members: Vec<(usize, CellArea, u32)>,
    cross_of: impl Fn(&CellArea) -> (u32, u32),
    along_start_of: impl Fn(&CellArea) -> u32,
    along_is_row: bool,
) -> Vec<Band> {
    let mut sortable: Vec<(u32, u32, RepeatEntry)> = members
        .into_iter()
        .map(|(idx, area, expansion)| {
            let (lo, hi) = cross_of(&area);
            (
                lo,
                hi,
                RepeatEntry {
                    repeat_index: idx,
                    area,
                    expansion,
                },
            )
        })
        .collect();
    sortable.sort_by_key(|(lo, ..)| *lo);

    let mut raw_bands: Vec<(u32, u32, Vec<RepeatEntry>)> = Vec::new();
    for (lo, hi, entry) in sortable {
        if let Some(last) = raw_bands.last_mut() {
            if lo <= last.1 {
                last.1 = last.1.max(hi);
                last.2.push(entry);
                continue;
            }
        }
        raw_bands.push((lo, hi, vec![entry]));
    }

    raw_bands
        .into_iter()
        .map(|(lo, hi, mut entries)| {
            entries.sort_by_key(|e| along_start_of(&e.area));
            let mut cumulative_before = Vec::with_capacity(entries.len());
            let mut running = 0;
            for entry in &entries {
                cumulative_before.push(running);
                running += entry.expansion;
            }
            Band {
                cross_extent: (lo, hi),
                entries,
                cumulative_before,
                along_is_row,
            }
        })
        .collect()
}

/// Builds bands for `Down` repeats: grouped by overlapping column ranges,
/// stacking by row within a band.
pub fn build_down_bands(repeats: &[(usize, &RepeatRegionSpec)], row_expansions: &[u32]) -> Vec<Band> {
    let members = repeats
        .iter()
        .map(|(idx, r)| (*idx, r.area, row_expansions[*idx]))
        .collect();
    build_bands(
        members,
        |area| (area.start.1, area.end.1),
        |area| area.start.0,
        true,
    )
}

/// Builds bands for `Right` repeats: grouped by overlapping row ranges,
/// stacking by column within a band.
pub fn build_right_bands(repeats: &[(usize, &RepeatRegionSpec)], col_expansions: &[u32]) -> Vec<Band> {
    let members = repeats
        .iter()
        .map(|(idx, r)| (*idx, r.area, col_expansions[*idx]))
        .collect();
    build_bands(
        members,
        |area| (area.start.0, area.end.0),
        |area| area.start.1,
        false,
    )
}
