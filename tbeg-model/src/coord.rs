//! PURPOSE: Coordinate types shared by every stage of the pipeline.
//! CONTEXT: Mirrors the A1 <-> (row, col) conversions every processor needs
//! when walking template cells or rewriting formula tokens. Row and column
//! indices are zero-based throughout; only the A1 textual form is one-based.

use std::cmp::{max, min};
use std::fmt;

/// A cell coordinate as (row, col) with zero-based indices.
pub type CellCoord = (u32, u32);

/// Converts a column string (e.g. "A", "AA", "ABC") to a 0-based column index.
///
/// # Panics
/// Panics if `col_str` contains non-alphabetic characters; callers that parse
/// untrusted A1 references should validate with [`is_valid_col_str`] first.
pub fn col_to_index(col_str: &str) -> u32 {
    let mut result: u32 = 0;
    for c in col_str.chars() {
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        result = result * 26 + digit;
    }
    result - 1
}

/// Returns true if every character of `col_str` is an ASCII letter.
pub fn is_valid_col_str(col_str: &str) -> bool {
    !col_str.is_empty() && col_str.chars().all(|c| c.is_ascii_alphabetic())
}

/// Converts a 0-based column index to a column string ("A", "AA", ...).
pub fn index_to_col(mut col_index: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col_index % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col_index < 26 {
            break;
        }
        col_index = col_index / 26 - 1;
    }
    result
}

/// Converts an A1-style column/row pair to a 0-based [`CellCoord`].
pub fn a1_to_coord(col_str: &str, row_num: u32) -> CellCoord {
    (row_num - 1, col_to_index(col_str))
}

/// Converts a 0-based [`CellCoord`] to its A1-style reference string.
pub fn coord_to_a1(coord: CellCoord) -> String {
    let (row, col) = coord;
    format!("{}{}", index_to_col(col), row + 1)
}

/// Splits a raw A1 reference like "AA100" or "$B$7" into (column letters, row).
/// Dollar signs marking absolute references are stripped; callers that care
/// about absoluteness should check for `$` before calling this.
pub fn split_a1_ref(reference: &str) -> Option<(String, u32)> {
    let cleaned: String = reference.chars().filter(|c| *c != '$').collect();
    let split_at = cleaned.find(|c: char| c.is_ascii_digit())?;
    let (col_part, row_part) = cleaned.split_at(split_at);
    if col_part.is_empty() || row_part.is_empty() {
        return None;
    }
    if !is_valid_col_str(col_part) {
        return None;
    }
    let row_num: u32 = row_part.parse().ok()?;
    if row_num == 0 {
        return None;
    }
    Some((col_part.to_string(), row_num))
}

/// Parses a bare A1 reference ("B2") into a zero-based [`CellCoord`].
pub fn parse_a1(reference: &str) -> Option<CellCoord> {
    let (col, row) = split_a1_ref(reference)?;
    Some(a1_to_coord(&col, row))
}

/// A rectangular area of cells, inclusive on both corners.
///
/// Invariant: `start.0 <= end.0` and `start.1 <= end.1`. Use [`CellArea::new`]
/// or [`CellArea::from_corners`] to construct one normalized from arbitrary
/// corner order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellArea {
    pub start: CellCoord,
    pub end: CellCoord,
}

impl CellArea {
    /// Builds an area from already-normalized corners. Panics in debug builds
    /// if `start` is not top-left of `end`.
    pub fn new(start: CellCoord, end: CellCoord) -> Self {
        debug_assert!(start.0 <= end.0 && start.1 <= end.1);
        CellArea { start, end }
    }

    /// Builds an area from two arbitrary corners, normalizing their order.
    pub fn from_corners(a: CellCoord, b: CellCoord) -> Self {
        CellArea {
            start: (min(a.0, b.0), min(a.1, b.1)),
            end: (max(a.0, b.0), max(a.1, b.1)),
        }
    }

    /// A single-cell area.
    pub fn single(coord: CellCoord) -> Self {
        CellArea::new(coord, coord)
    }

    pub fn row_span(&self) -> u32 {
        self.end.0 - self.start.0 + 1
    }

    pub fn col_span(&self) -> u32 {
        self.end.1 - self.start.1 + 1
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.0 >= self.start.0
            && coord.0 <= self.end.0
            && coord.1 >= self.start.1
            && coord.1 <= self.end.1
    }

    /// Two areas overlap if their row and column ranges both intersect.
    pub fn overlaps(&self, other: &CellArea) -> bool {
        self.start.0 <= other.end.0
            && other.start.0 <= self.end.0
            && self.start.1 <= other.end.1
            && other.start.1 <= self.end.1
    }

    /// Shifts both corners by `(rows, cols)`.
    pub fn shifted(&self, rows: u32, cols: u32) -> Self {
        CellArea {
            start: (self.start.0 + rows, self.start.1 + cols),
            end: (self.end.0 + rows, self.end.1 + cols),
        }
    }

    /// Parses an A1 range such as "A1:C3" or a bare cell "A1" (treated as a
    /// single-cell area).
    pub fn parse(range: &str) -> Option<Self> {
        if let Some((start_ref, end_ref)) = range.split_once(':') {
            let start = parse_a1(start_ref)?;
            let end = parse_a1(end_ref)?;
            Some(CellArea::from_corners(start, end))
        } else {
            parse_a1(range).map(CellArea::single)
        }
    }

    /// Renders back to A1 notation, e.g. "A1:C3" (or "A1" for a single cell).
    pub fn to_a1(&self) -> String {
        if self.start == self.end {
            coord_to_a1(self.start)
        } else {
            format!("{}:{}", coord_to_a1(self.start), coord_to_a1(self.end))
        }
    }
}

impl fmt::Display for CellArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

/// A reference to a sheet by name. `None` means "the current sheet" — the
/// sheet the marker or formula cell lives on.
pub type SheetRef = Option<String>;

/// Direction a repeat region expands along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatDirection {
    Down,
    Right,
}

impl Default for RepeatDirection {
    fn default() -> Self {
        RepeatDirection::Down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn col_round_trip() {
        for i in 0..1000 {
            let s = index_to_col(i);
            assert_eq!(col_to_index(&s), i, "round trip failed for {i}");
        }
    }

    #[test]
    fn a1_round_trip() {
        assert_eq!(a1_to_coord("A", 1), (0, 0));
        assert_eq!(a1_to_coord("AA", 100), (99, 26));
        assert_eq!(coord_to_a1((0, 0)), "A1");
        assert_eq!(coord_to_a1((99, 26)), "AA100");
    }

    #[test]
    fn parses_absolute_references() {
        assert_eq!(parse_a1("$B$7"), parse_a1("B7"));
    }

    #[test]
    fn area_parse_and_render() {
        let area = CellArea::parse("A2:B2").unwrap();
        assert_eq!(area.row_span(), 1);
        assert_eq!(area.col_span(), 2);
        assert_eq!(area.to_a1(), "A2:B2");
    }

    #[test]
    fn area_normalizes_reversed_corners() {
        let area = CellArea::from_corners((5, 5), (1, 1));
        assert_eq!(area.start, (1, 1));
        assert_eq!(area.end, (5, 5));
    }

    #[test]
    fn area_overlap_detection() {
        let a = CellArea::parse("A1:B2").unwrap();
        let b = CellArea::parse("B2:C3").unwrap();
        let c = CellArea::parse("D1:E2").unwrap();
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
