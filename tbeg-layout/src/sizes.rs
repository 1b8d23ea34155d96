//! PURPOSE: Column width / row height snapshot and restore, spec.md §4.7.
//! CONTEXT: Extraction reads worksheet XML with regex, the same
//! DOM-avoiding style `tbeg-ooxml` uses for content types and relationships;
//! restore expands a template index set into final indices via
//! `PositionCalculator`, mirroring the axis-generic approach
//! `tbeg-position::bands` uses for row/column bands.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tbeg_model::{RepeatDirection, RepeatRegionSpec};
use tbeg_position::PositionCalculator;

static COL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<col\s+min="(\d+)"\s+max="(\d+)"\s+width="([\d.]+)"[^/]*/>"#).expect("valid regex")
});

static ROW_HEIGHT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<row\s+r="(\d+)"[^>]*\bht="([\d.]+)"[^>]*>"#).expect("valid regex")
});

/// One-based column/row index to size, as found in the template XML.
pub type SizeMap = HashMap<u32, f64>;

/// Extracts `{colIndex (0-based) -> width}` from a `<cols>...</cols>` block
/// (or the whole worksheet XML, since the regex only matches `<col>` tags).
pub fn extract_column_widths(xml: &str) -> SizeMap {
    let mut widths = SizeMap::new();
    for caps in COL_RE.captures_iter(xml) {
        let min: u32 = caps[1].parse().unwrap_or(1);
        let max: u32 = caps[2].parse().unwrap_or(min);
        let width: f64 = caps[3].parse().unwrap_or(0.0);
        for col in min..=max {
            widths.insert(col - 1, width);
        }
    }
    widths
}

/// Extracts `{rowIndex (0-based) -> height}` from worksheet XML `<row>`
/// elements carrying an explicit `ht` attribute.
pub fn extract_row_heights(xml: &str) -> SizeMap {
    let mut heights = SizeMap::new();
    for caps in ROW_HEIGHT_RE.captures_iter(xml) {
        let row: u32 = caps[1].parse().unwrap_or(1);
        let height: f64 = caps[2].parse().unwrap_or(0.0);
        heights.insert(row - 1, height);
    }
    heights
}

/// Renders a `<cols>...</cols>` block from a final `{colIndex -> width}` map,
/// one `<col>` per entry (OOXML's `min`/`max` are both one-based and
/// inclusive, so a single column becomes `min == max`).
pub fn render_cols_block(widths: &SizeMap) -> String {
    if widths.is_empty() {
        return String::new();
    }
    let mut entries: Vec<(&u32, &f64)> = widths.iter().collect();
    entries.sort_by_key(|(col, _)| **col);
    let mut xml = String::from("<cols>");
    for (col, width) in entries {
        xml.push_str(&format!(
            r#"<col min="{0}" max="{0}" width="{1}" customWidth="1"/>"#,
            col + 1,
            width
        ));
    }
    xml.push_str("</cols>");
    xml
}

fn find_repeat_covering(repeats: &[RepeatRegionSpec], index: u32, along_row: bool) -> Option<&RepeatRegionSpec> {
    repeats.iter().find(|r| {
        if along_row {
            index >= r.area.start.0 && index <= r.area.end.0
        } else {
            index >= r.area.start.1 && index <= r.area.end.1
        }
    })
}

/// Expands a template `{index -> size}` map into final indices.
///
/// A row (or column) not covered by any repeat is projected once through
/// the calculator. A row covered by a `Down` repeat duplicates its height
/// once per item (spec.md §4.7: "rows within an expanded repeat inherit the
/// repeat's template row height"); a column covered by a `Right` repeat
/// duplicates symmetrically. Rows/columns that merely sit inside the
/// *other* axis's repeat area (e.g. row height for a `Right` repeat) are
/// projected as a single point, since that axis doesn't grow.
pub fn expand_sizes(
    template: &SizeMap,
    repeats: &[RepeatRegionSpec],
    calculator: &PositionCalculator,
    along_row: bool,
) -> SizeMap {
    let mut result = SizeMap::new();
    for (&index, &size) in template {
        let covering = find_repeat_covering(repeats, index, along_row);
        let grows_here = covering.map_or(false, |r| {
            (along_row && r.direction == RepeatDirection::Down)
                || (!along_row && r.direction == RepeatDirection::Right)
        });

        if let (Some(repeat), true) = (covering, grows_here) {
            let repeat_index = repeats.iter().position(|r| std::ptr::eq(r, repeat)).unwrap();
            let expansion = calculator.expansion(repeat_index);
            let span = if along_row { repeat.area.row_span() } else { repeat.area.col_span() };
            let base = if along_row {
                calculator.get_final_position((index, repeat.area.start.1)).0
            } else {
                calculator.get_final_position((repeat.area.start.0, index)).1
            };
            for item in 0..expansion.item_count.max(1) as u32 {
                result.insert(base + item * span, size);
            }
        } else {
            let final_index = if along_row {
                calculator.get_final_position((index, 0)).0
            } else {
                calculator.get_final_position((0, index)).1
            };
            result.insert(final_index, size);
        }
    }
    result
}
