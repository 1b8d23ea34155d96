//! PURPOSE: Rewrites `<c:f>` cell/range references inside chart XML after
//! render, spec.md §4.8.

use once_cell::sync::Lazy;
use regex::Regex;
use tbeg_model::{parse_a1, CellArea};
use tbeg_position::PositionCalculator;

static FORMULA_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<c:f>([^<]+)</c:f>"#).expect("valid regex"));
static REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:'([^']+)'|([A-Za-z_][A-Za-z0-9_]*))?!(\$?[A-Za-z]{1,3}\$?[0-9]+)(?::(\$?[A-Za-z]{1,3}\$?[0-9]+))?"#)
        .expect("valid regex")
});

fn strip_dollars(s: &str) -> String {
    s.chars().filter(|c| *c != '$').collect()
}

/// Rewrites every `<c:f>` series reference in `chart_xml`, projecting
/// through `calculator` (the originating sheet's `PositionCalculator`).
pub fn rewrite_chart_references(chart_xml: &str, calculator: &PositionCalculator) -> String {
    FORMULA_TAG_RE
        .replace_all(chart_xml, |caps: &regex::Captures| {
            let original = &caps[1];
            let Some(ref_caps) = REF_RE.captures(original) else {
                return format!("<c:f>{original}</c:f>");
            };

            let sheet_prefix = ref_caps
                .get(1)
                .or_else(|| ref_caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or("");
            let start_ref = strip_dollars(&ref_caps[3]);
            let Some(start) = parse_a1(&start_ref) else {
                return format!("<c:f>{original}</c:f>");
            };

            let rewritten = if let Some(end_m) = ref_caps.get(4) {
                let end_ref = strip_dollars(end_m.as_str());
                let Some(end) = parse_a1(&end_ref) else {
                    return format!("<c:f>{original}</c:f>");
                };
                let projected = calculator.get_final_range(CellArea::from_corners(start, end));
                projected.to_a1()
            } else {
                let (row, col) = calculator.get_final_position(start);
                tbeg_model::coord_to_a1((row, col))
            };

            let sheet_part = if sheet_prefix.contains(' ') {
                format!("'{sheet_prefix}'!")
            } else if !sheet_prefix.is_empty() {
                format!("{sheet_prefix}!")
            } else {
                String::new()
            };

            format!("<c:f>{sheet_part}{rewritten}</c:f>")
        })
        .into_owned()
}
