//! PURPOSE: Rewrites cell and range references inside formula text so they
//! keep pointing at the right data after repeat expansion, spec.md §4.6.
//! CONTEXT: Formulas are scanned segment by segment — string literals are
//! left untouched, and within the remaining text a single regex recognizes
//! an optional sheet qualifier followed by a cell or range reference. This
//! mirrors the regex-over-full-parse approach `tbeg-ooxml` uses for package
//! XML: formulas are rewritten in place rather than parsed into a full AST.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tbeg_model::{CellArea, FormulaExpansionError};
use tbeg_position::PositionCalculator;

/// Excel's worksheet bounds (rows 1..=1_048_576, columns A..=XFD).
const MAX_ROW: u32 = 1_048_576;
const MAX_COL: u32 = 16_384;

// `regex` has no lookahead, so a trailing `(` (making this a function call
// like `LOG10(` or `ATAN2(`, not a cell reference) is captured as part of
// the match instead of excluded from it — `rewrite_segment` checks for it
// and passes the whole match through unchanged when present. Mirrors the
// teacher's parser checking for a following `(` before treating an
// identifier as a cell ref (examples/DanielSallander-Calcula/core/parser/src/parser.rs).
static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:(?:'(?P<qsheet>[^']+)'|(?P<sheet>[A-Za-z_][A-Za-z0-9_.]*))!)?(?P<c1>\$?[A-Za-z]{1,3})(?P<r1>\$[0-9]+|[0-9]+)(?::(?P<c2>\$?[A-Za-z]{1,3})(?P<r2>\$[0-9]+|[0-9]+))?(?P<func>\()?"#,
    )
    .expect("valid regex")
});

/// Splits `text` into alternating (outside-quotes, inside-quotes) segments.
/// Excel escapes a literal `"` inside a string literal by doubling it.
fn split_quoted(text: &str) -> Vec<(String, bool)> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = text.char_indices().peekable();
    let mut in_quotes = false;

    while let Some((_, ch)) = chars.next() {
        if ch == '"' {
            if in_quotes && chars.peek().map(|(_, c)| *c) == Some('"') {
                current.push('"');
                current.push('"');
                chars.next();
                continue;
            }
            current.push('"');
            segments.push((std::mem::take(&mut current), in_quotes));
            in_quotes = !in_quotes;
        } else {
            current.push(ch);
        }
    }
    segments.push((current, in_quotes));
    segments
}

fn strip_dollar(s: &str) -> (bool, &str) {
    match s.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, s),
    }
}

/// Rewrites every cell/range reference in `formula` (without the leading
/// `=`), projecting through `calculators` (keyed by sheet name).
/// `current_sheet` is used for unqualified references.
pub fn rewrite_formula(
    formula: &str,
    current_sheet: &str,
    cell_ref: &str,
    calculators: &HashMap<String, PositionCalculator>,
) -> Result<String, FormulaExpansionError> {
    let mut out = String::with_capacity(formula.len());
    for (segment, in_quotes) in split_quoted(formula) {
        if in_quotes {
            out.push_str(&segment);
            continue;
        }
        out.push_str(&rewrite_segment(&segment, current_sheet, cell_ref, formula, calculators)?);
    }
    Ok(out)
}

fn rewrite_segment(
    segment: &str,
    current_sheet: &str,
    cell_ref: &str,
    full_formula: &str,
    calculators: &HashMap<String, PositionCalculator>,
) -> Result<String, FormulaExpansionError> {
    let mut out = String::with_capacity(segment.len());
    let mut last_end = 0;

    for caps in REFERENCE_RE.captures_iter(segment) {
        let whole = caps.get(0).unwrap();
        out.push_str(&segment[last_end..whole.start()]);
        last_end = whole.end();

        if caps.name("func").is_some() {
            // `LOG10(`, `ATAN2(`, etc. — a function name, not a cell reference.
            out.push_str(whole.as_str());
            continue;
        }

        let sheet_name = caps
            .name("qsheet")
            .or_else(|| caps.name("sheet"))
            .map(|m| m.as_str().to_string());
        let sheet_for_lookup = sheet_name.clone().unwrap_or_else(|| current_sheet.to_string());

        let Some(calculator) = calculators.get(&sheet_for_lookup) else {
            // Sheet outside this render's scope (or not a repeat target on
            // any sheet we track) — reference passes through unchanged.
            out.push_str(whole.as_str());
            continue;
        };

        let (c1_abs, c1) = strip_dollar(&caps["c1"]);
        let (r1_abs, r1) = strip_dollar(&caps["r1"]);
        let col1 = tbeg_model::col_to_index(c1);
        let row1: u32 = r1.parse().map_err(|_| expansion_error(current_sheet, cell_ref, full_formula))?;
        if row1 == 0 {
            out.push_str(whole.as_str());
            continue;
        }

        let rewritten = if let (Some(c2m), Some(r2m)) = (caps.name("c2"), caps.name("r2")) {
            let (c2_abs, c2) = strip_dollar(c2m.as_str());
            let (r2_abs, r2) = strip_dollar(r2m.as_str());
            let col2 = tbeg_model::col_to_index(c2);
            let row2: u32 = r2.parse().map_err(|_| expansion_error(current_sheet, cell_ref, full_formula))?;

            let area = CellArea::from_corners((row1 - 1, col1), (row2 - 1, col2));
            let projected = calculator.get_final_range(area);
            check_bounds(&projected, current_sheet, cell_ref, full_formula)?;

            format!(
                "{}{}{}{}:{}{}{}",
                sheet_prefix(&sheet_name),
                if c1_abs { "$" } else { "" },
                tbeg_model::index_to_col(projected.start.1),
                if r1_abs { format!("${}", projected.start.0 + 1) } else { (projected.start.0 + 1).to_string() },
                if c2_abs { "$" } else { "" },
                tbeg_model::index_to_col(projected.end.1),
                if r2_abs { format!("${}", projected.end.0 + 1) } else { (projected.end.0 + 1).to_string() },
            )
        } else {
            let (final_row, final_col) = calculator.get_final_position((row1 - 1, col1));
            if final_row >= MAX_ROW || final_col >= MAX_COL {
                return Err(expansion_error(current_sheet, cell_ref, full_formula));
            }
            format!(
                "{}{}{}{}{}",
                sheet_prefix(&sheet_name),
                if c1_abs { "$" } else { "" },
                tbeg_model::index_to_col(final_col),
                if r1_abs { "$" } else { "" },
                final_row + 1,
            )
        };

        out.push_str(&rewritten);
    }
    out.push_str(&segment[last_end..]);
    Ok(out)
}

fn sheet_prefix(sheet: &Option<String>) -> String {
    match sheet {
        Some(s) if s.contains(' ') => format!("'{s}'!"),
        Some(s) => format!("{s}!"),
        None => String::new(),
    }
}

fn check_bounds(
    area: &CellArea,
    sheet: &str,
    cell_ref: &str,
    formula: &str,
) -> Result<(), FormulaExpansionError> {
    if area.end.0 >= MAX_ROW || area.end.1 >= MAX_COL {
        Err(expansion_error(sheet, cell_ref, formula))
    } else {
        Ok(())
    }
}

fn expansion_error(sheet: &str, cell_ref: &str, formula: &str) -> FormulaExpansionError {
    FormulaExpansionError {
        sheet: sheet.to_string(),
        cell_ref: cell_ref.to_string(),
        formula: formula.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbeg_model::{CollectionSizes, RepeatDirection, RepeatRegionSpec};

    fn calculators_with_down_repeat(item_count: usize) -> HashMap<String, PositionCalculator> {
        let repeats = vec![RepeatRegionSpec {
            collection: "items".to_string(),
            sheet: "Sheet1".to_string(),
            area: CellArea::parse("A2:A2").unwrap(),
            variable: "it".to_string(),
            direction: RepeatDirection::Down,
            empty_area: None,
        }];
        let mut sizes = CollectionSizes::new();
        sizes.set("items", item_count);
        let mut map = HashMap::new();
        map.insert("Sheet1".to_string(), PositionCalculator::new(&repeats, &sizes));
        map
    }

    #[test]
    fn rewrites_range_across_expansion() {
        let calculators = calculators_with_down_repeat(5);
        let rewritten = rewrite_formula("SUM(A2:A2)", "Sheet1", "B1", &calculators).unwrap();
        assert_eq!(rewritten, "SUM(A2:A6)");
    }

    #[test]
    fn leaves_unaffected_reference_untouched() {
        let calculators = calculators_with_down_repeat(5);
        let rewritten = rewrite_formula("C1+1", "Sheet1", "D1", &calculators).unwrap();
        assert_eq!(rewritten, "C1+1");
    }

    #[test]
    fn preserves_absolute_markers() {
        let calculators = calculators_with_down_repeat(3);
        let rewritten = rewrite_formula("$A$2", "Sheet1", "B1", &calculators).unwrap();
        assert_eq!(rewritten, "$A$2");
    }

    #[test]
    fn string_literals_are_left_untouched() {
        let calculators = calculators_with_down_repeat(5);
        let rewritten = rewrite_formula(r#"A1&"A2 is not a ref""#, "Sheet1", "B1", &calculators).unwrap();
        assert_eq!(rewritten, r#"A1&"A2 is not a ref""#);
    }

    #[test]
    fn cross_sheet_reference_uses_that_sheets_calculator() {
        let calculators = calculators_with_down_repeat(4);
        let rewritten = rewrite_formula("Sheet1!A2", "Sheet2", "B1", &calculators).unwrap();
        assert_eq!(rewritten, "Sheet1!A2");
    }

    #[test]
    fn function_names_ending_in_digits_are_not_treated_as_cell_references() {
        let calculators = calculators_with_down_repeat(5);
        let rewritten = rewrite_formula("LOG10(A2)", "Sheet1", "B1", &calculators).unwrap();
        assert_eq!(rewritten, "LOG10(A6)");

        let rewritten = rewrite_formula("ATAN2(A2,A2)", "Sheet1", "B1", &calculators).unwrap();
        assert_eq!(rewritten, "ATAN2(A6,A6)");
    }
}
