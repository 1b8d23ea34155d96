//! PURPOSE: Parse placeholder strings into typed [`tbeg_model::CellContent`]
//! variants.
//! CONTEXT: The first stage of the pipeline — everything downstream works
//! against `CellContent`, never against raw cell text again.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod resolve;
pub mod token;

use parser::Parser;
use tbeg_model::{CellContent, ErrorKind, TemplateError};

/// A cell's raw value as read off the worksheet XML, before marker parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCellValue {
    Blank,
    Text(String),
    Number(f64),
    Boolean(bool),
    /// Formula text without the leading `=`.
    Formula(String),
}

const MARKER_OPEN: &str = "${";
const ALTERNATE_NAMES: [&str; 3] = ["TBEG_REPEAT", "TBEG_IMAGE", "TBEG_SIZE"];

struct MarkerSpan {
    start: usize,
    end: usize,
    inner: String,
}

/// Finds every non-overlapping `${...}` span in `text`. Markers don't nest,
/// so the first `}` after a `${` always closes it.
fn scan_markers(text: &str) -> Vec<MarkerSpan> {
    let mut spans = Vec::new();
    let mut search_from = 0;
    while let Some(rel_open) = text[search_from..].find(MARKER_OPEN) {
        let open = search_from + rel_open;
        let inner_start = open + MARKER_OPEN.len();
        match text[inner_start..].find('}') {
            Some(rel_close) => {
                let close = inner_start + rel_close;
                spans.push(MarkerSpan {
                    start: open,
                    end: close + 1,
                    inner: text[inner_start..close].to_string(),
                });
                search_from = close + 1;
            }
            None => break,
        }
    }
    spans
}

fn parse_syntax_error(sheet: &str, cell_ref: &str, text: &str) -> TemplateError {
    TemplateError {
        kind: ErrorKind::InvalidRepeatSyntax,
        sheet: sheet.to_string(),
        cell_ref: cell_ref.to_string(),
        text: text.to_string(),
    }
}

fn resolve_inner(sheet: &str, cell_ref: &str, inner: &str) -> Result<CellContent, TemplateError> {
    let expr = Parser::new(inner)
        .parse()
        .map_err(|_| parse_syntax_error(sheet, cell_ref, inner))?;
    resolve::resolve(sheet, cell_ref, inner, expr)
}

/// Parses plain (non-formula) cell text.
fn parse_text(sheet: &str, cell_ref: &str, text: &str) -> Result<CellContent, TemplateError> {
    let spans = scan_markers(text);
    match spans.as_slice() {
        [] => Ok(CellContent::StaticString(text.to_string())),
        [only] if only.start == 0 && only.end == text.len() => {
            resolve_inner(sheet, cell_ref, &only.inner)
        }
        _ => Ok(CellContent::TemplateText(text.to_string())),
    }
}

/// Parses formula text (no leading `=`). `TBEG_REPEAT`/`TBEG_IMAGE`/
/// `TBEG_SIZE` used as the entire formula body resolve structurally, exactly
/// like their `${...}` equivalents; anything else stays a `Formula`, with
/// any embedded `${var}` left in place for render-time substitution.
fn parse_formula(sheet: &str, cell_ref: &str, formula: &str) -> Result<CellContent, TemplateError> {
    let trimmed = formula.trim();
    let upper_name_matches = ALTERNATE_NAMES
        .iter()
        .any(|name| trimmed.to_ascii_uppercase().starts_with(name));
    if upper_name_matches && trimmed.ends_with(')') {
        let expr = Parser::new(trimmed)
            .parse()
            .map_err(|_| parse_syntax_error(sheet, cell_ref, formula))?;
        if let ast::MarkerExpr::Call { ref name, .. } = expr {
            if ALTERNATE_NAMES.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                return resolve::resolve(sheet, cell_ref, formula, expr);
            }
        }
    }
    Ok(CellContent::Formula(format!("={formula}")))
}

/// Parses a worksheet cell's raw value into typed template content.
///
/// `sheet` and `cell_ref` are only used to annotate errors per spec.md
/// §4.1's contract (every `TemplateError` carries the sheet and cell it came
/// from).
pub fn parse_cell(sheet: &str, cell_ref: &str, raw: &RawCellValue) -> Result<CellContent, TemplateError> {
    match raw {
        RawCellValue::Blank => Ok(CellContent::Empty),
        RawCellValue::Number(n) => Ok(CellContent::StaticNumber(*n)),
        RawCellValue::Boolean(b) => Ok(CellContent::StaticBoolean(*b)),
        RawCellValue::Text(s) => parse_text(sheet, cell_ref, s),
        RawCellValue::Formula(f) => parse_formula(sheet, cell_ref, f),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbeg_model::RepeatDirection;

    #[test]
    fn blank_and_scalar_values_pass_through() {
        assert_eq!(parse_cell("S", "A1", &RawCellValue::Blank).unwrap(), CellContent::Empty);
        assert_eq!(
            parse_cell("S", "A1", &RawCellValue::Number(3.5)).unwrap(),
            CellContent::StaticNumber(3.5)
        );
        assert_eq!(
            parse_cell("S", "A1", &RawCellValue::Boolean(true)).unwrap(),
            CellContent::StaticBoolean(true)
        );
    }

    #[test]
    fn plain_text_with_no_marker_is_static() {
        assert_eq!(
            parse_cell("S", "A1", &RawCellValue::Text("hello".into())).unwrap(),
            CellContent::StaticString("hello".into())
        );
    }

    #[test]
    fn whole_cell_variable_marker_resolves_to_variable() {
        assert_eq!(
            parse_cell("S", "A1", &RawCellValue::Text("${title}".into())).unwrap(),
            CellContent::Variable("title".into())
        );
    }

    #[test]
    fn embedded_marker_in_literal_text_becomes_template_text() {
        let content = parse_cell("S", "A1", &RawCellValue::Text("Hello ${name}!".into())).unwrap();
        assert_eq!(content, CellContent::TemplateText("Hello ${name}!".into()));
    }

    #[test]
    fn repeat_marker_round_trips_through_dollar_brace_form() {
        let content = parse_cell(
            "S",
            "A1",
            &RawCellValue::Text("${repeat(items, A2:B2, it, DOWN)}".into()),
        )
        .unwrap();
        match content {
            CellContent::RepeatMarker(m) => {
                assert_eq!(m.collection, "items");
                assert_eq!(m.direction, RepeatDirection::Down);
            }
            _ => panic!("expected repeat marker"),
        }
    }

    #[test]
    fn plain_formula_without_markers_is_formula() {
        let content = parse_cell("S", "B1", &RawCellValue::Formula("SUM(A2:A6)".into())).unwrap();
        assert_eq!(content, CellContent::Formula("=SUM(A2:A6)".into()));
    }

    #[test]
    fn formula_with_embedded_variable_keeps_marker_text() {
        let content = parse_cell("S", "B1", &RawCellValue::Formula("A1&\"${suffix}\"".into())).unwrap();
        assert_eq!(content, CellContent::Formula("=A1&\"${suffix}\"".into()));
    }

    #[test]
    fn alternate_formula_spelling_resolves_structurally() {
        let content = parse_cell(
            "S",
            "A1",
            &RawCellValue::Formula("TBEG_REPEAT(items, A2:B2)".into()),
        )
        .unwrap();
        assert!(matches!(content, CellContent::RepeatMarker(_)));
    }

    #[test]
    fn malformed_marker_reports_sheet_and_cell() {
        let err = parse_cell("Sheet1", "C3", &RawCellValue::Text("${repeat(}".into())).unwrap_err();
        assert_eq!(err.sheet, "Sheet1");
        assert_eq!(err.cell_ref, "C3");
    }
}
