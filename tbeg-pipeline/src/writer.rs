//! PURPOSE: Turns a `RenderedSheet` back into worksheet XML — the
//! XmlVariableReplace stage's core — plus the template-origin coordinate
//! map that stage and NumberFormat both need for style reuse, and the
//! small value conversions PivotRecreate needs to read rendered cells back
//! out as plain data.
//! CONTEXT: `tbeg_render::render::render_sheet_into` already walks a
//! sheet's non-repeat cells and repeat bodies to resolve values; the
//! origin map below repeats that exact traversal to pair final
//! coordinates with their template coordinate instead, since the render
//! pass's `sink` callback never sees the template coordinate it came from.

use regex::Regex;
use std::collections::HashMap;
use tbeg_collection::CollectionBufferManager;
use tbeg_marker::RawCellValue;
use tbeg_model::{coord_to_a1, CellArea, CellCoord, DataValue, RepeatDirection, SheetSpec, TbegError, TbegResult};
use tbeg_render::render::RenderedSheet;
use tbeg_render::value::RenderedValue;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// For every final coordinate a sheet renders into, the template coordinate
/// it was resolved from — non-repeat cells map to themselves, repeat-body
/// cells map to whichever template row/column produced that expansion.
pub fn template_origin_map(
    sheet: &SheetSpec,
    calculator: &tbeg_position::PositionCalculator,
    buffers: &CollectionBufferManager,
) -> TbegResult<HashMap<CellCoord, CellCoord>> {
    let mut origins = HashMap::new();

    for (&coord, content) in &sheet.cells {
        if content.is_repeat() {
            continue;
        }
        if sheet.repeats.iter().any(|r| r.area.contains(coord)) {
            continue;
        }
        origins.insert(calculator.get_final_position(coord), coord);
    }

    for repeat in &sheet.repeats {
        let size = buffers.size(&repeat.collection).map_err(|e| TbegError::PackageIo(e.to_string()))?;
        if size == 0 {
            continue;
        }
        let template_coords: Vec<CellCoord> =
            sheet.cells.keys().copied().filter(|c| repeat.area.contains(*c)).collect();

        for index in 0..size {
            for &coord in &template_coords {
                let base = calculator.get_final_position(coord);
                let final_coord = match repeat.direction {
                    RepeatDirection::Down => (base.0 + (index as u32) * repeat.area.row_span(), base.1),
                    RepeatDirection::Right => (base.0, base.1 + (index as u32) * repeat.area.col_span()),
                };
                origins.insert(final_coord, coord);
            }
        }
    }

    Ok(origins)
}

/// Renders one resolved value as a `<c>` element, reusing `style` (a
/// template style index) verbatim when given.
pub fn render_cell_xml(coord: CellCoord, value: &RenderedValue, style: Option<&str>) -> String {
    let r = coord_to_a1(coord);
    let s_attr = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
    match value {
        RenderedValue::Empty => format!(r#"<c r="{r}"{s_attr}/>"#),
        RenderedValue::Text(text) if text.is_empty() => format!(r#"<c r="{r}"{s_attr}/>"#),
        RenderedValue::Text(text) => {
            format!(r#"<c r="{r}"{s_attr} t="inlineStr"><is><t>{}</t></is></c>"#, escape(text))
        }
        RenderedValue::Number(n) => format!(r#"<c r="{r}"{s_attr}><v>{n}</v></c>"#),
        RenderedValue::Boolean(b) => {
            format!(r#"<c r="{r}"{s_attr} t="b"><v>{}</v></c>"#, if *b { 1 } else { 0 })
        }
        RenderedValue::Formula(formula) => {
            let body = formula.strip_prefix('=').unwrap_or(formula);
            format!(r#"<c r="{r}"{s_attr}><f>{}</f></c>"#, escape(body))
        }
    }
}

/// Renders one template cell verbatim at `target`, for empty-area
/// substitutions — these copy the marker's declared placeholder region
/// as-is rather than resolving it against data.
pub fn render_raw_cell_xml(target: CellCoord, raw: &RawCellValue, style: Option<&str>) -> String {
    let r = coord_to_a1(target);
    let s_attr = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
    match raw {
        RawCellValue::Blank => format!(r#"<c r="{r}"{s_attr}/>"#),
        RawCellValue::Text(text) => {
            format!(r#"<c r="{r}"{s_attr} t="inlineStr"><is><t>{}</t></is></c>"#, escape(text))
        }
        RawCellValue::Number(n) => format!(r#"<c r="{r}"{s_attr}><v>{n}</v></c>"#),
        RawCellValue::Boolean(b) => {
            format!(r#"<c r="{r}"{s_attr} t="b"><v>{}</v></c>"#, if *b { 1 } else { 0 })
        }
        RawCellValue::Formula(formula) => format!(r#"<c r="{r}"{s_attr}><f>{}</f></c>"#, escape(formula)),
    }
}

/// Shifts `source_cells` (raw template cells restricted to `source`) so
/// they land starting at `target_start`, rendering each as XML.
pub fn render_empty_substitution(
    source_cells: &[(CellCoord, RawCellValue)],
    styles: &HashMap<CellCoord, String>,
    source: CellArea,
    target_start: CellCoord,
) -> Vec<(CellCoord, String)> {
    let row_offset = target_start.0 as i64 - source.start.0 as i64;
    let col_offset = target_start.1 as i64 - source.start.1 as i64;

    source_cells
        .iter()
        .filter(|(coord, _)| source.contains(*coord))
        .map(|(coord, raw)| {
            let target = ((coord.0 as i64 + row_offset) as u32, (coord.1 as i64 + col_offset) as u32);
            let style = styles.get(coord).map(|s| s.as_str());
            (target, render_raw_cell_xml(target, raw, style))
        })
        .collect()
}

/// Groups rendered `<c>` elements into `<row>` blocks and splices the
/// result in place of the worksheet's existing `<sheetData>`.
pub fn splice_sheet_data(worksheet_xml: &str, mut cells: Vec<(CellCoord, String)>) -> String {
    cells.sort_by_key(|(coord, _)| *coord);

    let mut rows: Vec<(u32, Vec<String>)> = Vec::new();
    for (coord, xml) in cells {
        match rows.last_mut() {
            Some((row, row_cells)) if *row == coord.0 => row_cells.push(xml),
            _ => rows.push((coord.0, vec![xml])),
        }
    }

    let mut body = String::new();
    for (row, row_cells) in rows {
        body.push_str(&format!(r#"<row r="{}">{}</row>"#, row + 1, row_cells.concat()));
    }
    let sheet_data = format!("<sheetData>{body}</sheetData>");

    let re = Regex::new(r"(?s)<sheetData(?:\s[^>]*)?>.*?</sheetData>|<sheetData(?:\s[^>]*)?/>")
        .expect("valid regex");
    if re.is_match(worksheet_xml) {
        re.replace(worksheet_xml, regex::NoExpand(&sheet_data)).into_owned()
    } else {
        worksheet_xml.to_string()
    }
}

/// A rendered cell's text, for callers (pivot header/data rows) that want a
/// display string rather than the typed value. Formulas and empty cells
/// have no fixed text to show and read as `None`.
pub fn rendered_cell_text(rendered: &RenderedSheet, coord: CellCoord) -> Option<String> {
    match rendered.cells.get(&coord)? {
        RenderedValue::Text(s) => Some(s.clone()),
        RenderedValue::Number(n) => Some(n.to_string()),
        RenderedValue::Boolean(b) => Some(if *b { "TRUE".to_string() } else { "FALSE".to_string() }),
        RenderedValue::Formula(_) | RenderedValue::Empty => None,
    }
}

/// Converts a rendered value into the data model's generic [`DataValue`],
/// for feeding rendered rows back into a pivot cache as plain data.
pub fn rendered_to_data_value(value: &RenderedValue) -> DataValue {
    match value {
        RenderedValue::Empty => DataValue::Null,
        RenderedValue::Text(s) => DataValue::String(s.clone()),
        RenderedValue::Number(n) => DataValue::Number(*n),
        RenderedValue::Boolean(b) => DataValue::Boolean(*b),
        RenderedValue::Formula(_) => DataValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_text_number_and_formula_cells() {
        assert_eq!(
            render_cell_xml((0, 0), &RenderedValue::Text("Hi".into()), Some("3")),
            r#"<c r="A1" s="3" t="inlineStr"><is><t>Hi</t></is></c>"#
        );
        assert_eq!(render_cell_xml((0, 1), &RenderedValue::Number(4.0), None), r#"<c r="B1"><v>4</v></c>"#);
        assert_eq!(
            render_cell_xml((0, 2), &RenderedValue::Formula("=SUM(A1:A2)".into()), None),
            r#"<c r="C1"><f>SUM(A1:A2)</f></c>"#
        );
        assert_eq!(render_cell_xml((0, 3), &RenderedValue::Empty, None), r#"<c r="D1"/>"#);
    }

    #[test]
    fn splices_cells_into_rows_in_order() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1"><v>0</v></c></row></sheetData></worksheet>"#;
        let cells = vec![
            ((1, 0), r#"<c r="A2"><v>1</v></c>"#.to_string()),
            ((0, 0), r#"<c r="A1"><v>0</v></c>"#.to_string()),
        ];
        let spliced = splice_sheet_data(xml, cells);
        assert_eq!(
            spliced,
            r#"<worksheet><sheetData><row r="1"><c r="A1"><v>0</v></c></row><row r="2"><c r="A2"><v>1</v></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn shifts_empty_substitution_cells_to_target() {
        let raw = vec![((6, 0), RawCellValue::Text("No data".into()))];
        let styles = HashMap::new();
        let shifted = render_empty_substitution(&raw, &styles, CellArea::parse("A7:A7").unwrap(), (1, 0));
        assert_eq!(shifted[0].0, (1, 0));
        assert!(shifted[0].1.contains(r#"r="A2""#));
    }
}
