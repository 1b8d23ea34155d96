//! PURPOSE: `PivotTableProcessor::recreate`'s package-facing half — writes
//! the rebuilt pivot parts back, restores overrides and relationships, and
//! splices the pivot's visible grid into its worksheet, spec.md §4.9 step 5.

use crate::definition::PivotDefinition;
use crate::recreate::{recreate_pivot, PivotBodyRow};
use regex::Regex;
use std::collections::HashMap;
use tbeg_model::{coord_to_a1, CellArea, CellCoord, DataValue};
use tbeg_ooxml::{add_override, add_relationship, rels_part_for, OoxmlPackage};

const PIVOT_TABLE_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.pivotTable+xml";
const CACHE_DEFINITION_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.pivotCacheDefinition+xml";
const CACHE_RECORDS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.pivotCacheRecords+xml";
const PIVOT_TABLE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/pivotTable";
const CACHE_DEFINITION_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/pivotCacheDefinition";
const CACHE_RECORDS_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/pivotCacheRecords";

/// What a caller supplies per pivot to rebuild it over the rendered output.
pub struct PivotRenderInput {
    /// Header row of `data_rows`, read from the rendered source range.
    pub headers: Vec<String>,
    pub data_rows: Vec<Vec<DataValue>>,
    /// The pivot's location, already projected through the sheet's final
    /// layout.
    pub final_location: CellArea,
    /// The pivot's source range, already projected.
    pub final_source_range: CellArea,
    pub grand_total_caption: String,
}

/// Rebuilds every extracted pivot over its rendered source data, writing the
/// three OOXML parts back, restoring overrides/relationships, and splicing
/// the pivot's visible grid into the owning worksheet.
pub fn restore_pivots(
    package: &mut OoxmlPackage,
    pivots: &[PivotDefinition],
    inputs: &HashMap<String, PivotRenderInput>,
) {
    for def in pivots {
        let Some(input) = inputs.get(&def.pivot_table_path) else {
            continue;
        };

        let recreated = recreate_pivot(
            def,
            &input.headers,
            &input.data_rows,
            input.final_location,
            input.final_source_range,
            &input.grand_total_caption,
        );

        package.set_part_text(def.pivot_table_path.clone(), recreated.pivot_table_xml);
        package.set_part_text(def.cache_definition_path.clone(), recreated.cache_definition_xml);
        package.set_part_text(def.cache_records_path.clone(), recreated.cache_records_xml);

        add_override(package, &format!("/{}", def.pivot_table_path), PIVOT_TABLE_CONTENT_TYPE);
        add_override(
            package,
            &format!("/{}", def.cache_definition_path),
            CACHE_DEFINITION_CONTENT_TYPE,
        );
        add_override(package, &format!("/{}", def.cache_records_path), CACHE_RECORDS_CONTENT_TYPE);

        let pivot_rels_path = rels_part_for(&def.pivot_table_path);
        add_relationship(
            package,
            &pivot_rels_path,
            CACHE_DEFINITION_REL_TYPE,
            &relative_target(&def.pivot_table_path, &def.cache_definition_path),
        );

        let cache_rels_path = rels_part_for(&def.cache_definition_path);
        add_relationship(
            package,
            &cache_rels_path,
            CACHE_RECORDS_REL_TYPE,
            &relative_target(&def.cache_definition_path, &def.cache_records_path),
        );

        let sheet_rels_path = rels_part_for(&def.worksheet_path);
        add_relationship(
            package,
            &sheet_rels_path,
            PIVOT_TABLE_REL_TYPE,
            &relative_target(&def.worksheet_path, &def.pivot_table_path),
        );

        if let Ok(sheet_xml) = package.part_text(&def.worksheet_path) {
            let updated = splice_pivot_grid(&sheet_xml, def, &recreated);
            package.set_part_text(def.worksheet_path.clone(), updated);
        }
    }
}

/// Builds a `../pivotCache/pivotCacheDefinition1.xml`-style relative target
/// from `base` to `target`, both rooted under `xl/`.
fn relative_target(base: &str, target: &str) -> String {
    let base_depth = base.matches('/').count().saturating_sub(1);
    let up = "../".repeat(base_depth);
    format!("{up}{}", target.trim_start_matches("xl/"))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn render_text_cell(coord: CellCoord, text: &str, style: Option<&str>) -> String {
    let r = coord_to_a1(coord);
    let s_attr = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
    if text.is_empty() {
        format!(r#"<c r="{r}"{s_attr}/>"#)
    } else {
        format!(r#"<c r="{r}"{s_attr} t="inlineStr"><is><t>{}</t></is></c>"#, escape(text))
    }
}

fn render_number_cell(coord: CellCoord, value: f64, style: Option<&str>) -> String {
    let r = coord_to_a1(coord);
    let s_attr = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
    format!(r#"<c r="{r}"{s_attr}><v>{value}</v></c>"#)
}

fn render_row(
    row_number: u32,
    col_start: u32,
    labels: &[String],
    values: &[f64],
    label_style: Option<&str>,
    value_style: Option<&str>,
) -> String {
    let mut col = col_start;
    let mut cells = String::new();
    for label in labels {
        cells.push_str(&render_text_cell((row_number - 1, col), label, label_style));
        col += 1;
    }
    for &value in values {
        cells.push_str(&render_number_cell((row_number - 1, col), value, value_style));
        col += 1;
    }
    format!(r#"<row r="{row_number}">{cells}</row>"#)
}

fn replace_row(worksheet_xml: &str, row_number: u32, row_xml: &str) -> String {
    let re = Regex::new(&format!(r#"(?s)<row r="{row_number}"[^>]*>.*?</row>|<row r="{row_number}"[^>]*/>"#))
        .expect("valid regex");
    if re.is_match(worksheet_xml) {
        re.replace(worksheet_xml, regex::NoExpand(row_xml)).into_owned()
    } else if let Some(idx) = worksheet_xml.find("</sheetData>") {
        format!("{}{row_xml}{}", &worksheet_xml[..idx], &worksheet_xml[idx..])
    } else {
        format!("{worksheet_xml}{row_xml}")
    }
}

/// Writes the pivot's header row, grouped body rows, and grand-total row
/// into the worksheet at `recreated.final_location`.
fn splice_pivot_grid(worksheet_xml: &str, def: &PivotDefinition, recreated: &crate::recreate::RecreatedPivot) -> String {
    let start = recreated.final_location.start;
    let header_style = def.header_style.as_deref();
    let data_style = def.data_style.as_deref();

    let header_row_number = start.0 + 1;
    let header_labels: Vec<String> = recreated.header_labels.clone();
    let header_xml = render_row(header_row_number, start.1, &header_labels, &[], header_style, header_style);
    let mut updated = replace_row(worksheet_xml, header_row_number, &header_xml);

    for (offset, body) in recreated.body_rows.iter().enumerate() {
        let row_number = header_row_number + 1 + offset as u32;
        let row_xml = render_row(row_number, start.1, &body.labels, &body.values, data_style, data_style);
        updated = replace_row(&updated, row_number, &row_xml);
    }

    let grand_row_number = header_row_number + 1 + recreated.body_rows.len() as u32;
    let grand: &PivotBodyRow = &recreated.grand_total;
    let grand_xml = render_row(grand_row_number, start.1, &grand.labels, &grand.values, data_style, data_style);
    replace_row(&updated, grand_row_number, &grand_xml)
}
