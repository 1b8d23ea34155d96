//! PURPOSE: `PivotTableProcessor::recreate` — groups rendered source rows by
//! the original axis fields, computes aggregates, and renders a fresh pivot
//! table definition plus cache, spec.md §4.9 steps 1-5.

use crate::cache::{self, FieldPlan};
use crate::definition::PivotDefinition;
use tbeg_model::{CellArea, DataValue};

pub const DEFAULT_GRAND_TOTAL_CAPTION: &str = "전체";

/// One grouped row of the recreated pivot body.
struct GroupRow {
    /// Each row field's shared-items index for this group, in `row_fields`
    /// order — what `<rowItems>` actually encodes.
    axis_indices: Vec<usize>,
    accumulators: Vec<(f64, usize)>,
}

/// One row of the pivot's visible body grid, ready to splice into a
/// worksheet: one label per row field, then one aggregated value per data
/// field.
pub struct PivotBodyRow {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// The fully rendered replacement for a pivot's three OOXML parts, plus the
/// visible grid a caller can splice into the owning worksheet.
pub struct RecreatedPivot {
    pub pivot_table_xml: String,
    pub cache_definition_xml: String,
    pub cache_records_xml: String,
    pub final_location: CellArea,
    /// Row field captions followed by data field display names.
    pub header_labels: Vec<String>,
    pub body_rows: Vec<PivotBodyRow>,
    pub grand_total: PivotBodyRow,
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn group_key(row: &[DataValue], row_fields: &[u32]) -> String {
    row_fields
        .iter()
        .map(|&idx| row.get(idx as usize).map(DataValue::to_string).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\u{1}")
}

fn group_axis_indices(row: &[DataValue], def: &PivotDefinition, plans: &[FieldPlan]) -> Vec<usize> {
    def.row_fields
        .iter()
        .map(|&idx| {
            row.get(idx as usize)
                .and_then(|v| cache::axis_index(&plans[idx as usize], v))
                .unwrap_or(0)
        })
        .collect()
}

fn aggregate_rows<'a>(
    def: &PivotDefinition,
    rows: impl Iterator<Item = &'a Vec<DataValue>>,
) -> Vec<(f64, usize)> {
    let mut accumulators = vec![(0.0_f64, 0_usize); def.data_fields.len()];
    for row in rows {
        for (field_idx, field) in def.data_fields.iter().enumerate() {
            let (acc, count) = accumulators[field_idx];
            let value = row
                .get(field.field_index as usize)
                .and_then(DataValue::as_f64)
                .unwrap_or(0.0);
            let has_value = row.get(field.field_index as usize).and_then(DataValue::as_f64).is_some();
            if has_value || matches!(field.function, crate::definition::AggregateFunction::Count) {
                accumulators[field_idx] = (field.function.fold(acc, count, value), count + 1);
            }
        }
    }
    accumulators
}

/// Groups `data_rows` (in source order, header excluded) by `def.row_fields`
/// in first-seen order, computes each data field's aggregate per group, and
/// appends a grand-total row.
fn build_groups(def: &PivotDefinition, data_rows: &[Vec<DataValue>], plans: &[FieldPlan]) -> Vec<GroupRow> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: std::collections::HashMap<String, (Vec<usize>, Vec<&Vec<DataValue>>)> =
        std::collections::HashMap::new();

    for row in data_rows {
        let key = group_key(row, &def.row_fields);
        buckets
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key.clone());
                (group_axis_indices(row, def, plans), Vec::new())
            })
            .1
            .push(row);
    }

    order
        .into_iter()
        .map(|key| {
            let (axis_indices, rows) = &buckets[&key];
            GroupRow {
                axis_indices: axis_indices.clone(),
                accumulators: aggregate_rows(def, rows.iter().copied()),
            }
        })
        .collect()
}

fn finish(def: &PivotDefinition, accumulators: &[(f64, usize)]) -> Vec<f64> {
    def.data_fields
        .iter()
        .zip(accumulators)
        .map(|(field, &(acc, count))| field.function.finish(acc, count))
        .collect()
}

fn data_field_caption(def: &PivotDefinition, field: &DataFieldSpec) -> String {
    field.display_name.clone().unwrap_or_else(|| {
        format!(
            "{} {}",
            field.function.caption_prefix(),
            def.field_captions.get(field.field_index as usize).cloned().unwrap_or_default()
        )
    })
}

fn row_labels(def: &PivotDefinition, axis_indices: &[usize], plans: &[FieldPlan]) -> Vec<String> {
    def.row_fields
        .iter()
        .zip(axis_indices)
        .map(|(&field_idx, &idx)| match &plans[field_idx as usize] {
            FieldPlan::Axis { values, .. } => values.get(idx).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .collect()
}

fn render_pivot_fields(def: &PivotDefinition) -> String {
    def.field_captions
        .iter()
        .enumerate()
        .map(|(idx, _)| {
            if def.row_fields.contains(&(idx as u32)) {
                r#"<pivotField axis="axisRow" showAll="0"/>"#.to_string()
            } else {
                r#"<pivotField showAll="0"/>"#.to_string()
            }
        })
        .collect()
}

fn render_data_fields(def: &PivotDefinition) -> String {
    def.data_fields
        .iter()
        .map(|f| {
            format!(
                r#"<dataField name="{}" fld="{}" baseField="0" baseItem="0" subtotal="{}"/>"#,
                escape(&data_field_caption(def, f)),
                f.field_index,
                f.function.subtotal_attr()
            )
        })
        .collect()
}

/// The `<rowItems>` block: one entry per group (encoding each row field's
/// shared-items index) plus a trailing grand-total item.
fn render_row_items(groups: &[GroupRow]) -> String {
    let body: String = groups
        .iter()
        .map(|g| {
            let xs: String = g.axis_indices.iter().map(|&i| format!(r#"<x v="{i}"/>"#)).collect();
            format!("<i>{xs}</i>")
        })
        .collect();
    body + r#"<i t="grand"/>"#
}

/// The `<colItems>` block: one `<i/>` per data field, since each data field
/// gets its own column under the `Values` axis (spec.md §4.9 step 5).
fn render_col_items(def: &PivotDefinition) -> String {
    let count = def.data_fields.len().max(1);
    format!(r#"<colItems count="{count}">{}</colItems>"#, "<i/>".repeat(count))
}

fn render_pivot_table(
    def: &PivotDefinition,
    groups: &[GroupRow],
    _grand_totals: &[f64],
    _grand_total_caption: &str,
    final_location: &CellArea,
) -> String {
    let rows_xml = render_row_items(groups);
    let col_items = render_col_items(def);
    let location = format!(
        r#"<location ref="{}" firstHeaderRow="1" firstDataRow="2" firstDataCol="1"/>"#,
        final_location.to_a1()
    );

    format!(
        r#"<pivotTableDefinition xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" name="{}" cacheId="0" applyNumberFormats="0" dataCaption="Values" updatedVersion="6" minRefreshableVersion="3" useAutoformatting="1" itemPrintTitles="1" createdVersion="6" indent="0" outline="1" outlineData="1" multipleFieldFilters="0">{location}<pivotFields count="{}">{}</pivotFields><rowFields count="{}">{}</rowFields><rowItems count="{}">{rows_xml}</rowItems>{col_items}<dataFields count="{}">{}</dataFields>{}{}</pivotTableDefinition>"#,
        escape(&def.name),
        def.field_captions.len(),
        render_pivot_fields(def),
        def.row_fields.len(),
        def.row_fields.iter().map(|f| format!(r#"<field x="{f}"/>"#)).collect::<String>(),
        groups.len() + 1,
        def.data_fields.len(),
        render_data_fields(def),
        if def.style_info.is_empty() { String::new() } else { def.style_info.clone() },
        def.formats_xml.clone().unwrap_or_default(),
    )
}

/// Recreates a pivot over the rendered source data, returning the three
/// replacement OOXML parts. `headers` labels `data_rows`' columns (read from
/// the rendered header row); `final_location` and `final_source_range` are
/// already projected through the sheet's final layout by the caller.
pub fn recreate_pivot(
    def: &PivotDefinition,
    headers: &[String],
    data_rows: &[Vec<DataValue>],
    final_location: CellArea,
    final_source_range: CellArea,
    grand_total_caption: &str,
) -> RecreatedPivot {
    let plans = cache::build_field_plans(headers, &def.row_fields, data_rows);
    let groups = build_groups(def, data_rows, &plans);
    let grand_accumulators = aggregate_rows(def, data_rows.iter());
    let grand_totals = finish(def, &grand_accumulators);

    let location_rows_needed = 1 + groups.len() as u32 + 1;
    let location = CellArea::new(
        final_location.start,
        (
            final_location.start.0 + location_rows_needed - 1,
            final_location.start.1 + final_location.col_span() - 1,
        ),
    );

    let pivot_table_xml =
        render_pivot_table(def, &groups, &grand_totals, grand_total_caption, &location);

    let cache_definition_xml =
        cache::render_cache_definition(&def.source_sheet, &final_source_range, &plans, data_rows.len());
    let cache_records_xml = cache::render_cache_records(&plans, data_rows);

    let header_labels: Vec<String> = def
        .row_fields
        .iter()
        .map(|&f| def.field_captions.get(f as usize).cloned().unwrap_or_default())
        .chain(def.data_fields.iter().map(|f| data_field_caption(def, f)))
        .collect();

    let body_rows: Vec<PivotBodyRow> = groups
        .iter()
        .map(|g| PivotBodyRow {
            labels: row_labels(def, &g.axis_indices, &plans),
            values: finish(def, &g.accumulators),
        })
        .collect();

    let mut grand_labels = vec![grand_total_caption.to_string()];
    grand_labels.extend(std::iter::repeat(String::new()).take(def.row_fields.len().saturating_sub(1)));
    let grand_total = PivotBodyRow { labels: grand_labels, values: grand_totals };

    RecreatedPivot {
        pivot_table_xml,
        cache_definition_xml,
        cache_records_xml,
        final_location: location,
        header_labels,
        body_rows,
        grand_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{AggregateFunction, DataFieldSpec};

    fn sample_def() -> PivotDefinition {
        PivotDefinition {
            name: "PivotTable1".into(),
            sheet: "Sheet1".into(),
            worksheet_path: "xl/worksheets/sheet1.xml".into(),
            location: CellArea::parse("A10:B12").unwrap(),
            source_sheet: "Sheet1".into(),
            source_range: CellArea::parse("A1:B8").unwrap(),
            row_fields: vec![0],
            data_fields: vec![DataFieldSpec {
                field_index: 1,
                function: AggregateFunction::Sum,
                display_name: Some("Sum of Salary".into()),
            }],
            field_captions: vec!["Position".into(), "Salary".into()],
            style_info: r#"<pivotTableStyleInfo name="PivotStyleLight16" showRowHeaders="1"/>"#.into(),
            formats_xml: None,
            header_style: None,
            data_style: None,
            pivot_table_path: "xl/pivotTables/pivotTable1.xml".into(),
            cache_definition_path: "xl/pivotCache/pivotCacheDefinition1.xml".into(),
            cache_records_path: "xl/pivotCache/pivotCacheRecords1.xml".into(),
        }
    }

    #[test]
    fn groups_by_axis_field_in_first_seen_order_with_grand_total() {
        let def = sample_def();
        let headers = vec!["Position".to_string(), "Salary".to_string()];
        let rows = vec![
            vec![DataValue::String("Engineer".into()), DataValue::Number(60000.0)],
            vec![DataValue::String("Manager".into()), DataValue::Number(90000.0)],
            vec![DataValue::String("Engineer".into()), DataValue::Number(65000.0)],
        ];

        let recreated = recreate_pivot(
            &def,
            &headers,
            &rows,
            CellArea::parse("A10:B10").unwrap(),
            CellArea::parse("A1:B4").unwrap(),
            DEFAULT_GRAND_TOTAL_CAPTION,
        );

        assert!(recreated.pivot_table_xml.contains(r#"name="PivotTable1""#));
        assert!(recreated.pivot_table_xml.contains(r#"ref="A10:B13""#));
        assert!(recreated.cache_records_xml.contains(r#"<n v="60000"/>"#));
        assert!(recreated.cache_definition_xml.contains(r#"recordCount="3""#));
        assert!(recreated.pivot_table_xml.contains(r#"<colItems count="1"><i/></colItems>"#));
    }

    #[test]
    fn col_items_count_matches_number_of_data_fields() {
        let mut def = sample_def();
        def.data_fields.push(DataFieldSpec {
            field_index: 2,
            function: AggregateFunction::Avg,
            display_name: Some("Average of Bonus".into()),
        });
        def.field_captions.push("Bonus".into());

        let headers = vec!["Position".to_string(), "Salary".to_string(), "Bonus".to_string()];
        let rows = vec![
            vec![DataValue::String("Engineer".into()), DataValue::Number(60000.0), DataValue::Number(500.0)],
            vec![DataValue::String("Manager".into()), DataValue::Number(90000.0), DataValue::Number(700.0)],
        ];

        let recreated = recreate_pivot(
            &def,
            &headers,
            &rows,
            CellArea::parse("A10:C10").unwrap(),
            CellArea::parse("A1:C3").unwrap(),
            DEFAULT_GRAND_TOTAL_CAPTION,
        );

        assert!(recreated.pivot_table_xml.contains(r#"<colItems count="2"><i/><i/></colItems>"#));
    }
}
