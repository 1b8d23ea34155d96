//! PURPOSE: Builds the rebuilt pivot cache's `sharedItems`/numeric metadata
//! and renders `pivotCacheDefinitionN.xml` / `pivotCacheRecordsN.xml`,
//! spec.md §4.9 step 4.

use std::collections::HashMap;
use tbeg_model::{CellArea, DataValue};

/// Per-field shape the rebuilt cache assigns: axis fields get an ordered
/// shared-items table; everything else gets numeric range metadata when the
/// column is numeric.
#[derive(Debug, Clone)]
pub enum FieldPlan {
    Axis { name: String, values: Vec<String> },
    Numeric { name: String, min: f64, max: f64, contains_integer: bool },
    Other { name: String },
}

/// Builds one [`FieldPlan`] per column of `rows`, treating `row_field_indices`
/// as axis (grouping) columns and everything else as a value column.
pub fn build_field_plans(
    headers: &[String],
    row_field_indices: &[u32],
    rows: &[Vec<DataValue>],
) -> Vec<FieldPlan> {
    headers
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let col = index as u32;
            if row_field_indices.contains(&col) {
                let mut seen = HashMap::new();
                let mut values = Vec::new();
                for row in rows {
                    if let Some(v) = row.get(index) {
                        let text = v.to_string();
                        if !seen.contains_key(&text) {
                            seen.insert(text.clone(), values.len());
                            values.push(text);
                        }
                    }
                }
                FieldPlan::Axis { name: name.clone(), values }
            } else {
                let numbers: Vec<f64> = rows.iter().filter_map(|r| r.get(index)).filter_map(DataValue::as_f64).collect();
                if numbers.len() == rows.len() && !numbers.is_empty() {
                    let min = numbers.iter().cloned().fold(f64::INFINITY, f64::min);
                    let max = numbers.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    let contains_integer = numbers.iter().all(|n| n.fract() == 0.0);
                    FieldPlan::Numeric { name: name.clone(), min, max, contains_integer }
                } else {
                    FieldPlan::Other { name: name.clone() }
                }
            }
        })
        .collect()
}

/// The position of a value within an axis field's shared-items table.
pub fn axis_index(plan: &FieldPlan, value: &DataValue) -> Option<usize> {
    match plan {
        FieldPlan::Axis { values, .. } => {
            let text = value.to_string();
            values.iter().position(|v| v == &text)
        }
        _ => None,
    }
}

fn render_shared_items(values: &[String]) -> String {
    let items: String = values.iter().map(|v| format!(r#"<s v="{}"/>"#, escape(v))).collect();
    format!(r#"<sharedItems count="{}">{items}</sharedItems>"#, values.len())
}

fn render_numeric_shared_items(min: f64, max: f64, contains_integer: bool) -> String {
    format!(
        r#"<sharedItems containsSemiMixedTypes="0" containsString="0" containsNumber="1" containsInteger="{}" minValue="{min}" maxValue="{max}"/>"#,
        if contains_integer { "1" } else { "0" }
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// Renders `pivotCacheDefinitionN.xml`.
pub fn render_cache_definition(
    source_sheet: &str,
    source_range: &CellArea,
    plans: &[FieldPlan],
    record_count: usize,
) -> String {
    let fields: String = plans
        .iter()
        .map(|plan| match plan {
            FieldPlan::Axis { name, values } => {
                format!(r#"<cacheField name="{}" numFmtId="0">{}</cacheField>"#, escape(name), render_shared_items(values))
            }
            FieldPlan::Numeric { name, min, max, contains_integer } => format!(
                r#"<cacheField name="{}" numFmtId="0">{}</cacheField>"#,
                escape(name),
                render_numeric_shared_items(*min, *max, *contains_integer)
            ),
            FieldPlan::Other { name } => {
                format!(r#"<cacheField name="{}" numFmtId="0"><sharedItems/></cacheField>"#, escape(name))
            }
        })
        .collect();

    format!(
        r#"<pivotCacheDefinition xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" refreshOnLoad="true" recordCount="{record_count}"><cacheSource type="worksheet"><worksheetSource ref="{}" sheet="{}"/></cacheSource><cacheFields count="{}">{fields}</cacheFields></pivotCacheDefinition>"#,
        source_range.to_a1(),
        escape(source_sheet),
        plans.len()
    )
}

fn render_record_value(plan: &FieldPlan, value: &DataValue) -> String {
    match plan {
        FieldPlan::Axis { .. } => {
            let idx = axis_index(plan, value).unwrap_or(0);
            format!(r#"<x v="{idx}"/>"#)
        }
        _ => match value {
            DataValue::Null => "<m/>".to_string(),
            DataValue::Number(n) => format!(r#"<n v="{n}"/>"#),
            DataValue::DateTime(n) => format!(r#"<n v="{n}"/>"#),
            DataValue::Boolean(b) => format!(r#"<b v="{}"/>"#, if *b { 1 } else { 0 }),
            DataValue::String(s) => format!(r#"<s v="{}"/>"#, escape(s)),
            DataValue::Object(_) => "<m/>".to_string(),
        },
    }
}

/// Renders `pivotCacheRecordsN.xml` — one `<r>` per source row.
pub fn render_cache_records(plans: &[FieldPlan], rows: &[Vec<DataValue>]) -> String {
    let records: String = rows
        .iter()
        .map(|row| {
            let cells: String = plans
                .iter()
                .enumerate()
                .map(|(i, plan)| row.get(i).map(|v| render_record_value(plan, v)).unwrap_or_else(|| "<m/>".to_string()))
                .collect();
            format!("<r>{cells}</r>")
        })
        .collect();
    format!(
        r#"<pivotCacheRecords xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}">{records}</pivotCacheRecords>"#,
        rows.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_field_collects_unique_values_in_insertion_order() {
        let headers = vec!["Position".to_string(), "Salary".to_string()];
        let rows = vec![
            vec![DataValue::String("Engineer".into()), DataValue::Number(60000.0)],
            vec![DataValue::String("Manager".into()), DataValue::Number(90000.0)],
            vec![DataValue::String("Engineer".into()), DataValue::Number(65000.0)],
        ];
        let plans = build_field_plans(&headers, &[0], &rows);
        match &plans[0] {
            FieldPlan::Axis { values, .. } => assert_eq!(values, &vec!["Engineer".to_string(), "Manager".to_string()]),
            _ => panic!("expected axis plan"),
        }
        match &plans[1] {
            FieldPlan::Numeric { min, max, contains_integer, .. } => {
                assert_eq!(*min, 60000.0);
                assert_eq!(*max, 90000.0);
                assert!(*contains_integer);
            }
            _ => panic!("expected numeric plan"),
        }
    }

    #[test]
    fn records_encode_axis_fields_by_shared_item_index() {
        let headers = vec!["Position".to_string(), "Salary".to_string()];
        let rows = vec![
            vec![DataValue::String("Engineer".into()), DataValue::Number(60000.0)],
            vec![DataValue::String("Manager".into()), DataValue::Number(90000.0)],
        ];
        let plans = build_field_plans(&headers, &[0], &rows);
        let xml = render_cache_records(&plans, &rows);
        assert!(xml.contains(r#"<x v="0"/><n v="60000"/>"#));
        assert!(xml.contains(r#"<x v="1"/><n v="90000"/>"#));
    }
}
