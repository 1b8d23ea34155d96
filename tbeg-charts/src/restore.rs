//! PURPOSE: `ChartProcessor::restore` — reinsert extracted charts with
//! rewritten series references and re-projected anchors, spec.md §4.8.

use crate::anchor::render_chart_anchor;
use crate::extract::ExtractedChart;
use crate::reference::rewrite_chart_references;
use std::collections::HashMap;
use tbeg_ooxml::{add_override, add_relationship, rels_part_for, OoxmlPackage};
use tbeg_position::PositionCalculator;

const CHART_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.drawingml.chart+xml";
const CHART_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart";

/// Restores every chart extracted for one sheet, rewriting its series
/// references through that sheet's `PositionCalculator` and re-anchoring it
/// at the projected final position.
pub fn restore_charts(
    package: &mut OoxmlPackage,
    charts: &[ExtractedChart],
    calculators: &HashMap<String, PositionCalculator>,
) {
    let mut drawing_bodies: HashMap<String, String> = HashMap::new();

    for chart in charts {
        let Some(calculator) = calculators.get(&chart.sheet_name) else {
            continue;
        };

        let rewritten_xml = rewrite_chart_references(&chart.chart_xml, calculator);
        package.set_part_text(chart.chart_path.clone(), rewritten_xml);
        add_override(package, &format!("/{}", chart.chart_path), CHART_CONTENT_TYPE);

        let drawing_rels_path = rels_part_for(&chart.drawing_path);
        let target = relative_target(&chart.drawing_path, &chart.chart_path);
        let rel_id = add_relationship(package, &drawing_rels_path, CHART_REL_TYPE, &target);

        let (from_row, from_col) =
            calculator.get_final_position((chart.anchor.from.row, chart.anchor.from.col));
        let (to_row, to_col) =
            calculator.get_final_position((chart.anchor.to.row, chart.anchor.to.col));

        let mut projected = chart.anchor.clone();
        projected.from.row = from_row;
        projected.from.col = from_col;
        projected.to.row = to_row;
        projected.to.col = to_col;

        let anchor_xml = render_chart_anchor(&projected, &rel_id);
        drawing_bodies
            .entry(chart.drawing_path.clone())
            .or_insert_with(String::new)
            .push_str(&anchor_xml);
    }

    for (drawing_path, anchors_xml) in drawing_bodies {
        let Ok(drawing_xml) = package.part_text(&drawing_path) else {
            continue;
        };
        let updated = if drawing_xml.contains("</xdr:wsDr>") {
            drawing_xml.replacen("</xdr:wsDr>", &format!("{anchors_xml}</xdr:wsDr>"), 1)
        } else {
            format!("{drawing_xml}{anchors_xml}")
        };
        package.set_part_text(drawing_path, updated);
    }
}

/// Builds a `../charts/chartN.xml`-style relative target from `base` (the
/// drawing part) to `target` (the chart part), both rooted under `xl/`.
fn relative_target(base: &str, target: &str) -> String {
    let base_depth = base.matches('/').count().saturating_sub(1);
    let up = "../".repeat(base_depth);
    format!("{up}{}", target.trim_start_matches("xl/"))
}
