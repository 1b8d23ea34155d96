//! PURPOSE: `ChartProcessor::extract` — pull chart parts and their drawing
//! anchors out of the package before a streaming render, spec.md §4.8.

use crate::anchor::{find_chart_anchors, ChartAnchor};
use tbeg_ooxml::{parse_relationships, rels_part_for, remove_override, OoxmlPackage};

/// A chart pulled out of the package, with everything needed to put it
/// back after render.
#[derive(Debug, Clone)]
pub struct ExtractedChart {
    pub sheet_name: String,
    pub chart_path: String,
    pub chart_xml: String,
    pub drawing_path: String,
    pub anchor: ChartAnchor,
}

/// Resolves a relationship `Target` (relative to `base_dir`) to an absolute
/// package part path, handling `../` components.
fn resolve_relative(base_dir: &str, target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        return stripped.to_string();
    }
    let mut stack: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            ".." => {
                stack.pop();
            }
            "." | "" => {}
            other => stack.push(other),
        }
    }
    stack.join("/")
}

fn dir_of(part_name: &str) -> &str {
    match part_name.rfind('/') {
        Some(idx) => &part_name[..idx],
        None => "",
    }
}

/// Finds the drawing part a worksheet references, if any.
fn sheet_drawing_path(package: &OoxmlPackage, worksheet_path: &str) -> Option<String> {
    let rels_path = rels_part_for(worksheet_path);
    let xml = package.part_text(&rels_path).ok()?;
    let rel = parse_relationships(&xml)
        .into_iter()
        .find(|r| r.rel_type.ends_with("/drawing"))?;
    Some(resolve_relative(dir_of(worksheet_path), &rel.target))
}

/// Extracts every chart anchored to `worksheet_path`'s drawing, removing
/// the chart part, its content-type override, its relationship entry, and
/// its anchor block from the drawing XML.
pub fn extract_charts_for_sheet(
    package: &mut OoxmlPackage,
    sheet_name: &str,
    worksheet_path: &str,
) -> Vec<ExtractedChart> {
    let Some(drawing_path) = sheet_drawing_path(package, worksheet_path) else {
        return Vec::new();
    };
    let Ok(mut drawing_xml) = package.part_text(&drawing_path) else {
        return Vec::new();
    };
    let drawing_rels_path = rels_part_for(&drawing_path);
    let Ok(drawing_rels_xml) = package.part_text(&drawing_rels_path) else {
        return Vec::new();
    };
    let drawing_rels = parse_relationships(&drawing_rels_xml);

    let anchors = find_chart_anchors(&drawing_xml);
    let mut extracted = Vec::new();

    // Remove matched spans back to front so earlier offsets stay valid.
    for (anchor, range) in anchors.into_iter().rev() {
        let Some(rel) = drawing_rels.iter().find(|r| r.id == anchor.rel_id) else {
            continue;
        };
        let chart_path = resolve_relative(dir_of(&drawing_path), &rel.target);
        let Ok(chart_xml) = package.part_text(&chart_path) else {
            continue;
        };

        package.remove_part(&chart_path);
        remove_override(package, &format!("/{chart_path}"));
        tbeg_ooxml::remove_relationship(package, &drawing_rels_path, &anchor.rel_id);
        drawing_xml.replace_range(range, "");

        extracted.push(ExtractedChart {
            sheet_name: sheet_name.to_string(),
            chart_path,
            chart_xml,
            drawing_path: drawing_path.clone(),
            anchor,
        });
    }

    package.set_part_text(drawing_path, drawing_xml);
    extracted.reverse();
    extracted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package_with_one_chart() -> OoxmlPackage {
        let mut pkg = OoxmlPackage::empty();
        pkg.set_part_text(
            "xl/worksheets/_rels/sheet1.xml.rels",
            r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/></Relationships>"#.to_string(),
        );
        pkg.set_part_text(
            "xl/drawings/_rels/drawing1.xml.rels",
            r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart" Target="../charts/chart1.xml"/></Relationships>"#.to_string(),
        );
        pkg.set_part_text(
            "xl/drawings/drawing1.xml",
            r#"<xdr:wsDr><xdr:twoCellAnchor>
                <xdr:from><xdr:col>1</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>1</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
                <xdr:to><xdr:col>8</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>20</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>
                <xdr:graphicFrame><c:chart r:id="rId1"/></xdr:graphicFrame>
                <xdr:clientData/>
            </xdr:twoCellAnchor></xdr:wsDr>"#.to_string(),
        );
        pkg.set_part_text("xl/charts/chart1.xml", "<c:chartSpace><c:f>Sheet1!$A$2</c:f></c:chartSpace>".to_string());
        pkg.set_part_text(
            "[Content_Types].xml",
            r#"<Types><Override PartName="/xl/charts/chart1.xml" ContentType="application/vnd.openxmlformats-officedocument.drawingml.chart+xml"/></Types>"#.to_string(),
        );
        pkg
    }

    #[test]
    fn extracts_chart_and_removes_it_from_the_package() {
        let mut pkg = package_with_one_chart();
        let extracted = extract_charts_for_sheet(&mut pkg, "Sheet1", "xl/worksheets/sheet1.xml");

        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].chart_path, "xl/charts/chart1.xml");
        assert!(extracted[0].chart_xml.contains("Sheet1!$A$2"));
        assert!(!pkg.has_part("xl/charts/chart1.xml"));
        assert!(!pkg.part_text("[Content_Types].xml").unwrap().contains("chart1.xml"));

        let drawing = pkg.part_text("xl/drawings/drawing1.xml").unwrap();
        assert!(!drawing.contains("twoCellAnchor"));
    }
}
