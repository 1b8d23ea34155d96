//! PURPOSE: Resolves workbook sheet names to their worksheet part paths, the
//! one piece of package-layout plumbing every other stage needs but none of
//! the processor crates expose publicly.
//! CONTEXT: Same `<sheet name="..." r:id="...">` + relationship-target
//! pattern `tbeg-pivot`'s extraction uses internally to go the other
//! direction (part path -> sheet name); duplicated here deliberately since
//! that mapping is private to that crate.

use once_cell::sync::Lazy;
use regex::Regex;
use tbeg_ooxml::{parse_relationships, OoxmlPackage, WORKBOOK_PATH, WORKBOOK_RELS_PATH};

static SHEET_ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<sheet[^>]*name="([^"]+)"[^>]*r:id="([^"]+)"[^>]*/>"#).expect("valid regex"));

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

/// Sheet names in workbook order, paired with their worksheet part path.
pub fn sheet_paths(package: &OoxmlPackage) -> Vec<(String, String)> {
    let Ok(workbook_xml) = package.part_text(WORKBOOK_PATH) else {
        return Vec::new();
    };
    let Ok(rels_xml) = package.part_text(WORKBOOK_RELS_PATH) else {
        return Vec::new();
    };
    let rels = parse_relationships(&rels_xml);

    let mut out = Vec::new();
    for caps in SHEET_ENTRY_RE.captures_iter(&workbook_xml) {
        let name = caps[1].to_string();
        let rid = &caps[2];
        if let Some(rel) = rels.iter().find(|r| r.id == rid) {
            out.push((name, resolve_relative("xl", &rel.target)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_package() -> OoxmlPackage {
        let mut pkg = OoxmlPackage::empty();
        pkg.set_part_text(
            WORKBOOK_PATH,
            r#"<workbook><sheets><sheet name="Summary" sheetId="1" r:id="rId1"/><sheet name="Detail" sheetId="2" r:id="rId2"/></sheets></workbook>"#.to_string(),
        );
        pkg.set_part_text(
            WORKBOOK_RELS_PATH,
            r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/></Relationships>"#.to_string(),
        );
        pkg
    }

    #[test]
    fn resolves_sheet_names_in_workbook_order() {
        let pkg = sample_package();
        let paths = sheet_paths(&pkg);
        assert_eq!(
            paths,
            vec![
                ("Summary".to_string(), "xl/worksheets/sheet1.xml".to_string()),
                ("Detail".to_string(), "xl/worksheets/sheet2.xml".to_string()),
            ]
        );
    }
}
