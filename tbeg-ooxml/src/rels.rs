//! PURPOSE: Add/remove `<Relationship>` entries in `_rels/*.rels` parts
//! without a full DOM parse, mirroring [`crate::content_types`]'s approach
//! so untouched relationships (and their ordering) survive byte-for-byte.

use crate::package::OoxmlPackage;
use regex::Regex;

/// Relationship id, type, and target extracted from a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

fn rel_regex() -> Regex {
    Regex::new(
        r#"<Relationship[^>]*Id="(?P<id>[^"]+)"[^>]*Type="(?P<type>[^"]+)"[^>]*Target="(?P<target>[^"]+)"[^>]*/>"#,
    )
    .expect("valid regex")
}

/// Parses every `<Relationship>` entry out of a `.rels` part's XML text.
pub fn parse_relationships(xml: &str) -> Vec<Relationship> {
    rel_regex()
        .captures_iter(xml)
        .map(|c| Relationship {
            id: c["id"].to_string(),
            rel_type: c["type"].to_string(),
            target: c["target"].to_string(),
        })
        .collect()
}

/// The next unused `rIdN` relationship id for a `.rels` part.
pub fn next_relationship_id(xml: &str) -> String {
    let max = parse_relationships(xml)
        .iter()
        .filter_map(|r| r.id.strip_prefix("rId"))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("rId{}", max + 1)
}

/// Appends a `<Relationship>` entry before `</Relationships>`, returning the
/// id assigned.
pub fn add_relationship(package: &mut OoxmlPackage, rels_part: &str, rel_type: &str, target: &str) -> String {
    let xml = package
        .part_text(rels_part)
        .unwrap_or_else(|_| {
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#
                .to_string()
        });
    let id = next_relationship_id(&xml);
    let entry = format!(r#"<Relationship Id="{id}" Type="{rel_type}" Target="{target}"/>"#);
    let updated = if xml.contains("</Relationships>") {
        xml.replacen("</Relationships>", &format!("{entry}</Relationships>"), 1)
    } else {
        format!("{xml}{entry}")
    };
    package.set_part_text(rels_part.to_string(), updated);
    id
}

/// Removes the relationship with the given id, if present.
pub fn remove_relationship(package: &mut OoxmlPackage, rels_part: &str, rel_id: &str) {
    let Ok(xml) = package.part_text(rels_part) else {
        return;
    };
    let needle = Regex::new(&format!(
        r#"<Relationship[^>]*Id="{}"[^>]*/>"#,
        regex::escape(rel_id)
    ))
    .expect("valid regex");
    let updated = needle.replace(&xml, "").into_owned();
    package.set_part_text(rels_part.to_string(), updated);
}

/// The `.rels` part name for a given part, e.g.
/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`.
pub fn rels_part_for(part_name: &str) -> String {
    match part_name.rfind('/') {
        Some(idx) => {
            let (dir, file) = part_name.split_at(idx);
            let file = &file[1..];
            format!("{dir}/_rels/{file}.rels")
        }
        None => format!("_rels/{part_name}.rels"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_rels_part_path() {
        assert_eq!(
            rels_part_for("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
        assert_eq!(rels_part_for("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
    }

    #[test]
    fn assigns_next_available_id() {
        let xml = r#"<Relationships><Relationship Id="rId1" Type="t" Target="a"/><Relationship Id="rId3" Type="t" Target="b"/></Relationships>"#;
        assert_eq!(next_relationship_id(xml), "rId4");
    }

    #[test]
    fn adds_and_removes_relationship() {
        let mut pkg = OoxmlPackage::empty();
        pkg.set_part_text(
            "xl/_rels/workbook.xml.rels",
            r#"<Relationships></Relationships>"#.to_string(),
        );
        let id = add_relationship(
            &mut pkg,
            "xl/_rels/workbook.xml.rels",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet",
            "worksheets/sheet1.xml",
        );
        assert_eq!(id, "rId1");
        let xml = pkg.part_text("xl/_rels/workbook.xml.rels").unwrap();
        assert_eq!(parse_relationships(&xml).len(), 1);

        remove_relationship(&mut pkg, "xl/_rels/workbook.xml.rels", &id);
        let xml = pkg.part_text("xl/_rels/workbook.xml.rels").unwrap();
        assert!(parse_relationships(&xml).is_empty());
    }
}
