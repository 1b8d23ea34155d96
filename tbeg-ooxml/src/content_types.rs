//! PURPOSE: Add/remove `<Override>` entries in `[Content_Types].xml` without
//! a full DOM parse, so the rest of the document (defaults, unrelated
//! overrides) survives untouched, per spec.md §9's regex-over-DOM design
//! note.

use crate::package::OoxmlPackage;
use once_cell::sync::Lazy;
use regex::Regex;

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

static OVERRIDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<Override[^>]*PartName="(?P<name>[^"]+)"[^>]*/>"#).expect("valid regex")
});

/// Returns `true` if an `<Override>` for `part_name` already exists.
pub fn has_override(package: &OoxmlPackage, part_name: &str) -> bool {
    package
        .part_text(CONTENT_TYPES_PART)
        .map(|xml| {
            OVERRIDE_RE
                .captures_iter(&xml)
                .any(|c| &c["name"] == part_name)
        })
        .unwrap_or(false)
}

/// Inserts an `<Override>` entry for `part_name` with the given content
/// type, right before the closing `</Types>` tag. No-op if already present.
pub fn add_override(package: &mut OoxmlPackage, part_name: &str, content_type: &str) {
    if has_override(package, part_name) {
        return;
    }
    let Ok(xml) = package.part_text(CONTENT_TYPES_PART) else {
        return;
    };
    let entry = format!(
        r#"<Override PartName="{part_name}" ContentType="{content_type}"/>"#
    );
    let updated = xml.replacen("</Types>", &format!("{entry}</Types>"), 1);
    package.set_part_text(CONTENT_TYPES_PART, updated);
}

/// Removes the `<Override>` entry for `part_name`, if any.
pub fn remove_override(package: &mut OoxmlPackage, part_name: &str) {
    let Ok(xml) = package.part_text(CONTENT_TYPES_PART) else {
        return;
    };
    let needle_re = Regex::new(&format!(
        r#"<Override[^>]*PartName="{}"[^>]*/>"#,
        regex::escape(part_name)
    ))
    .expect("valid regex");
    let updated = needle_re.replace(&xml, "").into_owned();
    package.set_part_text(CONTENT_TYPES_PART, updated);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package_with_types() -> OoxmlPackage {
        let mut pkg = OoxmlPackage::empty();
        pkg.set_part_text(
            CONTENT_TYPES_PART,
            r#"<?xml version="1.0"?><Types xmlns="a"><Default Extension="xml" ContentType="application/xml"/></Types>"#
                .to_string(),
        );
        pkg
    }

    #[test]
    fn adds_and_detects_override() {
        let mut pkg = package_with_types();
        assert!(!has_override(&pkg, "/xl/pivotTables/pivotTable1.xml"));
        add_override(
            &mut pkg,
            "/xl/pivotTables/pivotTable1.xml",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.pivotTable+xml",
        );
        assert!(has_override(&pkg, "/xl/pivotTables/pivotTable1.xml"));
    }

    #[test]
    fn add_override_is_idempotent() {
        let mut pkg = package_with_types();
        add_override(&mut pkg, "/xl/foo.xml", "application/xml");
        add_override(&mut pkg, "/xl/foo.xml", "application/xml");
        let xml = pkg.part_text(CONTENT_TYPES_PART).unwrap();
        assert_eq!(xml.matches("/xl/foo.xml").count(), 1);
    }

    #[test]
    fn removes_override_leaving_rest_intact() {
        let mut pkg = package_with_types();
        add_override(&mut pkg, "/xl/foo.xml", "application/xml");
        remove_override(&mut pkg, "/xl/foo.xml");
        assert!(!has_override(&pkg, "/xl/foo.xml"));
        assert!(pkg.part_text(CONTENT_TYPES_PART).unwrap().contains("Default Extension"));
    }
}
