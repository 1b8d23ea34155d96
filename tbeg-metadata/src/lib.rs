//! PURPOSE: `MetadataWriter` — the pipeline's final stage, writing the
//! provider's document metadata into `docProps/core.xml` and
//! `docProps/app.xml`, spec.md §4.10. Missing fields are left untouched
//! rather than blanked, mirroring the rest of this workspace's
//! edit-in-place regex approach over a full DOM parse.

use once_cell::sync::Lazy;
use regex::Regex;
use tbeg_model::DocumentMetadata;
use tbeg_ooxml::{CORE_PROPS_PATH, APP_PROPS_PATH, OoxmlPackage};

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Replaces `tag`'s element in `xml` with `value`, inserting one just before
/// `insertion_point` if the tag is absent.
fn set_element(xml: &str, tag: &str, value: &str, insertion_point: &str) -> String {
    let pattern = format!(r#"(?s)<{tag}(?:\s[^>]*)?>.*?</{tag}>|<{tag}(?:\s[^>]*)?/>"#);
    let re = Regex::new(&pattern).expect("valid regex");
    let rendered = format!("<{tag}>{}</{tag}>", escape(value));
    if re.is_match(xml) {
        re.replace(xml, regex::NoExpand(&rendered)).into_owned()
    } else if xml.contains(insertion_point) {
        xml.replacen(insertion_point, &format!("{rendered}{insertion_point}"), 1)
    } else {
        format!("{xml}{rendered}")
    }
}

static CORE_CLOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</cp:coreProperties>").expect("valid regex"));
static APP_CLOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</Properties>").expect("valid regex"));

fn core_closing_tag(xml: &str) -> &'static str {
    if CORE_CLOSE_RE.is_match(xml) {
        "</cp:coreProperties>"
    } else {
        ""
    }
}

fn app_closing_tag(xml: &str) -> &'static str {
    if APP_CLOSE_RE.is_match(xml) {
        "</Properties>"
    } else {
        ""
    }
}

/// Writes `metadata` into the package's core and extended properties parts.
/// Fields the provider left unset are skipped, leaving whatever the template
/// already carried in place.
pub fn write_metadata(package: &mut OoxmlPackage, metadata: &DocumentMetadata) {
    if let Ok(mut core_xml) = package.part_text(CORE_PROPS_PATH) {
        let insertion = core_closing_tag(&core_xml).to_string();
        if let Some(title) = &metadata.title {
            core_xml = set_element(&core_xml, "dc:title", title, &insertion);
        }
        if let Some(author) = &metadata.author {
            core_xml = set_element(&core_xml, "dc:creator", author, &insertion);
        }
        if let Some(subject) = &metadata.subject {
            core_xml = set_element(&core_xml, "dc:subject", subject, &insertion);
        }
        if !metadata.keywords.is_empty() {
            core_xml = set_element(&core_xml, "cp:keywords", &metadata.keywords.join(","), &insertion);
        }
        if let Some(description) = &metadata.description {
            core_xml = set_element(&core_xml, "dc:description", description, &insertion);
        }
        if let Some(category) = &metadata.category {
            core_xml = set_element(&core_xml, "cp:category", category, &insertion);
        }
        package.set_part_text(CORE_PROPS_PATH, core_xml);
    }

    if let Ok(mut app_xml) = package.part_text(APP_PROPS_PATH) {
        let insertion = app_closing_tag(&app_xml).to_string();
        if let Some(company) = &metadata.company {
            app_xml = set_element(&app_xml, "Company", company, &insertion);
        }
        if let Some(manager) = &metadata.manager {
            app_xml = set_element(&app_xml, "Manager", manager, &insertion);
        }
        package.set_part_text(APP_PROPS_PATH, app_xml);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_package() -> OoxmlPackage {
        let mut pkg = OoxmlPackage::empty();
        pkg.set_part_text(
            CORE_PROPS_PATH,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Old</dc:title></cp:coreProperties>"#
                .to_string(),
        );
        pkg.set_part_text(
            APP_PROPS_PATH,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>Microsoft Excel</Application></Properties>"#
                .to_string(),
        );
        pkg
    }

    #[test]
    fn replaces_existing_element_and_inserts_missing_ones() {
        let mut pkg = sample_package();
        let metadata = DocumentMetadata {
            title: Some("Quarterly Report".into()),
            author: Some("Jane Doe".into()),
            subject: None,
            keywords: vec!["finance".into(), "q3".into()],
            description: Some("Generated report".into()),
            category: None,
            company: Some("Acme".into()),
            manager: None,
        };

        write_metadata(&mut pkg, &metadata);

        let core = pkg.part_text(CORE_PROPS_PATH).unwrap();
        assert!(core.contains("<dc:title>Quarterly Report</dc:title>"));
        assert!(!core.contains(">Old<"));
        assert!(core.contains("<dc:creator>Jane Doe</dc:creator>"));
        assert!(core.contains("<cp:keywords>finance,q3</cp:keywords>"));
        assert!(core.contains("<dc:description>Generated report</dc:description>"));
        assert!(!core.contains("dc:subject"));
        assert!(!core.contains("cp:category"));

        let app = pkg.part_text(APP_PROPS_PATH).unwrap();
        assert!(app.contains("<Company>Acme</Company>"));
        assert!(app.contains("<Application>Microsoft Excel</Application>"));
        assert!(!app.contains("Manager"));
    }

    #[test]
    fn omits_fields_the_provider_left_unset() {
        let mut pkg = sample_package();
        write_metadata(&mut pkg, &DocumentMetadata::default());

        let core = pkg.part_text(CORE_PROPS_PATH).unwrap();
        assert!(core.contains("<dc:title>Old</dc:title>"));
    }

    #[test]
    fn escapes_special_characters() {
        let mut pkg = sample_package();
        let metadata = DocumentMetadata {
            title: Some("A & B <Report>".into()),
            ..Default::default()
        };
        write_metadata(&mut pkg, &metadata);
        let core = pkg.part_text(CORE_PROPS_PATH).unwrap();
        assert!(core.contains("A &amp; B &lt;Report&gt;"));
    }
}
