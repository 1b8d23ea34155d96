//! PURPOSE: ZIP/XML package access for `.xlsx` files.
//! CONTEXT: Sits directly atop `tbeg-model`; every higher-level processor
//! crate (marker, pivot, charts, layout, metadata) reads and writes parts
//! through [`OoxmlPackage`] rather than touching the ZIP archive itself.

pub mod content_types;
pub mod error;
pub mod package;
pub mod rels;

pub use content_types::{add_override, has_override, remove_override};
pub use error::{OoxmlError, Result};
pub use package::OoxmlPackage;
pub use rels::{add_relationship, next_relationship_id, parse_relationships, rels_part_for, remove_relationship, Relationship};

pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";
pub const ROOT_RELS_PATH: &str = "_rels/.rels";
pub const WORKBOOK_PATH: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";
pub const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";
pub const STYLES_PATH: &str = "xl/styles.xml";
pub const CORE_PROPS_PATH: &str = "docProps/core.xml";
pub const APP_PROPS_PATH: &str = "docProps/app.xml";

/// Worksheet part path for a 1-based sheet index.
pub fn worksheet_path(sheet_index: usize) -> String {
    format!("xl/worksheets/sheet{sheet_index}.xml")
}

/// Pivot table definition part path for a 1-based pivot index.
pub fn pivot_table_path(pivot_index: usize) -> String {
    format!("xl/pivotTables/pivotTable{pivot_index}.xml")
}

/// Pivot cache definition part path for a 1-based cache index.
pub fn pivot_cache_definition_path(cache_index: usize) -> String {
    format!("xl/pivotCache/pivotCacheDefinition{cache_index}.xml")
}

/// Pivot cache records part path for a 1-based cache index.
pub fn pivot_cache_records_path(cache_index: usize) -> String {
    format!("xl/pivotCache/pivotCacheRecords{cache_index}.xml")
}

/// Chart part path for a 1-based chart index.
pub fn chart_path(chart_index: usize) -> String {
    format!("xl/charts/chart{chart_index}.xml")
}

/// Drawing part path for a 1-based drawing index.
pub fn drawing_path(drawing_index: usize) -> String {
    format!("xl/drawings/drawing{drawing_index}.xml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_helpers_follow_ooxml_naming() {
        assert_eq!(worksheet_path(2), "xl/worksheets/sheet2.xml");
        assert_eq!(pivot_table_path(1), "xl/pivotTables/pivotTable1.xml");
        assert_eq!(
            pivot_cache_definition_path(1),
            "xl/pivotCache/pivotCacheDefinition1.xml"
        );
        assert_eq!(chart_path(3), "xl/charts/chart3.xml");
    }
}
