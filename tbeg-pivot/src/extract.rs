//! PURPOSE: `PivotTableProcessor::extract` — parse every pivot table and its
//! cache before render, then strip all trace of it from the package so the
//! renderer never sees it, spec.md §4.9.

use crate::definition::{AggregateFunction, DataFieldSpec, PivotDefinition};
use once_cell::sync::Lazy;
use regex::Regex;
use tbeg_model::{parse_a1, CellArea};
use tbeg_ooxml::{parse_relationships, rels_part_for, remove_override, OoxmlPackage};

static LOCATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<location[^>]*ref="([^"]+)"[^>]*/>"#).expect("valid regex"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<pivotTableDefinition[^>]*\bname="([^"]+)""#).expect("valid regex"));
static PIVOT_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<pivotField([^>]*)(?:/>|>.*?</pivotField>)"#).expect("valid regex")
});
static ROW_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<field x="(\d+)"/>"#).expect("valid regex"));
static ROW_FIELDS_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<rowFields[^>]*>(.*?)</rowFields>"#).expect("valid regex"));
static DATA_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<dataField[^>]*name="([^"]*)"[^>]*fld="(\d+)"(?:[^>]*subtotal="([^"]+)")?[^>]*/>"#)
        .expect("valid regex")
});
static STYLE_INFO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<pivotTableStyleInfo[^/]*/>"#).expect("valid regex"));
static FORMATS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<formats>.*?</formats>"#).expect("valid regex"));
static WORKSHEET_SOURCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<worksheetSource[^>]*ref="([^"]+)"[^>]*sheet="([^"]+)"[^>]*/>"#)
        .expect("valid regex")
});
static CACHE_FIELD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<cacheField[^>]*name="([^"]+)"[^>]*>"#).expect("valid regex"));
static CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<c r="([A-Za-z]+[0-9]+)"[^>]*(?:/>|>.*?</c>)"#).expect("valid regex"));

fn cell_style(worksheet_xml: &str, coord: tbeg_model::CellCoord) -> Option<String> {
    let target = tbeg_model::coord_to_a1(coord);
    for caps in CELL_RE.captures_iter(worksheet_xml) {
        if caps[1] == target {
            let whole = caps.get(0).unwrap().as_str();
            let re = Regex::new(r#"\bs="([^"]+)""#).expect("valid regex");
            return re.captures(whole).map(|c| c[1].to_string());
        }
    }
    None
}

fn is_axis_row(field_attrs: &str) -> bool {
    field_attrs.contains(r#"axis="axisRow""#)
}

fn pivot_field_captions(xml: &str) -> Vec<String> {
    CACHE_FIELD_NAME_RE
        .captures_iter(xml)
        .map(|c| c[1].to_string())
        .collect()
}

/// Parses one `pivotTableN.xml` + its cache parts into a [`PivotDefinition`].
fn parse_pivot(
    package: &OoxmlPackage,
    sheet: &str,
    worksheet_path: &str,
    pivot_table_path: &str,
    pivot_xml: &str,
    worksheet_xml: &str,
) -> Option<PivotDefinition> {
    let name = NAME_RE
        .captures(pivot_xml)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "PivotTable1".to_string());

    let location_ref = LOCATION_RE.captures(pivot_xml)?[1].to_string();
    let location = CellArea::parse(&location_ref)?;

    let row_fields = ROW_FIELDS_BLOCK_RE
        .captures(pivot_xml)
        .map(|block| {
            ROW_FIELD_RE
                .captures_iter(&block[1])
                .filter_map(|c| c[1].parse::<u32>().ok())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let data_fields: Vec<DataFieldSpec> = DATA_FIELD_RE
        .captures_iter(pivot_xml)
        .filter_map(|c| {
            let field_index: u32 = c[2].parse().ok()?;
            let function = c
                .get(3)
                .and_then(|m| AggregateFunction::from_subtotal_attr(m.as_str()))
                .unwrap_or(AggregateFunction::Sum);
            let display_name = c.get(1).map(|m| m.as_str().to_string()).filter(|s| !s.is_empty());
            Some(DataFieldSpec { field_index, function, display_name })
        })
        .collect();

    let style_info = STYLE_INFO_RE
        .find(pivot_xml)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let formats_xml = FORMATS_RE.find(pivot_xml).map(|m| m.as_str().to_string());

    let rels_path = rels_part_for(pivot_table_path);
    let rels_xml = package.part_text(&rels_path).ok()?;
    let cache_rel = parse_relationships(&rels_xml)
        .into_iter()
        .find(|r| r.rel_type.ends_with("/pivotCacheDefinition"))?;
    let cache_definition_path = resolve_relative(dir_of(pivot_table_path), &cache_rel.target);
    let cache_xml = package.part_text(&cache_definition_path).ok()?;

    let cache_rels_path = rels_part_for(&cache_definition_path);
    let cache_rels_xml = package.part_text(&cache_rels_path).unwrap_or_default();
    let records_rel = parse_relationships(&cache_rels_xml)
        .into_iter()
        .find(|r| r.rel_type.ends_with("/pivotCacheRecords"));
    let cache_records_path = records_rel
        .map(|r| resolve_relative(dir_of(&cache_definition_path), &r.target))
        .unwrap_or_else(|| cache_definition_path.replace("Definition", "Records"));

    let (source_range_ref, source_sheet) = WORKSHEET_SOURCE_RE
        .captures(&cache_xml)
        .map(|c| (c[1].to_string(), c[2].to_string()))?;
    let source_range = CellArea::parse(&source_range_ref)?;

    let field_captions = pivot_field_captions(&cache_xml);

    // Ensure the field count matches the regex at least loosely; harmless if
    // `PIVOT_FIELD_RE` finds more fields than axis/data roles use.
    let _ = PIVOT_FIELD_RE.captures_iter(pivot_xml).filter(|c| is_axis_row(&c[1])).count();

    let header_style = cell_style(worksheet_xml, location.start);
    let data_style = cell_style(worksheet_xml, (location.start.0 + 1, location.start.1 + 1));

    Some(PivotDefinition {
        name,
        sheet: sheet.to_string(),
        worksheet_path: worksheet_path.to_string(),
        location,
        source_sheet,
        source_range,
        row_fields,
        data_fields,
        field_captions,
        header_style,
        data_style,
        style_info,
        formats_xml,
        pivot_table_path: pivot_table_path.to_string(),
        cache_definition_path,
        cache_records_path,
    })
}

fn dir_of(part_name: &str) -> &str {
    match part_name.rfind('/') {
        Some(idx) => &part_name[..idx],
        None => "",
    }
}

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

/// Blanks every `<c>` element under `location` in a worksheet's XML so the
/// renderer's row-wise expansion below does not inherit pivot cell styles.
fn blank_cells_under(worksheet_xml: &str, location: &CellArea) -> String {
    CELL_RE
        .replace_all(worksheet_xml, |caps: &regex::Captures| {
            let whole = caps.get(0).unwrap().as_str();
            match parse_a1(&caps[1]) {
                Some(coord) if location.contains(coord) => String::new(),
                _ => whole.to_string(),
            }
        })
        .into_owned()
}

/// Extracts every pivot table in the package, removing its parts,
/// relationships, and content-type overrides, and blanking the worksheet
/// cells under its template location.
pub fn extract_pivots(package: &mut OoxmlPackage) -> Vec<PivotDefinition> {
    let pivot_paths: Vec<String> = package
        .part_names_with_prefix("xl/pivotTables/")
        .filter(|n| n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();

    let worksheet_sheet_map = worksheet_sheet_names(package);
    let mut extracted = Vec::new();

    for pivot_table_path in pivot_paths {
        let Ok(pivot_xml) = package.part_text(&pivot_table_path) else { continue };
        let Some(sheet_path) = owning_worksheet(package, &pivot_table_path) else { continue };
        let sheet_name = worksheet_sheet_map
            .get(&sheet_path)
            .cloned()
            .unwrap_or_else(|| sheet_path.clone());

        let sheet_xml_before = package.part_text(&sheet_path).unwrap_or_default();
        let Some(def) = parse_pivot(package, &sheet_name, &sheet_path, &pivot_table_path, &pivot_xml, &sheet_xml_before) else {
            continue;
        };

        package.remove_part(&pivot_table_path);
        package.remove_part(&def.cache_definition_path);
        package.remove_part(&def.cache_records_path);
        remove_override(package, &format!("/{pivot_table_path}"));
        remove_override(package, &format!("/{}", def.cache_definition_path));
        remove_override(package, &format!("/{}", def.cache_records_path));

        let sheet_rels_path = rels_part_for(&sheet_path);
        if let Ok(sheet_rels_xml) = package.part_text(&sheet_rels_path) {
            if let Some(rel) = parse_relationships(&sheet_rels_xml)
                .into_iter()
                .find(|r| r.rel_type.ends_with("/pivotTable") && {
                    resolve_relative(dir_of(&sheet_path), &r.target) == pivot_table_path
                })
            {
                tbeg_ooxml::remove_relationship(package, &sheet_rels_path, &rel.id);
            }
        }

        if let Ok(sheet_xml) = package.part_text(&sheet_path) {
            let blanked = blank_cells_under(&sheet_xml, &def.location);
            package.set_part_text(sheet_path.clone(), blanked);
        }

        extracted.push(def);
    }

    extracted
}

/// Finds the worksheet part that relates to `pivot_table_path` via a
/// `.../relationships/pivotTable` relationship.
fn owning_worksheet(package: &OoxmlPackage, pivot_table_path: &str) -> Option<String> {
    let sheet_paths: Vec<String> = package
        .part_names_with_prefix("xl/worksheets/")
        .filter(|n| n.ends_with(".xml") && !n.contains("_rels"))
        .map(|s| s.to_string())
        .collect();
    for sheet_path in sheet_paths {
        let rels_path = rels_part_for(&sheet_path);
        let Ok(rels_xml) = package.part_text(&rels_path) else { continue };
        for rel in parse_relationships(&rels_xml) {
            if rel.rel_type.ends_with("/pivotTable")
                && resolve_relative(dir_of(&sheet_path), &rel.target) == pivot_table_path
            {
                return Some(sheet_path);
            }
        }
    }
    None
}

static SHEET_ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<sheet[^>]*name="([^"]+)"[^>]*r:id="([^"]+)"[^>]*/>"#).expect("valid regex"));

/// Maps worksheet part paths to their workbook sheet names.
fn worksheet_sheet_names(package: &OoxmlPackage) -> std::collections::HashMap<String, String> {
    let mut map = std::collections::HashMap::new();
    let Ok(workbook_xml) = package.part_text(tbeg_ooxml::WORKBOOK_PATH) else {
        return map;
    };
    let Ok(rels_xml) = package.part_text(tbeg_ooxml::WORKBOOK_RELS_PATH) else {
        return map;
    };
    let rels = parse_relationships(&rels_xml);
    for caps in SHEET_ENTRY_RE.captures_iter(&workbook_xml) {
        let name = caps[1].to_string();
        let rid = &caps[2];
        if let Some(rel) = rels.iter().find(|r| r.id == rid) {
            let path = resolve_relative("xl", &rel.target);
            map.insert(path, name);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_package() -> OoxmlPackage {
        let mut pkg = OoxmlPackage::empty();
        pkg.set_part_text(
            tbeg_ooxml::WORKBOOK_PATH,
            r#"<workbook><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string(),
        );
        pkg.set_part_text(
            tbeg_ooxml::WORKBOOK_RELS_PATH,
            r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
        );
        pkg.set_part_text(
            "xl/worksheets/sheet1.xml",
            r#"<worksheet><sheetData><row r="10"><c r="A10" t="str"><v>Position</v></c></row></sheetData></worksheet>"#.to_string(),
        );
        pkg.set_part_text(
            "xl/worksheets/_rels/sheet1.xml.rels",
            r#"<Relationships><Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/pivotTable" Target="../pivotTables/pivotTable1.xml"/></Relationships>"#.to_string(),
        );
        pkg.set_part_text(
            "xl/pivotTables/pivotTable1.xml",
            r#"<pivotTableDefinition name="PivotTable1"><location ref="A10:B15" firstHeaderRow="1" firstDataRow="2" firstDataCol="1"/>
            <pivotFields count="2"><pivotField axis="axisRow"><items><item x="0"/></items></pivotField><pivotField/></pivotFields>
            <rowFields count="1"><field x="0"/></rowFields>
            <dataFields count="1"><dataField name="Sum of Salary" fld="1" baseField="0" baseItem="0" subtotal="sum"/></dataFields>
            <pivotTableStyleInfo name="PivotStyleLight16" showRowHeaders="1"/>
            </pivotTableDefinition>"#.to_string(),
        );
        pkg.set_part_text(
            "xl/pivotTables/_rels/pivotTable1.xml.rels",
            r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/pivotCacheDefinition" Target="../pivotCache/pivotCacheDefinition1.xml"/></Relationships>"#.to_string(),
        );
        pkg.set_part_text(
            "xl/pivotCache/pivotCacheDefinition1.xml",
            r#"<pivotCacheDefinition recordCount="7"><cacheSource type="worksheet"><worksheetSource ref="A1:B8" sheet="Sheet1"/></cacheSource>
            <cacheFields count="2"><cacheField name="Position" numFmtId="0"><sharedItems count="0"/></cacheField><cacheField name="Salary" numFmtId="0"><sharedItems/></cacheField></cacheFields>
            </pivotCacheDefinition>"#.to_string(),
        );
        pkg.set_part_text(
            "xl/pivotCache/_rels/pivotCacheDefinition1.xml.rels",
            r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/pivotCacheRecords" Target="pivotCacheRecords1.xml"/></Relationships>"#.to_string(),
        );
        pkg.set_part_text(
            "xl/pivotCache/pivotCacheRecords1.xml",
            r#"<pivotCacheRecords count="7"></pivotCacheRecords>"#.to_string(),
        );
        pkg.set_part_text(
            "[Content_Types].xml",
            r#"<Types><Override PartName="/xl/pivotTables/pivotTable1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.pivotTable+xml"/></Types>"#.to_string(),
        );
        pkg
    }

    #[test]
    fn extracts_pivot_definition_and_strips_package() {
        let mut pkg = sample_package();
        let pivots = extract_pivots(&mut pkg);

        assert_eq!(pivots.len(), 1);
        let def = &pivots[0];
        assert_eq!(def.name, "PivotTable1");
        assert_eq!(def.location.to_a1(), "A10:B15");
        assert_eq!(def.source_range.to_a1(), "A1:B8");
        assert_eq!(def.row_fields, vec![0]);
        assert_eq!(def.data_fields.len(), 1);
        assert_eq!(def.data_fields[0].field_index, 1);
        assert_eq!(def.data_fields[0].display_name.as_deref(), Some("Sum of Salary"));

        assert!(!pkg.has_part("xl/pivotTables/pivotTable1.xml"));
        assert!(!pkg.has_part("xl/pivotCache/pivotCacheDefinition1.xml"));
        assert!(!pkg.has_part("xl/pivotCache/pivotCacheRecords1.xml"));

        let sheet_xml = pkg.part_text("xl/worksheets/sheet1.xml").unwrap();
        assert!(!sheet_xml.contains("A10"));
    }
}
