//! PURPOSE: Four-phase template traversal, spec.md §4.2.
//! CONTEXT: (i) collect repeat markers, (ii) dedup them by
//! `(collection, targetSheet, targetArea)`, (iii) classify every cell into a
//! `SheetSpec`, (iv) drop duplicate non-repeat range markers (images).

use crate::source::TemplateSource;
use std::collections::HashMap;
use tbeg_marker::RawCellValue;
use tbeg_model::{
    coord_to_a1, CellContent, CellCoord, ErrorKind, MissingNames, RepeatRegionSpec,
    RequiredNames, SheetSpec, TbegError, TemplateError, WorkbookSpec,
};

/// Runs the four-phase traversal over `source`, producing the workbook
/// blueprint and the set of names the data provider must satisfy.
pub fn analyze(source: &dyn TemplateSource) -> Result<(WorkbookSpec, RequiredNames), TbegError> {
    let sheet_names: Vec<&str> = source.sheets().iter().map(|s| s.name.as_str()).collect();

    let mut workbook = WorkbookSpec::new();
    let mut required = RequiredNames::new();
    // Phase i: collect every repeat marker, in traversal order, per sheet.
    let mut repeats_by_sheet: HashMap<String, Vec<RepeatRegionSpec>> = HashMap::new();

    for template_sheet in source.sheets() {
        let mut sheet_spec = SheetSpec::new(template_sheet.name.clone());
        let mut ordered_cells = template_sheet.cells.iter().collect::<Vec<_>>();
        // Row-major order, per spec.md §4.2 phase (iii).
        ordered_cells.sort_by_key(|(coord, _)| *coord);

        for (coord, raw) in ordered_cells {
            let cell_ref = coord_to_a1(*coord);
            let content = tbeg_marker::parse_cell(&template_sheet.name, &cell_ref, raw)?;
            collect_required_names(&content, &mut required);

            if let CellContent::RepeatMarker(ref marker) = content {
                let target_sheet = marker
                    .target_sheet
                    .clone()
                    .unwrap_or_else(|| template_sheet.name.clone());
                if !sheet_names.contains(&target_sheet.as_str()) {
                    return Err(TbegError::Template(TemplateError {
                        kind: ErrorKind::SheetNotFound,
                        sheet: template_sheet.name.clone(),
                        cell_ref,
                        text: target_sheet,
                    }));
                }
                repeats_by_sheet
                    .entry(target_sheet.clone())
                    .or_default()
                    .push(RepeatRegionSpec {
                        collection: marker.collection.clone(),
                        sheet: target_sheet,
                        area: marker.area,
                        variable: marker.variable.clone(),
                        direction: marker.direction,
                        empty_area: marker.empty_area,
                    });
            }

            sheet_spec.set_cell(*coord, content);
        }

        workbook.sheets.push(sheet_spec);
    }

    // Phase ii: dedup repeats by (collection, targetSheet, targetArea), last
    // declaration wins.
    for (sheet_name, repeats) in repeats_by_sheet {
        let mut deduped: HashMap<(String, String, (u32, u32, u32, u32)), RepeatRegionSpec> =
            HashMap::new();
        for repeat in repeats {
            let key = repeat.dedup_key();
            if deduped.contains_key(&key) {
                log::warn!(
                    "duplicate repeat declaration for collection '{}' targeting {} on sheet '{}'; keeping the last one",
                    repeat.collection,
                    repeat.area,
                    sheet_name,
                );
            }
            deduped.insert(key, repeat);
        }
        if let Some(sheet_spec) = workbook.sheet_mut(&sheet_name) {
            sheet_spec.repeats = deduped.into_values().collect();
            sheet_spec.repeats.sort_by_key(|r| r.area.start);
        }
    }

    // Phase iv: drop duplicate image-marker declarations within a sheet,
    // keeping the last one and blanking the earlier cell(s).
    for sheet_spec in &mut workbook.sheets {
        dedup_image_markers(sheet_spec);
    }

    Ok((workbook, required))
}

fn collect_required_names(content: &CellContent, required: &mut RequiredNames) {
    match content {
        CellContent::Variable(name) => {
            required.variables.insert(name.clone());
        }
        CellContent::TemplateText(text) => {
            for name in embedded_variable_names(text) {
                required.variables.insert(name);
            }
        }
        CellContent::RepeatMarker(marker) => {
            required.collections.insert(marker.collection.clone());
        }
        CellContent::SizeMarker(collection) => {
            required.collections.insert(collection.clone());
        }
        CellContent::ImageMarker { name, .. } => {
            required.images.insert(name.clone());
        }
        _ => {}
    }
}

/// Extracts top-level `${name}` variable references from literal text that
/// mixes markers with surrounding characters (item-field paths inside such
/// text are resolved per-item at render time, not validated up front).
fn embedded_variable_names(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("${") {
        let after_open = &rest[open + 2..];
        if let Some(close) = after_open.find('}') {
            let inner = &after_open[..close];
            if !inner.contains('.') && !inner.contains('(') {
                names.push(inner.to_string());
            }
            rest = &after_open[close + 1..];
        } else {
            break;
        }
    }
    names
}

/// Identity for a declared image marker: same image name at the same anchor
/// cell. Two such declarations on the same sheet are treated as the same
/// logical marker; only the later one survives.
fn image_dedup_key(coord: CellCoord, name: &str, anchor: (u32, u32)) -> (String, (u32, u32)) {
    let _ = coord;
    (name.to_string(), anchor)
}

fn dedup_image_markers(sheet: &mut SheetSpec) {
    let mut last_cell_for_key: HashMap<(String, (u32, u32)), CellCoord> = HashMap::new();
    for (coord, content) in sheet.cells.iter() {
        if let CellContent::ImageMarker { name, position, .. } = content {
            let key = image_dedup_key(*coord, name, position.cell);
            last_cell_for_key.insert(key, *coord);
        }
    }

    let mut to_blank = Vec::new();
    for (coord, content) in sheet.cells.iter() {
        if let CellContent::ImageMarker { name, position, .. } = content {
            let key = image_dedup_key(*coord, name, position.cell);
            if last_cell_for_key.get(&key) != Some(coord) {
                to_blank.push(*coord);
            }
        }
    }
    for coord in to_blank {
        sheet.cells.insert(coord, CellContent::Empty);
    }
}

/// Applies `missingDataBehavior`: returns the computed [`MissingNames`] and,
/// for `Throw`, the error to raise instead of rendering.
pub fn check_required_names(
    required: &RequiredNames,
    available: &[&str],
    behavior: tbeg_model::MissingDataBehavior,
) -> Result<MissingNames, TbegError> {
    use tbeg_model::MissingDataBehavior;

    let missing = required.diff(available);
    match behavior {
        MissingDataBehavior::Ignore => Ok(missing),
        MissingDataBehavior::Warn => {
            if !missing.is_empty() {
                log::warn!(
                    "template references data the provider does not supply: variables={:?} collections={:?} images={:?}",
                    missing.variables,
                    missing.collections,
                    missing.images,
                );
            }
            Ok(missing)
        }
        MissingDataBehavior::Throw => {
            if missing.is_empty() {
                Ok(missing)
            } else {
                Err(TbegError::MissingData(tbeg_model::MissingTemplateDataError {
                    variables: missing.variables,
                    collections: missing.collections,
                    images: missing.images,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TemplateSheet;

    fn sheet(name: &str, cells: Vec<(CellCoord, RawCellValue)>) -> TemplateSheet {
        TemplateSheet {
            name: name.to_string(),
            cells,
        }
    }

    #[test]
    fn collects_variables_and_collections() {
        let sheets = vec![sheet(
            "Sheet1",
            vec![
                ((0, 0), RawCellValue::Text("${title}".into())),
                (
                    (1, 0),
                    RawCellValue::Text("${repeat(items, A2:B2, it, DOWN)}".into()),
                ),
                ((1, 1), RawCellValue::Text("${it.value}".into())),
            ],
        )];

        let (workbook, required) = analyze(&sheets).unwrap();
        assert!(required.variables.contains("title"));
        assert!(required.collections.contains("items"));
        assert_eq!(workbook.sheets.len(), 1);
        assert_eq!(workbook.sheets[0].repeats.len(), 1);
    }

    #[test]
    fn duplicate_repeats_keep_last_declaration() {
        let sheets = vec![sheet(
            "Sheet1",
            vec![
                (
                    (0, 0),
                    RawCellValue::Text("${repeat(items, A1:A1, first)}".into()),
                ),
                (
                    (5, 0),
                    RawCellValue::Text("${repeat(items, A1:A1, second)}".into()),
                ),
            ],
        )];

        let (workbook, _) = analyze(&sheets).unwrap();
        let repeats = &workbook.sheets[0].repeats;
        assert_eq!(repeats.len(), 1);
        assert_eq!(repeats[0].variable, "second");
    }

    #[test]
    fn repeat_targeting_unknown_sheet_errors() {
        let sheets = vec![sheet(
            "Sheet1",
            vec![(
                (0, 0),
                RawCellValue::Text("${repeat(items, 'Ghost'!A1:A1)}".into()),
            )],
        )];

        let err = analyze(&sheets).unwrap_err();
        match err {
            TbegError::Template(t) => assert_eq!(t.kind, ErrorKind::SheetNotFound),
            other => panic!("expected SheetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_image_marker_keeps_last_and_blanks_earlier() {
        let sheets = vec![sheet(
            "Sheet1",
            vec![
                ((0, 0), RawCellValue::Text("${image(logo, B2)}".into())),
                ((2, 0), RawCellValue::Text("${image(logo, B2)}".into())),
            ],
        )];

        let (workbook, _) = analyze(&sheets).unwrap();
        let sheet_spec = &workbook.sheets[0];
        assert_eq!(sheet_spec.cells[&(0, 0)], CellContent::Empty);
        assert!(matches!(
            sheet_spec.cells[&(2, 0)],
            CellContent::ImageMarker { .. }
        ));
    }

    #[test]
    fn missing_required_names_throws_when_configured() {
        let mut required = RequiredNames::new();
        required.variables.insert("title".into());
        let err = check_required_names(&required, &[], tbeg_model::MissingDataBehavior::Throw)
            .unwrap_err();
        assert!(matches!(err, TbegError::MissingData(_)));
    }

    #[test]
    fn missing_required_names_ignored_when_configured() {
        let mut required = RequiredNames::new();
        required.variables.insert("title".into());
        let missing =
            check_required_names(&required, &[], tbeg_model::MissingDataBehavior::Ignore).unwrap();
        assert_eq!(missing.variables, vec!["title".to_string()]);
    }
}
