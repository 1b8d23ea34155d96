//! PURPOSE: `LayoutPreserver` — the combined snapshot/restore entry point,
//! spec.md §4.7.

use crate::conditional::{expand_conditional_formats, extract_conditional_formats, ConditionalFormat};
use crate::sizes::{expand_sizes, extract_column_widths, extract_row_heights, SizeMap};
use crate::validation::{expand_validations, extract_data_validations, DataValidation};
use tbeg_model::RepeatRegionSpec;
use tbeg_position::PositionCalculator;

/// Everything captured from one sheet's template XML before rendering.
#[derive(Debug, Clone, Default)]
pub struct LayoutSnapshot {
    pub column_widths: SizeMap,
    pub row_heights: SizeMap,
    pub validations: Vec<DataValidation>,
    pub conditional_formats: Vec<ConditionalFormat>,
}

impl LayoutSnapshot {
    /// Reads every layout concern out of one sheet's raw worksheet XML.
    pub fn snapshot(xml: &str) -> Self {
        LayoutSnapshot {
            column_widths: extract_column_widths(xml),
            row_heights: extract_row_heights(xml),
            validations: extract_data_validations(xml),
            conditional_formats: extract_conditional_formats(xml),
        }
    }
}

/// The same data, projected onto the rendered sheet's final coordinates.
#[derive(Debug, Clone, Default)]
pub struct RestoredLayout {
    pub column_widths: SizeMap,
    pub row_heights: SizeMap,
    pub validations: Vec<DataValidation>,
    pub conditional_formats: Vec<ConditionalFormat>,
}

/// Expands a template snapshot using the sheet's repeat regions and its
/// `PositionCalculator`.
pub fn restore(
    snapshot: &LayoutSnapshot,
    repeats: &[RepeatRegionSpec],
    calculator: &PositionCalculator,
) -> RestoredLayout {
    RestoredLayout {
        column_widths: expand_sizes(&snapshot.column_widths, repeats, calculator, false),
        row_heights: expand_sizes(&snapshot.row_heights, repeats, calculator, true),
        validations: expand_validations(&snapshot.validations, repeats, calculator),
        conditional_formats: expand_conditional_formats(&snapshot.conditional_formats, calculator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbeg_model::{CellArea, CollectionSizes, RepeatDirection};

    #[test]
    fn snapshot_and_restore_round_trip_a_template() {
        let xml = r#"<worksheet><cols><col min="1" max="1" width="20" customWidth="1"/></cols>
            <sheetData><row r="2" ht="25" customHeight="1"><c r="A2"/></row></sheetData>
            <dataValidations><dataValidation type="list" allowBlank="1" showInputMessage="1" showErrorMessage="1" sqref="B2"><formula1>"Yes,No"</formula1></dataValidation></dataValidations>
            <conditionalFormatting sqref="C2:C2"><cfRule type="cellIs" operator="greaterThan"><formula>0</formula></cfRule></conditionalFormatting>
            </worksheet>"#;

        let snapshot = LayoutSnapshot::snapshot(xml);
        assert_eq!(snapshot.column_widths.get(&0), Some(&20.0));
        assert_eq!(snapshot.row_heights.get(&1), Some(&25.0));
        assert_eq!(snapshot.validations.len(), 1);
        assert_eq!(snapshot.conditional_formats.len(), 1);

        let repeats = vec![RepeatRegionSpec {
            collection: "items".into(),
            sheet: "Sheet1".into(),
            area: CellArea::parse("A2:C2").unwrap(),
            variable: "it".into(),
            direction: RepeatDirection::Down,
            empty_area: None,
        }];
        let mut sizes = CollectionSizes::new();
        sizes.set("items", 3);
        let calculator = PositionCalculator::new(&repeats, &sizes);

        let restored = restore(&snapshot, &repeats, &calculator);
        assert_eq!(restored.row_heights.len(), 3);
        assert_eq!(restored.validations[0].range, CellArea::parse("B2:B4").unwrap());
        assert_eq!(restored.conditional_formats[0].range, CellArea::parse("C2:C4").unwrap());
    }
}
