//! PURPOSE: The input contract the analyzer scans — decouples it from how
//! template cells were actually read off the worksheet XML.

use tbeg_marker::RawCellValue;
use tbeg_model::CellCoord;

/// One worksheet's raw cells, in whatever order the reader produced them.
pub struct TemplateSheet {
    pub name: String,
    pub cells: Vec<(CellCoord, RawCellValue)>,
}

/// A template's sheets, in workbook order.
pub trait TemplateSource {
    fn sheets(&self) -> &[TemplateSheet];
}

impl TemplateSource for Vec<TemplateSheet> {
    fn sheets(&self) -> &[TemplateSheet] {
        self.as_slice()
    }
}
