//! PURPOSE: `ProcessingContext` — the scratch space every pipeline stage
//! reads from and writes into, built once up front so per-sheet decisions
//! (streaming, collection sizes, final positions) are made before the
//! first stage runs rather than re-derived by each one.
//! CONTEXT: `tbeg-render`'s strategy doc calls out that chart extraction
//! only matters for the streaming path; deciding streaming here, at
//! construction time, is what lets the ChartExtract stage (first in the
//! fixed order) consult that decision without recomputing it.

use crate::reader::{self, WorksheetContents};
use crate::workbook;
use std::collections::HashMap;
use tbeg_analyze::source::TemplateSheet;
use tbeg_charts::ExtractedChart;
use tbeg_collection::CollectionBufferManager;
use tbeg_layout::LayoutSnapshot;
use tbeg_model::{
    DataProvider, MissingNames, RequiredNames, TbegConfig, TbegError, TbegResult, WorkbookSpec,
};
use tbeg_ooxml::{OoxmlPackage, SHARED_STRINGS_PATH};
use tbeg_pivot::PivotDefinition;
use tbeg_position::PositionCalculator;
use tbeg_render::RenderedSheet;

/// Lets a long-running generation be cancelled between (not mid-) stages.
pub trait CancellationToken {
    fn is_cancelled(&self) -> bool;
}

/// The default token for callers that never cancel.
pub struct NeverCancel;

impl CancellationToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Shared state threaded through every pipeline stage.
pub struct ProcessingContext<'a> {
    pub package: OoxmlPackage,
    pub provider: &'a dyn DataProvider,
    pub config: TbegConfig,

    pub workbook: WorkbookSpec,
    pub required_names: RequiredNames,
    pub missing_names: MissingNames,

    /// Sheet name -> worksheet part path, in workbook order.
    pub sheet_paths: Vec<(String, String)>,
    /// Sheet name -> its raw template cells and style indices, captured
    /// before any rendering overwrites the worksheet XML.
    pub raw_sheets: HashMap<String, WorksheetContents>,

    pub buffers: CollectionBufferManager,
    pub calculators: HashMap<String, PositionCalculator>,
    /// Sheet name -> whether that sheet renders through the streaming path.
    pub streaming: HashMap<String, bool>,

    pub rendered: HashMap<String, RenderedSheet>,
    /// Sheet name -> final coordinate -> style index chosen by NumberFormat
    /// for a rendered numeric cell whose template origin had no style.
    pub style_overrides: HashMap<String, HashMap<(u32, u32), String>>,

    pub layout_snapshots: HashMap<String, LayoutSnapshot>,
    pub extracted_charts: Vec<ExtractedChart>,
    pub extracted_pivots: Vec<PivotDefinition>,
    pub pivot_inputs: HashMap<String, tbeg_pivot::PivotRenderInput>,
}

impl<'a> ProcessingContext<'a> {
    /// Opens `bytes` as an OOXML package, reads every worksheet's raw cells,
    /// analyzes the template, validates required names against `provider`,
    /// then primes collections and decides the render strategy for every
    /// sheet up front.
    pub fn new(bytes: &[u8], provider: &'a dyn DataProvider, config: TbegConfig) -> TbegResult<Self> {
        let package = OoxmlPackage::open_bytes(bytes).map_err(|e| TbegError::PackageIo(e.to_string()))?;

        let sheet_paths = workbook::sheet_paths(&package);
        let shared_strings = package
            .part_text(SHARED_STRINGS_PATH)
            .map(|xml| reader::parse_shared_strings(&xml))
            .unwrap_or_default();

        let mut raw_sheets = HashMap::new();
        let mut template_sheets = Vec::new();
        for (name, path) in &sheet_paths {
            let xml = package.part_text(path).map_err(|e| TbegError::PackageIo(e.to_string()))?;
            let contents = reader::read_worksheet(&xml, &shared_strings);
            template_sheets.push(TemplateSheet {
                name: name.clone(),
                cells: contents.cells.clone(),
            });
            raw_sheets.insert(name.clone(), contents);
        }

        let (workbook, required_names) = tbeg_analyze::analyzer::analyze(&template_sheets)?;
        let available: Vec<&str> = provider.available_names().iter().map(|s| s.as_str()).collect();
        let missing_names = tbeg_analyze::analyzer::check_required_names(
            &required_names,
            &available,
            config.missing_data_behavior,
        )?;

        let mut buffers = CollectionBufferManager::new();
        let mut calculators = HashMap::new();
        let mut streaming = HashMap::new();

        for sheet in &workbook.sheets {
            tbeg_render::prime_collections(&sheet.repeats, provider, &mut buffers)?;
            let sizes = tbeg_render::collection_sizes(&sheet.repeats, &buffers)?;
            let calculator = PositionCalculator::new(&sheet.repeats, &sizes);

            let projected_rows = sheet
                .repeats
                .iter()
                .map(|r| calculator.get_final_range(r.area).end.0 + 1)
                .max()
                .unwrap_or(sheet.last_row_with_data + 1);

            streaming.insert(sheet.name.clone(), config.should_stream(projected_rows));
            calculators.insert(sheet.name.clone(), calculator);
        }

        Ok(ProcessingContext {
            package,
            provider,
            config,
            workbook,
            required_names,
            missing_names,
            sheet_paths,
            raw_sheets,
            buffers,
            calculators,
            streaming,
            rendered: HashMap::new(),
            style_overrides: HashMap::new(),
            layout_snapshots: HashMap::new(),
            extracted_charts: Vec::new(),
            extracted_pivots: Vec::new(),
            pivot_inputs: HashMap::new(),
        })
    }

    pub fn worksheet_path(&self, sheet_name: &str) -> Option<&str> {
        self.sheet_paths.iter().find(|(name, _)| name == sheet_name).map(|(_, path)| path.as_str())
    }
}
