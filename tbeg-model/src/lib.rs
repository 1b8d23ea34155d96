//! PURPOSE: Shared data model for the template-based spreadsheet generator.
//! CONTEXT: Every other crate in the workspace depends on this one for
//! coordinates, cell content, repeat bookkeeping, configuration, the data
//! provider contract, and the error taxonomy. Nothing here touches OOXML or
//! ZIP directly — that begins in `tbeg-ooxml`.

pub mod config;
pub mod content;
pub mod coord;
pub mod error;
pub mod provider;
pub mod repeat;
pub mod spec;

pub use config::{
    FileConflictPolicy, FileNamingMode, MissingDataBehavior, StreamingMode, TbegConfig,
};
pub use content::{CellContent, ImagePosition, ImageSizing, RepeatMarker};
pub use coord::{
    a1_to_coord, col_to_index, coord_to_a1, index_to_col, parse_a1, split_a1_ref, CellArea,
    CellCoord, RepeatDirection, SheetRef,
};
pub use error::{
    ErrorKind, FormulaExpansionError, MissingTemplateDataError, TbegError, TbegResult,
    TemplateError,
};
pub use provider::{DataProvider, DataValue, DocumentMetadata, ImageFormat, ItemIterator};
pub use repeat::{CollectionSizes, RepeatExpansion, RepeatRegionSpec};
pub use spec::{MissingNames, RequiredNames, SheetSpec, WorkbookSpec};
