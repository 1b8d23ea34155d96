//! PURPOSE: Orchestrates the fixed eleven-stage sequence that turns a
//! template workbook plus a data provider into a finished `.xlsx` package,
//! spec.md §2.

pub mod context;
pub mod pipeline;
pub mod processors;
pub mod reader;
pub mod workbook;
pub mod writer;

pub use context::{CancellationToken, NeverCancel, ProcessingContext};
pub use pipeline::Pipeline;
