//! PURPOSE: Four-phase template traversal producing a `WorkbookSpec` and the
//! set of names a data provider must satisfy before rendering.

pub mod analyzer;
pub mod source;

pub use analyzer::{analyze, check_required_names};
pub use source::{TemplateSheet, TemplateSource};
