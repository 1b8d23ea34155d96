//! PURPOSE: The error taxonomy shared by every stage of the pipeline.
//! CONTEXT: Mirrors the corpus's layering convention (a narrow per-crate
//! error enum that converts into a crate-root error via `#[from]`) so each
//! processor crate can define its own error type and still funnel into a
//! single `TbegError` at the facade.

use thiserror::Error;

/// The specific way a placeholder marker failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRepeatSyntax,
    MissingRequiredParameter,
    InvalidRangeFormat,
    SheetNotFound,
    InvalidParameterValue,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InvalidRepeatSyntax => "INVALID_REPEAT_SYNTAX",
            ErrorKind::MissingRequiredParameter => "MISSING_REQUIRED_PARAMETER",
            ErrorKind::InvalidRangeFormat => "INVALID_RANGE_FORMAT",
            ErrorKind::SheetNotFound => "SHEET_NOT_FOUND",
            ErrorKind::InvalidParameterValue => "INVALID_PARAMETER_VALUE",
        };
        write!(f, "{s}")
    }
}

/// A placeholder failed to parse. Carries the sheet/cell it was found in and
/// the offending marker text, per spec.md §4.1.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} in sheet '{sheet}' cell {cell_ref}: {text}")]
pub struct TemplateError {
    pub kind: ErrorKind,
    pub sheet: String,
    pub cell_ref: String,
    pub text: String,
}

/// Names the template references that the data provider does not supply,
/// raised only when `missingDataBehavior = Throw`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "missing template data: variables={variables:?}, collections={collections:?}, images={images:?}"
)]
pub struct MissingTemplateDataError {
    pub variables: Vec<String>,
    pub collections: Vec<String>,
    pub images: Vec<String>,
}

/// A formula's projected range would exceed Excel's function-argument
/// limits, per spec.md §4.6.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("formula expansion exceeds limits in sheet '{sheet}' cell {cell_ref}: {formula}")]
pub struct FormulaExpansionError {
    pub sheet: String,
    pub cell_ref: String,
    pub formula: String,
}

/// Top-level error type returned by the facade and every pipeline stage.
#[derive(Debug, Error)]
pub enum TbegError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    MissingData(#[from] MissingTemplateDataError),

    #[error(transparent)]
    FormulaExpansion(#[from] FormulaExpansionError),

    #[error("pivot rebuild failed for '{pivot_name}': {source}")]
    PivotRebuild {
        pivot_name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("package IO error: {0}")]
    PackageIo(String),

    #[error("cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TbegResult<T> = std::result::Result<T, TbegError>;
