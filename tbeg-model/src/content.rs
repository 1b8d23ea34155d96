//! PURPOSE: The per-cell template blueprint produced by the marker parser
//! and consumed by the renderer.
//! CONTEXT: `CellContent` separates "what the designer wrote in the
//! template cell" from "what ends up in the output cell" the same way the
//! engine crate separates a cell's formula text from its evaluated value.

use crate::coord::{CellArea, RepeatDirection, SheetRef};

/// How an image marker's size parameter should be interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSizing {
    /// Keep the image's native pixel dimensions.
    Original,
    /// Fixed pixel size.
    Pixels { width: u32, height: u32 },
}

/// Anchor position for an image marker: an A1 cell plus an optional pixel
/// offset within that cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePosition {
    pub cell: (u32, u32),
    pub offset_x: i32,
    pub offset_y: i32,
}

/// A declarative description of how a repeat region expands. This is the
/// parsed form of `${repeat(collection, range [, var] [, direction]
/// [, empty=<range>])}` (or the `=TBEG_REPEAT(...)` spreadsheet-function
/// spelling).
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatMarker {
    pub collection: String,
    /// Sheet the expanded region targets; `None` means the sheet the marker
    /// cell lives on.
    pub target_sheet: SheetRef,
    pub area: CellArea,
    pub variable: String,
    pub direction: RepeatDirection,
    pub empty_area: Option<CellArea>,
}

/// The tagged variant every template cell resolves to after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Empty,
    StaticString(String),
    StaticNumber(f64),
    StaticBoolean(bool),
    /// Resolves via `dataProvider.value(name)`.
    Variable(String),
    /// A dotted path resolved against the current repeat iteration item,
    /// e.g. `it.name` or `it.address.city`.
    ItemField(String),
    /// Literal text with one or more embedded `${...}` variable or item-field
    /// substrings, e.g. `"Hello ${name}"`. Unlike [`CellContent::Variable`],
    /// which replaces the whole cell, the surrounding literal text survives
    /// substitution.
    TemplateText(String),
    /// Excel formula text; may embed `${...}` variables resolved at render
    /// time before the formula is adjusted for expansion.
    Formula(String),
    RepeatMarker(RepeatMarker),
    ImageMarker {
        name: String,
        position: ImagePosition,
        sizing: ImageSizing,
    },
    /// `${size(collection)}` — resolves to the collection's item count at
    /// render time.
    SizeMarker(String),
}

impl CellContent {
    pub fn is_repeat(&self) -> bool {
        matches!(self, CellContent::RepeatMarker(_))
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellContent::Formula(_))
    }
}
