//! PURPOSE: Formula reference rewriting, template cell resolution, and the
//! in-memory / streaming rendering strategies, spec.md §4.3-§4.6.

pub mod formula;
pub mod render;
pub mod strategy;
pub mod value;

pub use formula::rewrite_formula;
pub use render::{
    collection_sizes, prime_collections, render_repeat_into, render_sheet, render_static_cells_into,
    repeat_final_row_range, EmptyAreaSubstitution, RenderedSheet,
};
pub use strategy::{choose_strategy, InMemoryStrategy, RenderingStrategy, StreamingStrategy};
pub use value::{resolve_cell, ItemContext, RenderedValue};
