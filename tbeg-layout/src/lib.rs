//! PURPOSE: Column widths, row heights, data validations, and conditional
//! formats — snapshot before render, restore/expand after, spec.md §4.7.

pub mod conditional;
pub mod preserve;
pub mod sizes;
pub mod validation;

pub use conditional::ConditionalFormat;
pub use preserve::{restore, LayoutSnapshot, RestoredLayout};
pub use sizes::{render_cols_block, SizeMap};
pub use validation::{render_data_validation, DataValidation, ValidationType};
