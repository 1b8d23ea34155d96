//! PURPOSE: Pivot table extraction before render and cache/definition/grid
//! rebuild afterward, spec.md §4.9.

pub mod cache;
pub mod definition;
pub mod extract;
pub mod recreate;
pub mod restore;

pub use cache::FieldPlan;
pub use definition::{AggregateFunction, DataFieldSpec, PivotDefinition};
pub use extract::extract_pivots;
pub use recreate::{recreate_pivot, PivotBodyRow, RecreatedPivot, DEFAULT_GRAND_TOTAL_CAPTION};
pub use restore::{restore_pivots, PivotRenderInput};
