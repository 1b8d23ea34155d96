//! PURPOSE: `ChartProcessor` — extracts chart parts and their drawing
//! anchors before a streaming render, then restores them with series
//! references rewritten and anchors re-projected, spec.md §4.8. Only runs
//! for the streaming strategy; the in-memory strategy leaves charts
//! untouched since no repeat expansion needs retrofitting into them there.

pub mod anchor;
pub mod extract;
pub mod reference;
pub mod restore;

pub use anchor::{AnchorCorner, ChartAnchor};
pub use extract::{extract_charts_for_sheet, ExtractedChart};
pub use reference::rewrite_chart_references;
pub use restore::restore_charts;
