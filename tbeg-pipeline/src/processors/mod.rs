//! PURPOSE: The `Processor` trait every pipeline stage implements, plus the
//! fixed-order module list, spec.md §2.

pub mod chart_extract;
pub mod chart_restore;
pub mod formula_adjust;
pub mod layout_restore;
pub mod layout_snapshot;
pub mod metadata;
pub mod number_format;
pub mod pivot_extract;
pub mod pivot_recreate;
pub mod template_render;
pub mod xml_variable_replace;

use crate::context::ProcessingContext;
use tbeg_model::TbegResult;

/// One stage of the fixed pipeline order.
pub trait Processor {
    fn name(&self) -> &'static str;

    /// Whether this stage has anything to do, e.g. chart stages no-op when
    /// a package has no charts at all. Defaults to always running.
    fn should_process(&self, ctx: &ProcessingContext) -> bool {
        let _ = ctx;
        true
    }

    fn process(&self, ctx: &mut ProcessingContext) -> TbegResult<()>;
}
