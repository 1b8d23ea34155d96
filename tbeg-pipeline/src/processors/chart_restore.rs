//! PURPOSE: Stage 10 — re-anchors every extracted chart against its sheet's
//! final layout and writes its parts back, spec.md §2/§4.10.

use super::Processor;
use crate::context::ProcessingContext;
use tbeg_model::TbegResult;

pub struct ChartRestore;

impl Processor for ChartRestore {
    fn name(&self) -> &'static str {
        "ChartRestore"
    }

    fn should_process(&self, ctx: &ProcessingContext) -> bool {
        !ctx.extracted_charts.is_empty()
    }

    fn process(&self, ctx: &mut ProcessingContext) -> TbegResult<()> {
        tbeg_charts::restore_charts(&mut ctx.package, &ctx.extracted_charts, &ctx.calculators);
        Ok(())
    }
}
