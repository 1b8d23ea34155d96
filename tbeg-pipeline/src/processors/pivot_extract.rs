//! PURPOSE: Stage 2 — pulls pivot tables out of the package before render,
//! spec.md §2/§4.9 step 1. Self-contained: `extract_pivots` discovers every
//! pivot in the package on its own, so this stage is just plumbing.

use super::Processor;
use crate::context::ProcessingContext;
use tbeg_model::TbegResult;

pub struct PivotExtract;

impl Processor for PivotExtract {
    fn name(&self) -> &'static str {
        "PivotExtract"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> TbegResult<()> {
        ctx.extracted_pivots = tbeg_pivot::extract_pivots(&mut ctx.package);
        Ok(())
    }
}
