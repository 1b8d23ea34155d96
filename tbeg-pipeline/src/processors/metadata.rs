//! PURPOSE: Stage 11 — writes document metadata into `docProps`, spec.md
//! §2/§4.11.

use super::Processor;
use crate::context::ProcessingContext;
use tbeg_model::TbegResult;

pub struct Metadata;

impl Processor for Metadata {
    fn name(&self) -> &'static str {
        "Metadata"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> TbegResult<()> {
        let metadata = ctx.provider.metadata().unwrap_or_default();
        tbeg_metadata::write_metadata(&mut ctx.package, &metadata);
        Ok(())
    }
}
