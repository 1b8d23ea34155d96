//! PURPOSE: Stage 3 — snapshots column widths, row heights, data
//! validations, and conditional formats off each sheet's template XML
//! before render overwrites it, spec.md §2/§4.7.

use super::Processor;
use crate::context::ProcessingContext;
use tbeg_layout::LayoutSnapshot;
use tbeg_model::{TbegError, TbegResult};

pub struct LayoutSnapshotStage;

impl Processor for LayoutSnapshotStage {
    fn name(&self) -> &'static str {
        "LayoutSnapshot"
    }

    fn should_process(&self, ctx: &ProcessingContext) -> bool {
        ctx.config.preserve_template_layout
    }

    fn process(&self, ctx: &mut ProcessingContext) -> TbegResult<()> {
        let sheet_paths = ctx.sheet_paths.clone();
        for (name, path) in sheet_paths {
            let xml = ctx.package.part_text(&path).map_err(|e| TbegError::PackageIo(e.to_string()))?;
            ctx.layout_snapshots.insert(name, LayoutSnapshot::snapshot(&xml));
        }
        Ok(())
    }
}
