//! PURPOSE: `Pipeline` — runs the fixed stage sequence from spec.md §2 over
//! a `ProcessingContext`, checking for cancellation between stages and
//! always releasing collection buffers on the way out.

use crate::context::{CancellationToken, ProcessingContext};
use crate::processors::{
    chart_extract::ChartExtract, chart_restore::ChartRestore, formula_adjust::FormulaAdjust,
    layout_restore::LayoutRestore, layout_snapshot::LayoutSnapshotStage, metadata::Metadata,
    number_format::NumberFormat, pivot_extract::PivotExtract, pivot_recreate::PivotRecreate,
    template_render::TemplateRender, xml_variable_replace::XmlVariableReplace, Processor,
};
use tbeg_model::{TbegError, TbegResult};

/// Runs the eleven stages in the fixed order: ChartExtract, PivotExtract,
/// LayoutSnapshot, TemplateRender, FormulaAdjust, NumberFormat,
/// XmlVariableReplace, LayoutRestore, PivotRecreate, ChartRestore, Metadata.
pub struct Pipeline {
    stages: Vec<Box<dyn Processor>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline {
            stages: vec![
                Box::new(ChartExtract),
                Box::new(PivotExtract),
                Box::new(LayoutSnapshotStage),
                Box::new(TemplateRender),
                Box::new(FormulaAdjust),
                Box::new(NumberFormat),
                Box::new(XmlVariableReplace),
                Box::new(LayoutRestore),
                Box::new(PivotRecreate),
                Box::new(ChartRestore),
                Box::new(Metadata),
            ],
        }
    }

    pub fn run(&self, ctx: &mut ProcessingContext, cancellation: &dyn CancellationToken) -> TbegResult<()> {
        let result = self.run_stages(ctx, cancellation);
        ctx.buffers.close_all();
        result
    }

    fn run_stages(&self, ctx: &mut ProcessingContext, cancellation: &dyn CancellationToken) -> TbegResult<()> {
        for stage in &self.stages {
            if cancellation.is_cancelled() {
                return Err(TbegError::Cancelled);
            }
            if !stage.should_process(ctx) {
                continue;
            }
            log::debug!("running pipeline stage {}", stage.name());
            stage.process(ctx)?;
        }
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::new()
    }
}
