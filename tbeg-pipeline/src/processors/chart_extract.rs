//! PURPOSE: Stage 1 — pulls charts off streaming sheets before render,
//! spec.md §2/§4.8. The in-memory strategy leaves charts alone per
//! `tbeg-charts`'s own scoping: no repeat expansion needs retrofitting into
//! a chart's series references there.

use super::Processor;
use crate::context::ProcessingContext;
use tbeg_model::TbegResult;

pub struct ChartExtract;

impl Processor for ChartExtract {
    fn name(&self) -> &'static str {
        "ChartExtract"
    }

    fn should_process(&self, ctx: &ProcessingContext) -> bool {
        ctx.streaming.values().any(|&streaming| streaming)
    }

    fn process(&self, ctx: &mut ProcessingContext) -> TbegResult<()> {
        let streaming_sheets: Vec<(String, String)> = ctx
            .sheet_paths
            .iter()
            .filter(|(name, _)| ctx.streaming.get(name).copied().unwrap_or(false))
            .cloned()
            .collect();

        for (name, path) in streaming_sheets {
            let charts = tbeg_charts::extract_charts_for_sheet(&mut ctx.package, &name, &path);
            ctx.extracted_charts.extend(charts);
        }
        Ok(())
    }
}
