//! PURPOSE: Stage 4 — resolves every sheet's template cells against the
//! data provider and its repeat expansions, spec.md §2/§4.3-§4.5.
//! CONTEXT: `ctx.streaming` records the per-sheet decision made once at
//! `ProcessingContext::new`; this is the stage that actually acts on it,
//! picking `tbeg_render::choose_strategy` instead of always resolving
//! through the in-memory convenience wrapper. The strategy only changes
//! how much is held open *while* a sheet is being resolved (streaming
//! buffers one repeat row-group at a time instead of the whole sheet) —
//! downstream stages still need random access to the result, so it's
//! collected into `ctx.rendered` either way.

use super::Processor;
use crate::context::ProcessingContext;
use tbeg_model::TbegResult;
use tbeg_render::{RenderedSheet, RenderingStrategy};

pub struct TemplateRender;

impl Processor for TemplateRender {
    fn name(&self) -> &'static str {
        "TemplateRender"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> TbegResult<()> {
        let sheets = ctx.workbook.sheets.clone();
        for sheet in &sheets {
            let calculator = ctx.calculators.get(&sheet.name).expect("calculator built for every sheet");
            let should_stream = *ctx.streaming.get(&sheet.name).unwrap_or(&false);
            let strategy = tbeg_render::choose_strategy(should_stream);

            let mut cells = std::collections::HashMap::new();
            let empty_substitutions = strategy.render(
                sheet,
                ctx.provider,
                calculator,
                &ctx.buffers,
                ctx.config.missing_data_behavior,
                &mut |coord, value| {
                    cells.insert(coord, value);
                },
            )?;

            let rendered = RenderedSheet { name: sheet.name.clone(), cells, empty_substitutions };
            ctx.rendered.insert(sheet.name.clone(), rendered);
        }
        Ok(())
    }
}
