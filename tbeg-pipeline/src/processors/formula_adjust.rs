//! PURPOSE: Stage 5 — rewrites every rendered formula cell's references so
//! they still point at the right data after repeat expansion, spec.md
//! §2/§4.6.

use super::Processor;
use crate::context::ProcessingContext;
use tbeg_model::{coord_to_a1, CellCoord, TbegResult};
use tbeg_render::RenderedValue;

pub struct FormulaAdjust;

impl Processor for FormulaAdjust {
    fn name(&self) -> &'static str {
        "FormulaAdjust"
    }

    fn should_process(&self, ctx: &ProcessingContext) -> bool {
        ctx.config.formula_processing_enabled
    }

    fn process(&self, ctx: &mut ProcessingContext) -> TbegResult<()> {
        let sheet_names: Vec<String> = ctx.rendered.keys().cloned().collect();

        for sheet_name in sheet_names {
            let formula_coords: Vec<CellCoord> = ctx.rendered[&sheet_name]
                .cells
                .iter()
                .filter_map(|(coord, value)| matches!(value, RenderedValue::Formula(_)).then_some(*coord))
                .collect();

            for coord in formula_coords {
                let formula_text = match &ctx.rendered[&sheet_name].cells[&coord] {
                    RenderedValue::Formula(f) => f.strip_prefix('=').unwrap_or(f).to_string(),
                    _ => continue,
                };
                let cell_ref = coord_to_a1(coord);
                let rewritten = tbeg_render::rewrite_formula(&formula_text, &sheet_name, &cell_ref, &ctx.calculators)?;

                ctx.rendered
                    .get_mut(&sheet_name)
                    .expect("sheet stays rendered for the duration of this stage")
                    .cells
                    .insert(coord, RenderedValue::Formula(format!("={rewritten}")));
            }
        }
        Ok(())
    }
}
