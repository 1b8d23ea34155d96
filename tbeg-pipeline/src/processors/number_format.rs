//! PURPOSE: Stage 6 — chooses an explicit number-format style for rendered
//! numeric cells whose template origin carried no style of its own,
//! picking between `pivotIntegerFormatIndex` and `pivotDecimalFormatIndex`
//! by whether the value has a fractional part, spec.md §6.

use super::Processor;
use crate::context::ProcessingContext;
use crate::writer;
use std::collections::HashMap;
use tbeg_model::TbegResult;
use tbeg_render::RenderedValue;

pub struct NumberFormat;

impl Processor for NumberFormat {
    fn name(&self) -> &'static str {
        "NumberFormat"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> TbegResult<()> {
        let sheet_names: Vec<String> = ctx.workbook.sheets.iter().map(|s| s.name.clone()).collect();

        for sheet_name in sheet_names {
            let Some(rendered) = ctx.rendered.get(&sheet_name) else { continue };
            let sheet = ctx.workbook.sheet(&sheet_name).expect("sheet listed in workbook").clone();
            let calculator = ctx.calculators.get(&sheet_name).expect("calculator built for every sheet");
            let origins = writer::template_origin_map(&sheet, calculator, &ctx.buffers)?;
            let template_styles = ctx.raw_sheets.get(&sheet_name).map(|c| c.styles.clone()).unwrap_or_default();

            let mut overrides = HashMap::new();
            for (&final_coord, value) in &rendered.cells {
                let RenderedValue::Number(n) = value else { continue };
                let has_template_style = origins
                    .get(&final_coord)
                    .map(|origin| template_styles.contains_key(origin))
                    .unwrap_or(false);
                if has_template_style {
                    continue;
                }
                let index = if n.fract() == 0.0 {
                    ctx.config.pivot_integer_format_index
                } else {
                    ctx.config.pivot_decimal_format_index
                };
                overrides.insert(final_coord, index.to_string());
            }
            ctx.style_overrides.insert(sheet_name, overrides);
        }
        Ok(())
    }
}
