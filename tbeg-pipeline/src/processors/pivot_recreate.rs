//! PURPOSE: Stage 9 — projects each extracted pivot's location and source
//! range through the rendered sheet and rebuilds its cache/table parts,
//! spec.md §2/§4.9.

use super::Processor;
use crate::context::ProcessingContext;
use crate::writer;
use std::collections::HashMap;
use tbeg_model::{CellArea, TbegResult};
use tbeg_pivot::{PivotRenderInput, DEFAULT_GRAND_TOTAL_CAPTION};

fn row_has_data(rendered: &tbeg_render::RenderedSheet, row: u32, cols: std::ops::RangeInclusive<u32>) -> bool {
    cols.clone().any(|col| {
        writer::rendered_cell_text(rendered, (row, col)).map(|s| !s.is_empty()).unwrap_or(false)
    })
}

pub struct PivotRecreate;

impl Processor for PivotRecreate {
    fn name(&self) -> &'static str {
        "PivotRecreate"
    }

    fn should_process(&self, ctx: &ProcessingContext) -> bool {
        !ctx.extracted_pivots.is_empty()
    }

    fn process(&self, ctx: &mut ProcessingContext) -> TbegResult<()> {
        let mut inputs: HashMap<String, PivotRenderInput> = HashMap::new();

        for def in ctx.extracted_pivots.clone() {
            let Some(calculator) = ctx.calculators.get(&def.source_sheet) else { continue };
            let Some(rendered) = ctx.rendered.get(&def.source_sheet) else { continue };

            let final_location = calculator.get_final_range(def.location);
            let mut final_source_range = calculator.get_final_range(def.source_range);

            let header_row = final_source_range.start.0;
            let headers: Vec<String> = (final_source_range.start.1..=final_source_range.end.1)
                .map(|col| writer::rendered_cell_text(rendered, (header_row, col)).unwrap_or_default())
                .collect();

            let mut last_full_row = header_row;
            for row in (header_row + 1)..=final_source_range.end.0 {
                if row_has_data(rendered, row, final_source_range.start.1..=final_source_range.end.1) {
                    last_full_row = row;
                } else {
                    break;
                }
            }
            final_source_range = CellArea::new(final_source_range.start, (last_full_row, final_source_range.end.1));

            let data_rows: Vec<Vec<tbeg_model::DataValue>> = ((header_row + 1)..=last_full_row)
                .map(|row| {
                    (final_source_range.start.1..=final_source_range.end.1)
                        .map(|col| {
                            rendered
                                .cells
                                .get(&(row, col))
                                .map(writer::rendered_to_data_value)
                                .unwrap_or(tbeg_model::DataValue::Null)
                        })
                        .collect()
                })
                .collect();

            inputs.insert(
                def.pivot_table_path.clone(),
                PivotRenderInput {
                    headers,
                    data_rows,
                    final_location,
                    final_source_range,
                    grand_total_caption: DEFAULT_GRAND_TOTAL_CAPTION.to_string(),
                },
            );
        }

        ctx.pivot_inputs = inputs;
        tbeg_pivot::restore_pivots(&mut ctx.package, &ctx.extracted_pivots, &ctx.pivot_inputs);
        Ok(())
    }
}
