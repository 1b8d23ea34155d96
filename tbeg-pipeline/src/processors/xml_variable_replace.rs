//! PURPOSE: Stage 7 — writes every sheet's resolved cells back into
//! worksheet XML, applying chosen styles and copying in any empty-area
//! substitutions, spec.md §2/§4.3.

use super::Processor;
use crate::context::ProcessingContext;
use crate::writer;
use std::collections::HashMap;
use tbeg_model::{CellCoord, TbegError, TbegResult};

pub struct XmlVariableReplace;

impl Processor for XmlVariableReplace {
    fn name(&self) -> &'static str {
        "XmlVariableReplace"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> TbegResult<()> {
        let sheet_names: Vec<String> = ctx.workbook.sheets.iter().map(|s| s.name.clone()).collect();

        for sheet_name in sheet_names {
            let Some(path) = ctx.worksheet_path(&sheet_name).map(|p| p.to_string()) else { continue };
            let Some(rendered) = ctx.rendered.get(&sheet_name) else { continue };

            let sheet = ctx.workbook.sheet(&sheet_name).expect("sheet listed in workbook").clone();
            let calculator = ctx.calculators.get(&sheet_name).expect("calculator built for every sheet");
            let origins = writer::template_origin_map(&sheet, calculator, &ctx.buffers)?;

            let empty = HashMap::new();
            let template_styles = ctx.raw_sheets.get(&sheet_name).map(|c| &c.styles).unwrap_or(&empty);
            let overrides = ctx.style_overrides.get(&sheet_name).unwrap_or(&empty);

            let mut cell_xmls: Vec<(CellCoord, String)> = rendered
                .cells
                .iter()
                .map(|(&coord, value)| {
                    let style = overrides
                        .get(&coord)
                        .or_else(|| origins.get(&coord).and_then(|origin| template_styles.get(origin)))
                        .map(|s| s.as_str());
                    (coord, writer::render_cell_xml(coord, value, style))
                })
                .collect();

            if let Some(raw) = ctx.raw_sheets.get(&sheet_name) {
                for substitution in &rendered.empty_substitutions {
                    cell_xmls.extend(writer::render_empty_substitution(
                        &raw.cells,
                        &raw.styles,
                        substitution.source,
                        substitution.target_start,
                    ));
                }
            }

            let worksheet_xml = ctx.package.part_text(&path).map_err(|e| TbegError::PackageIo(e.to_string()))?;
            let updated = writer::splice_sheet_data(&worksheet_xml, cell_xmls);
            ctx.package.set_part_text(path, updated);
        }
        Ok(())
    }
}
