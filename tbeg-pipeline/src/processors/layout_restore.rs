//! PURPOSE: Stage 8 — projects the snapshotted layout through each sheet's
//! repeat expansion and merges it back into the now-rendered worksheet XML,
//! spec.md §2/§4.7. Runs after XmlVariableReplace so row elements already
//! exist for the height merge to attach to.

use super::Processor;
use crate::context::ProcessingContext;
use regex::Regex;
use tbeg_layout::conditional::render_conditional_format;
use tbeg_layout::{render_cols_block, render_data_validation};
use tbeg_model::{TbegError, TbegResult};

fn apply_cols_block(xml: &str, cols_block: &str) -> String {
    let re = Regex::new(r"(?s)<cols>.*?</cols>").expect("valid regex");
    if cols_block.is_empty() {
        return re.replace(xml, "").into_owned();
    }
    if re.is_match(xml) {
        re.replace(xml, regex::NoExpand(cols_block)).into_owned()
    } else if let Some(idx) = xml.find("<sheetData") {
        format!("{}{}{}", &xml[..idx], cols_block, &xml[idx..])
    } else {
        xml.to_string()
    }
}

/// Merges `ht`/`customHeight` into an existing `<row r="N">` open tag. Rows
/// with a template height but no cell content (so no `<row>` element was
/// written by XmlVariableReplace) are left without a restored height — a
/// known scope cut, since inventing a bare `<row>` for them would require
/// duplicating XmlVariableReplace's row-grouping logic here too.
fn apply_row_height(xml: &str, row_num: u32, height: f64) -> String {
    let open_tag_re = Regex::new(&format!(r#"<row r="{row_num}"([^>]*)>"#)).expect("valid regex");
    let Some(caps) = open_tag_re.captures(xml) else {
        return xml.to_string();
    };
    let strip_re = Regex::new(r#"\s*(ht|customHeight)="[^"]*""#).expect("valid regex");
    let cleaned = strip_re.replace_all(&caps[1], "");
    let replacement = format!(r#"<row r="{row_num}"{cleaned} ht="{height}" customHeight="1">"#);
    open_tag_re.replace(xml, regex::NoExpand(&replacement)).into_owned()
}

fn apply_validations_and_conditional(xml: &str, validations_xml: &str, conditional_xml: &str) -> String {
    let without_validations =
        Regex::new(r"(?s)<dataValidations.*?</dataValidations>").expect("valid regex").replace(xml, "").into_owned();
    let without_conditional = Regex::new(r"(?s)<conditionalFormatting.*?</conditionalFormatting>")
        .expect("valid regex")
        .replace_all(&without_validations, "")
        .into_owned();

    let combined = format!("{validations_xml}{conditional_xml}");
    if combined.is_empty() {
        return without_conditional;
    }
    if let Some(idx) = without_conditional.rfind("</worksheet>") {
        format!("{}{}{}", &without_conditional[..idx], combined, &without_conditional[idx..])
    } else {
        format!("{without_conditional}{combined}")
    }
}

pub struct LayoutRestore;

impl Processor for LayoutRestore {
    fn name(&self) -> &'static str {
        "LayoutRestore"
    }

    fn should_process(&self, ctx: &ProcessingContext) -> bool {
        ctx.config.preserve_template_layout
    }

    fn process(&self, ctx: &mut ProcessingContext) -> TbegResult<()> {
        let sheet_names: Vec<String> = ctx.workbook.sheets.iter().map(|s| s.name.clone()).collect();

        for sheet_name in sheet_names {
            let Some(snapshot) = ctx.layout_snapshots.get(&sheet_name) else { continue };
            let Some(path) = ctx.worksheet_path(&sheet_name).map(|p| p.to_string()) else { continue };
            let sheet = ctx.workbook.sheet(&sheet_name).expect("sheet listed in workbook");
            let calculator = ctx.calculators.get(&sheet_name).expect("calculator built for every sheet");

            let restored = tbeg_layout::restore(snapshot, &sheet.repeats, calculator);

            let mut xml = ctx.package.part_text(&path).map_err(|e| TbegError::PackageIo(e.to_string()))?;
            xml = apply_cols_block(&xml, &render_cols_block(&restored.column_widths));
            for (&row_index, &height) in &restored.row_heights {
                xml = apply_row_height(&xml, row_index + 1, height);
            }

            let validations_xml = if restored.validations.is_empty() {
                String::new()
            } else {
                let body: String = restored.validations.iter().map(|v| render_data_validation(v, &v.range)).collect();
                format!(r#"<dataValidations count="{}">{body}</dataValidations>"#, restored.validations.len())
            };
            let conditional_xml: String =
                restored.conditional_formats.iter().map(|f| render_conditional_format(f, &f.range)).collect();

            xml = apply_validations_and_conditional(&xml, &validations_xml, &conditional_xml);
            ctx.package.set_part_text(path, xml);
        }
        Ok(())
    }
}
