//! PURPOSE: Data validation snapshot, expansion and re-rendering, spec.md
//! §4.7.

use once_cell::sync::Lazy;
use regex::Regex;
use tbeg_model::{CellArea, RepeatRegionSpec};
use tbeg_position::PositionCalculator;

/// The validation kinds spec.md §4.7 names.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationType {
    List { formula1: String },
    Integer { operator: String, formula1: String, formula2: Option<String> },
    Decimal { operator: String, formula1: String, formula2: Option<String> },
    Date { operator: String, formula1: String, formula2: Option<String> },
    Time { operator: String, formula1: String, formula2: Option<String> },
    TextLength { operator: String, formula1: String, formula2: Option<String> },
    CustomFormula { formula1: String },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PromptBox {
    pub title: Option<String>,
    pub text: Option<String>,
}

/// One `<dataValidation>` entry, its range and every attribute spec.md
/// §4.7 says must survive restore.
#[derive(Debug, Clone, PartialEq)]
pub struct DataValidation {
    pub range: CellArea,
    pub validation_type: ValidationType,
    pub allow_blank: bool,
    pub show_error_box: bool,
    pub show_prompt_box: bool,
    pub error_box: PromptBox,
    pub prompt_box: PromptBox,
}

static VALIDATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<dataValidation\s+([^>]*)>(.*?)</dataValidation>"#).expect("valid regex")
});
static FORMULA1_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?s)<formula1>(.*?)</formula1>"#).expect("valid regex"));
static FORMULA2_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?s)<formula2>(.*?)</formula2>"#).expect("valid regex"));

fn attr(attrs: &str, name: &str) -> Option<String> {
    let re = Regex::new(&format!(r#"{name}="([^"]*)""#)).ok()?;
    re.captures(attrs).map(|c| c[1].to_string())
}

fn bool_attr(attrs: &str, name: &str, default: bool) -> bool {
    attr(attrs, name).map(|v| v == "1" || v == "true").unwrap_or(default)
}

/// Extracts every `<dataValidation>` entry from worksheet XML.
pub fn extract_data_validations(xml: &str) -> Vec<DataValidation> {
    let mut out = Vec::new();
    for caps in VALIDATION_RE.captures_iter(xml) {
        let attrs = &caps[1];
        let body = &caps[2];

        let Some(sqref) = attr(attrs, "sqref") else { continue };
        let Some(range) = CellArea::parse(sqref.split_whitespace().next().unwrap_or(&sqref)) else { continue };

        let formula1 = FORMULA1_RE.captures(body).map(|c| c[1].to_string()).unwrap_or_default();
        let formula2 = FORMULA2_RE.captures(body).map(|c| c[1].to_string());
        let operator = attr(attrs, "operator").unwrap_or_else(|| "between".to_string());

        let validation_type = match attr(attrs, "type").as_deref() {
            Some("list") => ValidationType::List { formula1 },
            Some("whole") => ValidationType::Integer { operator, formula1, formula2 },
            Some("decimal") => ValidationType::Decimal { operator, formula1, formula2 },
            Some("date") => ValidationType::Date { operator, formula1, formula2 },
            Some("time") => ValidationType::Time { operator, formula1, formula2 },
            Some("textLength") => ValidationType::TextLength { operator, formula1, formula2 },
            Some("custom") => ValidationType::CustomFormula { formula1 },
            _ => continue,
        };

        out.push(DataValidation {
            range,
            validation_type,
            allow_blank: bool_attr(attrs, "allowBlank", false),
            show_error_box: bool_attr(attrs, "showErrorMessage", true),
            show_prompt_box: bool_attr(attrs, "showInputMessage", true),
            error_box: PromptBox { title: attr(attrs, "errorTitle"), text: attr(attrs, "error") },
            prompt_box: PromptBox { title: attr(attrs, "promptTitle"), text: attr(attrs, "prompt") },
        });
    }
    out
}

fn type_attr(validation_type: &ValidationType) -> &'static str {
    match validation_type {
        ValidationType::List { .. } => "list",
        ValidationType::Integer { .. } => "whole",
        ValidationType::Decimal { .. } => "decimal",
        ValidationType::Date { .. } => "date",
        ValidationType::Time { .. } => "time",
        ValidationType::TextLength { .. } => "textLength",
        ValidationType::CustomFormula { .. } => "custom",
    }
}

fn formulas(validation_type: &ValidationType) -> (String, Option<String>, Option<&str>) {
    match validation_type {
        ValidationType::List { formula1 } | ValidationType::CustomFormula { formula1 } => {
            (formula1.clone(), None, None)
        }
        ValidationType::Integer { operator, formula1, formula2 }
        | ValidationType::Decimal { operator, formula1, formula2 }
        | ValidationType::Date { operator, formula1, formula2 }
        | ValidationType::Time { operator, formula1, formula2 }
        | ValidationType::TextLength { operator, formula1, formula2 } => {
            (formula1.clone(), formula2.clone(), Some(operator.as_str()))
        }
    }
}

/// Renders one validation back to a `<dataValidation>` element, targeting
/// `range` (the already-expanded range, not the template one).
pub fn render_data_validation(validation: &DataValidation, range: &CellArea) -> String {
    let (formula1, formula2, operator) = formulas(&validation.validation_type);
    let mut attrs = format!(
        r#"type="{}" allowBlank="{}" showInputMessage="{}" showErrorMessage="{}""#,
        type_attr(&validation.validation_type),
        if validation.allow_blank { 1 } else { 0 },
        if validation.show_prompt_box { 1 } else { 0 },
        if validation.show_error_box { 1 } else { 0 },
    );
    if let Some(op) = operator {
        attrs.push_str(&format!(r#" operator="{op}""#));
    }
    if let Some(title) = &validation.error_box.title {
        attrs.push_str(&format!(r#" errorTitle="{title}""#));
    }
    if let Some(text) = &validation.error_box.text {
        attrs.push_str(&format!(r#" error="{text}""#));
    }
    if let Some(title) = &validation.prompt_box.title {
        attrs.push_str(&format!(r#" promptTitle="{title}""#));
    }
    if let Some(text) = &validation.prompt_box.text {
        attrs.push_str(&format!(r#" prompt="{text}""#));
    }
    attrs.push_str(&format!(r#" sqref="{}""#, range.to_a1()));

    let mut body = format!("<formula1>{formula1}</formula1>");
    if let Some(f2) = formula2 {
        body.push_str(&format!("<formula2>{f2}</formula2>"));
    }
    format!("<dataValidation {attrs}>{body}</dataValidation>")
}

/// Expands every validation whose range falls inside a repeat's template
/// area via `getFinalRange`; validations outside every repeat area are
/// still projected, since their absolute position may have shifted.
pub fn expand_validations(
    validations: &[DataValidation],
    _repeats: &[RepeatRegionSpec],
    calculator: &PositionCalculator,
) -> Vec<DataValidation> {
    validations
        .iter()
        .map(|v| DataValidation {
            range: calculator.get_final_range(v.range),
            ..v.clone()
        })
        .collect()
}
