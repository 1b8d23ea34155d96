//! PURPOSE: Conditional-format range snapshot and expansion, spec.md §4.7.
//! CONTEXT: Rule bodies (`<cfRule>` elements with their dxf/colorScale/
//! iconSet children) are kept as opaque XML — only the governing `sqref`
//! range needs to move with the expansion.

use once_cell::sync::Lazy;
use regex::Regex;
use tbeg_model::CellArea;
use tbeg_position::PositionCalculator;

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalFormat {
    pub range: CellArea,
    /// Raw `<cfRule>...</cfRule>` children, preserved byte-for-byte.
    pub rules_xml: String,
}

static CF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<conditionalFormatting\s+sqref="([^"]+)">(.*?)</conditionalFormatting>"#)
        .expect("valid regex")
});

pub fn extract_conditional_formats(xml: &str) -> Vec<ConditionalFormat> {
    let mut out = Vec::new();
    for caps in CF_RE.captures_iter(xml) {
        let sqref = &caps[1];
        let Some(range) = CellArea::parse(sqref.split_whitespace().next().unwrap_or(sqref)) else { continue };
        out.push(ConditionalFormat { range, rules_xml: caps[2].to_string() });
    }
    out
}

pub fn render_conditional_format(format: &ConditionalFormat, range: &CellArea) -> String {
    format!(
        r#"<conditionalFormatting sqref="{}">{}</conditionalFormatting>"#,
        range.to_a1(),
        format.rules_xml
    )
}

/// Projects every conditional format's range through the calculator.
pub fn expand_conditional_formats(
    formats: &[ConditionalFormat],
    calculator: &PositionCalculator,
) -> Vec<ConditionalFormat> {
    formats
        .iter()
        .map(|f| ConditionalFormat { range: calculator.get_final_range(f.range), ..f.clone() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_range_and_keeps_rule_body_verbatim() {
        let xml = r#"<conditionalFormatting sqref="A2:A10"><cfRule type="cellIs" dxfId="0" priority="1" operator="greaterThan"><formula>100</formula></cfRule></conditionalFormatting>"#;
        let formats = extract_conditional_formats(xml);
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].range, CellArea::parse("A2:A10").unwrap());
        assert!(formats[0].rules_xml.contains("cellIs"));
    }

    #[test]
    fn render_round_trips_with_new_range() {
        let format = ConditionalFormat {
            range: CellArea::parse("A2:A10").unwrap(),
            rules_xml: "<cfRule/>".into(),
        };
        let rendered = render_conditional_format(&format, &CellArea::parse("A2:A20").unwrap());
        assert!(rendered.contains(r#"sqref="A2:A20""#));
        assert!(rendered.contains("<cfRule/>"));
    }
}
