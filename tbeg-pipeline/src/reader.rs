//! PURPOSE: Reads raw cell values and template style indices off worksheet
//! XML — the piece of XML ingestion `tbeg-marker`'s `RawCellValue` assumes
//! already happened, and every downstream stage that needs a template
//! cell's original style (XmlVariableReplace, NumberFormat, pivot's header
//! row) still needs.
//! CONTEXT: Same `<c r="...">` cell-tag regex tbeg-pivot's extraction uses
//! to look up a single cell's style index, generalized here to also read
//! out every value kind the marker parser accepts.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tbeg_marker::RawCellValue;
use tbeg_model::{parse_a1, CellCoord};

static CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<c\s+r="([A-Za-z]+[0-9]+)"([^>]*?)(?:/>|>(.*?)</c>)"#).expect("valid regex"));
static SI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?s)<si[^>]*>(.*?)</si>"#).expect("valid regex"));
static T_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?s)<t[^>]*>(.*?)</t>"#).expect("valid regex"));
static F_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?s)<f[^>]*>(.*?)</f>"#).expect("valid regex"));
static V_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?s)<v[^>]*>(.*?)</v>"#).expect("valid regex"));
static IS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?s)<is>(.*?)</is>"#).expect("valid regex"));

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn attr(attrs: &str, name: &str) -> Option<String> {
    let re = Regex::new(&format!(r#"{name}="([^"]*)""#)).ok()?;
    re.captures(attrs).map(|c| c[1].to_string())
}

/// Parses `xl/sharedStrings.xml` into its ordered string table. Rich-text
/// runs (`<r><t>...</t></r>`) are concatenated, same as Excel renders them.
pub fn parse_shared_strings(xml: &str) -> Vec<String> {
    SI_RE
        .captures_iter(xml)
        .map(|c| T_RE.captures_iter(&c[1]).map(|t| unescape(&t[1])).collect::<Vec<_>>().join(""))
        .collect()
}

/// One worksheet's raw cells plus the style index each cell carried in the
/// template, keyed by coordinate.
#[derive(Debug, Clone, Default)]
pub struct WorksheetContents {
    pub cells: Vec<(CellCoord, RawCellValue)>,
    pub styles: HashMap<CellCoord, String>,
}

/// Reads every `<c>` element out of `worksheet_xml`, resolving shared-string
/// indices against `shared_strings`.
pub fn read_worksheet(worksheet_xml: &str, shared_strings: &[String]) -> WorksheetContents {
    let mut cells = Vec::new();
    let mut styles = HashMap::new();

    for caps in CELL_RE.captures_iter(worksheet_xml) {
        let Some(coord) = parse_a1(&caps[1]) else { continue };
        let attrs = &caps[2];
        let body = caps.get(3).map(|m| m.as_str()).unwrap_or("");

        if let Some(style) = attr(attrs, "s") {
            styles.insert(coord, style);
        }

        if let Some(formula) = F_RE.captures(body).map(|c| unescape(&c[1])) {
            cells.push((coord, RawCellValue::Formula(formula)));
            continue;
        }

        let value = match attr(attrs, "t").as_deref() {
            Some("inlineStr") => {
                let text = IS_RE
                    .captures(body)
                    .map(|c| T_RE.captures_iter(&c[1]).map(|t| unescape(&t[1])).collect::<Vec<_>>().join(""))
                    .unwrap_or_default();
                RawCellValue::Text(text)
            }
            Some("s") => {
                let index: usize = V_RE.captures(body).and_then(|c| c[1].trim().parse().ok()).unwrap_or(0);
                RawCellValue::Text(shared_strings.get(index).cloned().unwrap_or_default())
            }
            Some("str") => RawCellValue::Text(V_RE.captures(body).map(|c| unescape(&c[1])).unwrap_or_default()),
            Some("b") => RawCellValue::Boolean(V_RE.captures(body).map(|c| c[1].trim() == "1").unwrap_or(false)),
            _ => match V_RE.captures(body).and_then(|c| c[1].trim().parse::<f64>().ok()) {
                Some(n) => RawCellValue::Number(n),
                None => RawCellValue::Blank,
            },
        };
        cells.push((coord, value));
    }

    WorksheetContents { cells, styles }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_shared_string_inline_string_number_and_boolean() {
        let shared = parse_shared_strings(r#"<sst><si><t>Hello</t></si><si><r><t>A</t></r><r><t>B</t></r></si></sst>"#);
        assert_eq!(shared, vec!["Hello".to_string(), "AB".to_string()]);

        let xml = r#"<worksheet><sheetData>
            <row r="1">
                <c r="A1" s="2" t="s"><v>0</v></c>
                <c r="B1" t="inlineStr"><is><t>World</t></is></c>
                <c r="C1"><v>3.5</v></c>
                <c r="D1" t="b"><v>1</v></c>
                <c r="E1"/>
            </row>
        </sheetData></worksheet>"#;

        let contents = read_worksheet(xml, &shared);
        assert_eq!(contents.cells.len(), 5);
        assert_eq!(contents.styles.get(&(0, 0)), Some(&"2".to_string()));
        assert!(contents.cells.contains(&((0, 0), RawCellValue::Text("Hello".into()))));
        assert!(contents.cells.contains(&((0, 1), RawCellValue::Text("World".into()))));
        assert!(contents.cells.contains(&((0, 2), RawCellValue::Number(3.5))));
        assert!(contents.cells.contains(&((0, 3), RawCellValue::Boolean(true))));
        assert!(contents.cells.contains(&((0, 4), RawCellValue::Blank)));
    }

    #[test]
    fn reads_formula_cell_with_cached_value() {
        let xml = r#"<c r="B2"><f>SUM(A1:A2)</f><v>10</v></c>"#;
        let contents = read_worksheet(xml, &[]);
        assert_eq!(contents.cells[0].1, RawCellValue::Formula("SUM(A1:A2)".into()));
    }

    #[test]
    fn escaped_entities_round_trip_through_inline_text() {
        let xml = r#"<c r="A1" t="inlineStr"><is><t>A &amp; B &lt;x&gt;</t></is></c>"#;
        let contents = read_worksheet(xml, &[]);
        assert_eq!(contents.cells[0].1, RawCellValue::Text("A & B <x>".into()));
    }
}
