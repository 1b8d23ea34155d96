//! PURPOSE: Resolves a template cell's [`CellContent`] against a
//! [`DataProvider`] and the current repeat iteration's item stack, producing
//! a value ready to write to the output worksheet, spec.md §4.3/§6.

use log::{debug, warn};
use tbeg_model::{
    CellContent, CollectionSizes, DataProvider, DataValue, MissingDataBehavior,
    MissingTemplateDataError, TbegError, TbegResult,
};

/// One level of the repeat-iteration stack: the marker's bound variable name
/// (e.g. `"it"`) paired with the current item's value.
pub struct ItemContext<'a> {
    pub variable: &'a str,
    pub value: &'a DataValue,
}

/// A render-ready cell value, independent of how it's ultimately encoded
/// into worksheet XML.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedValue {
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    /// Includes the leading `=`.
    Formula(String),
}

fn data_value_to_rendered(value: &DataValue) -> RenderedValue {
    match value {
        DataValue::Null => RenderedValue::Empty,
        DataValue::String(s) => RenderedValue::Text(s.clone()),
        DataValue::Number(n) => RenderedValue::Number(*n),
        DataValue::Boolean(b) => RenderedValue::Boolean(*b),
        DataValue::DateTime(serial) => RenderedValue::Number(*serial),
        DataValue::Object(_) => RenderedValue::Text(value.to_string()),
    }
}

/// Resolves a dotted path against the item stack first (innermost binding
/// wins), falling back to the data provider for names the item stack
/// doesn't own.
fn resolve_path_value(
    path: &str,
    provider: &dyn DataProvider,
    item_stack: &[ItemContext],
) -> Option<DataValue> {
    let (head, rest) = match path.split_once('.') {
        Some((h, r)) => (h, Some(r)),
        None => (path, None),
    };

    for ctx in item_stack.iter().rev() {
        if ctx.variable == head {
            return match rest {
                Some(r) => ctx.value.get_path(r).cloned(),
                None => Some(ctx.value.clone()),
            };
        }
    }

    provider.value(path)
}

/// Finds every `${...}` span in `text`, same rule as the marker scanner:
/// markers don't nest, so the first `}` closes the span.
fn scan_embedded(text: &str) -> Vec<(usize, usize, String)> {
    let mut spans = Vec::new();
    let mut search_from = 0;
    while let Some(rel_open) = text[search_from..].find("${") {
        let open = search_from + rel_open;
        let inner_start = open + 2;
        match text[inner_start..].find('}') {
            Some(rel_close) => {
                let close = inner_start + rel_close;
                spans.push((open, close + 1, text[inner_start..close].to_string()));
                search_from = close + 1;
            }
            None => break,
        }
    }
    spans
}

/// Substitutes every embedded `${path}` in `text`, applying
/// `missing_data_behavior` to names the item stack and provider both miss.
fn substitute(
    text: &str,
    provider: &dyn DataProvider,
    item_stack: &[ItemContext],
    behavior: MissingDataBehavior,
) -> TbegResult<String> {
    let spans = scan_embedded(text);
    if spans.is_empty() {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;
    for (start, end, inner) in spans {
        out.push_str(&text[last_end..start]);
        last_end = end;

        match resolve_path_value(&inner, provider, item_stack) {
            Some(value) => out.push_str(&value.to_string()),
            None => {
                if !inner.contains('.') || item_stack.iter().any(|c| inner.starts_with(c.variable)) {
                    // Item-bound field the current item just doesn't have;
                    // not a provider-level requirement.
                    debug!("embedded field '{inner}' absent on current item, substituting blank");
                } else {
                    handle_missing_variable(&inner, behavior)?;
                }
            }
        }
    }
    out.push_str(&text[last_end..]);
    Ok(out)
}

fn handle_missing_variable(name: &str, behavior: MissingDataBehavior) -> TbegResult<()> {
    match behavior {
        MissingDataBehavior::Ignore => Ok(()),
        MissingDataBehavior::Warn => {
            warn!("missing template variable '{name}', substituting blank");
            Ok(())
        }
        MissingDataBehavior::Throw => Err(TbegError::from(MissingTemplateDataError {
            variables: vec![name.to_string()],
            collections: Vec::new(),
            images: Vec::new(),
        })),
    }
}

/// Resolves one template cell to its render-ready value.
pub fn resolve_cell(
    content: &CellContent,
    provider: &dyn DataProvider,
    item_stack: &[ItemContext],
    sizes: &CollectionSizes,
    behavior: MissingDataBehavior,
) -> TbegResult<RenderedValue> {
    match content {
        CellContent::Empty => Ok(RenderedValue::Empty),
        CellContent::StaticString(s) => Ok(RenderedValue::Text(s.clone())),
        CellContent::StaticNumber(n) => Ok(RenderedValue::Number(*n)),
        CellContent::StaticBoolean(b) => Ok(RenderedValue::Boolean(*b)),

        CellContent::Variable(name) => match provider.value(name) {
            Some(value) => Ok(data_value_to_rendered(&value)),
            None => {
                handle_missing_variable(name, behavior)?;
                Ok(RenderedValue::Empty)
            }
        },

        CellContent::ItemField(path) => match resolve_path_value(path, provider, item_stack) {
            Some(value) => Ok(data_value_to_rendered(&value)),
            None => {
                debug!("item field '{path}' absent on current item, writing blank");
                Ok(RenderedValue::Empty)
            }
        },

        CellContent::TemplateText(text) => {
            Ok(RenderedValue::Text(substitute(text, provider, item_stack, behavior)?))
        }

        CellContent::Formula(text) => {
            Ok(RenderedValue::Formula(substitute(text, provider, item_stack, behavior)?))
        }

        CellContent::SizeMarker(collection) => Ok(RenderedValue::Number(sizes.get(collection) as f64)),

        // Structural markers: handled by the repeat expander / image
        // inserter before cell resolution ever reaches this point.
        CellContent::RepeatMarker(_) | CellContent::ImageMarker { .. } => Ok(RenderedValue::Empty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeProvider(HashMap<String, DataValue>);

    impl DataProvider for FakeProvider {
        fn value(&self, name: &str) -> Option<DataValue> {
            self.0.get(name).cloned()
        }
        fn items(&self, _name: &str) -> Option<Box<dyn Iterator<Item = DataValue> + '_>> {
            None
        }
        fn image(&self, _name: &str) -> Option<Vec<u8>> {
            None
        }
    }

    #[test]
    fn static_values_pass_through() {
        let provider = FakeProvider(HashMap::new());
        let sizes = CollectionSizes::new();
        assert_eq!(
            resolve_cell(&CellContent::StaticNumber(4.0), &provider, &[], &sizes, MissingDataBehavior::Warn).unwrap(),
            RenderedValue::Number(4.0)
        );
    }

    #[test]
    fn variable_resolves_from_provider() {
        let mut map = HashMap::new();
        map.insert("title".to_string(), DataValue::String("Report".into()));
        let provider = FakeProvider(map);
        let sizes = CollectionSizes::new();
        let result = resolve_cell(
            &CellContent::Variable("title".into()),
            &provider,
            &[],
            &sizes,
            MissingDataBehavior::Warn,
        )
        .unwrap();
        assert_eq!(result, RenderedValue::Text("Report".into()));
    }

    #[test]
    fn missing_variable_throws_when_configured() {
        let provider = FakeProvider(HashMap::new());
        let sizes = CollectionSizes::new();
        let err = resolve_cell(
            &CellContent::Variable("missing".into()),
            &provider,
            &[],
            &sizes,
            MissingDataBehavior::Throw,
        )
        .unwrap_err();
        assert!(matches!(err, TbegError::MissingData(_)));
    }

    #[test]
    fn item_field_resolves_against_stack() {
        let provider = FakeProvider(HashMap::new());
        let sizes = CollectionSizes::new();
        let item = DataValue::Object(vec![("name".to_string(), DataValue::String("Kim".into()))]);
        let stack = [ItemContext { variable: "it", value: &item }];
        let result = resolve_cell(
            &CellContent::ItemField("it.name".into()),
            &provider,
            &stack,
            &sizes,
            MissingDataBehavior::Warn,
        )
        .unwrap();
        assert_eq!(result, RenderedValue::Text("Kim".into()));
    }

    #[test]
    fn template_text_substitutes_embedded_markers() {
        let mut map = HashMap::new();
        map.insert("name".to_string(), DataValue::String("World".into()));
        let provider = FakeProvider(map);
        let sizes = CollectionSizes::new();
        let result = resolve_cell(
            &CellContent::TemplateText("Hello ${name}!".into()),
            &provider,
            &[],
            &sizes,
            MissingDataBehavior::Warn,
        )
        .unwrap();
        assert_eq!(result, RenderedValue::Text("Hello World!".into()));
    }

    #[test]
    fn formula_substitutes_and_keeps_equals_sign() {
        let mut map = HashMap::new();
        map.insert("suffix".to_string(), DataValue::String("won".into()));
        let provider = FakeProvider(map);
        let sizes = CollectionSizes::new();
        let result = resolve_cell(
            &CellContent::Formula("=A1&\"${suffix}\"".into()),
            &provider,
            &[],
            &sizes,
            MissingDataBehavior::Warn,
        )
        .unwrap();
        assert_eq!(result, RenderedValue::Formula("=A1&\"won\"".into()));
    }

    #[test]
    fn size_marker_reports_collection_count() {
        let provider = FakeProvider(HashMap::new());
        let mut sizes = CollectionSizes::new();
        sizes.set("items", 7);
        let result = resolve_cell(
            &CellContent::SizeMarker("items".into()),
            &provider,
            &[],
            &sizes,
            MissingDataBehavior::Warn,
        )
        .unwrap();
        assert_eq!(result, RenderedValue::Number(7.0));
    }
}
