//! PURPOSE: Binds parsed marker arguments to their named parameters and
//! produces the [`CellContent`] the rest of the pipeline consumes.
//! CONTEXT: spec.md §4.1's parameter-binding rule: arguments may be given
//! positionally or by name, but not both within the same call (the `empty=`
//! range on `repeat` is the one parameter that is always named).

use crate::ast::{Arg, ArgValue, MarkerExpr};
use tbeg_model::{
    CellArea, ErrorKind, ImagePosition, ImageSizing, RepeatDirection, RepeatMarker, TemplateError,
};

/// A single positional-or-named slot, resolved from a call's argument list.
struct Binder<'a> {
    sheet: &'a str,
    cell_ref: &'a str,
    text: &'a str,
    bound: Vec<Option<ArgValue>>,
}

impl<'a> Binder<'a> {
    fn new(
        sheet: &'a str,
        cell_ref: &'a str,
        text: &'a str,
        params: &'a [&'a str],
        args: Vec<Arg>,
        named_only: &'a [&'a str],
    ) -> Result<Self, TemplateError> {
        let mut bound: Vec<Option<ArgValue>> = params.iter().map(|_| None).collect();
        let mut extra: Vec<(String, ArgValue)> = Vec::new();

        let (named_args, positional_args): (Vec<_>, Vec<_>) =
            args.into_iter().partition(|a| a.key.is_some());

        if !named_args.is_empty() && !positional_args.is_empty() {
            // Mixing is only an error when a positional-capable param is
            // named while others stay positional; args whose key is in
            // `named_only` (e.g. `empty=`) don't count toward the mix.
            let disallowed_named = named_args
                .iter()
                .any(|a| !named_only.contains(&a.key.as_deref().unwrap_or("")));
            if disallowed_named {
                return Err(err(sheet, cell_ref, text, ErrorKind::InvalidRepeatSyntax));
            }
        }

        for arg in positional_args {
            match bound.iter_mut().find(|slot| slot.is_none()) {
                Some(slot) => *slot = Some(arg.value),
                None => return Err(err(sheet, cell_ref, text, ErrorKind::InvalidRepeatSyntax)),
            }
        }

        for arg in named_args {
            let key = arg.key.clone().expect("named arg has key");
            if let Some(idx) = params.iter().position(|p| *p == key) {
                if bound[idx].is_some() {
                    return Err(err(sheet, cell_ref, text, ErrorKind::InvalidRepeatSyntax));
                }
                bound[idx] = Some(arg.value);
            } else if named_only.contains(&key.as_str()) {
                extra.push((key, arg.value));
            } else {
                return Err(err(sheet, cell_ref, text, ErrorKind::InvalidRepeatSyntax));
            }
        }

        // `named_only` args (e.g. `empty=`) have no positional slot; they're
        // appended past `params.len()` and read back by that fixed index.
        for (_key, value) in extra {
            bound.push(Some(value));
        }

        Ok(Binder {
            sheet,
            cell_ref,
            text,
            bound,
        })
    }

    fn take(&mut self, index: usize) -> Result<ArgValue, TemplateError> {
        self.bound[index]
            .take()
            .ok_or_else(|| err(self.sheet, self.cell_ref, self.text, ErrorKind::MissingRequiredParameter))
    }

    fn take_opt(&mut self, index: usize) -> Option<ArgValue> {
        self.bound.get_mut(index).and_then(|v| v.take())
    }

    fn take_ident(&mut self, index: usize) -> Result<String, TemplateError> {
        match self.take(index)? {
            ArgValue::Ident(s) => Ok(s),
            ArgValue::Number(n) => Ok(n.to_string()),
        }
    }
}

fn err(sheet: &str, cell_ref: &str, text: &str, kind: ErrorKind) -> TemplateError {
    TemplateError {
        kind,
        sheet: sheet.to_string(),
        cell_ref: cell_ref.to_string(),
        text: text.to_string(),
    }
}

fn parse_area(sheet: &str, cell_ref: &str, text: &str, raw: &str) -> Result<CellArea, TemplateError> {
    let range_part = raw.rsplit_once('!').map(|(_, r)| r).unwrap_or(raw);
    CellArea::parse(range_part).ok_or_else(|| err(sheet, cell_ref, text, ErrorKind::InvalidRangeFormat))
}

fn sheet_ref_of(raw: &str) -> Option<String> {
    raw.split_once('!').map(|(sheet, _)| {
        sheet.trim_matches('\'').replace("''", "'")
    })
}

/// Resolves a parsed [`MarkerExpr`] found at `sheet`/`cell_ref` into a
/// [`tbeg_model::CellContent`] repeat/image/size variant, or an item-field /
/// variable path.
pub fn resolve(
    sheet: &str,
    cell_ref: &str,
    text: &str,
    expr: MarkerExpr,
) -> Result<tbeg_model::CellContent, TemplateError> {
    use tbeg_model::CellContent;

    match expr {
        MarkerExpr::Path(segments) => {
            if segments.len() == 1 {
                Ok(CellContent::Variable(segments.into_iter().next().unwrap()))
            } else {
                Ok(CellContent::ItemField(segments.join(".")))
            }
        }
        MarkerExpr::Call { name, args } => match name.to_ascii_uppercase().as_str() {
            "REPEAT" | "TBEG_REPEAT" => resolve_repeat(sheet, cell_ref, text, args),
            "IMAGE" | "TBEG_IMAGE" => resolve_image(sheet, cell_ref, text, args),
            "SIZE" | "TBEG_SIZE" => resolve_size(sheet, cell_ref, text, args),
            _ => Err(err(sheet, cell_ref, text, ErrorKind::InvalidRepeatSyntax)),
        },
    }
}

fn resolve_repeat(
    sheet: &str,
    cell_ref: &str,
    text: &str,
    args: Vec<Arg>,
) -> Result<tbeg_model::CellContent, TemplateError> {
    let params = ["collection", "range", "var", "direction"];
    let named_only = ["empty"];
    let mut binder = Binder::new(sheet, cell_ref, text, &params, args, &named_only)?;

    let collection = binder.take_ident(0)?;
    let range_raw = binder.take_ident(1)?;
    let area = parse_area(sheet, cell_ref, text, &range_raw)?;
    let target_sheet = sheet_ref_of(&range_raw);

    let variable = match binder.take_opt(2) {
        Some(ArgValue::Ident(s)) => s,
        Some(ArgValue::Number(_)) => {
            return Err(err(sheet, cell_ref, text, ErrorKind::InvalidParameterValue))
        }
        None => "it".to_string(),
    };

    let direction = match binder.take_opt(3) {
        Some(ArgValue::Ident(s)) => match s.to_ascii_uppercase().as_str() {
            "DOWN" => RepeatDirection::Down,
            "RIGHT" => RepeatDirection::Right,
            _ => return Err(err(sheet, cell_ref, text, ErrorKind::InvalidParameterValue)),
        },
        Some(ArgValue::Number(_)) => {
            return Err(err(sheet, cell_ref, text, ErrorKind::InvalidParameterValue))
        }
        None => RepeatDirection::Down,
    };

    let empty_area = match binder.bound.get(4).and_then(|v| v.clone()) {
        Some(ArgValue::Ident(s)) => Some(parse_area(sheet, cell_ref, text, &s)?),
        Some(ArgValue::Number(_)) => {
            return Err(err(sheet, cell_ref, text, ErrorKind::InvalidParameterValue))
        }
        None => None,
    };

    Ok(tbeg_model::CellContent::RepeatMarker(RepeatMarker {
        collection,
        target_sheet,
        area,
        variable,
        direction,
        empty_area,
    }))
}

fn resolve_image(
    sheet: &str,
    cell_ref: &str,
    text: &str,
    args: Vec<Arg>,
) -> Result<tbeg_model::CellContent, TemplateError> {
    let params = ["name", "position", "size"];
    let named_only: [&str; 0] = [];
    let mut binder = Binder::new(sheet, cell_ref, text, &params, args, &named_only)?;

    let name = binder.take_ident(0)?;

    let position = match binder.take_opt(1) {
        Some(ArgValue::Ident(s)) => {
            let coord = tbeg_model::parse_a1(&s)
                .ok_or_else(|| err(sheet, cell_ref, text, ErrorKind::InvalidRangeFormat))?;
            ImagePosition {
                cell: coord,
                offset_x: 0,
                offset_y: 0,
            }
        }
        Some(ArgValue::Number(_)) => {
            return Err(err(sheet, cell_ref, text, ErrorKind::InvalidParameterValue))
        }
        None => ImagePosition {
            cell: (0, 0),
            offset_x: 0,
            offset_y: 0,
        },
    };

    let sizing = match binder.take_opt(2) {
        Some(ArgValue::Ident(s)) if s.eq_ignore_ascii_case("original") => ImageSizing::Original,
        Some(ArgValue::Ident(s)) => {
            let (w, h) = s
                .split_once('x')
                .or_else(|| s.split_once('X'))
                .ok_or_else(|| err(sheet, cell_ref, text, ErrorKind::InvalidParameterValue))?;
            let width: u32 = w
                .parse()
                .map_err(|_| err(sheet, cell_ref, text, ErrorKind::InvalidParameterValue))?;
            let height: u32 = h
                .parse()
                .map_err(|_| err(sheet, cell_ref, text, ErrorKind::InvalidParameterValue))?;
            ImageSizing::Pixels { width, height }
        }
        Some(ArgValue::Number(_)) => {
            return Err(err(sheet, cell_ref, text, ErrorKind::InvalidParameterValue))
        }
        None => ImageSizing::Original,
    };

    Ok(tbeg_model::CellContent::ImageMarker {
        name,
        position,
        sizing,
    })
}

fn resolve_size(
    sheet: &str,
    cell_ref: &str,
    text: &str,
    args: Vec<Arg>,
) -> Result<tbeg_model::CellContent, TemplateError> {
    let params = ["collection"];
    let named_only: [&str; 0] = [];
    let mut binder = Binder::new(sheet, cell_ref, text, &params, args, &named_only)?;
    let collection = binder.take_ident(0)?;
    Ok(tbeg_model::CellContent::SizeMarker(collection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn resolve_str(text: &str) -> tbeg_model::CellContent {
        let expr = Parser::new(text).parse().unwrap();
        resolve("Sheet1", "A1", text, expr).unwrap()
    }

    #[test]
    fn resolves_bare_variable() {
        assert_eq!(resolve_str("title"), tbeg_model::CellContent::Variable("title".into()));
    }

    #[test]
    fn resolves_item_field() {
        assert_eq!(
            resolve_str("it.address.city"),
            tbeg_model::CellContent::ItemField("it.address.city".into())
        );
    }

    #[test]
    fn resolves_down_repeat_with_defaults() {
        let content = resolve_str("repeat(items, A2:B2)");
        match content {
            tbeg_model::CellContent::RepeatMarker(m) => {
                assert_eq!(m.collection, "items");
                assert_eq!(m.variable, "it");
                assert_eq!(m.direction, RepeatDirection::Down);
                assert!(m.empty_area.is_none());
            }
            _ => panic!("expected repeat marker"),
        }
    }

    #[test]
    fn resolves_repeat_with_all_params_and_empty_fallback() {
        let content = resolve_str("repeat(items, A2:B2, it, RIGHT, empty=A7:C7)");
        match content {
            tbeg_model::CellContent::RepeatMarker(m) => {
                assert_eq!(m.direction, RepeatDirection::Right);
                assert_eq!(m.empty_area.unwrap().to_a1(), "A7:C7");
            }
            _ => panic!("expected repeat marker"),
        }
    }

    #[test]
    fn rejects_mixed_positional_and_named_core_params() {
        let expr = Parser::new("repeat(collection=items, A2:B2)").parse().unwrap();
        let result = resolve("Sheet1", "A1", "repeat(collection=items, A2:B2)", expr);
        assert!(result.is_err());
    }

    #[test]
    fn resolves_image_with_position_and_pixel_size() {
        let content = resolve_str("image(logo, B2, 200x100)");
        match content {
            tbeg_model::CellContent::ImageMarker { name, position, sizing } => {
                assert_eq!(name, "logo");
                assert_eq!(position.cell, (1, 1));
                assert_eq!(sizing, ImageSizing::Pixels { width: 200, height: 100 });
            }
            _ => panic!("expected image marker"),
        }
    }

    #[test]
    fn resolves_size_marker() {
        assert_eq!(
            resolve_str("size(items)"),
            tbeg_model::CellContent::SizeMarker("items".into())
        );
    }

    #[test]
    fn alternate_spreadsheet_function_spelling_is_accepted() {
        let content = resolve_str("TBEG_REPEAT(items, A2:B2)");
        assert!(matches!(content, tbeg_model::CellContent::RepeatMarker(_)));
    }
}
