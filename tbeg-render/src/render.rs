//! PURPOSE: Expands a sheet's repeat regions and resolves every template
//! cell to a render-ready value, spec.md §4.3/§4.4.
//! CONTEXT: Bridges `tbeg-analyze`'s `SheetSpec` and `tbeg-position`'s
//! `PositionCalculator` into the concrete output grid a writer consumes.

use crate::value::{resolve_cell, ItemContext, RenderedValue};
use std::collections::HashMap;
use tbeg_collection::CollectionBufferManager;
use tbeg_model::{
    CellArea, CellCoord, CollectionSizes, DataProvider, MissingDataBehavior, RepeatDirection,
    RepeatRegionSpec, SheetSpec, TbegError, TbegResult,
};
use tbeg_position::PositionCalculator;

/// A zero-item repeat leaves a gap where its body would have been; the
/// `empty_area` template (if the marker declared one) should be copied into
/// that gap instead. Producing the copy itself is the writer's job — this
/// only describes where.
#[derive(Debug, Clone, PartialEq)]
pub struct EmptyAreaSubstitution {
    pub source: CellArea,
    pub target_start: CellCoord,
}

/// The fully resolved output for one sheet: final coordinates mapped to
/// their render-ready values, plus any empty-collection substitutions the
/// writer still needs to apply.
#[derive(Debug, Clone, Default)]
pub struct RenderedSheet {
    pub name: String,
    pub cells: HashMap<CellCoord, RenderedValue>,
    pub empty_substitutions: Vec<EmptyAreaSubstitution>,
}

/// Buffers every repeat's collection up front so sizes are known before any
/// position is computed. Collections already buffered (e.g. shared between
/// two repeats) are left alone.
pub fn prime_collections(
    repeats: &[RepeatRegionSpec],
    provider: &dyn DataProvider,
    buffers: &mut CollectionBufferManager,
) -> TbegResult<()> {
    for repeat in repeats {
        if buffers.contains(&repeat.collection) {
            continue;
        }
        if let Some(count) = provider.item_count(&repeat.collection) {
            // Still buffer through the provider's iterator so later replay
            // is consistent even when the fast-path count is available.
            let _ = count;
        }
        let items = provider
            .items(&repeat.collection)
            .ok_or_else(|| TbegError::PackageIo(format!("unknown collection '{}'", repeat.collection)))?;
        buffers
            .buffer(&repeat.collection, items)
            .map_err(|e| TbegError::PackageIo(e.to_string()))?;
    }
    Ok(())
}

pub fn collection_sizes(
    repeats: &[RepeatRegionSpec],
    buffers: &CollectionBufferManager,
) -> TbegResult<CollectionSizes> {
    let mut sizes = CollectionSizes::new();
    for repeat in repeats {
        if sizes.contains(&repeat.collection) {
            continue;
        }
        let size = buffers.size(&repeat.collection).map_err(|e| TbegError::PackageIo(e.to_string()))?;
        sizes.set(repeat.collection.clone(), size);
    }
    Ok(sizes)
}

/// Resolves every cell of `sheet` that sits outside any repeat's area,
/// one value at a time, via `sink(template_coord, final_coord, value)`.
/// Bounded by the sheet's template cell count, independent of any
/// collection's size — safe to buffer in full regardless of strategy.
pub fn render_static_cells_into(
    sheet: &SheetSpec,
    provider: &dyn DataProvider,
    calculator: &PositionCalculator,
    behavior: MissingDataBehavior,
    mut sink: impl FnMut(CellCoord, CellCoord, RenderedValue),
) -> TbegResult<()> {
    for (&coord, content) in &sheet.cells {
        if content.is_repeat() {
            continue;
        }
        if sheet.repeats.iter().any(|r| r.area.contains(coord)) {
            // Part of a repeat's template body; handled by render_repeat_into.
            continue;
        }
        let value = resolve_cell(content, provider, &[], &CollectionSizes::new(), behavior)?;
        sink(coord, calculator.get_final_position(coord), value);
    }
    Ok(())
}

/// Resolves one repeat region's body against its collection, item by item,
/// via `sink(template_coord, final_coord, value)`. Each item's cells are
/// resolved and handed to `sink` before the next item is pulled from
/// `buffers` — nothing beyond the current item's row is ever retained here,
/// so a caller that flushes completed rows as `sink` is called gets real
/// bounded memory regardless of the collection's size.
///
/// Returns the empty-area substitution when the collection has zero items.
pub fn render_repeat_into(
    sheet: &SheetSpec,
    repeat: &RepeatRegionSpec,
    provider: &dyn DataProvider,
    calculator: &PositionCalculator,
    buffers: &CollectionBufferManager,
    behavior: MissingDataBehavior,
    mut sink: impl FnMut(CellCoord, CellCoord, RenderedValue),
) -> TbegResult<Option<EmptyAreaSubstitution>> {
    let size = buffers.size(&repeat.collection).map_err(|e| TbegError::PackageIo(e.to_string()))?;
    if size == 0 {
        return Ok(repeat.empty_area.map(|empty_area| EmptyAreaSubstitution {
            source: empty_area,
            target_start: calculator.get_final_position(repeat.area.start),
        }));
    }

    let template_cells: Vec<(CellCoord, &tbeg_model::CellContent)> = sheet
        .cells
        .iter()
        .filter(|(coord, _)| repeat.area.contains(**coord))
        .map(|(coord, content)| (*coord, content))
        .collect();

    let items = buffers.iterator(&repeat.collection).map_err(|e| TbegError::PackageIo(e.to_string()))?;
    let sizes = collection_sizes(&sheet.repeats, buffers)?;

    for (index, item) in items.enumerate() {
        let item_stack = [ItemContext { variable: &repeat.variable, value: &item }];
        for &(coord, content) in &template_cells {
            let value = resolve_cell(content, provider, &item_stack, &sizes, behavior)?;
            let base = calculator.get_final_position(coord);
            let final_coord = match repeat.direction {
                RepeatDirection::Down => (base.0 + (index as u32) * repeat.area.row_span(), base.1),
                RepeatDirection::Right => (base.0, base.1 + (index as u32) * repeat.area.col_span()),
            };
            sink(coord, final_coord, value);
        }
    }

    Ok(None)
}

/// The final row range a repeat's body occupies once expanded, without
/// consuming any of its items — used to order sources for a windowed write
/// before any data is pulled from the collection.
pub fn repeat_final_row_range(repeat: &RepeatRegionSpec, calculator: &PositionCalculator) -> (u32, u32) {
    let final_area = calculator.get_final_range(repeat.area);
    (final_area.start.0, final_area.end.0)
}

/// Renders every cell of `sheet` into its final coordinates, one value at a
/// time, via `sink`. This is the shared core both the in-memory and
/// streaming strategies call — the difference is only what `sink` does with
/// each cell.
pub fn render_sheet_into(
    sheet: &SheetSpec,
    provider: &dyn DataProvider,
    calculator: &PositionCalculator,
    buffers: &CollectionBufferManager,
    behavior: MissingDataBehavior,
    mut sink: impl FnMut(CellCoord, RenderedValue),
) -> TbegResult<Vec<EmptyAreaSubstitution>> {
    let mut substitutions = Vec::new();

    render_static_cells_into(sheet, provider, calculator, behavior, |_template, final_coord, value| {
        sink(final_coord, value)
    })?;

    for repeat in &sheet.repeats {
        let substitution = render_repeat_into(sheet, repeat, provider, calculator, buffers, behavior, |_template, final_coord, value| {
            sink(final_coord, value)
        })?;
        substitutions.extend(substitution);
    }

    Ok(substitutions)
}

/// Convenience wrapper over [`render_sheet_into`] that collects every cell
/// into a `HashMap`, for the in-memory strategy.
pub fn render_sheet(
    sheet: &SheetSpec,
    provider: &dyn DataProvider,
    calculator: &PositionCalculator,
    buffers: &CollectionBufferManager,
    behavior: MissingDataBehavior,
) -> TbegResult<RenderedSheet> {
    let mut cells = HashMap::new();
    let empty_substitutions =
        render_sheet_into(sheet, provider, calculator, buffers, behavior, |coord, value| {
            cells.insert(coord, value);
        })?;

    Ok(RenderedSheet {
        name: sheet.name.clone(),
        cells,
        empty_substitutions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbeg_model::{CellContent, DataValue};

    struct FakeProvider {
        items: Vec<DataValue>,
    }

    impl DataProvider for FakeProvider {
        fn value(&self, _name: &str) -> Option<DataValue> {
            None
        }
        fn items(&self, _name: &str) -> Option<Box<dyn Iterator<Item = DataValue> + '_>> {
            Some(Box::new(self.items.clone().into_iter()))
        }
        fn image(&self, _name: &str) -> Option<Vec<u8>> {
            None
        }
    }

    fn item(name: &str) -> DataValue {
        DataValue::Object(vec![("name".to_string(), DataValue::String(name.to_string()))])
    }

    #[test]
    fn repeat_body_expands_down_with_item_values() {
        let mut sheet = SheetSpec::new("Sheet1");
        sheet.set_cell((1, 0), CellContent::ItemField("it.name".into()));
        sheet.repeats.push(RepeatRegionSpec {
            collection: "people".into(),
            sheet: "Sheet1".into(),
            area: CellArea::parse("A2:A2").unwrap(),
            variable: "it".into(),
            direction: RepeatDirection::Down,
            empty_area: None,
        });

        let provider = FakeProvider { items: vec![item("Kim"), item("Lee")] };
        let mut buffers = CollectionBufferManager::new();
        prime_collections(&sheet.repeats, &provider, &mut buffers).unwrap();
        let sizes = collection_sizes(&sheet.repeats, &buffers).unwrap();
        let calculator = PositionCalculator::new(&sheet.repeats, &sizes);

        let rendered = render_sheet(&sheet, &provider, &calculator, &buffers, MissingDataBehavior::Warn).unwrap();
        assert_eq!(rendered.cells.get(&(1, 0)), Some(&RenderedValue::Text("Kim".into())));
        assert_eq!(rendered.cells.get(&(2, 0)), Some(&RenderedValue::Text("Lee".into())));
    }

    #[test]
    fn empty_collection_records_substitution() {
        let mut sheet = SheetSpec::new("Sheet1");
        sheet.set_cell((1, 0), CellContent::ItemField("it.name".into()));
        sheet.repeats.push(RepeatRegionSpec {
            collection: "people".into(),
            sheet: "Sheet1".into(),
            area: CellArea::parse("A2:A2").unwrap(),
            variable: "it".into(),
            direction: RepeatDirection::Down,
            empty_area: CellArea::parse("A7:C7").ok(),
        });

        let provider = FakeProvider { items: vec![] };
        let mut buffers = CollectionBufferManager::new();
        prime_collections(&sheet.repeats, &provider, &mut buffers).unwrap();
        let sizes = collection_sizes(&sheet.repeats, &buffers).unwrap();
        let calculator = PositionCalculator::new(&sheet.repeats, &sizes);

        let rendered = render_sheet(&sheet, &provider, &calculator, &buffers, MissingDataBehavior::Warn).unwrap();
        assert!(rendered.cells.is_empty());
        assert_eq!(rendered.empty_substitutions.len(), 1);
        assert_eq!(rendered.empty_substitutions[0].target_start, (1, 0));
    }
}
