//! PURPOSE: Serializes a one-shot iterator to a temp file so it can be
//! replayed any number of times, spec.md §4.3.
//! CONTEXT: The streaming renderer needs a collection's item count up front
//! to lay out expansion, and some templates bind the same collection to two
//! independent repeats — both require re-iterating data a provider may only
//! be able to hand out once.

use crate::error::{CollectionError, Result};
use std::io::{BufRead, BufReader, BufWriter, Write};
use tbeg_model::DataValue;
use tempfile::NamedTempFile;

enum State {
    Empty,
    Buffered { file: NamedTempFile, size: usize },
    Closed,
}

/// Disk-backed replay buffer for a single named collection.
pub struct CollectionBuffer {
    name: String,
    state: State,
}

impl CollectionBuffer {
    pub fn new(name: impl Into<String>) -> Self {
        CollectionBuffer {
            name: name.into(),
            state: State::Empty,
        }
    }

    /// Serializes every item of `iter` to a temp file, newline-delimited
    /// JSON, one record per item. Errors if this buffer has already been
    /// buffered (or closed) once.
    pub fn buffer(&mut self, iter: impl Iterator<Item = DataValue>) -> Result<()> {
        if !matches!(self.state, State::Empty) {
            return Err(CollectionError::AlreadyBuffered(self.name.clone()));
        }

        let file = NamedTempFile::new().map_err(|source| CollectionError::Io {
            name: self.name.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file.reopen().map_err(|source| CollectionError::Io {
            name: self.name.clone(),
            source,
        })?);

        let mut size = 0usize;
        for item in iter {
            serde_json::to_writer(&mut writer, &item).map_err(|source| CollectionError::Corrupt {
                name: self.name.clone(),
                source,
            })?;
            writer.write_all(b"\n").map_err(|source| CollectionError::Io {
                name: self.name.clone(),
                source,
            })?;
            size += 1;
        }
        writer.flush().map_err(|source| CollectionError::Io {
            name: self.name.clone(),
            source,
        })?;

        self.state = State::Buffered { file, size };
        Ok(())
    }

    /// The number of items buffered. An empty iterator is a valid buffer
    /// with `size = 0`.
    pub fn size(&self) -> Result<usize> {
        match &self.state {
            State::Empty => Err(CollectionError::NotBuffered(self.name.clone())),
            State::Buffered { size, .. } => Ok(*size),
            State::Closed => Err(CollectionError::Closed(self.name.clone())),
        }
    }

    /// Returns a fresh iterator over the buffered items, reading the temp
    /// file from the start. Can be called any number of times.
    pub fn iterator(&self) -> Result<impl Iterator<Item = DataValue> + '_> {
        match &self.state {
            State::Empty => Err(CollectionError::NotBuffered(self.name.clone())),
            State::Closed => Err(CollectionError::Closed(self.name.clone())),
            State::Buffered { file, .. } => {
                let handle = file.reopen().map_err(|source| CollectionError::Io {
                    name: self.name.clone(),
                    source,
                })?;
                let reader = BufReader::new(handle);
                let name = self.name.clone();
                Ok(reader.lines().filter_map(move |line| {
                    let line = line.ok()?;
                    if line.is_empty() {
                        return None;
                    }
                    match serde_json::from_str::<DataValue>(&line) {
                        Ok(value) => Some(value),
                        Err(e) => {
                            log::error!("corrupt buffered record in collection '{name}': {e}");
                            None
                        }
                    }
                }))
            }
        }
    }

    /// Deletes the backing file. Idempotent: closing twice (or closing an
    /// unbuffered collection) is a no-op.
    pub fn close(&mut self) {
        self.state = State::Closed;
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self.state, State::Buffered { .. })
    }
}
