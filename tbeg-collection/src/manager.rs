//! PURPOSE: Owns [`CollectionBuffer`]s by name for the duration of a render.

use crate::buffer::CollectionBuffer;
use crate::error::Result;
use std::collections::HashMap;
use tbeg_model::DataValue;

#[derive(Default)]
pub struct CollectionBufferManager {
    buffers: HashMap<String, CollectionBuffer>,
}

impl CollectionBufferManager {
    pub fn new() -> Self {
        CollectionBufferManager {
            buffers: HashMap::new(),
        }
    }

    /// Buffers `iter` under `name`, creating the buffer if it doesn't exist
    /// yet.
    pub fn buffer(&mut self, name: &str, iter: impl Iterator<Item = DataValue>) -> Result<()> {
        let entry = self
            .buffers
            .entry(name.to_string())
            .or_insert_with(|| CollectionBuffer::new(name));
        entry.buffer(iter)
    }

    pub fn size(&self, name: &str) -> Result<usize> {
        self.get(name)?.size()
    }

    pub fn iterator(&self, name: &str) -> Result<impl Iterator<Item = DataValue> + '_> {
        self.get(name)?.iterator()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buffers.get(name).map(|b| b.is_buffered()).unwrap_or(false)
    }

    /// Closes every buffer, deleting their backing files.
    pub fn close_all(&mut self) {
        for buffer in self.buffers.values_mut() {
            buffer.close();
        }
    }

    fn get(&self, name: &str) -> Result<&CollectionBuffer> {
        self.buffers
            .get(name)
            .ok_or_else(|| crate::error::CollectionError::NotBuffered(name.to_string()))
    }
}
