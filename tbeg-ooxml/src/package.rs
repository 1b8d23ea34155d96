//! PURPOSE: Load/save the ZIP-packaged XML parts of an `.xlsx` file.
//! CONTEXT: An OOXML package is a flat lookup table keyed by part name
//! (`xl/worksheets/sheet1.xml`, `[Content_Types].xml`, ...), never a
//! shared-ownership object graph — spec.md §9 calls this out explicitly so
//! that cyclic references in the underlying document model (sheet <-> chart
//! <-> drawing) don't force a graph with shared ownership. Parts this
//! pipeline never touches are preserved byte-for-byte and re-zipped in their
//! original order.

use crate::error::{OoxmlError, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// An in-memory OOXML package: a ZIP archive of named XML (and binary) parts.
#[derive(Debug, Clone)]
pub struct OoxmlPackage {
    parts: HashMap<String, Vec<u8>>,
    /// Preserves the original ZIP entry order; parts added after load are
    /// appended in insertion order.
    order: Vec<String>,
}

impl OoxmlPackage {
    /// An empty package with no parts.
    pub fn empty() -> Self {
        OoxmlPackage {
            parts: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Reads every entry of a ZIP archive into memory.
    pub fn open_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = HashMap::with_capacity(archive.len());
        let mut order = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut buf)?;
            order.push(name.clone());
            parts.insert(name, buf);
        }

        Ok(OoxmlPackage { parts, order })
    }

    /// Returns the raw bytes of a part, if present.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(|v| v.as_slice())
    }

    /// Returns a part's bytes decoded as UTF-8 text.
    pub fn part_text(&self, name: &str) -> Result<String> {
        let bytes = self
            .part(name)
            .ok_or_else(|| OoxmlError::PartNotFound(name.to_string()))?;
        String::from_utf8(bytes.to_vec()).map_err(|e| OoxmlError::InvalidUtf8(e.to_string()))
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    /// Inserts or overwrites a part's bytes. New part names are appended to
    /// the write order.
    pub fn set_part(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        let name = name.into();
        if !self.parts.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.parts.insert(name, bytes);
    }

    pub fn set_part_text(&mut self, name: impl Into<String>, text: String) {
        self.set_part(name, text.into_bytes());
    }

    /// Removes a part entirely (used when extracting pivots/charts so the
    /// renderer never sees them).
    pub fn remove_part(&mut self, name: &str) -> Option<Vec<u8>> {
        let removed = self.parts.remove(name);
        if removed.is_some() {
            self.order.retain(|n| n != name);
        }
        removed
    }

    /// Part names currently in the package, in write order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Part names matching a prefix, e.g. `"xl/pivotTables/"`.
    pub fn part_names_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> {
        self.order
            .iter()
            .map(|s| s.as_str())
            .filter(move |n| n.starts_with(prefix))
    }

    /// Serializes the package back into ZIP bytes, writing parts in their
    /// current order with deflate compression.
    pub fn save_to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut writer = ZipWriter::new(Cursor::new(&mut buf));
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
            for name in &self.order {
                let bytes = self
                    .parts
                    .get(name)
                    .expect("order and parts stay in sync");
                writer.start_file(name, options)?;
                writer.write_all(bytes)?;
            }
            writer.finish()?;
        }
        Ok(buf)
    }
}

impl Default for OoxmlPackage {
    fn default() -> Self {
        OoxmlPackage::empty()
    }
}
