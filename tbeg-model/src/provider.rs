//! PURPOSE: The data-provider contract the host application implements,
//! spec.md §6. The core never knows where data comes from; it only asks
//! this trait for values, collections, images, and metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dynamic value a provider can hand back for a `${name}` variable or an
/// item field. Represented as a tagged variant at the boundary, the same
/// choice spec.md §9 calls out explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    Null,
    String(String),
    Number(f64),
    Boolean(bool),
    /// Excel serial date-time (days since the 1900 epoch, fractional part
    /// is time-of-day).
    DateTime(f64),
    /// A nested object, reachable via dotted `ItemField` paths.
    Object(Vec<(String, DataValue)>),
}

impl DataValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Number(n) => Some(*n),
            DataValue::DateTime(n) => Some(*n),
            DataValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Resolves a dotted path (`"address.city"`) against an object value.
    pub fn get_path(&self, path: &str) -> Option<&DataValue> {
        let mut current = self;
        for segment in path.split('.') {
            match current {
                DataValue::Object(fields) => {
                    current = fields.iter().find(|(k, _)| k == segment).map(|(_, v)| v)?;
                }
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => write!(f, ""),
            DataValue::String(s) => write!(f, "{s}"),
            DataValue::Number(n) => write!(f, "{n}"),
            DataValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            DataValue::DateTime(n) => write!(f, "{n}"),
            DataValue::Object(_) => write!(f, "[object]"),
        }
    }
}

/// Document properties written by the metadata stage, spec.md §4.10.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Vec<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub company: Option<String>,
    pub manager: Option<String>,
}

/// Image type sniffed from magic bytes, spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Bmp,
}

impl ImageFormat {
    /// Sniffs the format from a byte buffer's magic bytes. GIF is converted
    /// upstream to PNG by the caller and never reaches this sniffer in that
    /// form; anything unrecognized defaults to PNG per spec.md §6.
    pub fn sniff(bytes: &[u8]) -> ImageFormat {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            ImageFormat::Png
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            ImageFormat::Jpeg
        } else if bytes.starts_with(b"BM") {
            ImageFormat::Bmp
        } else {
            ImageFormat::Png
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Bmp => "dib",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Bmp => "image/bmp",
        }
    }
}

/// An iterator over collection items that the renderer can re-request.
/// Providers backing a single-shot iterator (e.g. wrapping a `Read` stream)
/// must still honor repeated `items()` calls for the same name per spec.md
/// §9's open question — return a fresh iterator each time, or the output
/// will silently drop a second binding of the same collection.
pub trait ItemIterator: Iterator<Item = DataValue> {}
impl<T: Iterator<Item = DataValue>> ItemIterator for T {}

/// The capabilities the core consumes from a host-supplied data source,
/// spec.md §6.
pub trait DataProvider {
    fn value(&self, name: &str) -> Option<DataValue>;

    /// Returns a fresh iterator over `name`'s items, or `None` if the
    /// collection is not known to this provider.
    fn items(&self, name: &str) -> Option<Box<dyn Iterator<Item = DataValue> + '_>>;

    fn image(&self, name: &str) -> Option<Vec<u8>>;

    /// Fast-path item count; when `Some`, the renderer can skip buffering
    /// the collection to disk to learn its size.
    fn item_count(&self, name: &str) -> Option<usize> {
        let _ = name;
        None
    }

    fn metadata(&self) -> Option<DocumentMetadata> {
        None
    }

    fn available_names(&self) -> Vec<String> {
        Vec::new()
    }
}
