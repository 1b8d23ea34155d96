use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("collection '{0}' was already buffered")]
    AlreadyBuffered(String),

    #[error("collection '{0}' was accessed before it was buffered")]
    NotBuffered(String),

    #[error("collection '{0}' was accessed after it was closed")]
    Closed(String),

    #[error("IO error buffering collection '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt buffered record in collection '{name}': {source}")]
    Corrupt {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CollectionError>;
