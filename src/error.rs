//! Error types for the row store.

use thiserror::Error;

/// Result type alias using the crate [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Insert attempted with `TABLE_MAX_ROWS` rows already committed.
    #[error("Table full.")]
    TableFull,

    /// Slot requested past the last page. Table checks capacity before
    /// addressing, so seeing this means a logic error.
    #[error("row {row_index} out of bounds")]
    OutOfBounds { row_index: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
