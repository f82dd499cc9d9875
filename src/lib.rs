//! colbase — in-memory strongly-typed columnar table library
//!
//! Provides typed column containers (ten element kinds, each in a nullable
//! and a non-nullable variant) composed into a [`Table`] supporting labeled
//! access, row/column mutation, regex filtering, joins, grouping, set
//! operations, sorting and CSV/binary serialization.
//!
//! Tables are single-threaded, in-place data structures: no operation
//! blocks, and no internal locking is provided. Sharing a column between
//! two tables is possible through [`ColumnRef`] handles and is a deliberate,
//! caller-managed act; call [`ColumnRef::detach`] when independence is
//! required.

pub mod data;
pub mod io;
pub mod table;

// Re-export main types
pub use data::column::{Column, ColumnRef};
pub use data::{ElementType, Value};
pub use table::{ColumnId, Table};

/// Library error type.
///
/// A single family covers every core-contract violation; callers branch on
/// the variant. All errors are synchronous and non-retryable.
#[derive(Debug, thiserror::Error)]
pub enum ColbaseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index {index} out of bounds (capacity {capacity})")]
    IndexOutOfBounds { index: usize, capacity: usize },

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("duplicate column name: {0}")]
    DuplicateColumnName(String),

    #[error("unlabeled column: {0}")]
    UnlabeledColumn(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("nullability mismatch: {0}")]
    NullabilityMismatch(String),

    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    #[error("null not allowed: {0}")]
    NullNotAllowed(String),

    #[error("conversion error: {0}")]
    Conversion(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("ambiguous join: {0}")]
    AmbiguousJoin(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("format error: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, ColbaseError>;
