//! Table aggregate and its algorithms
//!
//! [`Table`] owns the column sequence and mediates every read and write;
//! the sibling modules add querying, sorting, join/group/set algebra and
//! statistics on top of the same structure.

pub mod join;
pub mod query;
pub mod sort;
pub mod stats;
pub mod table;
pub mod util;

pub use table::{ColumnId, Table};
