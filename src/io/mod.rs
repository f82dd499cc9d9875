//! Serialization adapters
//!
//! The codecs consume only the table's public contract: structural
//! introspection, typed cell access and the factory's cell-constructor
//! dispatch. They own their formats; the core owns the data model.

pub mod binary;
pub mod csv;
pub mod dir;
