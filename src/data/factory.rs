//! Column construction dispatch
//!
//! Maps type codes and canonical type names to concrete column variants.
//! The CSV boundary consumes [`parse_typed_cell`], which dispatches over
//! the nine non-binary type names.

use crate::data::column::Column;
use crate::data::{convert, ElementType, Value};
use crate::{ColbaseError, Result};

/// The type names the CSV boundary accepts, in type-code order.
pub const CSV_TYPE_NAMES: [&str; 9] = [
    "byte", "short", "int", "long", "float", "double", "string", "char", "boolean",
];

/// Empty column for a `(kind, nullable)` type code.
pub fn column_for_code(code: u8) -> Result<Column> {
    let (kind, nullable) = ElementType::from_code(code)
        .ok_or_else(|| ColbaseError::InvalidValue(format!("unknown type code {}", code)))?;
    Ok(Column::empty(kind, nullable))
}

/// Empty column for a canonical type name and nullability.
pub fn column_for_name(type_name: &str, nullable: bool) -> Result<Column> {
    let kind = ElementType::from_name(type_name)
        .ok_or_else(|| ColbaseError::InvalidValue(format!("unknown type name {:?}", type_name)))?;
    Ok(Column::empty(kind, nullable))
}

/// Parse a text field into a cell, dispatching over the nine non-binary
/// type names.
pub fn parse_typed_cell(type_name: &str, text: &str) -> Result<Value> {
    let kind = ElementType::from_name(type_name)
        .filter(|k| *k != ElementType::Binary)
        .ok_or_else(|| {
            ColbaseError::InvalidValue(format!("unknown cell type name {:?}", type_name))
        })?;
    convert::parse_cell(kind, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_for_code() {
        let col = column_for_code(12).unwrap();
        assert_eq!(col.element_type(), ElementType::Int);
        assert!(col.is_nullable());
        assert!(column_for_code(0).is_err());
        assert!(column_for_code(21).is_err());
    }

    #[test]
    fn test_column_for_name() {
        let col = column_for_name("double", false).unwrap();
        assert_eq!(col.type_code(), 6);
        assert!(column_for_name("int64", false).is_err());
    }

    #[test]
    fn test_parse_typed_cell() {
        assert_eq!(parse_typed_cell("int", "41").unwrap(), Value::Int(41));
        assert_eq!(
            parse_typed_cell("boolean", "off").unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(parse_typed_cell("char", "x").unwrap(), Value::Char('x'));
        assert!(parse_typed_cell("binary", "00").is_err());
        assert!(parse_typed_cell("int", "x").is_err());
    }
}
