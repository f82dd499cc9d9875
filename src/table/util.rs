//! Cross-table utilities
//!
//! Free functions over whole tables that no single instance owns: deep
//! copies, structural clones, horizontal merges and whole-table
//! nullability conversion.

use crate::table::Table;
use crate::{ColbaseError, Result};

/// Independent deep copy: every column is detached, so mutating the copy
/// never touches the source.
pub fn copy(table: &Table) -> Table {
    let mut out = Table::new(table.is_nullable());
    out.columns = table.columns.iter().map(|c| c.detach()).collect();
    out.row_count = table.rows();
    out.reindex();
    out
}

/// Empty table with the same column kinds, names and nullability.
pub fn like(table: &Table) -> Table {
    table.like()
}

/// Horizontal merge: one table holding every column of every input, in
/// order, sharing storage with the inputs.
///
/// Inputs must agree on nullability, row count and capacity, and named
/// columns must be unique across the whole set.
pub fn merge_columns(tables: &[&Table]) -> Result<Table> {
    let Some(first) = tables.first() else {
        return Ok(Table::new(false));
    };
    let mut refs = Vec::new();
    for table in tables {
        if table.is_nullable() != first.is_nullable() {
            return Err(ColbaseError::NullabilityMismatch(
                "merge requires matching table nullability".to_string(),
            ));
        }
        if table.rows() != first.rows() || table.capacity() != first.capacity() {
            return Err(ColbaseError::SizeMismatch(format!(
                "merge of {} rows (capacity {}) with {} rows (capacity {})",
                first.rows(),
                first.capacity(),
                table.rows(),
                table.capacity()
            )));
        }
        refs.extend(table.get_columns());
    }
    Table::from_refs(refs, first.rows(), first.is_nullable())
}

/// The table with every column widened to its nullable variant.
pub fn to_nullable(table: &Table) -> Result<Table> {
    convert(table, true)
}

/// The table with every column narrowed to its non-nullable variant,
/// absences replaced by kind defaults.
pub fn to_default(table: &Table) -> Result<Table> {
    convert(table, false)
}

fn convert(table: &Table, nullable: bool) -> Result<Table> {
    let mut out = Table::new(nullable);
    for col in &table.columns {
        let col = col.borrow();
        let converted = if nullable { col.as_nullable()? } else { col.as_default()? };
        out.columns.push(crate::data::ColumnRef::new(converted));
    }
    out.row_count = table.rows();
    out.reindex();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::column::{Column, ColumnRef};
    use crate::data::Value;

    fn sample() -> Table {
        Table::from_columns(
            vec![
                Column::int("id", &[1, 2]),
                Column::string("name", &["a", "b"]),
            ],
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_copy_is_independent() {
        let src = sample();
        let mut dup = copy(&src);
        assert!(dup.equals(&src));
        dup.set_int("id", 0, 99).unwrap();
        assert_eq!(src.get_int("id", 0).unwrap(), 1);
    }

    #[test]
    fn test_like_keeps_schema_only() {
        let l = like(&sample());
        assert_eq!(l.rows(), 0);
        assert_eq!(l.column_count(), 2);
    }

    #[test]
    fn test_merge_columns_shares_storage() {
        let a = sample();
        let b = Table::from_columns(vec![Column::double("score", &[0.5, 0.9])], false).unwrap();
        let merged = merge_columns(&[&a, &b]).unwrap();
        assert_eq!(merged.column_count(), 3);
        assert_eq!(merged.rows(), 2);
        assert!(ColumnRef::ptr_eq(
            &merged.get_column("score").unwrap(),
            &b.get_column("score").unwrap()
        ));
    }

    #[test]
    fn test_merge_rejects_mismatched_rows() {
        let a = sample();
        let b = Table::from_columns(vec![Column::double("score", &[0.5])], false).unwrap();
        assert!(merge_columns(&[&a, &b]).is_err());
    }

    #[test]
    fn test_merge_rejects_duplicate_names() {
        let a = sample();
        let b = Table::from_columns(vec![Column::int("id", &[3, 4])], false).unwrap();
        assert!(matches!(
            merge_columns(&[&a, &b]),
            Err(ColbaseError::DuplicateColumnName(_))
        ));
    }

    #[test]
    fn test_nullability_roundtrip() {
        let src = sample();
        let wide = to_nullable(&src).unwrap();
        assert!(wide.is_nullable());
        assert_eq!(wide.get_int("id", 1).unwrap(), 2);

        let mut wide = wide;
        wide.set_null("id", 0).unwrap();
        let narrow = to_default(&wide).unwrap();
        assert!(!narrow.is_nullable());
        // absence replaced by the kind default
        assert_eq!(narrow.get_int("id", 0).unwrap(), 0);
        assert_eq!(narrow.get_value("name", 1).unwrap(), Value::String("b".into()));
    }
}
