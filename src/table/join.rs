//! Equi-join, grouping and set algebra
//!
//! The join and the row set operations are hash-assisted: rows are bucketed
//! by an `ahash` of their cell tuple, with exact equality checked inside a
//! bucket so hash collisions never produce wrong matches. Column set
//! operations match by name and share storage with their sources instead of
//! copying.

use crate::data::column::Column;
use crate::data::{ElementType, Value};
use crate::table::query::ValueKey;
use crate::table::Table;
use crate::{ColbaseError, Result};
use ahash::AHashMap;
use std::hash::Hasher;

/// Aggregation applied by the group-by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aggregate {
    Minimum,
    Maximum,
    Average,
    Sum,
}

impl Table {
    // ------------------------------------------------------------------
    // Join
    // ------------------------------------------------------------------

    /// Inner equi-join.
    ///
    /// With no keys given, the single column name common to both tables is
    /// used (an error if there are zero or several). With one key given it
    /// names the column on both sides. Key columns must share an element
    /// kind. Every combination of matching rows is emitted; columns of
    /// `other` whose names duplicate columns of `self` are excluded, so
    /// shared-name values always come from the left table.
    pub fn join(
        &self,
        other: &Table,
        key_self: Option<&str>,
        key_other: Option<&str>,
    ) -> Result<Table> {
        let (left_name, right_name): (String, String) = match (key_self, key_other) {
            (Some(a), Some(b)) => (a.to_string(), b.to_string()),
            (Some(a), None) => (a.to_string(), a.to_string()),
            (None, Some(b)) => (b.to_string(), b.to_string()),
            (None, None) => {
                let common: Vec<String> = self
                    .column_names()
                    .into_iter()
                    .flatten()
                    .filter(|n| other.name_index.contains_key(n))
                    .collect();
                match common.as_slice() {
                    [single] => (single.clone(), single.clone()),
                    [] => {
                        return Err(ColbaseError::AmbiguousJoin(
                            "no common column name".to_string(),
                        ))
                    }
                    names => {
                        return Err(ColbaseError::AmbiguousJoin(format!(
                            "{} common column names: {}",
                            names.len(),
                            names.join(", ")
                        )))
                    }
                }
            }
        };
        let left_key = self.get_column_index(&left_name)?;
        let right_key = other.get_column_index(&right_name)?;

        let left_kind = self.columns[left_key].borrow().element_type();
        let right_kind = other.columns[right_key].borrow().element_type();
        if left_kind != right_kind {
            return Err(ColbaseError::TypeMismatch(format!(
                "join keys {} ({}) and {} ({}) differ in element type",
                left_name,
                left_kind.type_name(),
                right_name,
                right_kind.type_name()
            )));
        }

        // Columns of `other` that survive into the result.
        let carried: Vec<usize> = (0..other.columns.len())
            .filter(|&i| match other.columns[i].borrow().name() {
                Some(name) => !self.name_index.contains_key(name),
                None => true,
            })
            .collect();

        let nullable = self.nullable || other.nullable;
        let mut schema: Vec<Column> = Vec::new();
        for col in &self.columns {
            let like = col.borrow().like();
            schema.push(if nullable { like.as_nullable()? } else { like });
        }
        for &i in &carried {
            let like = other.columns[i].borrow().like();
            schema.push(if nullable { like.as_nullable()? } else { like });
        }
        let mut out = Table::from_columns(schema, nullable)?;

        // Probe side index: key value -> matching right rows.
        let mut probe: AHashMap<ValueKey, Vec<usize>> = AHashMap::new();
        {
            let right = other.columns[right_key].borrow();
            for row in 0..other.row_count {
                let value = right.cell(row);
                if value.is_null() {
                    continue;
                }
                probe.entry(ValueKey(value)).or_default().push(row);
            }
        }

        for left_row in 0..self.row_count {
            let key = self.columns[left_key].borrow().cell(left_row);
            if key.is_null() {
                continue;
            }
            let Some(matches) = probe.get(&ValueKey(key)) else {
                continue;
            };
            for &right_row in matches {
                let mut row = self.get_row(left_row)?;
                for &i in &carried {
                    row.push(other.columns[i].borrow().cell(right_row));
                }
                out.add_row(row)?;
            }
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Group-by
    // ------------------------------------------------------------------

    /// One row per distinct grouping value, numeric columns reduced to
    /// their group minimum (source kind preserved).
    pub fn group_minimum_by(&self, key: &str) -> Result<Table> {
        self.group_by(key, Aggregate::Minimum)
    }

    /// One row per distinct grouping value, numeric columns reduced to
    /// their group maximum (source kind preserved).
    pub fn group_maximum_by(&self, key: &str) -> Result<Table> {
        self.group_by(key, Aggregate::Maximum)
    }

    /// One row per distinct grouping value, numeric columns averaged into
    /// double columns.
    pub fn group_average_by(&self, key: &str) -> Result<Table> {
        self.group_by(key, Aggregate::Average)
    }

    /// One row per distinct grouping value, numeric columns summed into
    /// double columns.
    pub fn group_sum_by(&self, key: &str) -> Result<Table> {
        self.group_by(key, Aggregate::Sum)
    }

    fn group_by(&self, key: &str, agg: Aggregate) -> Result<Table> {
        let key_pos = self.get_column_index(key)?;
        let key_kind = self.columns[key_pos].borrow().element_type();

        // Distinct keys in first-occurrence order, plus one absent group.
        let mut order: Vec<Value> = Vec::new();
        let mut groups: AHashMap<ValueKey, Vec<usize>> = AHashMap::new();
        let mut absent_rows: Vec<usize> = Vec::new();
        {
            let key_col = self.columns[key_pos].borrow();
            for row in 0..self.row_count {
                let value = key_col.cell(row);
                if value.is_null() {
                    absent_rows.push(row);
                    continue;
                }
                let rows = groups.entry(ValueKey(value.clone())).or_default();
                if rows.is_empty() {
                    order.push(value);
                }
                rows.push(row);
            }
        }
        let mut row_sets: Vec<Vec<usize>> = order
            .iter()
            .map(|v| groups[&ValueKey(v.clone())].clone())
            .collect();
        let mut keys = order;
        if self.nullable && !absent_rows.is_empty() {
            keys.push(Value::Null);
            row_sets.push(absent_rows);
        }

        let mut columns: Vec<Column> = vec![Column::from_values(
            key_kind,
            self.nullable,
            self.columns[key_pos].borrow().name(),
            keys,
        )?];

        for (pos, col) in self.columns.iter().enumerate() {
            if pos == key_pos {
                continue;
            }
            let col = col.borrow();
            if !col.is_numeric() {
                continue;
            }
            let out_kind = match agg {
                Aggregate::Average | Aggregate::Sum => ElementType::Double,
                Aggregate::Minimum | Aggregate::Maximum => col.element_type(),
            };
            let mut cells = Vec::with_capacity(row_sets.len());
            for rows in &row_sets {
                let reduced = reduce(rows.iter().filter_map(|&r| col.cell(r).as_f64()), agg);
                cells.push(aggregate_cell(reduced, out_kind, self.nullable)?);
            }
            columns.push(Column::from_values(
                out_kind,
                self.nullable,
                col.name(),
                cells,
            )?);
        }
        Table::from_columns(columns, self.nullable)
    }

    // ------------------------------------------------------------------
    // Row set algebra
    // ------------------------------------------------------------------

    /// Rows of `self` followed by the rows of `other` not already present.
    pub fn union_rows(&self, other: &Table) -> Result<Table> {
        self.check_row_algebra(other)?;
        let mut out = self.like();
        for row in 0..self.row_count {
            out.add_row(self.get_row(row)?)?;
        }
        let index = RowIndex::build(self);
        for row in 0..other.row_count {
            if !index.contains(self, other, row) {
                out.add_row(other.get_row(row)?)?;
            }
        }
        Ok(out)
    }

    /// Rows of `self` that also appear in `other`.
    pub fn intersection_rows(&self, other: &Table) -> Result<Table> {
        self.check_row_algebra(other)?;
        let index = RowIndex::build(other);
        let mut out = self.like();
        for row in 0..self.row_count {
            if index.contains(other, self, row) {
                out.add_row(self.get_row(row)?)?;
            }
        }
        Ok(out)
    }

    /// Rows of `self` that do not appear in `other`.
    pub fn difference_rows(&self, other: &Table) -> Result<Table> {
        self.check_row_algebra(other)?;
        let index = RowIndex::build(other);
        let mut out = self.like();
        for row in 0..self.row_count {
            if !index.contains(other, self, row) {
                out.add_row(self.get_row(row)?)?;
            }
        }
        Ok(out)
    }

    fn check_row_algebra(&self, other: &Table) -> Result<()> {
        if self.column_count() != other.column_count() {
            return Err(ColbaseError::SchemaMismatch(format!(
                "row set operation on {} vs {} columns",
                self.column_count(),
                other.column_count()
            )));
        }
        if self.is_labeled() != other.is_labeled() {
            return Err(ColbaseError::SchemaMismatch(
                "row set operation on tables with different labeling".to_string(),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Column set algebra
    // ------------------------------------------------------------------

    /// Columns of `self` plus the columns of `other` whose names are new.
    /// The result aliases the source columns.
    pub fn union_columns(&self, other: &Table) -> Result<Table> {
        self.check_column_algebra(other)?;
        if self.row_count != other.row_count || self.capacity() != other.capacity() {
            return Err(ColbaseError::SizeMismatch(format!(
                "column union of {} rows (capacity {}) with {} rows (capacity {})",
                self.row_count,
                self.capacity(),
                other.row_count,
                other.capacity()
            )));
        }
        let mut refs = self.columns.clone();
        for col in &other.columns {
            let name = col.borrow().name().unwrap().to_string();
            if !self.name_index.contains_key(&name) {
                refs.push(col.clone());
            }
        }
        Table::from_refs(refs, self.row_count, self.nullable)
    }

    /// Columns of `self` whose names also appear in `other`. The result
    /// aliases the source columns.
    pub fn intersection_columns(&self, other: &Table) -> Result<Table> {
        self.check_column_algebra(other)?;
        let refs: Vec<_> = self
            .columns
            .iter()
            .filter(|col| {
                let col = col.borrow();
                other.name_index.contains_key(col.name().unwrap())
            })
            .cloned()
            .collect();
        let rows = if refs.is_empty() { 0 } else { self.row_count };
        Table::from_refs(refs, rows, self.nullable)
    }

    /// Columns of `self` whose names do not appear in `other`. The result
    /// aliases the source columns.
    pub fn difference_columns(&self, other: &Table) -> Result<Table> {
        self.check_column_algebra(other)?;
        let refs: Vec<_> = self
            .columns
            .iter()
            .filter(|col| {
                let col = col.borrow();
                !other.name_index.contains_key(col.name().unwrap())
            })
            .cloned()
            .collect();
        let rows = if refs.is_empty() { 0 } else { self.row_count };
        Table::from_refs(refs, rows, self.nullable)
    }

    fn check_column_algebra(&self, other: &Table) -> Result<()> {
        if !self.is_labeled() || !other.is_labeled() {
            return Err(ColbaseError::UnlabeledColumn(
                "column set operations require every column to be named".to_string(),
            ));
        }
        if self.nullable != other.nullable {
            return Err(ColbaseError::NullabilityMismatch(
                "column set operations require matching table nullability".to_string(),
            ));
        }
        Ok(())
    }
}

fn reduce(values: impl Iterator<Item = f64>, agg: Aggregate) -> f64 {
    let mut count = 0usize;
    let mut sum = 0.0f64;
    let mut best: Option<f64> = None;
    for v in values {
        count += 1;
        sum += v;
        best = Some(match best {
            None => v,
            Some(b) => match agg {
                Aggregate::Minimum => {
                    if v < b {
                        v
                    } else {
                        b
                    }
                }
                Aggregate::Maximum => {
                    if v > b {
                        v
                    } else {
                        b
                    }
                }
                _ => b,
            },
        });
    }
    if count == 0 {
        return f64::NAN;
    }
    match agg {
        Aggregate::Sum => sum,
        Aggregate::Average => sum / count as f64,
        Aggregate::Minimum | Aggregate::Maximum => best.unwrap(),
    }
}

/// Cast an aggregate back to its output kind. A NaN aggregate becomes the
/// absent marker on a nullable target.
fn aggregate_cell(value: f64, kind: ElementType, nullable: bool) -> Result<Value> {
    if value.is_nan() && nullable {
        return Ok(Value::Null);
    }
    crate::data::convert::convert_value(&Value::Double(value), kind)
}

/// Hash index over the rows of one table, with exact-equality verification
/// on probe.
struct RowIndex {
    buckets: AHashMap<u64, Vec<usize>>,
}

impl RowIndex {
    fn build(table: &Table) -> RowIndex {
        let mut buckets: AHashMap<u64, Vec<usize>> = AHashMap::new();
        for row in 0..table.row_count {
            buckets.entry(row_hash(table, row)).or_default().push(row);
        }
        RowIndex { buckets }
    }

    /// Whether `probe_row` of `probe` equals any indexed row of `indexed`.
    fn contains(&self, indexed: &Table, probe: &Table, probe_row: usize) -> bool {
        let Some(candidates) = self.buckets.get(&row_hash(probe, probe_row)) else {
            return false;
        };
        candidates
            .iter()
            .any(|&row| rows_equal(indexed, row, probe, probe_row))
    }
}

fn row_hash(table: &Table, row: usize) -> u64 {
    let mut hasher = ahash::AHasher::default();
    for col in &table.columns {
        col.borrow().cell(row).hash_into(&mut hasher);
    }
    hasher.finish()
}

fn rows_equal(a: &Table, a_row: usize, b: &Table, b_row: usize) -> bool {
    a.columns
        .iter()
        .zip(&b.columns)
        .all(|(ca, cb)| ca.borrow().cell(a_row).equals(&cb.borrow().cell(b_row)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::column::ColumnRef;

    fn people() -> Table {
        Table::from_columns(
            vec![
                Column::int("id", &[1, 2, 3]),
                Column::string("name", &["ann", "bob", "cid"]),
            ],
            false,
        )
        .unwrap()
    }

    fn scores() -> Table {
        Table::from_columns(
            vec![
                Column::int("id", &[2, 3, 3, 4]),
                Column::double("score", &[0.5, 0.7, 0.9, 1.0]),
            ],
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_join_auto_detects_single_common_name() {
        let joined = people().join(&scores(), None, None).unwrap();
        assert_eq!(joined.column_count(), 3);
        assert_eq!(joined.rows(), 3); // id 2 once, id 3 twice
        assert_eq!(joined.get_int("id", 0).unwrap(), 2);
        assert_eq!(joined.get_string("name", 0).unwrap(), "bob");
        assert_eq!(joined.get_double("score", 2).unwrap(), 0.9);
    }

    #[test]
    fn test_join_ambiguous_and_missing_common_names() {
        let left = people();
        let mut right = scores();
        right.set_column_names(&["id", "name"]).unwrap();
        assert!(matches!(
            left.join(&right, None, None),
            Err(ColbaseError::AmbiguousJoin(_))
        ));
        let mut disjoint = scores();
        disjoint.set_column_names(&["key", "score"]).unwrap();
        assert!(matches!(
            left.join(&disjoint, None, None),
            Err(ColbaseError::AmbiguousJoin(_))
        ));
    }

    #[test]
    fn test_join_key_kind_must_match() {
        let left = people();
        let right = Table::from_columns(
            vec![Column::string("id", &["2"]), Column::double("score", &[0.5])],
            false,
        )
        .unwrap();
        assert!(matches!(
            left.join(&right, None, None),
            Err(ColbaseError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_join_no_duplicate_key_values_cardinality() {
        // no duplicates on either side: one output row per key equality
        let left = people();
        let right = Table::from_columns(
            vec![
                Column::int("id", &[3, 1]),
                Column::boolean("active", &[true, false]),
            ],
            false,
        )
        .unwrap();
        let joined = left.join(&right, None, None).unwrap();
        assert_eq!(joined.rows(), 2);
        assert_eq!(joined.get_int("id", 0).unwrap(), 1);
        assert!(!joined.get_boolean("active", 0).unwrap());
    }

    #[test]
    fn test_join_mixed_nullability_widens() {
        let left = people();
        let right = Table::from_columns(
            vec![
                Column::int_nullable("id", &[Some(1), None]),
                Column::double_nullable("score", &[Some(0.1), Some(0.2)]),
            ],
            true,
        )
        .unwrap();
        let joined = left.join(&right, None, None).unwrap();
        assert!(joined.is_nullable());
        assert_eq!(joined.rows(), 1); // absent key matches nothing
        assert_eq!(joined.get_int("id", 0).unwrap(), 1);
    }

    #[test]
    fn test_group_sum_and_average() {
        let t = Table::from_columns(
            vec![
                Column::string("g", &["x", "y", "x"]),
                Column::int("n", &[1, 2, 3]),
            ],
            false,
        )
        .unwrap();
        let sums = t.group_sum_by("g").unwrap();
        assert_eq!(sums.rows(), 2);
        assert_eq!(sums.get_string("g", 0).unwrap(), "x");
        assert_eq!(sums.get_double("n", 0).unwrap(), 4.0);
        assert_eq!(sums.get_double("n", 1).unwrap(), 2.0);

        let avgs = t.group_average_by("g").unwrap();
        assert_eq!(avgs.get_double("n", 0).unwrap(), 2.0);
    }

    #[test]
    fn test_group_min_max_preserve_kind() {
        let t = Table::from_columns(
            vec![
                Column::string("g", &["x", "y", "x"]),
                Column::int("n", &[5, 2, 3]),
            ],
            false,
        )
        .unwrap();
        let mins = t.group_minimum_by("g").unwrap();
        assert_eq!(mins.get_int("n", 0).unwrap(), 3);
        let maxs = t.group_maximum_by("g").unwrap();
        assert_eq!(maxs.get_int("n", 0).unwrap(), 5);
    }

    #[test]
    fn test_group_by_absent_key_row() {
        let t = Table::from_columns(
            vec![
                Column::string_nullable("g", &[Some("x"), None, Some("x"), None]),
                Column::int_nullable("n", &[Some(1), Some(2), Some(3), None]),
            ],
            true,
        )
        .unwrap();
        let sums = t.group_sum_by("g").unwrap();
        assert_eq!(sums.rows(), 2);
        assert!(sums.is_null("g", 1).unwrap());
        assert_eq!(sums.get_double("n", 1).unwrap(), 2.0);
    }

    #[test]
    fn test_group_empty_aggregate_becomes_absent() {
        let t = Table::from_columns(
            vec![
                Column::string_nullable("g", &[Some("x")]),
                Column::int_nullable("n", &[None]),
            ],
            true,
        )
        .unwrap();
        let mins = t.group_minimum_by("g").unwrap();
        assert!(mins.is_null("n", 0).unwrap());
    }

    #[test]
    fn test_union_rows() {
        let a = people();
        let b = Table::from_columns(
            vec![
                Column::int("id", &[2, 9]),
                Column::string("name", &["bob", "zoe"]),
            ],
            false,
        )
        .unwrap();
        let u = a.union_rows(&b).unwrap();
        assert_eq!(u.rows(), 4);
        assert_eq!(u.get_string("name", 3).unwrap(), "zoe");
    }

    #[test]
    fn test_intersection_and_difference_rows() {
        let a = people();
        let b = Table::from_columns(
            vec![
                Column::int("id", &[2, 9]),
                Column::string("name", &["bob", "zoe"]),
            ],
            false,
        )
        .unwrap();
        let i = a.intersection_rows(&b).unwrap();
        assert_eq!(i.rows(), 1);
        assert_eq!(i.get_string("name", 0).unwrap(), "bob");

        let d = a.difference_rows(&b).unwrap();
        assert_eq!(d.rows(), 2);
        assert_eq!(d.get_string("name", 0).unwrap(), "ann");
    }

    #[test]
    fn test_row_algebra_requires_same_shape() {
        let a = people();
        let b = Table::from_columns(vec![Column::int("id", &[1])], false).unwrap();
        assert!(a.union_rows(&b).is_err());
    }

    #[test]
    fn test_union_columns_aliases_source() {
        let a = people();
        let b = Table::from_columns(
            vec![
                Column::int("id", &[7, 8, 9]),
                Column::double("score", &[0.1, 0.2, 0.3]),
            ],
            false,
        )
        .unwrap();
        let u = a.union_columns(&b).unwrap();
        assert_eq!(u.column_count(), 3);
        // "id" comes from the left table
        assert_eq!(u.get_int("id", 0).unwrap(), 1);
        // the score column is shared storage, not a copy
        assert!(ColumnRef::ptr_eq(
            &u.get_column("score").unwrap(),
            &b.get_column("score").unwrap()
        ));
    }

    #[test]
    fn test_intersection_and_difference_columns() {
        let a = people();
        let b = Table::from_columns(
            vec![
                Column::int("id", &[0, 0, 0]),
                Column::double("score", &[0.0, 0.0, 0.0]),
            ],
            false,
        )
        .unwrap();
        let i = a.intersection_columns(&b).unwrap();
        assert_eq!(i.column_count(), 1);
        assert_eq!(i.get_int("id", 2).unwrap(), 3);

        let d = a.difference_columns(&b).unwrap();
        assert_eq!(d.column_count(), 1);
        assert_eq!(d.get_string("name", 0).unwrap(), "ann");
    }

    #[test]
    fn test_column_algebra_requires_labels() {
        let a = people();
        let mut b = people();
        b.set_column_name("name", None).unwrap();
        assert!(matches!(
            a.union_columns(&b),
            Err(ColbaseError::UnlabeledColumn(_))
        ));
    }
}
