//! Core table aggregate
//!
//! A [`Table`] is an ordered sequence of equal-capacity columns plus a
//! name→position index and a logical row count. Every column a table holds
//! shares the table's nullability. All mutation goes through the table so
//! the capacity, row-count and name-index invariants hold across the whole
//! operation set.
//!
//! Capacity policy: the backing arrays grow by doubling when a row append
//! finds them full, and shrink back to `row_count + 4` when removal drops
//! usage below one third of capacity. `flush()` trims to `row_count`
//! exactly; `clear()` leaves a two-slot buffer.

use crate::data::column::{Column, ColumnRef};
use crate::data::{ElementType, Value};
use crate::{ColbaseError, Result};
use log::debug;
use std::collections::HashMap;

/// Buffer left beyond `row_count` when a removal triggers a shrink.
const SHRINK_BUFFER: usize = 4;
/// Buffer left by `clear()`.
const CLEAR_BUFFER: usize = 2;

/// Column address: position or name.
#[derive(Debug, Clone, Copy)]
pub enum ColumnId<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for ColumnId<'_> {
    fn from(index: usize) -> Self {
        ColumnId::Index(index)
    }
}

impl<'a> From<&'a str> for ColumnId<'a> {
    fn from(name: &'a str) -> Self {
        ColumnId::Name(name)
    }
}

impl<'a> From<&'a String> for ColumnId<'a> {
    fn from(name: &'a String) -> Self {
        ColumnId::Name(name)
    }
}

/// Ordered collection of equal-capacity columns with an optional name
/// index.
#[derive(Debug)]
pub struct Table {
    pub(crate) columns: Vec<ColumnRef>,
    /// Logical row count: the next free index.
    pub(crate) row_count: usize,
    /// Derived name→position map; rebuilt by [`Table::reindex`] after every
    /// structural mutation.
    pub(crate) name_index: HashMap<String, usize>,
    /// Fixes the nullability of every contained column.
    pub(crate) nullable: bool,
}

impl Table {
    /// Create an empty table.
    pub fn new(nullable: bool) -> Self {
        Self {
            columns: Vec::new(),
            row_count: 0,
            name_index: HashMap::new(),
            nullable,
        }
    }

    /// Build a table from columns, converting each to the table's
    /// nullability. All columns must share one capacity; the logical row
    /// count becomes that capacity.
    pub fn from_columns(columns: Vec<Column>, nullable: bool) -> Result<Self> {
        let mut table = Table::new(nullable);
        let capacity = columns.first().map(|c| c.capacity()).unwrap_or(0);
        let mut seen = std::collections::HashSet::new();
        for col in columns {
            if col.capacity() != capacity {
                return Err(ColbaseError::SizeMismatch(format!(
                    "column {} has capacity {}, expected {}",
                    col.name().unwrap_or("<unnamed>"),
                    col.capacity(),
                    capacity
                )));
            }
            let col = if nullable { col.as_nullable()? } else { col.as_default()? };
            if let Some(name) = col.name() {
                if !seen.insert(name.to_string()) {
                    return Err(ColbaseError::DuplicateColumnName(name.to_string()));
                }
            }
            table.columns.push(ColumnRef::new(col));
        }
        table.row_count = capacity;
        table.reindex();
        Ok(table)
    }

    /// Build a table around existing handles without copying. Used by the
    /// column set operations, whose results alias their sources.
    pub(crate) fn from_refs(refs: Vec<ColumnRef>, row_count: usize, nullable: bool) -> Result<Self> {
        let mut table = Table::new(nullable);
        let mut seen = std::collections::HashSet::new();
        for r in refs {
            {
                let col = r.borrow();
                if col.is_nullable() != nullable {
                    return Err(ColbaseError::NullabilityMismatch(format!(
                        "column {} does not match table nullability",
                        col.name().unwrap_or("<unnamed>")
                    )));
                }
                if let Some(name) = col.name() {
                    if !seen.insert(name.to_string()) {
                        return Err(ColbaseError::DuplicateColumnName(name.to_string()));
                    }
                }
            }
            table.columns.push(r);
        }
        table.row_count = row_count;
        table.reindex();
        Ok(table)
    }

    /// Empty table with the same column kinds, names and nullability.
    pub fn like(&self) -> Table {
        let mut table = Table::new(self.nullable);
        for col in &self.columns {
            table.columns.push(ColumnRef::new(col.borrow().like()));
        }
        table.reindex();
        table
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Logical row count.
    pub fn rows(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Shared backing-array length of the columns.
    pub fn capacity(&self) -> usize {
        self.columns
            .first()
            .map(|c| c.borrow().capacity())
            .unwrap_or(0)
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn column_names(&self) -> Vec<Option<String>> {
        self.columns
            .iter()
            .map(|c| c.borrow().name().map(|n| n.to_string()))
            .collect()
    }

    /// Whether every column carries a name.
    pub fn is_labeled(&self) -> bool {
        self.columns.iter().all(|c| c.borrow().name().is_some())
    }

    /// Position of the named column.
    pub fn get_column_index(&self, name: &str) -> Result<usize> {
        self.name_index
            .get(name)
            .copied()
            .ok_or_else(|| ColbaseError::ColumnNotFound(name.to_string()))
    }

    /// Resolve a position-or-name address to a position.
    pub fn resolve<'a>(&self, id: impl Into<ColumnId<'a>>) -> Result<usize> {
        match id.into() {
            ColumnId::Index(i) if i < self.columns.len() => Ok(i),
            ColumnId::Index(i) => Err(ColbaseError::ColumnNotFound(format!(
                "column index {} out of range ({} columns)",
                i,
                self.columns.len()
            ))),
            ColumnId::Name(n) => self.get_column_index(n),
        }
    }

    /// Aliasing handle to one column. Mutating through the handle mutates
    /// this table's storage.
    pub fn get_column<'a>(&self, id: impl Into<ColumnId<'a>>) -> Result<ColumnRef> {
        Ok(self.columns[self.resolve(id)?].clone())
    }

    /// Aliasing handles to every column, in order.
    pub fn get_columns(&self) -> Vec<ColumnRef> {
        self.columns.clone()
    }

    pub fn element_type<'a>(&self, id: impl Into<ColumnId<'a>>) -> Result<ElementType> {
        Ok(self.columns[self.resolve(id)?].borrow().element_type())
    }

    // ------------------------------------------------------------------
    // Naming
    // ------------------------------------------------------------------

    /// Rebuild the name index from the current column order.
    ///
    /// Called at the end of every structural mutation; the map is derived
    /// state and never the source of truth for column existence.
    pub(crate) fn reindex(&mut self) {
        self.name_index.clear();
        for (i, col) in self.columns.iter().enumerate() {
            if let Some(name) = col.borrow().name() {
                self.name_index.insert(name.to_string(), i);
            }
        }
    }

    fn check_new_name(&self, name: Option<&str>) -> Result<()> {
        if let Some(name) = name {
            if self.name_index.contains_key(name) {
                return Err(ColbaseError::DuplicateColumnName(name.to_string()));
            }
        }
        Ok(())
    }

    /// Rename one column (`None` removes the label). Duplicate names are
    /// rejected.
    pub fn set_column_name<'a>(
        &mut self,
        id: impl Into<ColumnId<'a>>,
        name: Option<&str>,
    ) -> Result<()> {
        let pos = self.resolve(id)?;
        if let Some(new_name) = name {
            if let Some(&existing) = self.name_index.get(new_name) {
                if existing != pos {
                    return Err(ColbaseError::DuplicateColumnName(new_name.to_string()));
                }
            }
        }
        self.columns[pos].borrow_mut().set_name(name);
        self.reindex();
        Ok(())
    }

    /// Name every column at once. The slice length must equal the column
    /// count and the names must be distinct.
    pub fn set_column_names(&mut self, names: &[&str]) -> Result<()> {
        if names.len() != self.columns.len() {
            return Err(ColbaseError::SizeMismatch(format!(
                "{} names for {} columns",
                names.len(),
                self.columns.len()
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for name in names {
            if !seen.insert(*name) {
                return Err(ColbaseError::DuplicateColumnName(name.to_string()));
            }
        }
        for (col, name) in self.columns.iter().zip(names) {
            col.borrow_mut().set_name(Some(name));
        }
        self.reindex();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Row mutation
    // ------------------------------------------------------------------

    fn check_row_bounds(&self, row: usize) -> Result<()> {
        if row >= self.row_count {
            return Err(ColbaseError::IndexOutOfBounds {
                index: row,
                capacity: self.row_count,
            });
        }
        Ok(())
    }

    /// Validate a row against the schema, naming the offending column.
    fn check_row(&self, row: &[Value]) -> Result<()> {
        if self.columns.is_empty() {
            return Err(ColbaseError::SchemaMismatch(
                "table has no columns".to_string(),
            ));
        }
        if row.len() != self.columns.len() {
            return Err(ColbaseError::SchemaMismatch(format!(
                "row has {} items, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        for (i, (col, value)) in self.columns.iter().zip(row).enumerate() {
            let col = col.borrow();
            if !col.accepts(value) {
                return Err(ColbaseError::SchemaMismatch(format!(
                    "column {} ({}) at position {} cannot store {:?}",
                    col.name().unwrap_or("<unnamed>"),
                    col.type_name(),
                    i,
                    value
                )));
            }
        }
        Ok(())
    }

    fn grow_if_full(&mut self) {
        if self.row_count == self.capacity() {
            for col in &self.columns {
                col.borrow_mut().resize_double();
            }
            debug!("table grew to capacity {}", self.capacity());
        }
    }

    /// Append a row, growing capacity by doubling when full.
    pub fn add_row(&mut self, row: Vec<Value>) -> Result<()> {
        self.check_row(&row)?;
        self.grow_if_full();
        let at = self.row_count;
        for (col, value) in self.columns.iter().zip(row) {
            col.borrow_mut().set(at, value)?;
        }
        self.row_count += 1;
        Ok(())
    }

    /// Insert a row at `index`, shifting all later rows right.
    pub fn insert_row(&mut self, index: usize, row: Vec<Value>) -> Result<()> {
        if index > self.row_count {
            return Err(ColbaseError::IndexOutOfBounds {
                index,
                capacity: self.row_count,
            });
        }
        if index == self.row_count {
            return self.add_row(row);
        }
        self.check_row(&row)?;
        self.grow_if_full();
        for (col, value) in self.columns.iter().zip(row) {
            col.borrow_mut().insert_at(index, value)?;
        }
        self.row_count += 1;
        Ok(())
    }

    /// Overwrite an existing row.
    pub fn set_row(&mut self, index: usize, row: Vec<Value>) -> Result<()> {
        self.check_row_bounds(index)?;
        self.check_row(&row)?;
        for (col, value) in self.columns.iter().zip(row) {
            col.borrow_mut().set(index, value)?;
        }
        Ok(())
    }

    /// Owned copy of one row.
    pub fn get_row(&self, index: usize) -> Result<Vec<Value>> {
        self.check_row_bounds(index)?;
        Ok(self
            .columns
            .iter()
            .map(|col| col.borrow().cell(index))
            .collect())
    }

    /// Remove one row, shifting later rows left.
    pub fn remove_row(&mut self, index: usize) -> Result<()> {
        self.check_row_bounds(index)?;
        self.remove_rows(index, index + 1)
    }

    /// Remove the rows in `[from, to)`, shifting later rows left. Shrinks
    /// capacity when usage drops below one third.
    pub fn remove_rows(&mut self, from: usize, to: usize) -> Result<()> {
        if from > to || to > self.row_count {
            return Err(ColbaseError::IndexOutOfBounds {
                index: to,
                capacity: self.row_count,
            });
        }
        for col in &self.columns {
            col.borrow_mut().remove_range(from, to)?;
        }
        self.row_count -= to - from;
        self.shrink_check();
        Ok(())
    }

    pub(crate) fn shrink_check(&mut self) {
        if self.row_count * 3 < self.capacity() {
            self.flush_with(SHRINK_BUFFER);
        }
    }

    /// Trim every column's capacity to `row_count`.
    pub fn flush(&mut self) {
        self.flush_with(0);
    }

    /// Drop all rows, leaving a small capacity buffer.
    pub fn clear(&mut self) {
        self.row_count = 0;
        self.flush_with(CLEAR_BUFFER);
    }

    fn flush_with(&mut self, buffer: usize) {
        let target = self.row_count + buffer;
        if target == self.capacity() {
            return;
        }
        for col in &self.columns {
            col.borrow_mut().match_length(target);
        }
        debug!("table flushed to capacity {}", target);
    }

    /// Bulk-append every row of `other`.
    ///
    /// When both tables are fully labeled the columns are matched by name
    /// (missing source columns fill with default/absent, extra source
    /// columns are ignored); otherwise they are matched positionally and
    /// missing trailing columns fill with default/absent. The operation is
    /// atomic: every incoming value is validated before the first row is
    /// applied.
    pub fn add_rows(&mut self, other: &Table) -> Result<()> {
        if self.columns.is_empty() {
            return Err(ColbaseError::SchemaMismatch(
                "table has no columns".to_string(),
            ));
        }
        let by_name = self.is_labeled() && other.is_labeled();
        // Map each destination column to its source, if any.
        let sources: Vec<Option<usize>> = if by_name {
            self.columns
                .iter()
                .map(|col| {
                    let col = col.borrow();
                    other.name_index.get(col.name().unwrap()).copied()
                })
                .collect()
        } else {
            (0..self.columns.len())
                .map(|i| (i < other.columns.len()).then_some(i))
                .collect()
        };

        // Validation pass, then the append is all-or-nothing.
        let incoming = other.row_count;
        let mut staged: Vec<Vec<Value>> = Vec::with_capacity(incoming);
        for row in 0..incoming {
            let mut values = Vec::with_capacity(self.columns.len());
            for (dest, source) in self.columns.iter().zip(&sources) {
                let dest = dest.borrow();
                let value = match source {
                    Some(s) => other.columns[*s].borrow().cell(row),
                    None if self.nullable => Value::Null,
                    None => dest.default_value(),
                };
                if !dest.accepts(&value) {
                    return Err(ColbaseError::SchemaMismatch(format!(
                        "column {} ({}) cannot store {:?} from appended table",
                        dest.name().unwrap_or("<unnamed>"),
                        dest.type_name(),
                        value
                    )));
                }
                values.push(value);
            }
            staged.push(values);
        }
        for row in staged {
            self.grow_if_full();
            let at = self.row_count;
            for (col, value) in self.columns.iter().zip(row) {
                col.borrow_mut().set(at, value)?;
            }
            self.row_count += 1;
        }
        Ok(())
    }

    /// Append a row given as a name→value map. Requires a fully labeled
    /// table; columns missing from the map fill with default/absent, keys
    /// naming no column are rejected.
    pub fn add_row_map(&mut self, fields: &HashMap<String, Value>) -> Result<()> {
        if !self.is_labeled() {
            return Err(ColbaseError::UnlabeledColumn(
                "map-keyed rows require every column to be named".to_string(),
            ));
        }
        for key in fields.keys() {
            if !self.name_index.contains_key(key) {
                return Err(ColbaseError::ColumnNotFound(key.clone()));
            }
        }
        let row: Vec<Value> = self
            .columns
            .iter()
            .map(|col| {
                let col = col.borrow();
                match fields.get(col.name().unwrap()) {
                    Some(value) => value.clone(),
                    None if self.nullable => Value::Null,
                    None => col.default_value(),
                }
            })
            .collect();
        self.add_row(row)
    }

    /// One row as a name→value map. Requires a fully labeled table.
    pub fn get_row_map(&self, index: usize) -> Result<HashMap<String, Value>> {
        if !self.is_labeled() {
            return Err(ColbaseError::UnlabeledColumn(
                "map-keyed rows require every column to be named".to_string(),
            ));
        }
        self.check_row_bounds(index)?;
        Ok(self
            .columns
            .iter()
            .map(|col| {
                let col = col.borrow();
                (col.name().unwrap().to_string(), col.cell(index))
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Column mutation
    // ------------------------------------------------------------------

    /// Fit an incoming column to this table: nullability and capacity.
    ///
    /// Empty columns expand to the current capacity with default/absent
    /// fill. On a nullable table a column of any other size is widened to
    /// nullable and padded with absences; if it is longer than the current
    /// row count the whole table grows to match. A non-nullable table
    /// requires an exact capacity match.
    fn adapt_column(&mut self, col: Column) -> Result<Column> {
        let capacity = self.capacity();
        let mut col = col;
        if col.is_empty() && !self.columns.is_empty() {
            col = if self.nullable { col.as_nullable()? } else { col.as_default()? };
            col.match_length(capacity);
            return Ok(col);
        }
        if self.columns.is_empty() {
            // First column fixes capacity and row count.
            if col.is_nullable() != self.nullable {
                return Err(ColbaseError::NullabilityMismatch(format!(
                    "column {} does not match table nullability",
                    col.name().unwrap_or("<unnamed>")
                )));
            }
            return Ok(col);
        }
        if col.capacity() == capacity {
            if col.is_nullable() != self.nullable {
                return Err(ColbaseError::NullabilityMismatch(format!(
                    "column {} does not match table nullability",
                    col.name().unwrap_or("<unnamed>")
                )));
            }
            return Ok(col);
        }
        if !self.nullable {
            return Err(ColbaseError::SizeMismatch(format!(
                "column {} has capacity {}, table has {}",
                col.name().unwrap_or("<unnamed>"),
                col.capacity(),
                capacity
            )));
        }
        // Nullable table: widen and pad, growing the table if needed.
        let mut col = col.as_nullable()?;
        if col.capacity() > self.row_count {
            let new_rows = col.capacity();
            for existing in &self.columns {
                existing.borrow_mut().match_length(new_rows);
            }
            self.row_count = new_rows;
            col.match_length(new_rows);
        } else {
            col.match_length(capacity);
        }
        Ok(col)
    }

    /// Append a column.
    pub fn add_column(&mut self, col: Column) -> Result<()> {
        self.insert_column(self.columns.len(), col)
    }

    /// Append a column under a new name.
    pub fn add_column_named(&mut self, mut col: Column, name: &str) -> Result<()> {
        col.set_name(Some(name));
        self.add_column(col)
    }

    /// Insert a column at a position, shifting later columns right.
    pub fn insert_column(&mut self, index: usize, col: Column) -> Result<()> {
        if index > self.columns.len() {
            return Err(ColbaseError::IndexOutOfBounds {
                index,
                capacity: self.columns.len(),
            });
        }
        self.check_new_name(col.name())?;
        let first = self.columns.is_empty();
        let col = self.adapt_column(col)?;
        if first {
            self.row_count = col.capacity();
        }
        self.columns.insert(index, ColumnRef::new(col));
        self.reindex();
        Ok(())
    }

    /// Insert an existing handle without copying (aliasing append).
    pub fn add_column_ref(&mut self, col: ColumnRef) -> Result<()> {
        {
            let borrowed = col.borrow();
            if borrowed.is_nullable() != self.nullable {
                return Err(ColbaseError::NullabilityMismatch(format!(
                    "column {} does not match table nullability",
                    borrowed.name().unwrap_or("<unnamed>")
                )));
            }
            if !self.columns.is_empty() && borrowed.capacity() != self.capacity() {
                return Err(ColbaseError::SizeMismatch(format!(
                    "column {} has capacity {}, table has {}",
                    borrowed.name().unwrap_or("<unnamed>"),
                    borrowed.capacity(),
                    self.capacity()
                )));
            }
            self.check_new_name(borrowed.name())?;
        }
        if self.columns.is_empty() {
            self.row_count = col.borrow().capacity();
        }
        self.columns.push(col);
        self.reindex();
        Ok(())
    }

    /// Replace the column at a position. The replacement must match the
    /// table's capacity and nullability exactly.
    pub fn set_column(&mut self, position: usize, col: Column) -> Result<()> {
        if position >= self.columns.len() {
            return Err(ColbaseError::IndexOutOfBounds {
                index: position,
                capacity: self.columns.len(),
            });
        }
        if col.is_nullable() != self.nullable {
            return Err(ColbaseError::NullabilityMismatch(format!(
                "column {} does not match table nullability",
                col.name().unwrap_or("<unnamed>")
            )));
        }
        if col.capacity() != self.capacity() {
            return Err(ColbaseError::SizeMismatch(format!(
                "column {} has capacity {}, table has {}",
                col.name().unwrap_or("<unnamed>"),
                col.capacity(),
                self.capacity()
            )));
        }
        if let Some(name) = col.name() {
            if let Some(&existing) = self.name_index.get(name) {
                if existing != position {
                    return Err(ColbaseError::DuplicateColumnName(name.to_string()));
                }
            }
        }
        self.columns[position] = ColumnRef::new(col);
        self.reindex();
        Ok(())
    }

    /// Remove a column by position or name, returning its handle.
    pub fn remove_column<'a>(&mut self, id: impl Into<ColumnId<'a>>) -> Result<ColumnRef> {
        let pos = self.resolve(id)?;
        let removed = self.columns.remove(pos);
        if self.columns.is_empty() {
            self.row_count = 0;
        }
        self.reindex();
        Ok(removed)
    }

    /// Remove the column aliased by `col`, matching by storage identity.
    pub fn remove_column_ref(&mut self, col: &ColumnRef) -> Result<ColumnRef> {
        let pos = self
            .columns
            .iter()
            .position(|c| ColumnRef::ptr_eq(c, col))
            .ok_or_else(|| ColbaseError::ColumnNotFound("<instance>".to_string()))?;
        self.remove_column(pos)
    }

    // ------------------------------------------------------------------
    // Cell access
    // ------------------------------------------------------------------

    /// Read one cell. Absent slots read as [`Value::Null`].
    pub fn get_value<'a>(&self, id: impl Into<ColumnId<'a>>, row: usize) -> Result<Value> {
        self.check_row_bounds(row)?;
        Ok(self.columns[self.resolve(id)?].borrow().cell(row))
    }

    /// Write one cell, validating kind/range/nullability.
    pub fn set_value<'a>(
        &mut self,
        id: impl Into<ColumnId<'a>>,
        row: usize,
        value: Value,
    ) -> Result<()> {
        self.check_row_bounds(row)?;
        let pos = self.resolve(id)?;
        self.columns[pos].borrow_mut().set(row, value)
    }

    /// Whether a cell holds the absent marker.
    pub fn is_null<'a>(&self, id: impl Into<ColumnId<'a>>, row: usize) -> Result<bool> {
        self.check_row_bounds(row)?;
        Ok(self.columns[self.resolve(id)?].borrow().is_absent(row))
    }

    /// Set a cell to the absent marker (nullable tables only).
    pub fn set_null<'a>(&mut self, id: impl Into<ColumnId<'a>>, row: usize) -> Result<()> {
        self.set_value(id, row, Value::Null)
    }

    fn scalar<'a, T>(
        &self,
        id: impl Into<ColumnId<'a>>,
        row: usize,
        extract: impl Fn(Value) -> Option<T>,
        want: &str,
    ) -> Result<T> {
        let pos = self.resolve(id)?;
        self.check_row_bounds(row)?;
        let value = self.columns[pos].borrow().cell(row);
        extract(value.clone()).ok_or_else(|| {
            ColbaseError::TypeMismatch(format!(
                "cell at column {}, row {} is {:?}, not {}",
                pos, row, value, want
            ))
        })
    }

    pub fn get_byte<'a>(&self, id: impl Into<ColumnId<'a>>, row: usize) -> Result<i8> {
        self.scalar(id, row, |v| match v { Value::Byte(x) => Some(x), _ => None }, "byte")
    }

    pub fn get_short<'a>(&self, id: impl Into<ColumnId<'a>>, row: usize) -> Result<i16> {
        self.scalar(id, row, |v| match v { Value::Short(x) => Some(x), _ => None }, "short")
    }

    pub fn get_int<'a>(&self, id: impl Into<ColumnId<'a>>, row: usize) -> Result<i32> {
        self.scalar(id, row, |v| match v { Value::Int(x) => Some(x), _ => None }, "int")
    }

    pub fn get_long<'a>(&self, id: impl Into<ColumnId<'a>>, row: usize) -> Result<i64> {
        self.scalar(id, row, |v| match v { Value::Long(x) => Some(x), _ => None }, "long")
    }

    pub fn get_float<'a>(&self, id: impl Into<ColumnId<'a>>, row: usize) -> Result<f32> {
        self.scalar(id, row, |v| match v { Value::Float(x) => Some(x), _ => None }, "float")
    }

    pub fn get_double<'a>(&self, id: impl Into<ColumnId<'a>>, row: usize) -> Result<f64> {
        self.scalar(id, row, |v| match v { Value::Double(x) => Some(x), _ => None }, "double")
    }

    pub fn get_string<'a>(&self, id: impl Into<ColumnId<'a>>, row: usize) -> Result<String> {
        self.scalar(id, row, |v| match v { Value::String(x) => Some(x), _ => None }, "string")
    }

    pub fn get_char<'a>(&self, id: impl Into<ColumnId<'a>>, row: usize) -> Result<char> {
        self.scalar(id, row, |v| match v { Value::Char(x) => Some(x), _ => None }, "char")
    }

    pub fn get_boolean<'a>(&self, id: impl Into<ColumnId<'a>>, row: usize) -> Result<bool> {
        self.scalar(id, row, |v| match v { Value::Boolean(x) => Some(x), _ => None }, "boolean")
    }

    pub fn get_binary<'a>(&self, id: impl Into<ColumnId<'a>>, row: usize) -> Result<Vec<u8>> {
        self.scalar(id, row, |v| match v { Value::Binary(x) => Some(x), _ => None }, "binary")
    }

    pub fn set_byte<'a>(&mut self, id: impl Into<ColumnId<'a>>, row: usize, v: i8) -> Result<()> {
        self.set_value(id, row, Value::Byte(v))
    }

    pub fn set_short<'a>(&mut self, id: impl Into<ColumnId<'a>>, row: usize, v: i16) -> Result<()> {
        self.set_value(id, row, Value::Short(v))
    }

    pub fn set_int<'a>(&mut self, id: impl Into<ColumnId<'a>>, row: usize, v: i32) -> Result<()> {
        self.set_value(id, row, Value::Int(v))
    }

    pub fn set_long<'a>(&mut self, id: impl Into<ColumnId<'a>>, row: usize, v: i64) -> Result<()> {
        self.set_value(id, row, Value::Long(v))
    }

    pub fn set_float<'a>(&mut self, id: impl Into<ColumnId<'a>>, row: usize, v: f32) -> Result<()> {
        self.set_value(id, row, Value::Float(v))
    }

    pub fn set_double<'a>(&mut self, id: impl Into<ColumnId<'a>>, row: usize, v: f64) -> Result<()> {
        self.set_value(id, row, Value::Double(v))
    }

    pub fn set_string<'a>(&mut self, id: impl Into<ColumnId<'a>>, row: usize, v: &str) -> Result<()> {
        self.set_value(id, row, Value::String(v.to_string()))
    }

    pub fn set_char<'a>(&mut self, id: impl Into<ColumnId<'a>>, row: usize, v: char) -> Result<()> {
        self.set_value(id, row, Value::Char(v))
    }

    pub fn set_boolean<'a>(&mut self, id: impl Into<ColumnId<'a>>, row: usize, v: bool) -> Result<()> {
        self.set_value(id, row, Value::Boolean(v))
    }

    pub fn set_binary<'a>(&mut self, id: impl Into<ColumnId<'a>>, row: usize, v: &[u8]) -> Result<()> {
        self.set_value(id, row, Value::Binary(v.to_vec()))
    }

    // ------------------------------------------------------------------
    // Equality / internal helpers
    // ------------------------------------------------------------------

    /// Logical equality: same shape, names, kinds and cell values over the
    /// used prefix. Capacity buffers are not compared.
    pub fn equals(&self, other: &Table) -> bool {
        if self.column_count() != other.column_count() || self.row_count != other.row_count {
            return false;
        }
        for (a, b) in self.columns.iter().zip(&other.columns) {
            let a = a.borrow();
            let b = b.borrow();
            if a.type_code() != b.type_code() || a.name() != b.name() {
                return false;
            }
            for row in 0..self.row_count {
                if !a.cell(row).equals(&b.cell(row)) {
                    return false;
                }
            }
        }
        true
    }

    /// Swap two rows across every column.
    pub(crate) fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for col in &self.columns {
            col.borrow_mut().swap(a, b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_name_table() -> Table {
        Table::from_columns(
            vec![
                Column::int("id", &[1, 2, 3]),
                Column::string("name", &["a", "b", "c"]),
            ],
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_add_and_remove_row() {
        let mut t = id_name_table();
        t.add_row(vec![Value::Int(4), Value::String("d".into())]).unwrap();
        assert_eq!(t.rows(), 4);
        assert_eq!(t.get_int("id", 3).unwrap(), 4);

        t.remove_row(0).unwrap();
        assert_eq!(t.rows(), 3);
        assert_eq!(t.get_string("name", 0).unwrap(), "b");
    }

    #[test]
    fn test_capacity_doubles_on_append() {
        let mut t = id_name_table();
        assert_eq!(t.capacity(), 3);
        t.add_row(vec![Value::Int(4), Value::String("d".into())]).unwrap();
        assert_eq!(t.capacity(), 6);
        assert_eq!(t.rows(), 4);
        // every column shares the capacity
        for col in t.get_columns() {
            assert_eq!(col.borrow().capacity(), 6);
        }
    }

    #[test]
    fn test_capacity_shrinks_after_removal() {
        let mut t = Table::from_columns(vec![Column::int("v", &(0..30).collect::<Vec<_>>())], false)
            .unwrap();
        t.remove_rows(0, 25).unwrap();
        // 5 rows in a 30-slot buffer: shrink to row_count + 4
        assert_eq!(t.rows(), 5);
        assert_eq!(t.capacity(), 9);
    }

    #[test]
    fn test_flush_and_clear() {
        let mut t = id_name_table();
        t.add_row(vec![Value::Int(4), Value::String("d".into())]).unwrap();
        t.flush();
        assert_eq!(t.capacity(), 4);
        t.clear();
        assert_eq!(t.rows(), 0);
        assert_eq!(t.capacity(), 2);
    }

    #[test]
    fn test_insert_row_shifts() {
        let mut t = id_name_table();
        t.insert_row(1, vec![Value::Int(9), Value::String("x".into())]).unwrap();
        assert_eq!(t.rows(), 4);
        assert_eq!(t.get_int("id", 0).unwrap(), 1);
        assert_eq!(t.get_int("id", 1).unwrap(), 9);
        assert_eq!(t.get_int("id", 2).unwrap(), 2);
        assert_eq!(t.get_string("name", 3).unwrap(), "c");
    }

    #[test]
    fn test_row_validation_names_column() {
        let mut t = id_name_table();
        let err = t
            .add_row(vec![Value::Int(4), Value::Int(5)])
            .unwrap_err();
        match err {
            ColbaseError::SchemaMismatch(msg) => assert!(msg.contains("name")),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(t.rows(), 3);
    }

    #[test]
    fn test_set_row_and_get_row() {
        let mut t = id_name_table();
        t.set_row(1, vec![Value::Int(20), Value::String("bb".into())]).unwrap();
        assert_eq!(
            t.get_row(1).unwrap(),
            vec![Value::Int(20), Value::String("bb".into())]
        );
    }

    #[test]
    fn test_name_index_follows_structure() {
        let mut t = id_name_table();
        assert_eq!(t.get_column_index("name").unwrap(), 1);
        t.insert_column(0, Column::boolean("flag", &[true, false, true])).unwrap();
        assert_eq!(t.get_column_index("id").unwrap(), 1);
        assert_eq!(t.get_column_index("name").unwrap(), 2);
        t.remove_column("id").unwrap();
        assert_eq!(t.get_column_index("name").unwrap(), 1);
        assert!(t.get_column_index("id").is_err());
        t.set_column_name(0, Some("enabled")).unwrap();
        assert_eq!(t.get_column_index("enabled").unwrap(), 0);
        assert!(t.get_column_index("flag").is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut t = id_name_table();
        let err = t.add_column(Column::int("id", &[7, 8, 9])).unwrap_err();
        assert!(matches!(err, ColbaseError::DuplicateColumnName(_)));
        assert!(t.set_column_names(&["a", "a"]).is_err());
    }

    #[test]
    fn test_nullability_enforced() {
        let mut t = id_name_table();
        let err = t
            .add_column(Column::int_nullable("opt", &[Some(1), None, Some(3)]))
            .unwrap_err();
        assert!(matches!(err, ColbaseError::NullabilityMismatch(_)));
    }

    #[test]
    fn test_size_mismatch_on_default_table() {
        let mut t = id_name_table();
        let err = t.add_column(Column::int("extra", &[1, 2])).unwrap_err();
        assert!(matches!(err, ColbaseError::SizeMismatch(_)));
    }

    #[test]
    fn test_empty_column_expands() {
        let mut t = id_name_table();
        t.add_column(Column::int("zeros", &[])).unwrap();
        assert_eq!(t.get_int("zeros", 2).unwrap(), 0);
    }

    #[test]
    fn test_nullable_table_grows_for_long_column() {
        let mut t = Table::from_columns(
            vec![Column::int_nullable("a", &[Some(1), Some(2)])],
            true,
        )
        .unwrap();
        t.add_column(Column::int("b", &[1, 2, 3, 4])).unwrap();
        assert_eq!(t.rows(), 4);
        assert!(t.is_null("a", 3).unwrap());
        assert_eq!(t.get_int("b", 3).unwrap(), 4);
    }

    #[test]
    fn test_add_rows_by_name_atomic() {
        let mut dest = id_name_table();
        let src = Table::from_columns(
            vec![
                Column::string("name", &["d", "e"]),
                Column::int("id", &[4, 5]),
                Column::int("extra", &[0, 0]),
            ],
            false,
        )
        .unwrap();
        dest.add_rows(&src).unwrap();
        assert_eq!(dest.rows(), 5);
        assert_eq!(dest.get_int("id", 4).unwrap(), 5);
        assert_eq!(dest.get_string("name", 3).unwrap(), "d");

        // a mismatched source leaves the destination untouched
        let bad = Table::from_columns(vec![Column::string("id", &["x"])], false).unwrap();
        assert!(dest.add_rows(&bad).is_err());
        assert_eq!(dest.rows(), 5);
    }

    #[test]
    fn test_add_rows_positional_fills_missing() {
        let mut dest = Table::from_columns(
            vec![
                Column::from_values(ElementType::Int, false, None, vec![Value::Int(1)]).unwrap(),
                Column::from_values(
                    ElementType::String,
                    false,
                    None,
                    vec![Value::String("a".into())],
                )
                .unwrap(),
            ],
            false,
        )
        .unwrap();
        let src = Table::from_columns(vec![Column::int("x", &[7])], false).unwrap();
        dest.add_rows(&src).unwrap();
        assert_eq!(dest.rows(), 2);
        assert_eq!(dest.get_int(0, 1).unwrap(), 7);
        assert_eq!(dest.get_string(1, 1).unwrap(), "n/a");
    }

    #[test]
    fn test_map_keyed_rows() {
        let mut t = id_name_table();
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), Value::String("d".into()));
        fields.insert("id".to_string(), Value::Int(4));
        t.add_row_map(&fields).unwrap();
        assert_eq!(t.rows(), 4);
        assert_eq!(t.get_int("id", 3).unwrap(), 4);

        // missing column fills with the kind default
        let mut partial = HashMap::new();
        partial.insert("id".to_string(), Value::Int(5));
        t.add_row_map(&partial).unwrap();
        assert_eq!(t.get_string("name", 4).unwrap(), "n/a");

        // unknown keys are rejected before any mutation
        let mut bad = HashMap::new();
        bad.insert("age".to_string(), Value::Int(1));
        assert!(matches!(
            t.add_row_map(&bad),
            Err(ColbaseError::ColumnNotFound(_))
        ));
        assert_eq!(t.rows(), 5);

        let row = t.get_row_map(0).unwrap();
        assert_eq!(row["id"], Value::Int(1));
        assert_eq!(row["name"], Value::String("a".into()));
    }

    #[test]
    fn test_capacity_invariant_through_mixed_sequence() {
        let mut t = id_name_table();
        for i in 0..20 {
            t.add_row(vec![Value::Int(i), Value::String(format!("r{}", i))])
                .unwrap();
            assert!(t.capacity() >= t.rows());
        }
        t.remove_rows(2, 18).unwrap();
        assert!(t.capacity() >= t.rows());
        t.insert_row(0, vec![Value::Int(-1), Value::String("head".into())])
            .unwrap();
        t.add_column(Column::boolean("flag", &[])).unwrap();
        for col in t.get_columns() {
            assert_eq!(col.borrow().capacity(), t.capacity());
        }
        assert!(t.capacity() >= t.rows());
    }

    #[test]
    fn test_typed_accessors() {
        let mut t = Table::from_columns(
            vec![
                Column::double("x", &[1.5]),
                Column::boolean("ok", &[false]),
                Column::binary("blob", &[&[1, 2]]),
            ],
            false,
        )
        .unwrap();
        assert_eq!(t.get_double("x", 0).unwrap(), 1.5);
        t.set_boolean("ok", 0, true).unwrap();
        assert!(t.get_boolean("ok", 0).unwrap());
        assert_eq!(t.get_binary("blob", 0).unwrap(), vec![1, 2]);
        assert!(t.get_int("x", 0).is_err());
    }

    #[test]
    fn test_set_null_and_is_null() {
        let mut t = Table::from_columns(
            vec![Column::int_nullable("v", &[Some(1), Some(2)])],
            true,
        )
        .unwrap();
        t.set_null("v", 0).unwrap();
        assert!(t.is_null("v", 0).unwrap());
        assert_eq!(t.get_value("v", 0).unwrap(), Value::Null);
    }

    #[test]
    fn test_equals_ignores_capacity_buffer() {
        let mut a = id_name_table();
        let b = id_name_table();
        a.add_row(vec![Value::Int(4), Value::String("d".into())]).unwrap();
        a.remove_row(3).unwrap();
        assert!(a.equals(&b));
    }

    #[test]
    fn test_like_is_empty_with_schema() {
        let t = id_name_table();
        let l = t.like();
        assert_eq!(l.rows(), 0);
        assert_eq!(l.column_count(), 2);
        assert_eq!(l.get_column_index("name").unwrap(), 1);
    }
}
