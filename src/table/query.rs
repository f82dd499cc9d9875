//! Regex-keyed querying, filtering and counting
//!
//! Patterns match the *whole* display text of a cell (the expression is
//! anchored before compiling, so `a.` matches `ab` but not `abc`). Absent
//! cells render as `None`; the pattern `null` (or an absent pattern)
//! matches exactly the absent cells, and `NaN` matches a float NaN's text.

use crate::data::Value;
use crate::table::Table;
use crate::table::table::ColumnId;
use crate::Result;
use ahash::AHashMap;
use regex::Regex;

/// Compiled cell predicate.
pub(crate) enum Matcher {
    /// Matches absent cells only (`None` pattern or the literal `null`).
    Absent,
    Pattern(Regex),
}

impl Matcher {
    pub(crate) fn build(pattern: Option<&str>) -> Result<Matcher> {
        match pattern {
            None | Some("null") => Ok(Matcher::Absent),
            Some(p) => Ok(Matcher::Pattern(Regex::new(&format!("^(?:{})$", p))?)),
        }
    }
}

impl Table {
    fn matches(&self, column: usize, row: usize, matcher: &Matcher) -> bool {
        let col = self.columns[column].borrow();
        match matcher {
            Matcher::Absent => col.is_absent(row),
            Matcher::Pattern(re) => re.is_match(&col.cell(row).display_text()),
        }
    }

    /// First row at or after `start_from` whose cell matches.
    pub fn index_of<'a>(
        &self,
        id: impl Into<ColumnId<'a>>,
        pattern: Option<&str>,
        start_from: usize,
    ) -> Result<Option<usize>> {
        let column = self.resolve(id)?;
        let matcher = Matcher::build(pattern)?;
        Ok((start_from..self.row_count).find(|&row| self.matches(column, row, &matcher)))
    }

    /// Every matching row index, in order.
    pub fn index_of_all<'a>(
        &self,
        id: impl Into<ColumnId<'a>>,
        pattern: Option<&str>,
    ) -> Result<Vec<usize>> {
        let column = self.resolve(id)?;
        let matcher = Matcher::build(pattern)?;
        Ok((0..self.row_count)
            .filter(|&row| self.matches(column, row, &matcher))
            .collect())
    }

    /// Whether any cell of the column matches.
    pub fn contains<'a>(&self, id: impl Into<ColumnId<'a>>, pattern: Option<&str>) -> Result<bool> {
        Ok(self.index_of(id, pattern, 0)?.is_some())
    }

    /// New table holding deep copies of the matching rows.
    pub fn filter<'a>(&self, id: impl Into<ColumnId<'a>>, pattern: Option<&str>) -> Result<Table> {
        let column = self.resolve(id)?;
        let matcher = Matcher::build(pattern)?;
        let mut out = self.like();
        for row in 0..self.row_count {
            if self.matches(column, row, &matcher) {
                out.add_row(self.get_row(row)?)?;
            }
        }
        Ok(out)
    }

    /// New table holding deep copies of the rows that do NOT match.
    pub fn drop_matching<'a>(
        &self,
        id: impl Into<ColumnId<'a>>,
        pattern: Option<&str>,
    ) -> Result<Table> {
        let column = self.resolve(id)?;
        let matcher = Matcher::build(pattern)?;
        let mut out = self.like();
        for row in 0..self.row_count {
            if !self.matches(column, row, &matcher) {
                out.add_row(self.get_row(row)?)?;
            }
        }
        Ok(out)
    }

    /// In-place retention: keep only the matching rows.
    pub fn include<'a>(&mut self, id: impl Into<ColumnId<'a>>, pattern: Option<&str>) -> Result<()> {
        let column = self.resolve(id)?;
        let matcher = Matcher::build(pattern)?;
        self.remove_rows_by_match(column, &matcher, false)
    }

    /// In-place removal: delete the matching rows.
    pub fn exclude<'a>(&mut self, id: impl Into<ColumnId<'a>>, pattern: Option<&str>) -> Result<()> {
        let column = self.resolve(id)?;
        let matcher = Matcher::build(pattern)?;
        self.remove_rows_by_match(column, &matcher, true)
    }

    /// Two-pointer scan removing contiguous runs of rows whose match flag
    /// equals `remove_matching`, instead of one-row-at-a-time deletion.
    fn remove_rows_by_match(
        &mut self,
        column: usize,
        matcher: &Matcher,
        remove_matching: bool,
    ) -> Result<()> {
        let flags: Vec<bool> = (0..self.row_count)
            .map(|row| self.matches(column, row, matcher) == remove_matching)
            .collect();
        // Walk backward so earlier run positions stay valid.
        let mut end = self.row_count;
        while end > 0 {
            if !flags[end - 1] {
                end -= 1;
                continue;
            }
            let mut start = end - 1;
            while start > 0 && flags[start - 1] {
                start -= 1;
            }
            for col in &self.columns {
                col.borrow_mut().remove_range(start, end)?;
            }
            self.row_count -= end - start;
            end = start;
        }
        self.shrink_check();
        Ok(())
    }

    /// In-place replacement: set the column's matching cells to `value`.
    /// Returns the number of cells replaced.
    pub fn replace<'a>(
        &mut self,
        id: impl Into<ColumnId<'a>>,
        pattern: Option<&str>,
        value: Value,
    ) -> Result<usize> {
        let column = self.resolve(id)?;
        let matcher = Matcher::build(pattern)?;
        let rows: Vec<usize> = (0..self.row_count)
            .filter(|&row| self.matches(column, row, &matcher))
            .collect();
        for &row in &rows {
            self.columns[column].borrow_mut().set(row, value.clone())?;
        }
        Ok(rows.len())
    }

    /// Distinct non-absent values, in order of first occurrence.
    pub fn unique<'a>(&self, id: impl Into<ColumnId<'a>>) -> Result<Vec<Value>> {
        let column = self.resolve(id)?;
        let col = self.columns[column].borrow();
        let mut seen: AHashMap<ValueKey, ()> = AHashMap::new();
        let mut out = Vec::new();
        for row in 0..self.row_count {
            let value = col.cell(row);
            if value.is_null() {
                continue;
            }
            if seen.insert(ValueKey(value.clone()), ()).is_none() {
                out.push(value);
            }
        }
        Ok(out)
    }

    /// Occurrence table: one row per distinct value with its count and its
    /// fraction of all rows. On a nullable table, absent values are
    /// reported as one trailing row.
    pub fn count<'a>(&self, id: impl Into<ColumnId<'a>>) -> Result<Table> {
        let column = self.resolve(id)?;
        let col = self.columns[column].borrow();
        let kind = col.element_type();
        let value_name = col.name().unwrap_or("value").to_string();

        let mut order: Vec<Value> = Vec::new();
        let mut counts: AHashMap<ValueKey, usize> = AHashMap::new();
        let mut absent = 0usize;
        for row in 0..self.row_count {
            let value = col.cell(row);
            if value.is_null() {
                absent += 1;
                continue;
            }
            let n = counts.entry(ValueKey(value.clone())).or_insert(0usize);
            if *n == 0 {
                order.push(value);
            }
            *n += 1;
        }
        drop(col);

        let total = self.row_count as f64;
        let mut values = Vec::new();
        let mut count_cells = Vec::new();
        let mut fractions = Vec::new();
        for value in order {
            let n = counts[&ValueKey(value.clone())];
            values.push(value);
            count_cells.push(Value::Int(n as i32));
            fractions.push(Value::Double(n as f64 / total));
        }
        if self.nullable && absent > 0 {
            values.push(Value::Null);
            count_cells.push(Value::Int(absent as i32));
            fractions.push(Value::Double(absent as f64 / total));
        }

        let value_col = crate::data::column::Column::from_values(
            kind,
            self.nullable,
            Some(&value_name),
            values,
        )?;
        let count_col = crate::data::column::Column::from_values(
            crate::data::ElementType::Int,
            self.nullable,
            Some("count"),
            count_cells,
        )?;
        let fraction_col = crate::data::column::Column::from_values(
            crate::data::ElementType::Double,
            self.nullable,
            Some("fraction"),
            fractions,
        )?;
        Table::from_columns(vec![value_col, count_col, fraction_col], self.nullable)
    }

    /// Number of rows whose cell matches the pattern.
    pub fn count_matching<'a>(
        &self,
        id: impl Into<ColumnId<'a>>,
        pattern: Option<&str>,
    ) -> Result<usize> {
        Ok(self.index_of_all(id, pattern)?.len())
    }
}

/// Hash-map key wrapper giving [`Value`] NaN-stable equality and hashing.
#[derive(Debug, Clone)]
pub(crate) struct ValueKey(pub(crate) Value);

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.equals(&other.0)
    }
}

impl Eq for ValueKey {}

impl std::hash::Hash for ValueKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash_into(state);
    }
}
