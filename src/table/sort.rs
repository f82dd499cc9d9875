//! Single-key in-place sort
//!
//! Quicksort over the logical rows, permuting every column in lockstep via
//! paired row swaps. Absent values are pushed out of the sort range to the
//! tail first (nullable tables); for float keys, NaN values are pushed to
//! the tail of the remaining range next. Pivot is the element at
//! `(left + right) / 2`; ties are not specially broken, so the sort is not
//! stable. Binary keys order by byte length.

use crate::data::Value;
use crate::table::table::ColumnId;
use crate::table::Table;
use crate::Result;
use std::cmp::Ordering;

/// Order two same-kind, non-absent cells.
pub(crate) fn value_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Byte(x), Value::Byte(y)) => x.cmp(y),
        (Value::Short(x), Value::Short(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Long(x), Value::Long(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Char(x), Value::Char(y)) => x.cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Binary(x), Value::Binary(y)) => x.len().cmp(&y.len()),
        _ => Ordering::Equal,
    }
}

impl Table {
    pub fn sort_ascending_by<'a>(&mut self, id: impl Into<ColumnId<'a>>) -> Result<()> {
        self.sort_by(id, true)
    }

    pub fn sort_descending_by<'a>(&mut self, id: impl Into<ColumnId<'a>>) -> Result<()> {
        self.sort_by(id, false)
    }

    fn sort_by<'a>(&mut self, id: impl Into<ColumnId<'a>>, ascending: bool) -> Result<()> {
        let key = self.resolve(id)?;
        let mut end = self.row_count;
        if self.nullable {
            end = self.partition_tail(key, end, |col, row| col.borrow().is_absent(row));
        }
        if self.columns[key].borrow().element_type().is_float() {
            end = self.partition_tail(key, end, |col, row| match col.borrow().cell(row) {
                Value::Float(v) => v.is_nan(),
                Value::Double(v) => v.is_nan(),
                _ => false,
            });
        }
        if end > 1 {
            self.quicksort(key, 0, end as isize - 1, ascending);
        }
        Ok(())
    }

    /// Move every row satisfying `pred` past the sort range. Returns the
    /// new range end.
    fn partition_tail(
        &mut self,
        key: usize,
        end: usize,
        pred: impl Fn(&crate::data::ColumnRef, usize) -> bool,
    ) -> usize {
        let mut i = 0;
        let mut j = end;
        while i < j {
            if pred(&self.columns[key], i) {
                j -= 1;
                self.swap_rows(i, j);
            } else {
                i += 1;
            }
        }
        j
    }

    fn quicksort(&mut self, key: usize, left: isize, right: isize, ascending: bool) {
        if left >= right {
            return;
        }
        let pivot = self.columns[key]
            .borrow()
            .cell(((left + right) / 2) as usize);
        let mut i = left;
        let mut j = right;
        while i <= j {
            while self.keyed_cmp(key, i as usize, &pivot, ascending) == Ordering::Less {
                i += 1;
            }
            while self.keyed_cmp(key, j as usize, &pivot, ascending) == Ordering::Greater {
                j -= 1;
            }
            if i <= j {
                self.swap_rows(i as usize, j as usize);
                i += 1;
                j -= 1;
            }
        }
        self.quicksort(key, left, j, ascending);
        self.quicksort(key, i, right, ascending);
    }

    fn keyed_cmp(&self, key: usize, row: usize, pivot: &Value, ascending: bool) -> Ordering {
        let ord = value_cmp(&self.columns[key].borrow().cell(row), pivot);
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    }
}
