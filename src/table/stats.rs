//! Single-column statistics and in-place numeric transforms
//!
//! Scalar aggregates compute over the non-absent values of one numeric
//! column and return NaN when nothing remains. The rank selectors return
//! sub-tables built by repeatedly picking the next unselected extremum, so
//! ties resolve in scan order.

use crate::data::convert::convert_value;
use crate::data::Value;
use crate::table::table::ColumnId;
use crate::table::Table;
use crate::{ColbaseError, Result};

impl Table {
    fn numeric_position<'a>(&self, id: impl Into<ColumnId<'a>>) -> Result<usize> {
        let pos = self.resolve(id)?;
        let col = self.columns[pos].borrow();
        if !col.is_numeric() {
            return Err(ColbaseError::TypeMismatch(format!(
                "column {} ({}) is not numeric",
                col.name().unwrap_or("<unnamed>"),
                col.type_name()
            )));
        }
        Ok(pos)
    }

    fn numeric_values(&self, pos: usize) -> Vec<f64> {
        let col = self.columns[pos].borrow();
        (0..self.row_count)
            .filter_map(|row| col.cell(row).as_f64())
            .collect()
    }

    /// Mean of the non-absent values; NaN when there are none.
    pub fn average<'a>(&self, id: impl Into<ColumnId<'a>>) -> Result<f64> {
        let values = self.numeric_values(self.numeric_position(id)?);
        if values.is_empty() {
            return Ok(f64::NAN);
        }
        Ok(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Median of the non-absent values; NaN when there are none. Even
    /// counts average the two middle values.
    pub fn median<'a>(&self, id: impl Into<ColumnId<'a>>) -> Result<f64> {
        let mut values = self.numeric_values(self.numeric_position(id)?);
        if values.is_empty() {
            return Ok(f64::NAN);
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = values.len() / 2;
        if values.len() % 2 == 1 {
            Ok(values[mid])
        } else {
            Ok((values[mid - 1] + values[mid]) / 2.0)
        }
    }

    /// Sum of the non-absent values; NaN when there are none.
    pub fn sum<'a>(&self, id: impl Into<ColumnId<'a>>) -> Result<f64> {
        let values = self.numeric_values(self.numeric_position(id)?);
        if values.is_empty() {
            return Ok(f64::NAN);
        }
        Ok(values.iter().sum())
    }

    /// Smallest non-absent value; NaN when there are none.
    pub fn minimum<'a>(&self, id: impl Into<ColumnId<'a>>) -> Result<f64> {
        Ok(self.extremum(self.numeric_position(id)?, true))
    }

    /// Largest non-absent value; NaN when there are none.
    pub fn maximum<'a>(&self, id: impl Into<ColumnId<'a>>) -> Result<f64> {
        Ok(self.extremum(self.numeric_position(id)?, false))
    }

    fn extremum(&self, pos: usize, minimum: bool) -> f64 {
        let values = self.numeric_values(pos);
        let mut best: Option<f64> = None;
        for v in values {
            best = Some(match best {
                None => v,
                Some(b) => {
                    if (minimum && v < b) || (!minimum && v > b) {
                        v
                    } else {
                        b
                    }
                }
            });
        }
        best.unwrap_or(f64::NAN)
    }

    /// Sub-table of the `rank` rows with the smallest key values, in
    /// ascending order.
    pub fn minimum_rank<'a>(&self, id: impl Into<ColumnId<'a>>, rank: usize) -> Result<Table> {
        self.rank_rows(self.numeric_position(id)?, rank, true)
    }

    /// Sub-table of the `rank` rows with the largest key values, in
    /// descending order.
    pub fn maximum_rank<'a>(&self, id: impl Into<ColumnId<'a>>, rank: usize) -> Result<Table> {
        self.rank_rows(self.numeric_position(id)?, rank, false)
    }

    fn rank_rows(&self, pos: usize, rank: usize, minimum: bool) -> Result<Table> {
        let col = self.columns[pos].borrow();
        let keys: Vec<Option<f64>> = (0..self.row_count)
            .map(|row| col.cell(row).as_f64())
            .collect();
        drop(col);

        let mut out = self.like();
        let mut selected = vec![false; self.row_count];
        for _ in 0..rank {
            let mut best: Option<(usize, f64)> = None;
            for (row, key) in keys.iter().enumerate() {
                let Some(key) = key else { continue };
                if selected[row] {
                    continue;
                }
                best = match best {
                    None => Some((row, *key)),
                    Some((_, b)) if (minimum && *key < b) || (!minimum && *key > b) => {
                        Some((row, *key))
                    }
                    keep => keep,
                };
            }
            let Some((row, _)) = best else { break };
            selected[row] = true;
            out.add_row(self.get_row(row)?)?;
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // In-place elementwise transforms (absent slots are skipped)
    // ------------------------------------------------------------------

    /// Replace every value with its absolute value.
    pub fn absolute<'a>(&mut self, id: impl Into<ColumnId<'a>>) -> Result<()> {
        self.map_numeric(id, |v| v.abs())
    }

    /// Round every value up to the nearest integer.
    pub fn ceil<'a>(&mut self, id: impl Into<ColumnId<'a>>) -> Result<()> {
        self.map_numeric(id, |v| v.ceil())
    }

    /// Round every value down to the nearest integer.
    pub fn floor<'a>(&mut self, id: impl Into<ColumnId<'a>>) -> Result<()> {
        self.map_numeric(id, |v| v.floor())
    }

    /// Round every value to the nearest integer, half away from zero.
    pub fn round<'a>(&mut self, id: impl Into<ColumnId<'a>>) -> Result<()> {
        self.map_numeric(id, |v| v.round())
    }

    /// Clamp every value into `[low, high]`.
    pub fn clip<'a>(&mut self, id: impl Into<ColumnId<'a>>, low: f64, high: f64) -> Result<()> {
        self.map_numeric(id, |v| v.clamp(low, high))
    }

    fn map_numeric<'a>(
        &mut self,
        id: impl Into<ColumnId<'a>>,
        f: impl Fn(f64) -> f64,
    ) -> Result<()> {
        let pos = self.numeric_position(id)?;
        let kind = self.columns[pos].borrow().element_type();
        for row in 0..self.row_count {
            let cell = self.columns[pos].borrow().cell(row);
            let Some(v) = cell.as_f64() else { continue };
            let mapped = convert_value(&Value::Double(f(v)), kind)?;
            self.columns[pos].borrow_mut().set(row, mapped)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::column::Column;

    fn numbers() -> Table {
        Table::from_columns(
            vec![
                Column::double_nullable("x", &[Some(4.0), None, Some(1.0), Some(3.0)]),
                Column::string_nullable("tag", &[Some("a"), Some("b"), Some("c"), Some("d")]),
            ],
            true,
        )
        .unwrap()
    }

    #[test]
    fn test_scalar_aggregates_skip_absent() {
        let t = numbers();
        assert_eq!(t.sum("x").unwrap(), 8.0);
        assert!((t.average("x").unwrap() - 8.0 / 3.0).abs() < 1e-12);
        assert_eq!(t.minimum("x").unwrap(), 1.0);
        assert_eq!(t.maximum("x").unwrap(), 4.0);
        assert_eq!(t.median("x").unwrap(), 3.0);
    }

    #[test]
    fn test_aggregates_on_empty_are_nan() {
        let t = Table::from_columns(
            vec![Column::double_nullable("x", &[None, None])],
            true,
        )
        .unwrap();
        assert!(t.sum("x").unwrap().is_nan());
        assert!(t.average("x").unwrap().is_nan());
        assert!(t.minimum("x").unwrap().is_nan());
        assert!(t.median("x").unwrap().is_nan());
    }

    #[test]
    fn test_non_numeric_rejected() {
        let t = numbers();
        assert!(matches!(
            t.sum("tag"),
            Err(ColbaseError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_median_even_count() {
        let t = Table::from_columns(vec![Column::int("n", &[1, 2, 3, 4])], false).unwrap();
        assert_eq!(t.median("n").unwrap(), 2.5);
    }

    #[test]
    fn test_minimum_rank() {
        let t = numbers();
        let low = t.minimum_rank("x", 2).unwrap();
        assert_eq!(low.rows(), 2);
        assert_eq!(low.get_double("x", 0).unwrap(), 1.0);
        assert_eq!(low.get_double("x", 1).unwrap(), 3.0);
        assert_eq!(low.get_string("tag", 0).unwrap(), "c");
    }

    #[test]
    fn test_maximum_rank_caps_at_available() {
        let t = numbers();
        let high = t.maximum_rank("x", 10).unwrap();
        // only three non-absent values exist
        assert_eq!(high.rows(), 3);
        assert_eq!(high.get_double("x", 0).unwrap(), 4.0);
        assert_eq!(high.get_double("x", 2).unwrap(), 1.0);
    }

    #[test]
    fn test_rank_ties_break_in_scan_order() {
        let t = Table::from_columns(
            vec![
                Column::int("n", &[2, 2, 1]),
                Column::string("tag", &["first", "second", "low"]),
            ],
            false,
        )
        .unwrap();
        let low = t.minimum_rank("n", 2).unwrap();
        assert_eq!(low.get_string("tag", 0).unwrap(), "low");
        assert_eq!(low.get_string("tag", 1).unwrap(), "first");
    }

    #[test]
    fn test_elementwise_transforms() {
        let mut t = Table::from_columns(
            vec![Column::double_nullable("x", &[Some(-1.5), None, Some(2.4)])],
            true,
        )
        .unwrap();
        t.absolute("x").unwrap();
        assert_eq!(t.get_double("x", 0).unwrap(), 1.5);
        assert!(t.is_null("x", 1).unwrap());
        t.round("x").unwrap();
        assert_eq!(t.get_double("x", 0).unwrap(), 2.0);
        assert_eq!(t.get_double("x", 2).unwrap(), 2.0);
    }

    #[test]
    fn test_elementwise_on_integers() {
        let mut t = Table::from_columns(vec![Column::int("n", &[-3, 7])], false).unwrap();
        t.absolute("n").unwrap();
        assert_eq!(t.get_int("n", 0).unwrap(), 3);
        t.clip("n", 0.0, 5.0).unwrap();
        assert_eq!(t.get_int("n", 1).unwrap(), 5);
        t.ceil("n").unwrap(); // no-op on integers
        assert_eq!(t.get_int("n", 0).unwrap(), 3);
    }

    #[test]
    fn test_clip() {
        let mut t = Table::from_columns(
            vec![Column::double("x", &[-2.0, 0.5, 9.0])],
            false,
        )
        .unwrap();
        t.clip("x", 0.0, 1.0).unwrap();
        assert_eq!(t.get_double("x", 0).unwrap(), 0.0);
        assert_eq!(t.get_double("x", 1).unwrap(), 0.5);
        assert_eq!(t.get_double("x", 2).unwrap(), 1.0);
    }
}
