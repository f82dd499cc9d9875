//! Typed column storage
//!
//! A [`Column`] owns one dense backing vector for a single element kind.
//! Nullable variants carry a [`BitVec`] absent mask beside the data; slots
//! under a set mask bit hold the kind default so the dense vector never has
//! holes. The backing vector's length is the column's *capacity*; the
//! logically used prefix is tracked by the owning table.

use crate::data::{BitVec, ElementType, Value};
use crate::{ColbaseError, Result};
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

/// Dense per-kind storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    String(Vec<String>),
    Char(Vec<char>),
    Boolean(Vec<bool>),
    Binary(Vec<Vec<u8>>),
}

impl ColumnData {
    fn empty(kind: ElementType) -> Self {
        match kind {
            ElementType::Byte => ColumnData::Byte(Vec::new()),
            ElementType::Short => ColumnData::Short(Vec::new()),
            ElementType::Int => ColumnData::Int(Vec::new()),
            ElementType::Long => ColumnData::Long(Vec::new()),
            ElementType::Float => ColumnData::Float(Vec::new()),
            ElementType::Double => ColumnData::Double(Vec::new()),
            ElementType::String => ColumnData::String(Vec::new()),
            ElementType::Char => ColumnData::Char(Vec::new()),
            ElementType::Boolean => ColumnData::Boolean(Vec::new()),
            ElementType::Binary => ColumnData::Binary(Vec::new()),
        }
    }

    fn element_type(&self) -> ElementType {
        match self {
            ColumnData::Byte(_) => ElementType::Byte,
            ColumnData::Short(_) => ElementType::Short,
            ColumnData::Int(_) => ElementType::Int,
            ColumnData::Long(_) => ElementType::Long,
            ColumnData::Float(_) => ElementType::Float,
            ColumnData::Double(_) => ElementType::Double,
            ColumnData::String(_) => ElementType::String,
            ColumnData::Char(_) => ElementType::Char,
            ColumnData::Boolean(_) => ElementType::Boolean,
            ColumnData::Binary(_) => ElementType::Binary,
        }
    }

    fn len(&self) -> usize {
        match self {
            ColumnData::Byte(v) => v.len(),
            ColumnData::Short(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Long(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Double(v) => v.len(),
            ColumnData::String(v) => v.len(),
            ColumnData::Char(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Binary(v) => v.len(),
        }
    }

    fn value_at(&self, index: usize) -> Value {
        match self {
            ColumnData::Byte(v) => Value::Byte(v[index]),
            ColumnData::Short(v) => Value::Short(v[index]),
            ColumnData::Int(v) => Value::Int(v[index]),
            ColumnData::Long(v) => Value::Long(v[index]),
            ColumnData::Float(v) => Value::Float(v[index]),
            ColumnData::Double(v) => Value::Double(v[index]),
            ColumnData::String(v) => Value::String(v[index].clone()),
            ColumnData::Char(v) => Value::Char(v[index]),
            ColumnData::Boolean(v) => Value::Boolean(v[index]),
            ColumnData::Binary(v) => Value::Binary(v[index].clone()),
        }
    }

    /// Store a value that already passed kind/range validation.
    fn store(&mut self, index: usize, value: Value) {
        match (self, value) {
            (ColumnData::Byte(v), Value::Byte(x)) => v[index] = x,
            (ColumnData::Short(v), Value::Short(x)) => v[index] = x,
            (ColumnData::Int(v), Value::Int(x)) => v[index] = x,
            (ColumnData::Long(v), Value::Long(x)) => v[index] = x,
            (ColumnData::Float(v), Value::Float(x)) => v[index] = x,
            (ColumnData::Double(v), Value::Double(x)) => v[index] = x,
            (ColumnData::String(v), Value::String(x)) => v[index] = x,
            (ColumnData::Char(v), Value::Char(x)) => v[index] = x,
            (ColumnData::Boolean(v), Value::Boolean(x)) => v[index] = x,
            (ColumnData::Binary(v), Value::Binary(x)) => v[index] = x,
            _ => unreachable!("store after validation"),
        }
    }

    fn push_default(&mut self) {
        match self {
            ColumnData::Byte(v) => v.push(0),
            ColumnData::Short(v) => v.push(0),
            ColumnData::Int(v) => v.push(0),
            ColumnData::Long(v) => v.push(0),
            ColumnData::Float(v) => v.push(0.0),
            ColumnData::Double(v) => v.push(0.0),
            ColumnData::String(v) => v.push(crate::data::STRING_DEFAULT.to_string()),
            ColumnData::Char(v) => v.push('\0'),
            ColumnData::Boolean(v) => v.push(false),
            ColumnData::Binary(v) => v.push(vec![0]),
        }
    }

    fn insert_default_at(&mut self, index: usize) {
        match self {
            ColumnData::Byte(v) => v.insert(index, 0),
            ColumnData::Short(v) => v.insert(index, 0),
            ColumnData::Int(v) => v.insert(index, 0),
            ColumnData::Long(v) => v.insert(index, 0),
            ColumnData::Float(v) => v.insert(index, 0.0),
            ColumnData::Double(v) => v.insert(index, 0.0),
            ColumnData::String(v) => v.insert(index, crate::data::STRING_DEFAULT.to_string()),
            ColumnData::Char(v) => v.insert(index, '\0'),
            ColumnData::Boolean(v) => v.insert(index, false),
            ColumnData::Binary(v) => v.insert(index, vec![0]),
        }
    }

    fn truncate(&mut self, len: usize) {
        match self {
            ColumnData::Byte(v) => v.truncate(len),
            ColumnData::Short(v) => v.truncate(len),
            ColumnData::Int(v) => v.truncate(len),
            ColumnData::Long(v) => v.truncate(len),
            ColumnData::Float(v) => v.truncate(len),
            ColumnData::Double(v) => v.truncate(len),
            ColumnData::String(v) => v.truncate(len),
            ColumnData::Char(v) => v.truncate(len),
            ColumnData::Boolean(v) => v.truncate(len),
            ColumnData::Binary(v) => v.truncate(len),
        }
    }

    fn drain(&mut self, from: usize, to: usize) {
        match self {
            ColumnData::Byte(v) => drop(v.drain(from..to)),
            ColumnData::Short(v) => drop(v.drain(from..to)),
            ColumnData::Int(v) => drop(v.drain(from..to)),
            ColumnData::Long(v) => drop(v.drain(from..to)),
            ColumnData::Float(v) => drop(v.drain(from..to)),
            ColumnData::Double(v) => drop(v.drain(from..to)),
            ColumnData::String(v) => drop(v.drain(from..to)),
            ColumnData::Char(v) => drop(v.drain(from..to)),
            ColumnData::Boolean(v) => drop(v.drain(from..to)),
            ColumnData::Binary(v) => drop(v.drain(from..to)),
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        match self {
            ColumnData::Byte(v) => v.swap(a, b),
            ColumnData::Short(v) => v.swap(a, b),
            ColumnData::Int(v) => v.swap(a, b),
            ColumnData::Long(v) => v.swap(a, b),
            ColumnData::Float(v) => v.swap(a, b),
            ColumnData::Double(v) => v.swap(a, b),
            ColumnData::String(v) => v.swap(a, b),
            ColumnData::Char(v) => v.swap(a, b),
            ColumnData::Boolean(v) => v.swap(a, b),
            ColumnData::Binary(v) => v.swap(a, b),
        }
    }
}

/// A named, homogeneously-typed, resizable container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    name: Option<String>,
    data: ColumnData,
    /// `Some` marks the nullable variant; a set bit marks an absent slot.
    nulls: Option<BitVec>,
}

impl Column {
    /// Create an empty column of the given kind and nullability.
    pub fn empty(kind: ElementType, nullable: bool) -> Self {
        Self {
            name: None,
            data: ColumnData::empty(kind),
            nulls: nullable.then(BitVec::new),
        }
    }

    /// Create a column from owned cell values, validating each against the
    /// kind.
    pub fn from_values(
        kind: ElementType,
        nullable: bool,
        name: Option<&str>,
        values: Vec<Value>,
    ) -> Result<Self> {
        let mut col = Column::empty(kind, nullable);
        col.name = name.map(|n| n.to_string());
        col.match_length(values.len());
        for (i, value) in values.into_iter().enumerate() {
            col.set(i, value)?;
        }
        Ok(col)
    }

    // Per-kind constructors. The slice forms build non-nullable columns;
    // the `*_nullable` forms accept absent slots.

    pub fn byte(name: &str, values: &[i8]) -> Self {
        Self::of_native(name, ColumnData::Byte(values.to_vec()))
    }

    pub fn short(name: &str, values: &[i16]) -> Self {
        Self::of_native(name, ColumnData::Short(values.to_vec()))
    }

    pub fn int(name: &str, values: &[i32]) -> Self {
        Self::of_native(name, ColumnData::Int(values.to_vec()))
    }

    pub fn long(name: &str, values: &[i64]) -> Self {
        Self::of_native(name, ColumnData::Long(values.to_vec()))
    }

    pub fn float(name: &str, values: &[f32]) -> Self {
        Self::of_native(name, ColumnData::Float(values.to_vec()))
    }

    pub fn double(name: &str, values: &[f64]) -> Self {
        Self::of_native(name, ColumnData::Double(values.to_vec()))
    }

    pub fn string(name: &str, values: &[&str]) -> Self {
        Self::of_native(
            name,
            ColumnData::String(values.iter().map(|s| s.to_string()).collect()),
        )
    }

    pub fn character(name: &str, values: &[char]) -> Self {
        Self::of_native(name, ColumnData::Char(values.to_vec()))
    }

    pub fn boolean(name: &str, values: &[bool]) -> Self {
        Self::of_native(name, ColumnData::Boolean(values.to_vec()))
    }

    pub fn binary(name: &str, values: &[&[u8]]) -> Self {
        Self::of_native(
            name,
            ColumnData::Binary(values.iter().map(|b| b.to_vec()).collect()),
        )
    }

    pub fn byte_nullable(name: &str, values: &[Option<i8>]) -> Self {
        Self::of_options(name, ElementType::Byte, values, Value::Byte)
    }

    pub fn short_nullable(name: &str, values: &[Option<i16>]) -> Self {
        Self::of_options(name, ElementType::Short, values, Value::Short)
    }

    pub fn int_nullable(name: &str, values: &[Option<i32>]) -> Self {
        Self::of_options(name, ElementType::Int, values, Value::Int)
    }

    pub fn long_nullable(name: &str, values: &[Option<i64>]) -> Self {
        Self::of_options(name, ElementType::Long, values, Value::Long)
    }

    pub fn float_nullable(name: &str, values: &[Option<f32>]) -> Self {
        Self::of_options(name, ElementType::Float, values, Value::Float)
    }

    pub fn double_nullable(name: &str, values: &[Option<f64>]) -> Self {
        Self::of_options(name, ElementType::Double, values, Value::Double)
    }

    pub fn string_nullable(name: &str, values: &[Option<&str>]) -> Self {
        Self::of_options(name, ElementType::String, values, |x| {
            Value::String(x.to_string())
        })
    }

    pub fn character_nullable(name: &str, values: &[Option<char>]) -> Self {
        Self::of_options(name, ElementType::Char, values, Value::Char)
    }

    pub fn boolean_nullable(name: &str, values: &[Option<bool>]) -> Self {
        Self::of_options(name, ElementType::Boolean, values, Value::Boolean)
    }

    pub fn binary_nullable(name: &str, values: &[Option<&[u8]>]) -> Self {
        Self::of_options(name, ElementType::Binary, values, |x| {
            Value::Binary(x.to_vec())
        })
    }

    fn of_native(name: &str, data: ColumnData) -> Self {
        Self {
            name: Some(name.to_string()),
            data,
            nulls: None,
        }
    }

    fn of_options<T: Copy>(
        name: &str,
        kind: ElementType,
        values: &[Option<T>],
        make: impl Fn(T) -> Value,
    ) -> Self {
        let cells = values
            .iter()
            .map(|v| v.map(&make).unwrap_or(Value::Null))
            .collect();
        // cannot fail: every cell matches the kind
        Column::from_values(kind, true, Some(name), cells)
            .expect("native values conform to kind")
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(|n| n.to_string());
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    pub fn is_nullable(&self) -> bool {
        self.nulls.is_some()
    }

    /// Stable numeric identity of this `(kind, nullable)` variant.
    pub fn type_code(&self) -> u8 {
        self.element_type().type_code(self.is_nullable())
    }

    /// Canonical lowercase name, shared with the paired variant.
    pub fn type_name(&self) -> &'static str {
        self.element_type().type_name()
    }

    pub fn is_numeric(&self) -> bool {
        self.element_type().is_numeric()
    }

    pub fn default_value(&self) -> Value {
        self.element_type().default_value()
    }

    /// Length of the backing array.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capacity() == 0
    }

    fn check_bounds(&self, index: usize) -> Result<()> {
        if index >= self.capacity() {
            return Err(ColbaseError::IndexOutOfBounds {
                index,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Bounds-checked read. Absent slots read as [`Value::Null`].
    pub fn get(&self, index: usize) -> Result<Value> {
        self.check_bounds(index)?;
        Ok(self.cell(index))
    }

    /// Read used by table internals after their own bounds checks.
    #[inline]
    pub(crate) fn cell(&self, index: usize) -> Value {
        debug_assert!(index < self.capacity());
        if self.is_absent(index) {
            return Value::Null;
        }
        self.data.value_at(index)
    }

    /// Whether the slot holds the absent marker.
    #[inline]
    pub fn is_absent(&self, index: usize) -> bool {
        self.nulls.as_ref().map(|n| n.get(index)).unwrap_or(false)
    }

    /// Bounds-checked write with kind/range validation.
    ///
    /// Integer kinds accept any integer value that fits (overflow is an
    /// error); float kinds additionally accept integers, and `Double`
    /// accepts `Float`. `Null` is only accepted by nullable columns.
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        self.check_bounds(index)?;
        if value.is_null() {
            if let Some(nulls) = self.nulls.as_mut() {
                nulls.set(index, true);
                return Ok(());
            }
            return Err(ColbaseError::NullNotAllowed(format!(
                "column {} is not nullable",
                self.describe()
            )));
        }
        let coerced = self.coerce(value)?;
        self.data.store(index, coerced);
        if let Some(nulls) = self.nulls.as_mut() {
            nulls.set(index, false);
        }
        Ok(())
    }

    /// Validate a value against this column's kind, widening/narrowing
    /// integers with a range check. Does not accept `Null`.
    pub(crate) fn coerce(&self, value: Value) -> Result<Value> {
        let kind = self.element_type();
        // Exact-kind values pass straight through.
        let exact = matches!(
            (kind, &value),
            (ElementType::Byte, Value::Byte(_))
                | (ElementType::Short, Value::Short(_))
                | (ElementType::Int, Value::Int(_))
                | (ElementType::Long, Value::Long(_))
                | (ElementType::Float, Value::Float(_))
                | (ElementType::Double, Value::Double(_))
                | (ElementType::String, Value::String(_))
                | (ElementType::Char, Value::Char(_))
                | (ElementType::Boolean, Value::Boolean(_))
                | (ElementType::Binary, Value::Binary(_))
        );
        if exact {
            return Ok(value);
        }
        let as_integer = match &value {
            Value::Byte(v) => Some(*v as i64),
            Value::Short(v) => Some(*v as i64),
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            _ => None,
        };
        let widened = match (kind, as_integer, &value) {
            (ElementType::Byte, Some(v), _) => Some(self.narrow_integer(v, kind)?),
            (ElementType::Short, Some(v), _) => Some(self.narrow_integer(v, kind)?),
            (ElementType::Int, Some(v), _) => Some(self.narrow_integer(v, kind)?),
            (ElementType::Long, Some(v), _) => Some(Value::Long(v)),
            (ElementType::Float, Some(v), _) => Some(Value::Float(v as f32)),
            (ElementType::Double, Some(v), _) => Some(Value::Double(v as f64)),
            (ElementType::Double, None, Value::Float(v)) => Some(Value::Double(*v as f64)),
            _ => None,
        };
        widened.ok_or_else(|| {
            ColbaseError::TypeMismatch(format!(
                "column {} ({}) cannot store {:?}",
                self.describe(),
                kind.type_name(),
                value
            ))
        })
    }

    fn narrow_integer(&self, v: i64, kind: ElementType) -> Result<Value> {
        let out_of_range = || {
            ColbaseError::InvalidValue(format!(
                "value {} out of range for {}",
                v,
                kind.type_name()
            ))
        };
        Ok(match kind {
            ElementType::Byte => Value::Byte(i8::try_from(v).map_err(|_| out_of_range())?),
            ElementType::Short => Value::Short(i16::try_from(v).map_err(|_| out_of_range())?),
            _ => Value::Int(i32::try_from(v).map_err(|_| out_of_range())?),
        })
    }

    /// Whether a value could be stored into this column without error.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return self.is_nullable();
        }
        self.coerce(value.clone()).is_ok()
    }

    /// Shift slots at `index..` one right (dropping the last slot) and set
    /// `index`. Capacity is unchanged. Table-internal primitive.
    pub(crate) fn insert_at(&mut self, index: usize, value: Value) -> Result<()> {
        self.check_bounds(index)?;
        let last = self.capacity() - 1;
        self.data.truncate(last);
        self.data.insert_default_at(index);
        if let Some(nulls) = self.nulls.as_mut() {
            nulls.insert_at(index, true);
        }
        self.set(index, value)
    }

    /// Shift slots at `to..` left onto `from..`, filling the vacated tail
    /// with default (absent on nullable). Capacity unchanged.
    pub(crate) fn remove_range(&mut self, from: usize, to: usize) -> Result<()> {
        if from > to || to > self.capacity() {
            return Err(ColbaseError::IndexOutOfBounds {
                index: to,
                capacity: self.capacity(),
            });
        }
        let removed = to - from;
        self.data.drain(from, to);
        for _ in 0..removed {
            self.data.push_default();
        }
        if let Some(nulls) = self.nulls.as_mut() {
            nulls.remove_range(from, to, true);
        }
        Ok(())
    }

    /// Double the capacity (to 2 if empty), filling with default/absent.
    pub(crate) fn resize_double(&mut self) {
        let target = if self.capacity() == 0 { 2 } else { self.capacity() * 2 };
        self.match_length(target);
    }

    /// Truncate or extend to exactly `len`, preserving the prefix. New
    /// slots are default-filled (absent on nullable).
    pub(crate) fn match_length(&mut self, len: usize) {
        let current = self.capacity();
        if len < current {
            self.data.truncate(len);
        } else {
            for _ in current..len {
                self.data.push_default();
            }
        }
        if let Some(nulls) = self.nulls.as_mut() {
            nulls.match_length(len, true);
        }
    }

    /// Swap two slots, mask included. Table-internal primitive.
    #[inline]
    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        self.data.swap(a, b);
        if let Some(nulls) = self.nulls.as_mut() {
            nulls.swap(a, b);
        }
    }

    /// Structural + elementwise equality: same type code, same
    /// name-presence (equal names when both named), same capacity, equal
    /// values with NaN-equals-NaN semantics.
    pub fn equals(&self, other: &Column) -> bool {
        if self.type_code() != other.type_code() {
            return false;
        }
        match (&self.name, &other.name) {
            (Some(a), Some(b)) if a == b => {}
            (None, None) => {}
            _ => return false,
        }
        if self.capacity() != other.capacity() {
            return false;
        }
        (0..self.capacity()).all(|i| self.cell(i).equals(&other.cell(i)))
    }

    /// Structural clone: same kind, nullability and name, zero capacity.
    pub fn like(&self) -> Column {
        Column {
            name: self.name.clone(),
            data: ColumnData::empty(self.element_type()),
            nulls: self.nulls.as_ref().map(|_| BitVec::new()),
        }
    }

    fn describe(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<unnamed>".to_string())
    }
}

/// Shared handle to a [`Column`].
///
/// Cloning the handle aliases the same storage — the documented
/// caller-managed hazard when one column ends up in two tables.
/// [`detach`](ColumnRef::detach) produces an independent deep copy. `Rc`
/// keeps the whole structure single-threaded by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnRef(Rc<RefCell<Column>>);

impl ColumnRef {
    pub fn new(column: Column) -> Self {
        Self(Rc::new(RefCell::new(column)))
    }

    pub fn borrow(&self) -> Ref<'_, Column> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Column> {
        self.0.borrow_mut()
    }

    /// Independent deep copy of the underlying column.
    pub fn detach(&self) -> ColumnRef {
        ColumnRef::new(self.0.borrow().clone())
    }

    /// Whether two handles alias the same storage.
    pub fn ptr_eq(a: &ColumnRef, b: &ColumnRef) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl From<Column> for ColumnRef {
    fn from(column: Column) -> Self {
        ColumnRef::new(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip() {
        let mut col = Column::int("id", &[1, 2, 3]);
        assert_eq!(col.capacity(), 3);
        assert_eq!(col.get(1).unwrap(), Value::Int(2));
        col.set(1, Value::Int(20)).unwrap();
        assert_eq!(col.get(1).unwrap(), Value::Int(20));
    }

    #[test]
    fn test_bounds_checked() {
        let col = Column::int("id", &[1]);
        assert!(matches!(
            col.get(1),
            Err(ColbaseError::IndexOutOfBounds { index: 1, capacity: 1 })
        ));
    }

    #[test]
    fn test_null_rejected_on_default_variant() {
        let mut col = Column::string("name", &["a"]);
        assert!(matches!(
            col.set(0, Value::Null),
            Err(ColbaseError::NullNotAllowed(_))
        ));
    }

    #[test]
    fn test_nullable_set_and_clear_null() {
        let mut col = Column::int_nullable("v", &[Some(1), None]);
        assert!(col.is_absent(1));
        assert_eq!(col.get(1).unwrap(), Value::Null);
        col.set(1, Value::Int(7)).unwrap();
        assert!(!col.is_absent(1));
        col.set(0, Value::Null).unwrap();
        assert_eq!(col.get(0).unwrap(), Value::Null);
    }

    #[test]
    fn test_integer_narrowing_range_checked() {
        let mut col = Column::byte("b", &[0]);
        col.set(0, Value::Long(100)).unwrap();
        assert_eq!(col.get(0).unwrap(), Value::Byte(100));
        assert!(matches!(
            col.set(0, Value::Long(300)),
            Err(ColbaseError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let mut col = Column::boolean("ok", &[true]);
        assert!(matches!(
            col.set(0, Value::Int(1)),
            Err(ColbaseError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(Column::int("a", &[]).type_code(), 3);
        assert_eq!(Column::int_nullable("a", &[]).type_code(), 12);
        assert_eq!(Column::binary("a", &[]).type_code(), 19);
        assert_eq!(Column::binary_nullable("a", &[]).type_code(), 20);
        assert_eq!(Column::int_nullable("a", &[]).type_name(), "int");
    }

    #[test]
    fn test_clone_equals() {
        let col = Column::double_nullable("x", &[Some(1.5), None, Some(f64::NAN)]);
        let copy = col.clone();
        assert!(copy.equals(&col));
    }

    #[test]
    fn test_equals_name_presence() {
        let named = Column::int("a", &[1]);
        let mut unnamed = named.clone();
        unnamed.set_name(None);
        assert!(!named.equals(&unnamed));
        assert!(unnamed.equals(&unnamed.clone()));
    }

    #[test]
    fn test_insert_at_shifts() {
        let mut col = Column::int("v", &[1, 2, 3, 0]);
        col.insert_at(1, Value::Int(9)).unwrap();
        assert_eq!(col.get(0).unwrap(), Value::Int(1));
        assert_eq!(col.get(1).unwrap(), Value::Int(9));
        assert_eq!(col.get(2).unwrap(), Value::Int(2));
        assert_eq!(col.get(3).unwrap(), Value::Int(3));
        assert_eq!(col.capacity(), 4);
    }

    #[test]
    fn test_remove_range_fills_tail() {
        let mut col = Column::string("s", &["a", "b", "c"]);
        col.remove_range(0, 1).unwrap();
        assert_eq!(col.get(0).unwrap(), Value::String("b".into()));
        assert_eq!(col.get(1).unwrap(), Value::String("c".into()));
        assert_eq!(col.get(2).unwrap(), Value::String("n/a".into()));

        let mut nullable = Column::int_nullable("v", &[Some(1), Some(2), Some(3)]);
        nullable.remove_range(0, 2).unwrap();
        assert_eq!(nullable.get(0).unwrap(), Value::Int(3));
        assert!(nullable.is_absent(1));
        assert!(nullable.is_absent(2));
    }

    #[test]
    fn test_resize_double() {
        let mut col = Column::empty(ElementType::Int, false);
        col.resize_double();
        assert_eq!(col.capacity(), 2);
        col.resize_double();
        assert_eq!(col.capacity(), 4);
        assert_eq!(col.get(3).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_match_length() {
        let mut col = Column::int_nullable("v", &[Some(1), Some(2)]);
        col.match_length(4);
        assert_eq!(col.capacity(), 4);
        assert!(col.is_absent(3));
        col.match_length(1);
        assert_eq!(col.capacity(), 1);
        assert_eq!(col.get(0).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_column_ref_aliases() {
        let shared = ColumnRef::new(Column::int("v", &[1]));
        let alias = shared.clone();
        alias.borrow_mut().set(0, Value::Int(5)).unwrap();
        assert_eq!(shared.borrow().get(0).unwrap(), Value::Int(5));
        assert!(ColumnRef::ptr_eq(&shared, &alias));

        let detached = shared.detach();
        detached.borrow_mut().set(0, Value::Int(9)).unwrap();
        assert_eq!(shared.borrow().get(0).unwrap(), Value::Int(5));
    }
}
