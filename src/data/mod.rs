//! Element kinds, type codes and cell values

pub mod bitvec;
pub mod column;
pub mod convert;
pub mod factory;

use serde::{Deserialize, Serialize};

pub use bitvec::BitVec;
pub use column::{Column, ColumnRef};

// Type code layout: the nine non-binary kinds take 1..=9 with their nullable
// counterparts at +9; binary sits past that block, so its nullable
// counterpart is only +1 away.
const CODE_BYTE: u8 = 1;
const CODE_SHORT: u8 = 2;
const CODE_INT: u8 = 3;
const CODE_LONG: u8 = 4;
const CODE_FLOAT: u8 = 5;
const CODE_DOUBLE: u8 = 6;
const CODE_STRING: u8 = 7;
const CODE_CHAR: u8 = 8;
const CODE_BOOLEAN: u8 = 9;
const NULLABLE_OFFSET: u8 = 9;
const CODE_BINARY: u8 = 19;
const CODE_BINARY_NULLABLE: u8 = 20;

/// Default string value used to fill non-nullable gaps.
pub const STRING_DEFAULT: &str = "n/a";

/// Display text of an absent cell, as seen by the regex layer.
pub const NULL_TEXT: &str = "None";

/// One of the ten element kinds a column can hold.
///
/// A concrete column variant is a `(ElementType, nullable)` pair; the pair
/// maps to one of 20 stable type codes via [`ElementType::type_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Char,
    Boolean,
    Binary,
}

impl ElementType {
    /// All kinds, in type-code order.
    pub const ALL: [ElementType; 10] = [
        ElementType::Byte,
        ElementType::Short,
        ElementType::Int,
        ElementType::Long,
        ElementType::Float,
        ElementType::Double,
        ElementType::String,
        ElementType::Char,
        ElementType::Boolean,
        ElementType::Binary,
    ];

    /// Stable numeric identity of the `(kind, nullable)` variant.
    pub fn type_code(&self, nullable: bool) -> u8 {
        let base = match self {
            ElementType::Byte => CODE_BYTE,
            ElementType::Short => CODE_SHORT,
            ElementType::Int => CODE_INT,
            ElementType::Long => CODE_LONG,
            ElementType::Float => CODE_FLOAT,
            ElementType::Double => CODE_DOUBLE,
            ElementType::String => CODE_STRING,
            ElementType::Char => CODE_CHAR,
            ElementType::Boolean => CODE_BOOLEAN,
            ElementType::Binary => CODE_BINARY,
        };
        match (self, nullable) {
            (_, false) => base,
            (ElementType::Binary, true) => CODE_BINARY_NULLABLE,
            (_, true) => base + NULLABLE_OFFSET,
        }
    }

    /// Decode a type code back into `(kind, nullable)`.
    pub fn from_code(code: u8) -> Option<(ElementType, bool)> {
        let decoded = match code {
            CODE_BYTE => (ElementType::Byte, false),
            CODE_SHORT => (ElementType::Short, false),
            CODE_INT => (ElementType::Int, false),
            CODE_LONG => (ElementType::Long, false),
            CODE_FLOAT => (ElementType::Float, false),
            CODE_DOUBLE => (ElementType::Double, false),
            CODE_STRING => (ElementType::String, false),
            CODE_CHAR => (ElementType::Char, false),
            CODE_BOOLEAN => (ElementType::Boolean, false),
            CODE_BINARY => (ElementType::Binary, false),
            CODE_BINARY_NULLABLE => (ElementType::Binary, true),
            c if (CODE_BYTE + NULLABLE_OFFSET..=CODE_BOOLEAN + NULLABLE_OFFSET).contains(&c) => {
                let (kind, _) = ElementType::from_code(c - NULLABLE_OFFSET)?;
                (kind, true)
            }
            _ => return None,
        };
        Some(decoded)
    }

    /// Canonical lowercase name, shared by the nullable and default variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementType::Byte => "byte",
            ElementType::Short => "short",
            ElementType::Int => "int",
            ElementType::Long => "long",
            ElementType::Float => "float",
            ElementType::Double => "double",
            ElementType::String => "string",
            ElementType::Char => "char",
            ElementType::Boolean => "boolean",
            ElementType::Binary => "binary",
        }
    }

    /// Look a kind up by its canonical name.
    pub fn from_name(name: &str) -> Option<ElementType> {
        ElementType::ALL.iter().copied().find(|t| t.type_name() == name)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ElementType::Byte
                | ElementType::Short
                | ElementType::Int
                | ElementType::Long
                | ElementType::Float
                | ElementType::Double
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ElementType::Byte | ElementType::Short | ElementType::Int | ElementType::Long
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::Float | ElementType::Double)
    }

    /// Fill value for non-nullable gaps.
    pub fn default_value(&self) -> Value {
        match self {
            ElementType::Byte => Value::Byte(0),
            ElementType::Short => Value::Short(0),
            ElementType::Int => Value::Int(0),
            ElementType::Long => Value::Long(0),
            ElementType::Float => Value::Float(0.0),
            ElementType::Double => Value::Double(0.0),
            ElementType::String => Value::String(STRING_DEFAULT.to_string()),
            ElementType::Char => Value::Char('\0'),
            ElementType::Boolean => Value::Boolean(false),
            ElementType::Binary => Value::Binary(vec![0]),
        }
    }
}

/// Owned cell value.
///
/// `Null` is the absent marker; it is only ever observed in nullable
/// columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Char(char),
    Boolean(bool),
    Binary(Vec<u8>),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Element kind this value belongs to; `None` for the absent marker.
    pub fn element_type(&self) -> Option<ElementType> {
        match self {
            Value::Null => None,
            Value::Byte(_) => Some(ElementType::Byte),
            Value::Short(_) => Some(ElementType::Short),
            Value::Int(_) => Some(ElementType::Int),
            Value::Long(_) => Some(ElementType::Long),
            Value::Float(_) => Some(ElementType::Float),
            Value::Double(_) => Some(ElementType::Double),
            Value::String(_) => Some(ElementType::String),
            Value::Char(_) => Some(ElementType::Char),
            Value::Boolean(_) => Some(ElementType::Boolean),
            Value::Binary(_) => Some(ElementType::Binary),
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Byte(v) => Some(*v as f64),
            Value::Short(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Display text used by the regex layer and by CSV output.
    ///
    /// Absence renders as `"None"`, float NaN as `"NaN"` (the normalization
    /// target of pattern matching), binary as lowercase hex.
    pub fn display_text(&self) -> String {
        match self {
            Value::Null => NULL_TEXT.to_string(),
            Value::Byte(v) => v.to_string(),
            Value::Short(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::String(v) => v.clone(),
            Value::Char(v) => v.to_string(),
            Value::Boolean(v) => v.to_string(),
            Value::Binary(v) => convert::to_hex(v),
        }
    }

    /// Equality with NaN-equals-NaN semantics for the float kinds.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Double(a), Value::Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self == other,
        }
    }

    /// Feed the value into a hasher, bit-casting floats so that equal values
    /// (including NaN under [`Value::equals`]) hash alike.
    pub fn hash_into<H: std::hash::Hasher>(&self, state: &mut H) {
        use std::hash::Hash;
        match self {
            Value::Null => 0u8.hash(state),
            Value::Byte(v) => (1u8, v).hash(state),
            Value::Short(v) => (2u8, v).hash(state),
            Value::Int(v) => (3u8, v).hash(state),
            Value::Long(v) => (4u8, v).hash(state),
            Value::Float(v) => {
                let bits = if v.is_nan() { f32::NAN.to_bits() } else { v.to_bits() };
                (5u8, bits).hash(state)
            }
            Value::Double(v) => {
                let bits = if v.is_nan() { f64::NAN.to_bits() } else { v.to_bits() };
                (6u8, bits).hash(state)
            }
            Value::String(v) => (7u8, v).hash(state),
            Value::Char(v) => (8u8, v).hash(state),
            Value::Boolean(v) => (9u8, v).hash(state),
            Value::Binary(v) => (10u8, v).hash(state),
        }
    }
}
