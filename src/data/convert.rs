//! Kind-to-kind cell conversion
//!
//! One exhaustive matrix drives [`Column::convert_to`], text parsing for
//! the CSV boundary, and the fixed-width binary encodings. Numeric widening
//! is exact; narrowing is range-checked; text forms are the canonical
//! decimal/`true`/`false`/hex spellings produced by
//! [`Value::display_text`].

use crate::data::column::Column;
use crate::data::{ElementType, Value};
use crate::{ColbaseError, Result};

/// Lowercase hex encoding of a byte string.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Decode a hex string (case-insensitive, even length).
pub fn from_hex(text: &str) -> Result<Vec<u8>> {
    if text.len() % 2 != 0 {
        return Err(ColbaseError::Conversion(format!(
            "hex string has odd length: {:?}",
            text
        )));
    }
    let digits = text.as_bytes();
    let mut out = Vec::with_capacity(text.len() / 2);
    for pair in digits.chunks(2) {
        let hi = (pair[0] as char).to_digit(16);
        let lo = (pair[1] as char).to_digit(16);
        match (hi, lo) {
            (Some(h), Some(l)) => out.push((h * 16 + l) as u8),
            _ => {
                return Err(ColbaseError::Conversion(format!(
                    "invalid hex string: {:?}",
                    text
                )))
            }
        }
    }
    Ok(out)
}

/// Parse boolean text: `{true,t,1,yes,y,on}` / `{false,f,0,no,n,off}`,
/// case-insensitive.
pub fn parse_boolean(text: &str) -> Result<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" | "on" => Ok(true),
        "false" | "f" | "0" | "no" | "n" | "off" => Ok(false),
        _ => Err(ColbaseError::Conversion(format!(
            "cannot parse {:?} as boolean",
            text
        ))),
    }
}

/// Parse a text field into a cell of the given kind.
pub fn parse_cell(kind: ElementType, text: &str) -> Result<Value> {
    let bad = |what: &str| {
        ColbaseError::Conversion(format!("cannot parse {:?} as {}", text, what))
    };
    match kind {
        ElementType::Byte => text
            .parse::<i8>()
            .map(Value::Byte)
            .map_err(|_| bad("byte")),
        ElementType::Short => text
            .parse::<i16>()
            .map(Value::Short)
            .map_err(|_| bad("short")),
        ElementType::Int => text.parse::<i32>().map(Value::Int).map_err(|_| bad("int")),
        ElementType::Long => text
            .parse::<i64>()
            .map(Value::Long)
            .map_err(|_| bad("long")),
        ElementType::Float => text
            .parse::<f32>()
            .map(Value::Float)
            .map_err(|_| bad("float")),
        ElementType::Double => text
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| bad("double")),
        ElementType::String => Ok(Value::String(text.to_string())),
        ElementType::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(bad("char")),
            }
        }
        ElementType::Boolean => parse_boolean(text).map(Value::Boolean),
        ElementType::Binary => from_hex(text).map(Value::Binary),
    }
}

/// Fixed-width big-endian byte encoding of a numeric/boolean cell.
fn to_bytes(value: &Value) -> Vec<u8> {
    match value {
        Value::Byte(v) => v.to_be_bytes().to_vec(),
        Value::Short(v) => v.to_be_bytes().to_vec(),
        Value::Int(v) => v.to_be_bytes().to_vec(),
        Value::Long(v) => v.to_be_bytes().to_vec(),
        Value::Float(v) => v.to_be_bytes().to_vec(),
        Value::Double(v) => v.to_be_bytes().to_vec(),
        Value::Boolean(v) => vec![*v as u8],
        Value::Char(v) => {
            let mut buf = [0u8; 4];
            v.encode_utf8(&mut buf).as_bytes().to_vec()
        }
        _ => unreachable!("to_bytes on non-scalar value"),
    }
}

/// Inverse of [`to_bytes`]: decode a fixed-width big-endian byte string.
fn from_bytes(kind: ElementType, bytes: &[u8]) -> Result<Value> {
    let wrong_width = |want: usize| {
        ColbaseError::Conversion(format!(
            "binary value of {} bytes does not decode as {} ({} expected)",
            bytes.len(),
            kind.type_name(),
            want
        ))
    };
    let fixed = |want: usize| -> Result<&[u8]> {
        if bytes.len() == want {
            Ok(bytes)
        } else {
            Err(wrong_width(want))
        }
    };
    match kind {
        ElementType::Byte => Ok(Value::Byte(i8::from_be_bytes(fixed(1)?.try_into().unwrap()))),
        ElementType::Short => Ok(Value::Short(i16::from_be_bytes(
            fixed(2)?.try_into().unwrap(),
        ))),
        ElementType::Int => Ok(Value::Int(i32::from_be_bytes(fixed(4)?.try_into().unwrap()))),
        ElementType::Long => Ok(Value::Long(i64::from_be_bytes(
            fixed(8)?.try_into().unwrap(),
        ))),
        ElementType::Float => Ok(Value::Float(f32::from_be_bytes(
            fixed(4)?.try_into().unwrap(),
        ))),
        ElementType::Double => Ok(Value::Double(f64::from_be_bytes(
            fixed(8)?.try_into().unwrap(),
        ))),
        ElementType::Boolean => match fixed(1)?[0] {
            0 => Ok(Value::Boolean(false)),
            1 => Ok(Value::Boolean(true)),
            b => Err(ColbaseError::Conversion(format!(
                "byte 0x{:02x} does not decode as boolean",
                b
            ))),
        },
        ElementType::Char => {
            let text = std::str::from_utf8(bytes).map_err(|_| {
                ColbaseError::Conversion("binary value is not UTF-8 char data".to_string())
            })?;
            parse_cell(ElementType::Char, text)
        }
        _ => unreachable!("from_bytes on non-scalar kind"),
    }
}

/// Convert one non-absent cell to the target kind.
pub fn convert_value(value: &Value, target: ElementType) -> Result<Value> {
    debug_assert!(!value.is_null());
    let source = value.element_type().expect("non-null value");
    if source == target {
        return Ok(value.clone());
    }
    let fail = || {
        ColbaseError::Conversion(format!(
            "cannot convert {} value {:?} to {}",
            source.type_name(),
            value,
            target.type_name()
        ))
    };
    match target {
        // Numeric targets: exact widening, range-checked narrowing; text
        // and char parse; binary decodes fixed-width big-endian.
        ElementType::Byte
        | ElementType::Short
        | ElementType::Int
        | ElementType::Long
        | ElementType::Float
        | ElementType::Double => match value {
            Value::Byte(_)
            | Value::Short(_)
            | Value::Int(_)
            | Value::Long(_)
            | Value::Float(_)
            | Value::Double(_) => numeric_to_numeric(value, target),
            Value::String(s) => parse_cell(target, s),
            Value::Char(c) => parse_cell(target, &c.to_string()),
            Value::Boolean(b) => numeric_to_numeric(&Value::Byte(*b as i8), target),
            Value::Binary(b) => from_bytes(target, b),
            Value::Null => unreachable!(),
        },
        ElementType::String => match value {
            Value::Binary(b) => Ok(Value::String(to_hex(b))),
            _ => Ok(Value::String(value.display_text())),
        },
        ElementType::Char => match value {
            Value::Binary(b) => from_bytes(ElementType::Char, b),
            _ => parse_cell(ElementType::Char, &value.display_text()),
        },
        ElementType::Boolean => match value {
            Value::String(s) => parse_cell(ElementType::Boolean, s),
            Value::Char(c) => parse_cell(ElementType::Boolean, &c.to_string()),
            Value::Binary(b) => from_bytes(ElementType::Boolean, b),
            Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_) => {
                match value.as_f64().unwrap() as i64 {
                    0 => Ok(Value::Boolean(false)),
                    1 => Ok(Value::Boolean(true)),
                    _ => Err(fail()),
                }
            }
            _ => Err(fail()),
        },
        ElementType::Binary => match value {
            Value::String(s) => from_hex(s).map(Value::Binary),
            Value::Byte(_)
            | Value::Short(_)
            | Value::Int(_)
            | Value::Long(_)
            | Value::Float(_)
            | Value::Double(_)
            | Value::Boolean(_)
            | Value::Char(_) => Ok(Value::Binary(to_bytes(value))),
            Value::Null => unreachable!(),
            Value::Binary(_) => unreachable!("identity handled above"),
        },
    }
}

fn numeric_to_numeric(value: &Value, target: ElementType) -> Result<Value> {
    let fail = |detail: &str| {
        ColbaseError::Conversion(format!(
            "numeric value {:?} does not fit {}: {}",
            value,
            target.type_name(),
            detail
        ))
    };
    if target.is_float() {
        let v = value.as_f64().unwrap();
        return Ok(match target {
            ElementType::Float => Value::Float(v as f32),
            _ => Value::Double(v),
        });
    }
    // Integer target: floats truncate toward zero, NaN/inf rejected.
    let wide: i64 = match value {
        Value::Byte(v) => *v as i64,
        Value::Short(v) => *v as i64,
        Value::Int(v) => *v as i64,
        Value::Long(v) => *v,
        Value::Float(v) => {
            if !v.is_finite() {
                return Err(fail("not finite"));
            }
            v.trunc() as i64
        }
        Value::Double(v) => {
            if !v.is_finite() {
                return Err(fail("not finite"));
            }
            v.trunc() as i64
        }
        _ => unreachable!(),
    };
    match target {
        ElementType::Byte => i8::try_from(wide)
            .map(Value::Byte)
            .map_err(|_| fail("out of range")),
        ElementType::Short => i16::try_from(wide)
            .map(Value::Short)
            .map_err(|_| fail("out of range")),
        ElementType::Int => i32::try_from(wide)
            .map(Value::Int)
            .map_err(|_| fail("out of range")),
        ElementType::Long => Ok(Value::Long(wide)),
        _ => unreachable!(),
    }
}

impl Column {
    /// Produce a new column of the requested kind and nullability holding
    /// converted values.
    ///
    /// Converting nullable→non-nullable substitutes the target default for
    /// absent slots; non-nullable→nullable never introduces absences.
    pub fn convert_to(&self, kind: ElementType, nullable: bool) -> Result<Column> {
        let mut out = Column::empty(kind, nullable);
        out.set_name(self.name());
        out.match_length(self.capacity());
        for i in 0..self.capacity() {
            let cell = self.cell(i);
            match cell {
                Value::Null => {
                    if nullable {
                        out.set(i, Value::Null)?;
                    }
                    // non-nullable target keeps the default fill
                }
                v => out.set(i, convert_value(&v, kind)?)?,
            }
        }
        Ok(out)
    }

    /// This column as the nullable variant of its kind (identity clone if
    /// already nullable).
    pub fn as_nullable(&self) -> Result<Column> {
        if self.is_nullable() {
            return Ok(self.clone());
        }
        self.convert_to(self.element_type(), true)
    }

    /// This column as the non-nullable variant of its kind, absences
    /// replaced by the kind default.
    pub fn as_default(&self) -> Result<Column> {
        if !self.is_nullable() {
            return Ok(self.clone());
        }
        self.convert_to(self.element_type(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let bytes = vec![0x00, 0xff, 0xa5];
        assert_eq!(to_hex(&bytes), "00ffa5");
        assert_eq!(from_hex("00ffa5").unwrap(), bytes);
        assert_eq!(from_hex("00FFA5").unwrap(), bytes);
        assert!(from_hex("0f0").is_err());
        assert!(from_hex("zz").is_err());
    }

    #[test]
    fn test_parse_boolean_sets() {
        for t in ["true", "T", "1", "YES", "y", "on"] {
            assert_eq!(parse_boolean(t).unwrap(), true);
        }
        for f in ["false", "F", "0", "no", "N", "OFF"] {
            assert_eq!(parse_boolean(f).unwrap(), false);
        }
        assert!(parse_boolean("maybe").is_err());
    }

    #[test]
    fn test_numeric_widening_exact() {
        assert_eq!(
            convert_value(&Value::Byte(-7), ElementType::Long).unwrap(),
            Value::Long(-7)
        );
        assert_eq!(
            convert_value(&Value::Int(3), ElementType::Double).unwrap(),
            Value::Double(3.0)
        );
    }

    #[test]
    fn test_numeric_narrowing_checked() {
        assert_eq!(
            convert_value(&Value::Long(127), ElementType::Byte).unwrap(),
            Value::Byte(127)
        );
        assert!(convert_value(&Value::Long(128), ElementType::Byte).is_err());
        assert!(convert_value(&Value::Double(f64::NAN), ElementType::Int).is_err());
        assert_eq!(
            convert_value(&Value::Double(-3.9), ElementType::Int).unwrap(),
            Value::Int(-3)
        );
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!(
            convert_value(&Value::Int(42), ElementType::String).unwrap(),
            Value::String("42".into())
        );
        assert_eq!(
            convert_value(&Value::String("42".into()), ElementType::Int).unwrap(),
            Value::Int(42)
        );
        assert!(convert_value(&Value::String("4x".into()), ElementType::Int).is_err());
        assert_eq!(
            convert_value(&Value::String("on".into()), ElementType::Boolean).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_char_conversions() {
        assert_eq!(
            convert_value(&Value::Char('7'), ElementType::Int).unwrap(),
            Value::Int(7)
        );
        assert_eq!(
            convert_value(&Value::Int(7), ElementType::Char).unwrap(),
            Value::Char('7')
        );
        assert!(convert_value(&Value::Int(42), ElementType::Char).is_err());
    }

    #[test]
    fn test_binary_big_endian() {
        assert_eq!(
            convert_value(&Value::Int(0x0102_0304), ElementType::Binary).unwrap(),
            Value::Binary(vec![1, 2, 3, 4])
        );
        assert_eq!(
            convert_value(&Value::Binary(vec![1, 2, 3, 4]), ElementType::Int).unwrap(),
            Value::Int(0x0102_0304)
        );
        assert_eq!(
            convert_value(&Value::Short(-2), ElementType::Binary).unwrap(),
            Value::Binary(vec![0xff, 0xfe])
        );
        // wrong width
        assert!(convert_value(&Value::Binary(vec![1, 2]), ElementType::Int).is_err());
    }

    #[test]
    fn test_binary_string_hex() {
        assert_eq!(
            convert_value(&Value::Binary(vec![0xde, 0xad]), ElementType::String).unwrap(),
            Value::String("dead".into())
        );
        assert_eq!(
            convert_value(&Value::String("dead".into()), ElementType::Binary).unwrap(),
            Value::Binary(vec![0xde, 0xad])
        );
    }

    #[test]
    fn test_column_convert_nullable_substitution() {
        let col = Column::int_nullable("v", &[Some(1), None, Some(3)]);
        let plain = col.as_default().unwrap();
        assert!(!plain.is_nullable());
        assert_eq!(plain.get(1).unwrap(), Value::Int(0));

        let back = plain.as_nullable().unwrap();
        assert!(back.is_nullable());
        assert_eq!(back.get(1).unwrap(), Value::Int(0));
        assert_eq!(back.get(2).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_column_convert_kind() {
        let col = Column::int("v", &[1, 2]);
        let text = col.convert_to(ElementType::String, false).unwrap();
        assert_eq!(text.get(0).unwrap(), Value::String("1".into()));
        assert_eq!(text.type_name(), "string");
        assert_eq!(text.name(), Some("v"));
    }
}
