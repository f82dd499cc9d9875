//! Binary codec
//!
//! Little-endian layout behind an eight-byte magic and a format version:
//! table flags, column count and row count, then one block per column
//! (optional name, type code, absent mask for nullable variants, payload).
//! Only the logical rows are serialized; capacity buffers are not. The
//! Base64 entry points wrap the same bytes as text.

use crate::data::column::Column;
use crate::data::{factory, ElementType, Value};
use crate::table::Table;
use crate::{ColbaseError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 8] = b"CBTABLE\0";
const FORMAT_VERSION: u16 = 1;

const FLAG_NULLABLE: u8 = 1;

/// Serialize a table to bytes.
pub fn to_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.write_all(MAGIC)?;
    buf.write_u16::<LittleEndian>(FORMAT_VERSION)?;
    buf.write_u8(if table.is_nullable() { FLAG_NULLABLE } else { 0 })?;
    buf.write_u32::<LittleEndian>(table.column_count() as u32)?;
    buf.write_u64::<LittleEndian>(table.rows() as u64)?;
    for position in 0..table.column_count() {
        let col = table.get_column(position)?;
        let col = col.borrow();
        write_column(&mut buf, &col, table.rows())?;
    }
    Ok(buf)
}

/// Deserialize a table from bytes produced by [`to_bytes`].
pub fn from_bytes(bytes: &[u8]) -> Result<Table> {
    let mut rdr = Cursor::new(bytes);
    let mut magic = [0u8; 8];
    rdr.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(ColbaseError::Format("bad magic bytes".to_string()));
    }
    let version = rdr.read_u16::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(ColbaseError::Format(format!(
            "unsupported format version {}",
            version
        )));
    }
    let flags = rdr.read_u8()?;
    let nullable = flags & FLAG_NULLABLE != 0;
    let column_count = rdr.read_u32::<LittleEndian>()? as usize;
    let rows = rdr.read_u64::<LittleEndian>()? as usize;

    let mut columns = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        let col = read_column(&mut rdr, rows, nullable)?;
        columns.push(col);
    }
    Table::from_columns(columns, nullable)
}

/// Base64 text form of [`to_bytes`].
pub fn to_base64(table: &Table) -> Result<String> {
    Ok(STANDARD.encode(to_bytes(table)?))
}

/// Decode a table from its Base64 text form.
pub fn from_base64(text: &str) -> Result<Table> {
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| ColbaseError::Format(format!("bad base64 payload: {}", e)))?;
    from_bytes(&bytes)
}

pub fn save_file(table: &Table, path: &Path) -> Result<()> {
    std::fs::write(path, to_bytes(table)?)?;
    Ok(())
}

pub fn load_file(path: &Path) -> Result<Table> {
    from_bytes(&std::fs::read(path)?)
}

fn write_column(buf: &mut Vec<u8>, col: &Column, rows: usize) -> Result<()> {
    match col.name() {
        Some(name) => {
            buf.write_u8(1)?;
            buf.write_u32::<LittleEndian>(name.len() as u32)?;
            buf.write_all(name.as_bytes())?;
        }
        None => buf.write_u8(0)?,
    }
    buf.write_u8(col.type_code())?;

    if col.is_nullable() {
        let mut mask = vec![0u8; (rows + 7) / 8];
        for row in 0..rows {
            if col.is_absent(row) {
                mask[row / 8] |= 1 << (row % 8);
            }
        }
        buf.write_all(&mask)?;
    }

    let kind = col.element_type();
    if kind == ElementType::Boolean {
        let mut bits = vec![0u8; (rows + 7) / 8];
        for row in 0..rows {
            if let Value::Boolean(true) = payload_cell(col, row) {
                bits[row / 8] |= 1 << (row % 8);
            }
        }
        buf.write_all(&bits)?;
        return Ok(());
    }
    for row in 0..rows {
        match payload_cell(col, row) {
            Value::Byte(v) => buf.write_i8(v)?,
            Value::Short(v) => buf.write_i16::<LittleEndian>(v)?,
            Value::Int(v) => buf.write_i32::<LittleEndian>(v)?,
            Value::Long(v) => buf.write_i64::<LittleEndian>(v)?,
            Value::Float(v) => buf.write_f32::<LittleEndian>(v)?,
            Value::Double(v) => buf.write_f64::<LittleEndian>(v)?,
            Value::Char(v) => buf.write_u32::<LittleEndian>(v as u32)?,
            Value::String(v) => {
                buf.write_u32::<LittleEndian>(v.len() as u32)?;
                buf.write_all(v.as_bytes())?;
            }
            Value::Binary(v) => {
                buf.write_u32::<LittleEndian>(v.len() as u32)?;
                buf.write_all(&v)?;
            }
            Value::Boolean(_) | Value::Null => unreachable!("handled above"),
        }
    }
    Ok(())
}

/// Cell written into the payload: absent slots write the kind default so
/// every row has a fixed shape (the mask restores the absence on read).
fn payload_cell(col: &Column, row: usize) -> Value {
    match col.get(row) {
        Ok(Value::Null) | Err(_) => col.default_value(),
        Ok(v) => v,
    }
}

fn read_column(rdr: &mut Cursor<&[u8]>, rows: usize, table_nullable: bool) -> Result<Column> {
    let named = rdr.read_u8()? == 1;
    let name = if named {
        let len = rdr.read_u32::<LittleEndian>()? as usize;
        let mut bytes = vec![0u8; len];
        rdr.read_exact(&mut bytes)?;
        Some(String::from_utf8(bytes).map_err(|_| {
            ColbaseError::Format("column name is not valid UTF-8".to_string())
        })?)
    } else {
        None
    };
    let code = rdr.read_u8()?;
    let mut col = factory::column_for_code(code)
        .map_err(|_| ColbaseError::Format(format!("unknown type code {}", code)))?;
    if col.is_nullable() != table_nullable {
        return Err(ColbaseError::Format(format!(
            "type code {} does not match table nullability",
            code
        )));
    }
    col.set_name(name.as_deref());
    col.match_length(rows);

    let mask = if col.is_nullable() {
        let mut mask = vec![0u8; (rows + 7) / 8];
        rdr.read_exact(&mut mask)?;
        Some(mask)
    } else {
        None
    };
    let absent =
        |row: usize| mask.as_ref().map(|m| m[row / 8] >> (row % 8) & 1 == 1).unwrap_or(false);

    let kind = col.element_type();
    if kind == ElementType::Boolean {
        let mut bits = vec![0u8; (rows + 7) / 8];
        rdr.read_exact(&mut bits)?;
        for row in 0..rows {
            if absent(row) {
                continue;
            }
            let v = bits[row / 8] >> (row % 8) & 1 == 1;
            col.set(row, Value::Boolean(v))?;
        }
        return Ok(col);
    }
    for row in 0..rows {
        let value = match kind {
            ElementType::Byte => Value::Byte(rdr.read_i8()?),
            ElementType::Short => Value::Short(rdr.read_i16::<LittleEndian>()?),
            ElementType::Int => Value::Int(rdr.read_i32::<LittleEndian>()?),
            ElementType::Long => Value::Long(rdr.read_i64::<LittleEndian>()?),
            ElementType::Float => Value::Float(rdr.read_f32::<LittleEndian>()?),
            ElementType::Double => Value::Double(rdr.read_f64::<LittleEndian>()?),
            ElementType::Char => {
                let raw = rdr.read_u32::<LittleEndian>()?;
                Value::Char(char::from_u32(raw).ok_or_else(|| {
                    ColbaseError::Format(format!("invalid char code point {}", raw))
                })?)
            }
            ElementType::String => {
                let len = rdr.read_u32::<LittleEndian>()? as usize;
                let mut bytes = vec![0u8; len];
                rdr.read_exact(&mut bytes)?;
                Value::String(String::from_utf8(bytes).map_err(|_| {
                    ColbaseError::Format("string cell is not valid UTF-8".to_string())
                })?)
            }
            ElementType::Binary => {
                let len = rdr.read_u32::<LittleEndian>()? as usize;
                let mut bytes = vec![0u8; len];
                rdr.read_exact(&mut bytes)?;
                Value::Binary(bytes)
            }
            ElementType::Boolean => unreachable!("handled above"),
        };
        if !absent(row) {
            col.set(row, value)?;
        }
    }
    Ok(col)
}
