//! CSV codec
//!
//! Separator-aware reading and writing with double-quote escaping. A field
//! equal to the literal `null` is the absent marker; on write, fields
//! containing the separator, a quote or a newline are wrapped in double
//! quotes with inner quotes doubled. Cell construction dispatches over the
//! nine non-binary type names.

use crate::data::factory;
use crate::table::Table;
use crate::{ColbaseError, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Literal text standing for an absent cell.
const NULL_FIELD: &str = "null";

/// Write a table as CSV. With `header`, the first record carries the
/// column names (unnamed columns write an empty field).
pub fn write_csv<W: Write>(
    table: &Table,
    writer: &mut W,
    separator: char,
    header: bool,
) -> Result<()> {
    if header {
        let names: Vec<String> = table
            .column_names()
            .into_iter()
            .map(|n| escape_field(&n.unwrap_or_default(), separator))
            .collect();
        writeln!(writer, "{}", names.join(&separator.to_string()))?;
    }
    for row in 0..table.rows() {
        let mut fields = Vec::with_capacity(table.column_count());
        for col in 0..table.column_count() {
            let value = table.get_value(col, row)?;
            let text = if value.is_null() {
                NULL_FIELD.to_string()
            } else {
                value.display_text()
            };
            fields.push(escape_field(&text, separator));
        }
        writeln!(writer, "{}", fields.join(&separator.to_string()))?;
    }
    Ok(())
}

/// CSV text of the whole table.
pub fn to_csv_string(table: &Table, separator: char, header: bool) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf, separator, header)?;
    Ok(String::from_utf8(buf).expect("csv output is utf-8"))
}

pub fn write_csv_file(
    table: &Table,
    path: &Path,
    separator: char,
    header: bool,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_csv(table, &mut writer, separator, header)?;
    writer.flush()?;
    Ok(())
}

/// Read CSV into a table. `type_names` fixes the column count and the cell
/// type of each column (the nine non-binary type names); with `header`,
/// the first record names the columns.
pub fn read_csv<R: Read>(
    reader: &mut R,
    type_names: &[&str],
    separator: char,
    header: bool,
    nullable: bool,
) -> Result<Table> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    from_csv_string(&text, type_names, separator, header, nullable)
}

pub fn read_csv_file(
    path: &Path,
    type_names: &[&str],
    separator: char,
    header: bool,
    nullable: bool,
) -> Result<Table> {
    let mut reader = BufReader::new(File::open(path)?);
    read_csv(&mut reader, type_names, separator, header, nullable)
}

/// Parse CSV text into a table.
pub fn from_csv_string(
    text: &str,
    type_names: &[&str],
    separator: char,
    header: bool,
    nullable: bool,
) -> Result<Table> {
    let mut table = Table::new(nullable);
    for name in type_names {
        table.add_column(factory::column_for_name(name, nullable)?)?;
    }

    let mut records = split_records(text, separator)?.into_iter();
    if header {
        let names = records.next().ok_or_else(|| {
            ColbaseError::Format("csv input is missing the header record".to_string())
        })?;
        if names.len() != type_names.len() {
            return Err(ColbaseError::Format(format!(
                "header has {} fields, {} types given",
                names.len(),
                type_names.len()
            )));
        }
        let names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        table.set_column_names(&names)?;
    }

    for (line, record) in records.enumerate() {
        // blank line
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() != type_names.len() {
            return Err(ColbaseError::Format(format!(
                "record {} has {} fields, expected {}",
                line + 1,
                record.len(),
                type_names.len()
            )));
        }
        let mut row = Vec::with_capacity(record.len());
        for (field, type_name) in record.iter().zip(type_names) {
            if field == NULL_FIELD {
                row.push(if nullable {
                    crate::data::Value::Null
                } else {
                    crate::data::ElementType::from_name(type_name)
                        .expect("validated by column_for_name")
                        .default_value()
                });
            } else {
                row.push(factory::parse_typed_cell(type_name, field)?);
            }
        }
        table.add_row(row)?;
    }
    Ok(table)
}

fn escape_field(field: &str, separator: char) -> String {
    if field.contains(separator) || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split text into records of fields, honoring double-quoted fields
/// (which may contain the separator, doubled quotes and newlines).
fn split_records(text: &str, separator: char) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut any = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if quoted {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    quoted = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => quoted = true,
            '\r' => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut fields));
                any = false;
            }
            c if c == separator => {
                fields.push(std::mem::take(&mut field));
                any = true;
            }
            c => {
                field.push(c);
                any = true;
            }
        }
    }
    if quoted {
        return Err(ColbaseError::Format(
            "csv input ends inside a quoted field".to_string(),
        ));
    }
    if any || !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push(fields);
    }
    Ok(records)
}
