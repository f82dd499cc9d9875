//! Directory-keyed bulk table I/O
//!
//! One binary file per table under one directory, file stem = table name.

use crate::io::binary;
use crate::table::Table;
use crate::Result;
use log::info;
use std::collections::BTreeMap;
use std::path::Path;

/// File extension used for serialized tables.
pub const TABLE_EXTENSION: &str = "cbt";

/// Write every table of the map as `<name>.cbt` under `dir`, creating the
/// directory if needed.
pub fn save_dir(tables: &BTreeMap<String, Table>, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for (name, table) in tables {
        let path = dir.join(format!("{}.{}", name, TABLE_EXTENSION));
        binary::save_file(table, &path)?;
        info!("saved table {} ({} rows) to {}", name, table.rows(), path.display());
    }
    Ok(())
}

/// Read every `*.cbt` file under `dir` back into a name→table map.
pub fn load_dir(dir: &Path) -> Result<BTreeMap<String, Table>> {
    let mut tables = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(TABLE_EXTENSION) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let table = binary::load_file(&path)?;
        info!("loaded table {} ({} rows) from {}", name, table.rows(), path.display());
        tables.insert(name.to_string(), table);
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::column::Column;

    #[test]
    fn test_dir_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut tables = BTreeMap::new();
        tables.insert(
            "people".to_string(),
            Table::from_columns(
                vec![
                    Column::int("id", &[1, 2]),
                    Column::string("name", &["a", "b"]),
                ],
                false,
            )
            .unwrap(),
        );
        tables.insert(
            "scores".to_string(),
            Table::from_columns(
                vec![Column::double_nullable("x", &[Some(0.5), None])],
                true,
            )
            .unwrap(),
        );

        let path = dir.path().join("tables");
        save_dir(&tables, &path).unwrap();
        let loaded = load_dir(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded["people"].equals(&tables["people"]));
        assert!(loaded["scores"].equals(&tables["scores"]));
    }

    #[test]
    fn test_load_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
        let loaded = load_dir(dir.path()).unwrap();
        assert!(loaded.is_empty());
    }
}
