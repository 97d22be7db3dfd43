use polars::prelude::*;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::datasets::Descriptor;
use crate::error::{EnergyDataError, Result};

/// Read-only handle on one SQLite dataset file.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

/// One stored value, detached from the statement that produced it
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<ValueRef<'_>> for Cell {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                Cell::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

impl SqliteStore {
    /// Open an existing database file read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(EnergyDataError::StorageUnavailable {
                path,
                reason: "file does not exist".to_string(),
            });
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&path, flags).map_err(|e| {
            EnergyDataError::StorageUnavailable {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;
        debug!("Opened {} read-only", path.display());

        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, e: rusqlite::Error) -> EnergyDataError {
        EnergyDataError::StorageUnavailable {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }

    /// Names of all tables and views in the schema.
    ///
    /// This is the first statement run against the file, so a file that is not
    /// a SQLite database surfaces here as `StorageUnavailable`.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let unavailable = |e: rusqlite::Error| self.unavailable(e);
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'view') ORDER BY name")
            .map_err(unavailable)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(unavailable)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(unavailable)?;
        Ok(names)
    }

    /// Read a whole table into a DataFrame, keeping column order and inferring
    /// each column's type from the stored values.
    pub fn read_table(&self, table: &str) -> Result<DataFrame> {
        if !self.table_names()?.iter().any(|name| name == table) {
            return Err(EnergyDataError::TableNotFound {
                table: table.to_string(),
                path: self.path.clone(),
            });
        }

        // Pages are only read while stepping, so corruption past the schema
        // surfaces here rather than in `open`.
        let unavailable = |e: rusqlite::Error| self.unavailable(e);
        let sql = format!("SELECT * FROM {}", quote_identifier(table));
        let mut stmt = self.conn.prepare(&sql).map_err(unavailable)?;
        let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); column_names.len()];

        let mut rows = stmt.query([]).map_err(unavailable)?;
        while let Some(row) = rows.next().map_err(unavailable)? {
            for (idx, column) in columns.iter_mut().enumerate() {
                column.push(Cell::from(row.get_ref(idx)?));
            }
        }

        let series: Vec<Series> = column_names
            .iter()
            .zip(columns)
            .map(|(name, cells)| build_series(name, cells))
            .collect();
        let df = DataFrame::new(series)?;

        info!(
            "Loaded table '{}' from {}: {} rows x {} columns",
            table,
            self.path.display(),
            df.height(),
            df.width()
        );
        Ok(df)
    }
}

/// Open the descriptor's store, read its table and close the store again.
pub fn load(descriptor: &Descriptor) -> Result<DataFrame> {
    let store = SqliteStore::open(&descriptor.storage_path)?;
    store.read_table(&descriptor.table_name)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Integers only → Int64, any real → Float64, any text → String.
fn build_series(name: &str, cells: Vec<Cell>) -> Series {
    let mut has_real = false;
    let mut has_text = false;
    let mut has_integer = false;
    for cell in &cells {
        match cell {
            Cell::Null => {}
            Cell::Integer(_) => has_integer = true,
            Cell::Real(_) => has_real = true,
            Cell::Text(_) => has_text = true,
        }
    }

    if has_text || !(has_integer || has_real) {
        let values: Vec<Option<String>> = cells
            .into_iter()
            .map(|cell| match cell {
                Cell::Null => None,
                Cell::Integer(i) => Some(i.to_string()),
                Cell::Real(f) => Some(f.to_string()),
                Cell::Text(s) => Some(s),
            })
            .collect();
        Series::new(name, values)
    } else if has_real {
        let values: Vec<Option<f64>> = cells
            .into_iter()
            .map(|cell| match cell {
                Cell::Integer(i) => Some(i as f64),
                Cell::Real(f) => Some(f),
                _ => None,
            })
            .collect();
        Series::new(name, values)
    } else {
        let values: Vec<Option<i64>> = cells
            .into_iter()
            .map(|cell| match cell {
                Cell::Integer(i) => Some(i),
                _ => None,
            })
            .collect();
        Series::new(name, values)
    }
}
