use polars::prelude::*;
use serde::Serialize;

use super::DatasetKind;
use crate::error::Result;

/// Timestamp column of the hourly time series table
pub const TIMESTAMP_COLUMN: &str = "utc_timestamp";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
}

/// Shape and schema of a loaded table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub dataset: DatasetKind,
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
    /// First and last timestamp, for tables that have one
    pub time_range: Option<(String, String)>,
}

impl TableSummary {
    pub fn describe(dataset: DatasetKind, df: &DataFrame) -> Result<Self> {
        let columns = df
            .get_columns()
            .iter()
            .map(|s| ColumnSummary {
                name: s.name().to_string(),
                dtype: s.dtype().to_string(),
                null_count: s.null_count(),
            })
            .collect();

        let time_range = match df.column(TIMESTAMP_COLUMN) {
            Ok(column) => timestamp_range(column)?,
            Err(_) => None,
        };

        Ok(Self {
            dataset,
            rows: df.height(),
            columns,
            time_range,
        })
    }
}

/// OPSD stores ISO-8601 timestamps as text, so lexical order is time order.
fn timestamp_range(column: &Series) -> Result<Option<(String, String)>> {
    let text = column.cast(&DataType::String)?;
    let mut values = text.str()?.into_iter().flatten();
    let Some(first) = values.next() else {
        return Ok(None);
    };
    let (min, max) = values.fold((first, first), |(min, max), v| (min.min(v), max.max(v)));
    Ok(Some((min.to_string(), max.to_string())))
}
