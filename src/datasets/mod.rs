pub mod summary;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::Config;
use crate::error::{EnergyDataError, Result};

pub use summary::TableSummary;

/// The two OPSD datasets this tool knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    GenerationCapacity,
    TimeSeries,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 2] = [DatasetKind::GenerationCapacity, DatasetKind::TimeSeries];

    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::GenerationCapacity => "generation_capacity",
            DatasetKind::TimeSeries => "time_series",
        }
    }

    /// File name of the SQLite database inside the raw data directory
    pub fn file_name(&self) -> &'static str {
        match self {
            DatasetKind::GenerationCapacity => "national_generation_capacity.sqlite",
            DatasetKind::TimeSeries => "time_series.sqlite",
        }
    }

    /// The time series database also ships 15 and 30 minute tables; the hourly one is used.
    pub fn table_name(&self) -> &'static str {
        match self {
            DatasetKind::GenerationCapacity => "national_generation_capacity_stacked",
            DatasetKind::TimeSeries => "time_series_60min_singleindex",
        }
    }

    pub fn url<'a>(&self, config: &'a Config) -> &'a str {
        match self {
            DatasetKind::GenerationCapacity => &config.capacity_url,
            DatasetKind::TimeSeries => &config.time_series_url,
        }
    }
}

impl FromStr for DatasetKind {
    type Err = EnergyDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "generation_capacity" => Ok(DatasetKind::GenerationCapacity),
            "time_series" => Ok(DatasetKind::TimeSeries),
            _ => Err(EnergyDataError::InvalidDataset(s.to_string())),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a dataset lives on disk and which table to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub kind: DatasetKind,
    pub storage_path: PathBuf,
    pub table_name: String,
}

impl Descriptor {
    pub fn for_kind(config: &Config, kind: DatasetKind) -> Self {
        Self {
            kind,
            storage_path: config.raw_data().join(kind.file_name()),
            table_name: kind.table_name().to_string(),
        }
    }
}

/// Resolve a logical dataset name (case-insensitive, surrounding whitespace ignored).
pub fn resolve(config: &Config, logical_name: &str) -> Result<Descriptor> {
    let kind: DatasetKind = logical_name.parse()?;
    Ok(Descriptor::for_kind(config, kind))
}
