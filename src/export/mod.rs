use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cleaning::Level;
use crate::config::Config;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Parquet,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Parquet => "parquet",
            ExportFormat::Csv => "csv",
        }
    }
}

/// `<processed>/generation_capacity[_<level>].<ext>`
pub fn export_path(config: &Config, level: Option<Level>, format: ExportFormat) -> PathBuf {
    let stem = match level {
        Some(level) => format!("generation_capacity_{}", level.token()),
        None => "generation_capacity".to_string(),
    };
    config
        .processed_data()
        .join(format!("{}.{}", stem, format.extension()))
}

pub fn write_table(df: &mut DataFrame, path: &Path, format: ExportFormat) -> Result<()> {
    let mut file = File::create(path)?;
    match format {
        ExportFormat::Parquet => {
            ParquetWriter::new(&mut file).finish(df)?;
        }
        ExportFormat::Csv => {
            CsvWriter::new(&mut file).include_header(true).finish(df)?;
        }
    }
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}
