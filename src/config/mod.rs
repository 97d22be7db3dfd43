use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{EnergyDataError, Result};

pub const DEFAULT_CAPACITY_URL: &str = "https://data.open-power-system-data.org/national_generation_capacity/2020-10-01/national_generation_capacity.sqlite";
pub const DEFAULT_TIME_SERIES_URL: &str =
    "https://data.open-power-system-data.org/time_series/2020-10-06/time_series.sqlite";

/// Project directories and source URLs, passed explicitly to every stage.
///
/// Relative directories are resolved against `data_root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_root: PathBuf,
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub figures_dir: PathBuf,
    pub capacity_url: String,
    pub time_series_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            raw_dir: PathBuf::from("Data/Raw"),
            processed_dir: PathBuf::from("Data/Processed"),
            figures_dir: PathBuf::from("Reports/Figures"),
            capacity_url: DEFAULT_CAPACITY_URL.to_string(),
            time_series_url: DEFAULT_TIME_SERIES_URL.to_string(),
        }
    }
}

impl Config {
    /// Default layout rooted at `root`
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            data_root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Read a YAML config file. Missing keys fall back to the defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&text).map_err(|source| EnergyDataError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn raw_data(&self) -> PathBuf {
        self.resolve(&self.raw_dir)
    }

    pub fn processed_data(&self) -> PathBuf {
        self.resolve(&self.processed_dir)
    }

    pub fn figures(&self) -> PathBuf {
        self.resolve(&self.figures_dir)
    }

    /// Create the raw, processed and figures directories if they are missing
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.raw_data(), self.processed_data(), self.figures()] {
            if !dir.exists() {
                info!("Creating directory {}", dir.display());
                std::fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    fn resolve(&self, dir: &Path) -> PathBuf {
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.data_root.join(dir)
        }
    }
}
