use polars::prelude::*;

use super::load_cleaned;
use crate::config::Config;
use crate::error::{EnergyDataError, Result};

/// The five largest European markets
pub const TOP5_COUNTRIES: [&str; 5] = ["FR", "DE", "IT", "ES", "GB"];

/// OPSD's country code for the United Kingdom
pub const UK_COUNTRY: &str = "UK";

/// Keep rows whose `country` is one of `codes`.
pub fn select_countries(df: &DataFrame, codes: &[&str]) -> Result<DataFrame> {
    df.column("country")
        .map_err(|_| EnergyDataError::MissingColumn("country".to_string()))?;
    let codes = Series::new("codes", codes);
    let selected = df
        .clone()
        .lazy()
        .filter(col("country").cast(DataType::String).is_in(lit(codes)))
        .collect()?;
    Ok(selected)
}

pub fn select_top5(df: &DataFrame) -> Result<DataFrame> {
    select_countries(df, &TOP5_COUNTRIES)
}

pub fn select_uk(df: &DataFrame) -> Result<DataFrame> {
    select_countries(df, &[UK_COUNTRY])
}

/// Cleaned capacity data (all levels) for the top five countries.
pub fn load_top5(config: &Config) -> Result<DataFrame> {
    select_top5(&load_cleaned(config, None)?)
}

/// Cleaned capacity data (all levels) for the UK only.
pub fn load_uk(config: &Config) -> Result<DataFrame> {
    select_uk(&load_cleaned(config, None)?)
}
