//! Cleaning rules for the national generation capacity table.
//!
//! The pipeline runs in a fixed order: label coercion, year parsing, column
//! drops, deduplication, null drops, label normalization and finally the
//! optional level filter. Deduplication happens before level filtering so the
//! surviving row of a duplicate group does not depend on the level asked for.

pub mod views;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::datasets::{DatasetKind, Descriptor};
use crate::db;
use crate::error::{EnergyDataError, Result};

pub use views::{load_top5, load_uk, select_top5, select_uk, TOP5_COUNTRIES};

/// Columns with no use downstream
pub const DROPPED_COLUMNS: [&str; 7] = [
    "ID",
    "weblink",
    "type",
    "comment",
    "capacity_definition",
    "source",
    "source_type",
];

/// Hierarchy indicators, dropped once the table is filtered to a single level
pub const LEVEL_COLUMNS: [&str; 5] = [
    "energy_source_level_0",
    "energy_source_level_1",
    "energy_source_level_2",
    "energy_source_level_3",
    "technology_level",
];

/// Rows sharing these values are duplicates
pub const KEY_COLUMNS: [&str; 3] = ["technology", "year", "country"];

/// Columns coerced to labels
pub const LABEL_COLUMNS: [&str; 2] = ["technology", "country"];

/// Exact whole-value label rewrites
pub const LABEL_RENAMES: [(&str, &str); 2] = [
    ("Other or unspecified energy sources", "Other"),
    ("Renewable energy sources", "Renewables"),
];

const DAYS_FROM_CE_TO_UNIX_EPOCH: i32 = 719_163;

/// Aggregation level of the energy source taxonomy.
///
/// A row can belong to several levels at once ("Fossil fuels" is a total,
/// "Hard coal" a fuel), so sums are only meaningful within one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Total,
    Type,
    Fuel,
}

impl Level {
    pub fn indicator_column(&self) -> &'static str {
        match self {
            Level::Total => "energy_source_level_0",
            Level::Type => "energy_source_level_1",
            Level::Fuel => "energy_source_level_2",
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Level::Total => "total",
            Level::Type => "type",
            Level::Fuel => "fuel",
        }
    }
}

impl FromStr for Level {
    type Err = EnergyDataError;

    /// Only the exact lower-case tokens are accepted.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "total" => Ok(Level::Total),
            "type" => Ok(Level::Type),
            "fuel" => Ok(Level::Fuel),
            _ => Err(EnergyDataError::InvalidLevel(s.to_string())),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Run the full cleaning pipeline over a raw (or already cleaned) capacity table.
pub fn clean(table: &DataFrame, level: Option<Level>) -> Result<DataFrame> {
    let input_rows = table.height();

    let df = coerce_labels(table)?;
    let df = parse_years(df)?;
    let df = drop_columns(&df, &DROPPED_COLUMNS)?;
    let df = deduplicate(&df)?;
    debug!("Deduplicated capacity table: {} -> {} rows", input_rows, df.height());
    let df = drop_missing(&df)?;
    let df = normalize_labels(&df)?;

    let df = match level {
        Some(level) => filter_level(&df, level)?,
        None => df,
    };

    info!(
        "Cleaned capacity table (level: {}): {} -> {} rows",
        level.map(|l| l.token()).unwrap_or("all"),
        input_rows,
        df.height()
    );
    Ok(df)
}

/// Like [`clean`], but takes the level as a raw token.
///
/// The token is validated before any work is done on the table.
pub fn clean_with_token(table: &DataFrame, level: Option<&str>) -> Result<DataFrame> {
    let level = level.map(Level::from_str).transpose()?;
    clean(table, level)
}

/// Load the generation capacity table and clean it.
pub fn load_cleaned(config: &Config, level: Option<Level>) -> Result<DataFrame> {
    let descriptor = Descriptor::for_kind(config, DatasetKind::GenerationCapacity);
    let raw = db::load(&descriptor)?;
    clean(&raw, level)
}

/// Like [`load_cleaned`], but takes the level as a raw token.
///
/// A bad token is reported before the store is opened.
pub fn load_cleaned_with_token(config: &Config, level: Option<&str>) -> Result<DataFrame> {
    let level = level.map(Level::from_str).transpose()?;
    load_cleaned(config, level)
}

fn require<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map_err(|_| EnergyDataError::MissingColumn(name.to_string()))
}

/// Labels are kept as plain strings; values compare by content.
fn coerce_labels(table: &DataFrame) -> Result<DataFrame> {
    let mut df = table.clone();
    for name in LABEL_COLUMNS {
        let column = require(&df, name)?;
        if column.dtype() != &DataType::String {
            let labels = column.cast(&DataType::String)?;
            df.with_column(labels)?;
        }
    }
    Ok(df)
}

/// Parse `year` strictly as a four digit year into a Date on January 1.
///
/// Values that are not a four digit year become null and are removed with the
/// other incomplete rows.
fn parse_years(mut df: DataFrame) -> Result<DataFrame> {
    if require(&df, "year")?.dtype() == &DataType::Date {
        return Ok(df);
    }

    let column = require(&df, "year")?;
    let years: Vec<Option<i32>> = match column.dtype() {
        DataType::Float32 | DataType::Float64 => column
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.and_then(year_from_float))
            .collect(),
        dtype if dtype.is_integer() => column
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.and_then(year_from_int))
            .collect(),
        _ => column
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_year))
            .collect(),
    };

    let nulls = column.is_null();
    let malformed = years
        .iter()
        .zip(&nulls)
        .filter(|(parsed, was_null)| parsed.is_none() && !was_null.unwrap_or(false))
        .count();
    if malformed > 0 {
        warn!("{} rows have a malformed year and will be dropped", malformed);
    }

    let days: Vec<Option<i32>> = years
        .into_iter()
        .map(|year| year.and_then(days_since_epoch))
        .collect();
    let dates = Series::new("year", days).cast(&DataType::Date)?;
    df.with_column(dates)?;
    Ok(df)
}

/// Exactly four ASCII digits, nothing else.
pub fn parse_year(value: &str) -> Option<i32> {
    if value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()) {
        value.parse().ok()
    } else {
        None
    }
}

fn year_from_int(value: i64) -> Option<i32> {
    if (1000..=9999).contains(&value) {
        Some(value as i32)
    } else {
        None
    }
}

fn year_from_float(value: f64) -> Option<i32> {
    if value.fract() == 0.0 {
        year_from_int(value as i64)
    } else {
        None
    }
}

fn days_since_epoch(year: i32) -> Option<i32> {
    NaiveDate::from_ymd_opt(year, 1, 1).map(|date| date.num_days_from_ce() - DAYS_FROM_CE_TO_UNIX_EPOCH)
}

/// Remove the named columns; names not present are ignored.
pub(crate) fn drop_columns(df: &DataFrame, names: &[&str]) -> Result<DataFrame> {
    let kept: Vec<Series> = df
        .get_columns()
        .iter()
        .filter(|s| !names.contains(&s.name()))
        .cloned()
        .collect();
    Ok(DataFrame::new(kept)?)
}

/// Keep the first row of every (technology, year, country) group, in input order.
fn deduplicate(df: &DataFrame) -> Result<DataFrame> {
    for name in KEY_COLUMNS {
        require(df, name)?;
    }
    let subset: Vec<String> = KEY_COLUMNS.iter().map(|s| s.to_string()).collect();
    Ok(df.unique_stable(Some(&subset), UniqueKeepStrategy::First, None)?)
}

/// Drop every row with a null in any column. No imputation.
fn drop_missing(df: &DataFrame) -> Result<DataFrame> {
    Ok(df.drop_nulls::<String>(None)?)
}

pub fn normalize_label(value: &str) -> &str {
    LABEL_RENAMES
        .iter()
        .find(|(from, _)| *from == value)
        .map(|(_, to)| *to)
        .unwrap_or(value)
}

/// Apply [`LABEL_RENAMES`] to every text column.
fn normalize_labels(df: &DataFrame) -> Result<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|column| {
            if column.dtype() != &DataType::String {
                return Ok(column.clone());
            }
            let values: Vec<Option<&str>> = column
                .str()?
                .into_iter()
                .map(|v| v.map(normalize_label))
                .collect();
            Ok(Series::new(column.name(), values))
        })
        .collect::<Result<Vec<Series>>>()?;
    Ok(DataFrame::new(columns)?)
}

fn filter_level(df: &DataFrame, level: Level) -> Result<DataFrame> {
    let indicator = require(df, level.indicator_column())?;
    let mask = indicator.cast(&DataType::Float64)?.equal(1.0)?;
    let filtered = df.filter(&mask)?;
    drop_columns(&filtered, &LEVEL_COLUMNS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_table() -> DataFrame {
        df!(
            "ID" => &[1i64, 2, 3, 4, 5, 6],
            "technology" => &["Solar", "Solar", "Wind", "Renewable energy sources", "Other or unspecified energy sources", "Hard coal"],
            "source" => &["ENTSOE", "EUROSTAT", "ENTSOE", "ENTSOE", "ENTSOE", "ENTSOE"],
            "source_type" => &["Statistical", "Statistical", "Statistical", "Statistical", "Statistical", "Statistical"],
            "weblink" => &["http://a", "http://b", "http://c", "http://d", "http://e", "http://f"],
            "year" => &[Some("2020"), Some("2020"), Some("2019"), Some("2018"), Some("20x8"), Some("2017")],
            "type" => &["Installed capacity in MW"; 6],
            "country" => &["DE", "DE", "FR", "IT", "ES", "GB"],
            "capacity_definition" => &["Net capacity"; 6],
            "comment" => &[Some("n/a"), None, Some("n/a"), Some("n/a"), Some("n/a"), Some("n/a")],
            "capacity" => &[Some(100.0), Some(999.0), Some(50.0), Some(70.0), Some(10.0), None],
            "energy_source_level_0" => &[0i64, 0, 1, 1, 0, 0],
            "energy_source_level_1" => &[1i64, 1, 0, 0, 1, 0],
            "energy_source_level_2" => &[0i64, 0, 0, 0, 0, 1],
            "energy_source_level_3" => &[0i64, 0, 0, 0, 0, 0],
            "technology_level" => &[0i64, 0, 0, 0, 0, 1],
        )
        .unwrap()
    }

    fn strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn level_tokens_must_match_exactly() {
        assert_eq!("total".parse::<Level>().unwrap(), Level::Total);
        assert_eq!("type".parse::<Level>().unwrap(), Level::Type);
        assert_eq!("fuel".parse::<Level>().unwrap(), Level::Fuel);
        for token in ["bogus", " type ", "FUEL", "Total", ""] {
            assert!(
                matches!(token.parse::<Level>(), Err(EnergyDataError::InvalidLevel(ref t)) if t == token),
                "{token:?} should be rejected"
            );
        }
    }

    #[test]
    fn year_parsing_is_strict() {
        assert_eq!(parse_year("2020"), Some(2020));
        assert_eq!(parse_year("0999"), Some(999));
        assert_eq!(parse_year("20x0"), None);
        assert_eq!(parse_year("2020-01-01"), None);
        assert_eq!(parse_year(" 2020"), None);
        assert_eq!(parse_year("202"), None);
        assert_eq!(year_from_float(2015.0), Some(2015));
        assert_eq!(year_from_float(2015.5), None);
        assert_eq!(year_from_int(12), None);
    }

    #[test]
    fn epoch_year_is_day_zero() {
        assert_eq!(days_since_epoch(1970), Some(0));
        assert_eq!(days_since_epoch(1971), Some(365));
    }

    #[test]
    fn cleaning_drops_irrelevant_columns() {
        let cleaned = clean(&raw_table(), None).unwrap();
        for dropped in DROPPED_COLUMNS {
            assert!(cleaned.column(dropped).is_err(), "{dropped} should be dropped");
        }
        for kept in LEVEL_COLUMNS {
            assert!(cleaned.column(kept).is_ok(), "{kept} should be kept without a level");
        }
        assert_eq!(cleaned.column("year").unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn duplicates_keep_first_row() {
        let cleaned = clean(&raw_table(), None).unwrap();
        let solar = cleaned
            .filter(&cleaned.column("technology").unwrap().str().unwrap().equal("Solar"))
            .unwrap();
        assert_eq!(solar.height(), 1);
        assert_eq!(solar.column("capacity").unwrap().f64().unwrap().get(0), Some(100.0));
    }

    #[test]
    fn duplicate_removal_happens_before_null_removal() {
        // The first DE/Solar/2020 row has a null comment, but `comment` is
        // dropped before nulls are considered so the row survives.
        let mut raw = raw_table();
        raw.with_column(Series::new(
            "comment",
            &[None, Some("x"), Some("x"), Some("x"), Some("x"), Some("x")],
        ))
        .unwrap();
        let cleaned = clean(&raw, None).unwrap();
        let capacities: Vec<Option<f64>> = cleaned
            .column("capacity")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert!(capacities.contains(&Some(100.0)));
        assert!(!capacities.contains(&Some(999.0)));
    }

    #[test]
    fn incomplete_and_malformed_rows_are_dropped() {
        let cleaned = clean(&raw_table(), None).unwrap();
        // Hard coal has no capacity, the ES row has a malformed year.
        assert_eq!(strings(&cleaned, "country"), vec![
            Some("DE".to_string()),
            Some("FR".to_string()),
            Some("IT".to_string()),
        ]);
        assert_eq!(cleaned.column("year").unwrap().null_count(), 0);
    }

    #[test]
    fn labels_are_normalized_exactly() {
        let cleaned = clean(&raw_table(), None).unwrap();
        assert!(strings(&cleaned, "technology").contains(&Some("Renewables".to_string())));

        assert_eq!(normalize_label("Other or unspecified energy sources"), "Other");
        assert_eq!(normalize_label("Renewable energy sources"), "Renewables");
        assert_eq!(
            normalize_label("Other or unspecified energy sources (misc)"),
            "Other or unspecified energy sources (misc)"
        );
        assert_eq!(normalize_label("renewable energy sources"), "renewable energy sources");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let once = clean(&raw_table(), None).unwrap();
        let twice = clean(&once, None).unwrap();
        assert_eq!(once.shape(), twice.shape());
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn level_filter_keeps_only_indicated_rows() {
        let raw = raw_table();
        let unfiltered = clean(&raw, None).unwrap();
        for level in [Level::Total, Level::Type, Level::Fuel] {
            let expected = unfiltered
                .column(level.indicator_column())
                .unwrap()
                .i64()
                .unwrap()
                .into_iter()
                .filter(|v| *v == Some(1))
                .count();
            let filtered = clean(&raw, Some(level)).unwrap();
            assert_eq!(filtered.height(), expected, "level {level}");
            for dropped in LEVEL_COLUMNS {
                assert!(filtered.column(dropped).is_err());
            }
        }
    }

    #[test]
    fn end_to_end_type_level() {
        let raw = df!(
            "technology" => &["solar", "solar", "wind"],
            "year" => &["2020", "2020", "2019"],
            "country" => &["DE", "DE", "FR"],
            "capacity" => &[100.0, 999.0, 50.0],
            "energy_source_level_0" => &[0i64, 0, 1],
            "energy_source_level_1" => &[1i64, 1, 0],
            "energy_source_level_2" => &[0i64, 0, 0],
            "energy_source_level_3" => &[0i64, 0, 0],
            "technology_level" => &[0i64, 0, 0],
        )
        .unwrap();

        let types = clean(&raw, Some(Level::Type)).unwrap();
        assert_eq!(types.height(), 1);
        assert_eq!(strings(&types, "country"), vec![Some("DE".to_string())]);
        assert_eq!(strings(&types, "technology"), vec![Some("solar".to_string())]);
        assert_eq!(types.column("capacity").unwrap().f64().unwrap().get(0), Some(100.0));
    }

    #[test]
    fn integer_years_are_accepted() {
        let raw = df!(
            "technology" => &["Nuclear"],
            "year" => &[2015i64],
            "country" => &["FR"],
            "capacity" => &[63130.0],
        )
        .unwrap();
        let cleaned = clean(&raw, None).unwrap();
        let year = cleaned.column("year").unwrap().cast(&DataType::String).unwrap();
        assert_eq!(year.str().unwrap().get(0), Some("2015-01-01"));
    }

    #[test]
    fn bogus_level_token_is_rejected_up_front() {
        // The table lacks every indicator column, so any attempt to filter
        // would report a missing column instead.
        let raw = df!(
            "technology" => &["Solar"],
            "year" => &["2020"],
            "country" => &["DE"],
        )
        .unwrap();
        assert!(matches!(
            clean_with_token(&raw, Some("bogus")),
            Err(EnergyDataError::InvalidLevel(token)) if token == "bogus"
        ));
        assert!(matches!(
            clean_with_token(&raw, Some("type")),
            Err(EnergyDataError::MissingColumn(column)) if column == "energy_source_level_1"
        ));
    }

    #[test]
    fn missing_key_column_is_reported() {
        let raw = df!("technology" => &["Solar"], "year" => &["2020"]).unwrap();
        assert!(matches!(
            clean(&raw, None),
            Err(EnergyDataError::MissingColumn(column)) if column == "country"
        ));
    }
}
