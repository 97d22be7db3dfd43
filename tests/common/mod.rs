#![allow(dead_code)]

use opsd_energy::{Config, DatasetKind};
use rusqlite::{params, Connection};
use std::path::PathBuf;
use tempfile::TempDir;

/// (technology, year, country, capacity, level_0, level_1, level_2)
pub type CapacityRow<'a> = (&'a str, &'a str, &'a str, Option<f64>, i64, i64, i64);

/// A temp project root with the default directory layout.
pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = Config::with_root(dir.path());
        std::fs::create_dir_all(config.raw_data()).expect("create raw dir");
        Self { dir, config }
    }

    pub fn path_for(&self, kind: DatasetKind) -> PathBuf {
        self.config.raw_data().join(kind.file_name())
    }

    /// Write a capacity database shaped like the OPSD one, plus an unrelated table.
    pub fn write_capacity(&self, rows: &[CapacityRow]) -> PathBuf {
        let path = self.path_for(DatasetKind::GenerationCapacity);
        let conn = Connection::open(&path).expect("open capacity db");
        conn.execute_batch(
            r#"
            CREATE TABLE national_generation_capacity_stacked (
                ID INTEGER,
                technology TEXT,
                source TEXT,
                source_type TEXT,
                weblink TEXT,
                year INTEGER,
                type TEXT,
                country TEXT,
                capacity_definition TEXT,
                capacity REAL,
                comment TEXT,
                energy_source_level_0 INTEGER,
                energy_source_level_1 INTEGER,
                energy_source_level_2 INTEGER,
                energy_source_level_3 INTEGER,
                technology_level INTEGER
            );
            CREATE TABLE sources (name TEXT, url TEXT);
            INSERT INTO sources VALUES ('ENTSOE', 'https://www.entsoe.eu');
            "#,
        )
        .expect("create capacity schema");

        for (id, (technology, year, country, capacity, l0, l1, l2)) in rows.iter().enumerate() {
            conn.execute(
                r#"
                INSERT INTO national_generation_capacity_stacked VALUES
                    (?1, ?2, 'ENTSOE', 'Statistical', 'https://example.org', ?3,
                     'Installed capacity in MW', ?4, 'Net capacity', ?5, NULL, ?6, ?7, ?8, 0, 0)
                "#,
                params![id as i64, technology, year, country, capacity, l0, l1, l2],
            )
            .expect("insert capacity row");
        }
        path
    }

    pub fn write_time_series(&self) -> PathBuf {
        let path = self.path_for(DatasetKind::TimeSeries);
        let conn = Connection::open(&path).expect("open time series db");
        conn.execute_batch(
            r#"
            CREATE TABLE time_series_60min_singleindex (
                utc_timestamp TEXT,
                cet_cest_timestamp TEXT,
                DE_load_actual_entsoe_transparency REAL,
                DE_solar_generation_actual REAL
            );
            CREATE TABLE time_series_15min_singleindex (utc_timestamp TEXT);
            INSERT INTO time_series_60min_singleindex VALUES
                ('2015-01-01T00:00:00Z', '2015-01-01T01:00:00+0100', 41151, NULL),
                ('2015-01-01T01:00:00Z', '2015-01-01T02:00:00+0100', 40135.5, NULL),
                ('2015-01-01T02:00:00Z', '2015-01-01T03:00:00+0100', 39106, 0.0);
            "#,
        )
        .expect("create time series schema");
        path
    }
}
