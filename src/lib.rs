//! Load, clean and chart the Open Power System Data national generation
//! capacity and time-series datasets.
//!
//! ```text
//!  fetch ──► Data/Raw/*.sqlite ──► db::load ──► cleaning::clean ──► plotting
//!                                     ▲               │
//!                          datasets::resolve          └─► views (top 5, UK)
//! ```

pub mod cleaning;
pub mod config;
pub mod datasets;
pub mod db;
pub mod error;
pub mod export;
pub mod fetch;
pub mod monitoring;
pub mod plotting;

pub use cleaning::{clean, load_cleaned, load_cleaned_with_token, load_top5, load_uk, Level};
pub use config::Config;
pub use datasets::{resolve, DatasetKind, Descriptor};
pub use error::{EnergyDataError, Result};
