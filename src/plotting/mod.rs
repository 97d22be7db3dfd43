pub mod glyphs;
pub mod raster;

use polars::prelude::*;
use textplots::{Chart, Plot, Shape};

use crate::cleaning::Level;
use crate::error::{EnergyDataError, Result};

pub use raster::{generate_palette, RenderOptions};

/// How capacity values are combined within one bar segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
}

/// One bar, possibly stacked from several named segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub segments: Vec<(String, f64)>,
}

impl Bar {
    pub fn total(&self) -> f64 {
        self.segments.iter().map(|(_, v)| v).sum()
    }
}

/// A bar chart ready to be rasterized or previewed in the terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: Option<String>,
    pub x_title: String,
    pub y_title: String,
    /// Heading of the colour legend on stacked charts
    pub legend_title: Option<String>,
    pub bars: Vec<Bar>,
}

impl BarChart {
    /// Distinct segment names in stacking order
    pub fn series(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for bar in &self.bars {
            for (name, _) in &bar.segments {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    pub fn max_total(&self) -> f64 {
        self.bars.iter().map(Bar::total).fold(0.0, f64::max)
    }

    pub fn file_name(&self) -> Result<String> {
        png_name(self.title.as_deref())
    }
}

/// File name for a chart: trimmed title, spaces to underscores, hyphens and
/// colons removed, lower-cased, `.png` appended.
pub fn png_name(title: Option<&str>) -> Result<String> {
    let title = title.map(str::trim).filter(|t| !t.is_empty()).ok_or(EnergyDataError::MissingTitle)?;
    let name = title
        .replace(' ', "_")
        .replace('-', "")
        .replace(':', "")
        .to_lowercase();
    Ok(format!("{}.png", name))
}

/// A finalized figure: which level of the cleaned data it needs and how to build it.
pub struct FigureSpec {
    pub title: &'static str,
    pub level: Level,
    pub build: fn(&DataFrame, &str) -> Result<BarChart>,
}

/// The figures regenerated by the `figures` command
pub fn finalized_figures() -> Vec<FigureSpec> {
    vec![
        FigureSpec {
            title: "Total Generation Capacity by Country (1990 - 2020)",
            level: Level::Total,
            build: total_by_country,
        },
        FigureSpec {
            title: "Mean Energy Generation Capacity by Source and Country (1990 - 2020)",
            level: Level::Type,
            build: mean_by_country_and_technology,
        },
    ]
}

fn require(df: &DataFrame, name: &str) -> Result<()> {
    df.column(name)
        .map(|_| ())
        .map_err(|_| EnergyDataError::MissingColumn(name.to_string()))
}

/// Aggregate capacity per (country, segment) and return bars sorted by total, largest first.
///
/// Without a segment column every bar has a single `capacity` segment.
fn aggregate(
    df: &DataFrame,
    segment_column: Option<&str>,
    aggregation: Aggregation,
) -> Result<Vec<Bar>> {
    for name in ["country", "capacity"].into_iter().chain(segment_column) {
        require(df, name)?;
    }

    let segment = match segment_column {
        Some(name) => col(name).cast(DataType::String),
        None => lit("capacity"),
    };
    let value = match aggregation {
        Aggregation::Sum => col("capacity").sum(),
        Aggregation::Mean => col("capacity").mean(),
    };

    let grouped = df
        .clone()
        .lazy()
        .select([
            col("country").cast(DataType::String),
            segment.alias("segment"),
            col("capacity").cast(DataType::Float64),
        ])
        .drop_nulls(None)
        .group_by([col("country"), col("segment")])
        .agg([value.alias("value")])
        .sort(["country", "segment"], SortMultipleOptions::default())
        .collect()?;

    let countries = grouped.column("country")?.str()?;
    let segments = grouped.column("segment")?.str()?;
    let values = grouped.column("value")?.f64()?;

    let mut bars: Vec<Bar> = Vec::new();
    for ((country, segment), value) in countries.into_iter().zip(segments).zip(values) {
        let (Some(country), Some(segment), Some(value)) = (country, segment, value) else {
            continue;
        };
        match bars.last_mut() {
            Some(bar) if bar.label == country => bar.segments.push((segment.to_string(), value)),
            _ => bars.push(Bar {
                label: country.to_string(),
                segments: vec![(segment.to_string(), value)],
            }),
        }
    }
    bars.sort_by(|a, b| b.total().total_cmp(&a.total()));
    Ok(bars)
}

/// Summed capacity per country.
pub fn total_by_country(df: &DataFrame, title: &str) -> Result<BarChart> {
    Ok(BarChart {
        title: Some(title.to_string()),
        x_title: "Country".to_string(),
        y_title: "Generation Capacity (MW)".to_string(),
        legend_title: None,
        bars: aggregate(df, None, Aggregation::Sum)?,
    })
}

/// Mean capacity per country, stacked by technology.
pub fn mean_by_country_and_technology(df: &DataFrame, title: &str) -> Result<BarChart> {
    Ok(BarChart {
        title: Some(title.to_string()),
        x_title: "Country".to_string(),
        y_title: "Generation Capacity (MW)".to_string(),
        legend_title: Some("Technology".to_string()),
        bars: aggregate(df, Some("technology"), Aggregation::Mean)?,
    })
}

/// Terminal rendering of a chart's bar totals plus a ranked listing.
pub struct BarPlotter;

impl BarPlotter {
    pub fn new() -> Self {
        Self
    }

    pub fn plot(&self, chart: &BarChart, width: Option<usize>, height: Option<usize>) -> String {
        let title = chart.title.as_deref().unwrap_or("untitled");
        if chart.bars.is_empty() {
            return format!("📊 No data available for '{}'", title);
        }

        let chart_width = width.unwrap_or(80);
        let chart_height = height.unwrap_or(20);

        let points: Vec<(f32, f32)> = chart
            .bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (i as f32, bar.total() as f32))
            .collect();

        let mut output = String::new();
        output.push_str(&format!("📊 {}\n", title));
        output.push_str(&format!("📈 {}: {} | {}\n", chart.x_title, chart.bars.len(), chart.y_title));
        output.push_str(&"─".repeat(chart_width));
        output.push('\n');

        let chart_result = Chart::new(
            chart_width as u32,
            chart_height as u32,
            -0.5,
            chart.bars.len() as f32 - 0.5,
        )
        .lineplot(&Shape::Bars(&points))
        .to_string();
        output.push_str(&chart_result);
        output.push('\n');

        for (i, bar) in chart.bars.iter().enumerate() {
            output.push_str(&format!("{:>3}  {:<6} {:>12.1}\n", i, bar.label, bar.total()));
        }
        output.push_str(&"─".repeat(chart_width));
        output
    }

    /// Plot dimensions based on the terminal size
    pub fn get_optimal_dimensions(&self) -> (usize, usize) {
        match crossterm::terminal::size() {
            Ok((cols, rows)) => {
                let width = (cols as usize).clamp(60, 120);
                let height = (rows as usize / 3).clamp(15, 30);
                (width, height)
            }
            Err(_) => (80, 20),
        }
    }
}

impl Default for BarPlotter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capacity_rows() -> DataFrame {
        df!(
            "country" => &["DE", "DE", "FR", "FR", "FR", "IT"],
            "technology" => &["Solar", "Wind", "Nuclear", "Nuclear", "Wind", "Solar"],
            "capacity" => &[40.0, 60.0, 60.0, 80.0, 10.0, 20.0],
        )
        .unwrap()
    }

    #[test]
    fn png_names_follow_title() {
        assert_eq!(
            png_name(Some("Total Generation Capacity by Country (1990 - 2020)")).unwrap(),
            "total_generation_capacity_by_country_(1990__2020).png"
        );
        assert_eq!(png_name(Some("  Ratio: A-B  ")).unwrap(), "ratio_ab.png");
    }

    #[test]
    fn untitled_charts_cannot_be_named() {
        assert!(matches!(png_name(None), Err(EnergyDataError::MissingTitle)));
        assert!(matches!(png_name(Some("   ")), Err(EnergyDataError::MissingTitle)));
    }

    #[test]
    fn totals_are_summed_and_sorted() {
        let chart = total_by_country(&capacity_rows(), "Totals").unwrap();
        let totals: Vec<(&str, f64)> = chart.bars.iter().map(|b| (b.label.as_str(), b.total())).collect();
        assert_eq!(totals, vec![("FR", 150.0), ("DE", 100.0), ("IT", 20.0)]);
        assert_eq!(chart.max_total(), 150.0);
    }

    #[test]
    fn means_are_stacked_by_technology() {
        let chart = mean_by_country_and_technology(&capacity_rows(), "Means").unwrap();
        let fr = chart.bars.iter().find(|b| b.label == "FR").unwrap();
        assert_eq!(
            fr.segments,
            vec![("Nuclear".to_string(), 70.0), ("Wind".to_string(), 10.0)]
        );
        assert_eq!(chart.bars[0].label, "DE");
        assert_eq!(chart.series(), vec!["Solar", "Wind", "Nuclear"]);
    }

    #[test]
    fn incomplete_rows_are_left_out_of_the_bars() {
        let df = df!(
            "country" => &[Some("DE"), None, Some("FR")],
            "technology" => &[Some("Solar"), Some("Wind"), None],
            "capacity" => &[Some(5.0), Some(7.0), Some(3.0)],
        )
        .unwrap();
        let chart = mean_by_country_and_technology(&df, "Means").unwrap();
        assert_eq!(chart.bars.len(), 1);
        assert_eq!(chart.bars[0].segments, vec![("Solar".to_string(), 5.0)]);
        assert_eq!(chart.legend_title.as_deref(), Some("Technology"));

        let totals = total_by_country(&df, "Totals").unwrap();
        assert_eq!(totals.bars.len(), 2);
        assert_eq!(totals.legend_title, None);
    }

    #[test]
    fn missing_capacity_column_is_reported() {
        let df = df!("country" => &["DE"]).unwrap();
        assert!(matches!(
            total_by_country(&df, "x"),
            Err(EnergyDataError::MissingColumn(c)) if c == "capacity"
        ));
    }

    #[test]
    fn finalized_figures_have_distinct_files() {
        let names: Vec<String> = finalized_figures()
            .iter()
            .map(|f| png_name(Some(f.title)).unwrap())
            .collect();
        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);
    }

    #[test]
    fn terminal_plot_lists_every_bar() {
        let chart = total_by_country(&capacity_rows(), "Totals").unwrap();
        let text = BarPlotter::new().plot(&chart, Some(60), Some(15));
        assert!(text.contains("Totals"));
        for label in ["FR", "DE", "IT"] {
            assert!(text.contains(label));
        }
    }
}
