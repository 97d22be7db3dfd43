use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};

use opsd_energy::cleaning::{self, select_top5, select_uk, Level};
use opsd_energy::datasets::{self, DatasetKind, TableSummary};
use opsd_energy::export::{self, ExportFormat};
use opsd_energy::fetch::{create_progress_bar, FetchOutcome, Fetcher};
use opsd_energy::monitoring::StageTimer;
use opsd_energy::plotting::{self, raster, BarPlotter, RenderOptions};
use opsd_energy::{db, timed_stage, Config};

fn parse_level(token: Option<&str>) -> Result<Option<Level>> {
    token
        .map(|t| t.parse::<Level>())
        .transpose()
        .context("Invalid --level")
}

#[derive(Args)]
pub struct FetchCommand {
    /// Dataset to download (generation_capacity or time_series); both when omitted
    #[arg(short, long)]
    pub dataset: Option<String>,
}

impl FetchCommand {
    pub async fn execute(self, config: &Config) -> Result<()> {
        let kinds = match &self.dataset {
            Some(name) => vec![name.parse::<DatasetKind>()?],
            None => DatasetKind::ALL.to_vec(),
        };
        config.ensure_dirs().context("Failed to create data directories")?;

        let fetcher = Fetcher::new(config.clone())?;
        for kind in kinds {
            let pb = create_progress_bar(kind.name());
            let outcome = fetcher
                .fetch(kind, Some(&pb))
                .await
                .with_context(|| format!("Fetching {} failed", kind))?;
            pb.finish_and_clear();

            match outcome {
                FetchOutcome::Downloaded { path, bytes } => {
                    println!("📥 Downloaded {}, saved to {} ({} bytes)", kind, path.display(), bytes);
                }
                FetchOutcome::AlreadyPresent { path } => {
                    println!("✅ File {} already exists!", path.display());
                }
            }
        }
        Ok(())
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum View {
    Top5,
    Uk,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Args)]
pub struct InspectCommand {
    /// Dataset name: generation_capacity or time_series
    pub dataset: String,

    /// Filter capacity data to one level: total, type or fuel
    #[arg(short, long)]
    pub level: Option<String>,

    /// Restrict capacity data to a country view
    #[arg(long, value_enum)]
    pub view: Option<View>,

    /// Show the raw table instead of the cleaned one
    #[arg(long)]
    pub raw: bool,

    /// Number of rows to print
    #[arg(short, long, default_value = "10")]
    pub rows: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl InspectCommand {
    pub fn execute(self, config: &Config) -> Result<()> {
        let descriptor = datasets::resolve(config, &self.dataset)?;
        let level = parse_level(self.level.as_deref())?;

        if descriptor.kind == DatasetKind::TimeSeries && (level.is_some() || self.view.is_some()) {
            bail!("--level and --view only apply to generation_capacity");
        }
        if self.raw && (level.is_some() || self.view.is_some()) {
            bail!("--raw cannot be combined with --level or --view");
        }

        let raw = timed_stage!(format!("load_{}", descriptor.kind), {
            db::load(&descriptor).with_context(|| format!("Loading {} failed", descriptor.kind))?
        });

        let df = if descriptor.kind == DatasetKind::GenerationCapacity && !self.raw {
            let _timer = StageTimer::new("clean_generation_capacity");
            let cleaned = cleaning::clean(&raw, level).context("Cleaning generation_capacity failed")?;
            match self.view {
                Some(View::Top5) => select_top5(&cleaned)?,
                Some(View::Uk) => select_uk(&cleaned)?,
                None => cleaned,
            }
        } else {
            raw
        };

        let summary = TableSummary::describe(descriptor.kind, &df)?;
        match self.format {
            OutputFormat::Table => {
                println!("\n📋 {} ({} rows x {} columns)", summary.dataset, summary.rows, summary.columns.len());
                if let Some((first, last)) = &summary.time_range {
                    println!("📅 Time range: {} to {}", first, last);
                }
                println!("{:-<60}", "");
                for column in &summary.columns {
                    println!("  {:<40} {:<12} nulls: {}", column.name, column.dtype, column.null_count);
                }
                println!("{:-<60}", "");
                println!("{}", df.head(Some(self.rows)));
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct FiguresCommand {
    /// Skip the terminal previews
    #[arg(long)]
    pub no_preview: bool,

    /// Pixel multiplier for the saved images
    #[arg(long, default_value = "2")]
    pub scale: u32,
}

impl FiguresCommand {
    pub fn execute(self, config: &Config) -> Result<()> {
        config.ensure_dirs().context("Failed to create data directories")?;
        let options = RenderOptions {
            scale: self.scale.max(1),
            ..RenderOptions::default()
        };
        let plotter = BarPlotter::new();

        for figure in plotting::finalized_figures() {
            let df = cleaning::load_cleaned(config, Some(figure.level))
                .with_context(|| format!("Loading data for '{}' failed", figure.title))?;
            let chart = (figure.build)(&df, figure.title)
                .with_context(|| format!("Building '{}' failed", figure.title))?;
            if chart.bars.is_empty() {
                warn!("'{}' has no data", figure.title);
            }

            let path = config.figures().join(chart.file_name()?);
            raster::save_png(&chart, &path, options)
                .with_context(|| format!("Saving {} failed", path.display()))?;
            info!("Figure saved to {}", path.display());
            println!("🖼️  Figure: {} saved successfully!", chart.file_name()?);

            if !self.no_preview {
                let (width, height) = plotter.get_optimal_dimensions();
                println!("{}", plotter.plot(&chart, Some(width), Some(height)));
                let legend = raster::legend(&chart);
                if legend.len() > 1 {
                    for (name, color) in legend {
                        println!("  #{:02x}{:02x}{:02x}  {}", color[0], color[1], color[2], name);
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct ExportCommand {
    /// Filter to one level before exporting: total, type or fuel
    #[arg(short, long)]
    pub level: Option<String>,

    /// File format
    #[arg(short, long, value_enum, default_value = "parquet")]
    pub format: ExportFormat,
}

impl ExportCommand {
    pub fn execute(self, config: &Config) -> Result<()> {
        let level = parse_level(self.level.as_deref())?;
        config.ensure_dirs().context("Failed to create data directories")?;

        let mut df = {
            let _timer = StageTimer::new("load_cleaned_generation_capacity");
            cleaning::load_cleaned(config, level).context("Loading cleaned generation_capacity failed")?
        };
        let path = export::export_path(config, level, self.format);
        export::write_table(&mut df, &path, self.format)
            .with_context(|| format!("Writing {} failed", path.display()))?;

        println!("💾 Exported {} rows to {}", df.height(), path.display());
        Ok(())
    }
}
