use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::datasets::{DatasetKind, Descriptor};
use crate::error::{EnergyDataError, Result};

/// What happened to one dataset during acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    AlreadyPresent { path: PathBuf },
}

impl FetchOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FetchOutcome::Downloaded { path, .. } | FetchOutcome::AlreadyPresent { path } => path,
        }
    }
}

/// Downloads the OPSD SQLite files into the raw data directory.
pub struct Fetcher {
    client: reqwest::Client,
    config: Config,
}

impl Fetcher {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, config })
    }

    /// Local target: the path the table loader reads, whatever the URL is called
    pub fn local_path(&self, kind: DatasetKind) -> PathBuf {
        Descriptor::for_kind(&self.config, kind).storage_path
    }

    /// Download `kind` unless it is already on disk.
    ///
    /// The body is streamed into `<name>.part` and renamed into place only once
    /// complete, so a failed download never leaves a truncated database behind.
    pub async fn fetch(&self, kind: DatasetKind, progress: Option<&ProgressBar>) -> Result<FetchOutcome> {
        let path = self.local_path(kind);
        if path.exists() {
            info!("File {} already exists!", path.display());
            return Ok(FetchOutcome::AlreadyPresent { path });
        }

        let url = kind.url(&self.config);
        info!("Downloading {} from {}", kind, url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EnergyDataError::NetworkFetchFailure {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if let (Some(pb), Some(len)) = (progress, response.content_length()) {
            pb.set_length(len);
        }

        let part_path = part_file(&path);
        let bytes = match stream_to_file(response, &part_path, progress).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Download of {} failed, removing {}", kind, part_path.display());
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&part_path, &path).await?;

        info!("Downloaded {}, saved to {} ({} bytes)", kind, path.display(), bytes);
        Ok(FetchOutcome::Downloaded { path, bytes })
    }
}

async fn stream_to_file(
    response: reqwest::Response,
    part_path: &Path,
    progress: Option<&ProgressBar>,
) -> Result<u64> {
    let mut file = tokio::fs::File::create(part_path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        if let Some(pb) = progress {
            pb.inc(chunk.len() as u64);
        }
    }
    file.flush().await?;

    debug!("Streamed {} bytes into {}", written, part_path.display());
    Ok(written)
}

fn part_file(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Byte progress bar for one download
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "[{{elapsed_precise}}] {{bar:40.cyan/blue}} {{bytes}}/{{total_bytes}} {}",
                message
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb
}
