// Caller-facing download service
//
// Every operation returns a serializable result value; failures are carried
// in the value as `{success: false, error}` rather than as `Err`.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::downloader::{
    BlockingReason, DownloadOutcome, Downloader, DownloaderConfig, MediaInfo, ProbeFailure,
};

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResponse {
    pub success: bool,
    #[serde(flatten)]
    pub info: Option<MediaInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_reason: Option<BlockingReason>,
}

impl From<Result<MediaInfo, ProbeFailure>> for ProbeResponse {
    fn from(result: Result<MediaInfo, ProbeFailure>) -> Self {
        match result {
            Ok(info) => Self {
                success: true,
                info: Some(info),
                error: None,
                blocking_reason: None,
            },
            Err(failure) => Self {
                success: false,
                info: None,
                error: Some(failure.message),
                blocking_reason: failure.reason,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<DownloadOutcome> for DownloadResponse {
    fn from(outcome: DownloadOutcome) -> Self {
        Self {
            success: outcome.succeeded,
            title: outcome.title,
            file_path: outcome.resolved_path,
            file_size_mb: outcome.size_mb,
            container: outcome.container,
            error: outcome.failure_reason,
        }
    }
}

pub struct DownloadService {
    downloader: Downloader,
}

impl DownloadService {
    /// Default strategy chain. Bootstraps the download folder and cookie file;
    /// problems there are logged, the strategies report them again if they matter.
    ///
    /// Tool discovery spawns interpreter processes, so it runs on the blocking pool.
    pub async fn new(config: DownloaderConfig) -> Self {
        if let Err(e) = config.ensure_download_dir() {
            tracing::warn!("could not create {}: {}", config.download_dir.display(), e);
        }
        if let Err(e) = config.ensure_cookie_file() {
            tracing::warn!("could not create cookie file: {}", e);
        }

        let config = Arc::new(config);
        let shared = config.clone();
        let downloader =
            match tokio::task::spawn_blocking(move || Downloader::with_default_strategies(shared))
                .await
            {
                Ok(downloader) => downloader,
                Err(e) => {
                    tracing::error!("tool discovery failed: {}", e);
                    Downloader::new(config, Vec::new())
                }
            };
        tracing::debug!("strategy chain: {}", downloader.strategy_names().join(" -> "));
        Self::with_downloader(downloader)
    }

    pub fn with_downloader(downloader: Downloader) -> Self {
        Self { downloader }
    }

    pub async fn get_available_streams(&self, video_id: &str) -> ProbeResponse {
        self.downloader.probe(video_id).await.into()
    }

    pub async fn download_video(&self, video_id: &str, format_key: &str) -> DownloadResponse {
        self.downloader.download(video_id, format_key).await.into()
    }

    pub async fn direct_download(&self, video_id: &str) -> DownloadResponse {
        self.download_video(video_id, "best").await
    }
}
