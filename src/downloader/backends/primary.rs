use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::downloader::config::DownloaderConfig;
use crate::downloader::errors::DownloadError;
use crate::downloader::extractors::{ExtractOptions, MediaExtractor};
use crate::downloader::models::RawInfo;
use crate::downloader::traits::{ExtractionStrategy, StrategyArtifact};
use crate::downloader::utils::watch_url;

const BEST_COMBINED: &str = "bestvideo+bestaudio/best";
const OUTPUT_TEMPLATE: &str = "%(title)s-%(id)s.%(ext)s";

/// yt-dlp with the full set of anti-blocking options
pub struct PrimaryStrategy {
    extractor: Arc<dyn MediaExtractor>,
    config: Arc<DownloaderConfig>,
}

impl PrimaryStrategy {
    pub fn new(extractor: Arc<dyn MediaExtractor>, config: Arc<DownloaderConfig>) -> Self {
        Self { extractor, config }
    }

    fn options(&self, timeout_secs: u64) -> ExtractOptions {
        ExtractOptions {
            cookie_file: self.config.active_cookie_file().map(Path::to_path_buf),
            user_agent: Some(self.config.user_agent.clone()),
            no_check_certificates: true,
            player_clients: self.config.player_clients.clone(),
            proxy: self.config.proxy.clone(),
            ..ExtractOptions::minimal(timeout_secs)
        }
    }
}

/// Exact key first, then the best video+audio pair, then any single file
pub fn format_expression(format_key: &str) -> String {
    match format_key.trim() {
        "" | "best" => BEST_COMBINED.to_string(),
        key => format!("{}/{}", key, BEST_COMBINED),
    }
}

#[async_trait]
impl ExtractionStrategy for PrimaryStrategy {
    fn name(&self) -> &'static str {
        "primary"
    }

    async fn probe(&self, video_id: &str) -> Result<RawInfo, DownloadError> {
        let options = self.options(self.config.probe_timeout_secs);
        self.extractor
            .extract_metadata(&watch_url(video_id), &options)
            .await
    }

    async fn download(
        &self,
        video_id: &str,
        format_key: &str,
    ) -> Result<StrategyArtifact, DownloadError> {
        let template = self.config.download_dir.join(OUTPUT_TEMPLATE);
        let options = ExtractOptions {
            format: Some(format_expression(format_key)),
            output_template: Some(template.to_string_lossy().into_owned()),
            merge_output_format: Some(self.config.merge_output_format.clone()),
            ..self.options(self.config.download_timeout_secs)
        };

        tracing::debug!(
            "[{}] {} format {:?}",
            self.extractor.name(),
            video_id,
            options.format
        );

        let info = self
            .extractor
            .extract_and_download(&watch_url(video_id), &options)
            .await?;
        let expected_path = self.extractor.prepare_filename(&info, &options);

        Ok(StrategyArtifact { expected_path, info })
    }
}
