// Emergency strategy - yt-dlp with nothing but a format and a filename
//
// Cookies, a spoofed user agent and client hints help against blocking, but
// they are also what breaks first when the platform changes. This attempt
// drops all of them and lets the extractor use its own defaults.

use std::sync::Arc;

use async_trait::async_trait;

use crate::downloader::config::DownloaderConfig;
use crate::downloader::errors::DownloadError;
use crate::downloader::extractors::{ExtractOptions, MediaExtractor};
use crate::downloader::models::RawInfo;
use crate::downloader::traits::{ExtractionStrategy, StrategyArtifact};
use crate::downloader::utils::watch_url;

const OUTPUT_TEMPLATE: &str = "fallback_%(id)s.%(ext)s";

pub struct EmergencyStrategy {
    extractor: Arc<dyn MediaExtractor>,
    config: Arc<DownloaderConfig>,
}

impl EmergencyStrategy {
    pub fn new(extractor: Arc<dyn MediaExtractor>, config: Arc<DownloaderConfig>) -> Self {
        Self { extractor, config }
    }

    /// Proxy is routing, not identity, so it stays
    fn options(&self, timeout_secs: u64) -> ExtractOptions {
        ExtractOptions {
            proxy: self.config.proxy.clone(),
            ..ExtractOptions::minimal(timeout_secs)
        }
    }
}

#[async_trait]
impl ExtractionStrategy for EmergencyStrategy {
    fn name(&self) -> &'static str {
        "emergency"
    }

    async fn probe(&self, video_id: &str) -> Result<RawInfo, DownloadError> {
        let options = self.options(self.config.probe_timeout_secs);
        self.extractor
            .extract_metadata(&watch_url(video_id), &options)
            .await
    }

    /// The requested key is ignored on purpose: only `best` is asked for
    async fn download(
        &self,
        video_id: &str,
        _format_key: &str,
    ) -> Result<StrategyArtifact, DownloadError> {
        let template = self.config.download_dir.join(OUTPUT_TEMPLATE);
        let options = self
            .options(self.config.download_timeout_secs)
            .with_format("best")
            .with_output_template(template.to_string_lossy());

        let info = self
            .extractor
            .extract_and_download(&watch_url(video_id), &options)
            .await?;
        let expected_path = self.extractor.prepare_filename(&info, &options);

        Ok(StrategyArtifact { expected_path, info })
    }
}
