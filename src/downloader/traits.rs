// Extraction strategy trait definition

use std::path::PathBuf;

use async_trait::async_trait;

use super::errors::DownloadError;
use super::models::RawInfo;

/// What a strategy claims to have produced. The orchestrator still has to
/// find and verify the file before the attempt counts.
#[derive(Debug, Clone)]
pub struct StrategyArtifact {
    /// Path the extractor reported or predicted
    pub expected_path: PathBuf,
    pub info: RawInfo,
}

/// One way of getting metadata and a file out of the platform
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Name of the strategy (for logging)
    fn name(&self) -> &'static str;

    /// Metadata only, nothing written
    async fn probe(&self, video_id: &str) -> Result<RawInfo, DownloadError>;

    /// Download `format_key` (or `"best"`) into the configured folder
    async fn download(
        &self,
        video_id: &str,
        format_key: &str,
    ) -> Result<StrategyArtifact, DownloadError>;
}
