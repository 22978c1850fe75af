// Orchestrator with fallback logic
//
// Strategies run strictly one after another and the first verified artifact
// wins. A strategy's failure is logged and swallowed; only the last one is
// handed back to the caller once the whole chain is exhausted.

use std::path::Path;
use std::sync::Arc;

use super::artifact::ArtifactResolver;
use super::backends::{EmergencyStrategy, PrimaryStrategy, SecondaryStrategy};
use super::config::DownloaderConfig;
use super::errors::{DownloadError, ProbeFailure};
use super::extractors::{MediaExtractor, PytubeSource, StreamSource, YtDlpExtractor};
use super::format_selector::FormatSelector;
use super::models::{DownloadOutcome, MediaInfo, RawInfo};
use super::tools::ToolManager;
use super::traits::{ExtractionStrategy, StrategyArtifact};
use super::utils::{display_path, file_size_mb, validate_video_id};

/// Where a download request currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    NotStarted,
    TryingStrategy(usize),
    Verifying(usize),
    Succeeded(usize),
    AllFailed,
}

pub struct Downloader {
    config: Arc<DownloaderConfig>,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Downloader {
    pub fn new(config: Arc<DownloaderConfig>, strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { config, strategies }
    }

    /// Primary yt-dlp, then pytube, then bare yt-dlp
    pub fn with_default_strategies(config: Arc<DownloaderConfig>) -> Self {
        let tools = ToolManager::new(&config);
        let launcher = tools.ytdlp_launcher();
        tracing::debug!("yt-dlp launcher: {:?}", launcher);

        let ytdlp: Arc<dyn MediaExtractor> = Arc::new(YtDlpExtractor::new(launcher));
        let pytube: Arc<dyn StreamSource> = Arc::new(
            PytubeSource::new(tools.python())
                .with_proxy(config.proxy.clone())
                .with_timeouts(config.probe_timeout_secs, config.download_timeout_secs),
        );

        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(PrimaryStrategy::new(ytdlp.clone(), config.clone())),
            Box::new(SecondaryStrategy::new(pytube, config.clone())),
            Box::new(EmergencyStrategy::new(ytdlp, config.clone())),
        ];
        Self::new(config, strategies)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Metadata and ranked streams. Strategies are tried in order until one
    /// returns non-empty metadata.
    pub async fn probe(&self, video_id: &str) -> Result<MediaInfo, ProbeFailure> {
        let video_id = validate_video_id(video_id)?;
        let mut last_error: Option<DownloadError> = None;

        for strategy in &self.strategies {
            tracing::debug!("[Downloader] probing {} with {}", video_id, strategy.name());

            match strategy.probe(video_id).await {
                Ok(info) if !info.is_empty() => {
                    tracing::info!("[Downloader] probe succeeded with {}", strategy.name());
                    return Ok(self.media_info(info));
                }
                Ok(_) => {
                    let err = DownloadError::extraction(format!(
                        "{} returned no metadata for {}",
                        strategy.name(),
                        video_id
                    ));
                    log_failure(strategy.name(), &err);
                    last_error = Some(err);
                }
                Err(err) => {
                    log_failure(strategy.name(), &err);
                    last_error = Some(err);
                }
            }
        }

        let failure = match last_error {
            Some(err) => ProbeFailure::from(err),
            None => ProbeFailure {
                message: "No extraction strategy configured".to_string(),
                reason: None,
            },
        };
        tracing::error!("[Downloader] probe failed for {}: {}", video_id, failure);
        Err(failure)
    }

    /// Never fails outright: exhaustion comes back as a failed outcome
    /// carrying the last strategy's message.
    pub async fn download(&self, video_id: &str, format_key: &str) -> DownloadOutcome {
        match self.run_chain(video_id, format_key).await {
            Ok(outcome) => outcome,
            Err(err) => DownloadOutcome::failure(err.to_string()),
        }
    }

    async fn run_chain(
        &self,
        video_id: &str,
        format_key: &str,
    ) -> Result<DownloadOutcome, DownloadError> {
        let video_id = validate_video_id(video_id)?;
        let dir = self.config.ensure_download_dir()?;
        let mut state = AttemptState::NotStarted;
        let mut last_error: Option<DownloadError> = None;

        for (index, strategy) in self.strategies.iter().enumerate() {
            state = advance(video_id, state, AttemptState::TryingStrategy(index));
            let before = ArtifactResolver::snapshot(dir, video_id);

            match self
                .attempt(strategy.as_ref(), index, video_id, format_key, &mut state)
                .await
            {
                Ok(outcome) => {
                    advance(video_id, state, AttemptState::Succeeded(index));
                    tracing::info!(
                        "[Downloader] {} downloaded by {}",
                        video_id,
                        strategy.name()
                    );
                    return Ok(outcome);
                }
                Err(err) => {
                    log_failure(strategy.name(), &err);
                    let removed = ArtifactResolver::discard_new(dir, video_id, &before)
                        + ArtifactResolver::cleanup_partials(dir, video_id);
                    if removed > 0 {
                        tracing::debug!("[Downloader] cleaned {} partial file(s)", removed);
                    }
                    last_error = Some(err);
                }
            }
        }

        advance(video_id, state, AttemptState::AllFailed);
        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "No download strategy configured".to_string());
        tracing::error!(
            "[Downloader] all {} strategies failed for {}: {}",
            self.strategies.len(),
            video_id,
            last_error
        );

        Err(DownloadError::AllStrategiesExhausted {
            attempts: self.strategies.len(),
            last_error,
        })
    }

    async fn attempt(
        &self,
        strategy: &dyn ExtractionStrategy,
        index: usize,
        video_id: &str,
        format_key: &str,
        state: &mut AttemptState,
    ) -> Result<DownloadOutcome, DownloadError> {
        let StrategyArtifact { expected_path, info } =
            strategy.download(video_id, format_key).await?;

        if info.is_empty() {
            return Err(DownloadError::extraction(format!(
                "{} returned no metadata for {}",
                strategy.name(),
                video_id
            )));
        }

        *state = advance(video_id, *state, AttemptState::Verifying(index));
        let path = ArtifactResolver::resolve(&expected_path, video_id)?;
        outcome_for(&path, info)
    }

    fn media_info(&self, info: RawInfo) -> MediaInfo {
        let (video_streams, audio_streams) =
            FormatSelector::select(&info.formats, self.config.max_streams);

        MediaInfo {
            title: info.title,
            thumbnail_url: info.thumbnail,
            duration_seconds: info.duration,
            author: info.uploader,
            video_streams,
            audio_streams,
        }
    }
}

fn outcome_for(path: &Path, info: RawInfo) -> Result<DownloadOutcome, DownloadError> {
    let size_mb = file_size_mb(path)?;
    let container = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .or(info.ext);
    Ok(DownloadOutcome::success(
        display_path(path),
        size_mb,
        container,
        info.title,
    ))
}

fn advance(video_id: &str, from: AttemptState, to: AttemptState) -> AttemptState {
    tracing::debug!("[Downloader] {}: {:?} -> {:?}", video_id, from, to);
    to
}

fn log_failure(strategy: &str, err: &DownloadError) {
    let Some(reason) = err.blocking_reason() else {
        tracing::warn!("[Downloader] ✗ {} failed: {}", strategy, err);
        return;
    };
    tracing::warn!(
        "[Downloader] ✗ {} failed ({}): {}",
        strategy,
        reason.description(),
        err
    );
    if let Some(hint) = reason.hint() {
        tracing::info!("[Downloader] hint: {}", hint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::RawFormat;
    use async_trait::async_trait;

    struct Scripted {
        probe: Result<RawInfo, DownloadError>,
    }

    #[async_trait]
    impl ExtractionStrategy for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn probe(&self, _video_id: &str) -> Result<RawInfo, DownloadError> {
            self.probe.clone()
        }

        async fn download(
            &self,
            video_id: &str,
            _format_key: &str,
        ) -> Result<StrategyArtifact, DownloadError> {
            Err(DownloadError::extraction(format!("cannot fetch {}", video_id)))
        }
    }

    fn config(dir: &Path) -> Arc<DownloaderConfig> {
        Arc::new(DownloaderConfig::default().with_download_dir(dir).with_max_streams(2))
    }

    #[tokio::test]
    async fn probe_skips_empty_metadata_and_caps_streams() {
        let tmp = tempfile::tempdir().unwrap();
        let formats = (1..=4)
            .map(|i| RawFormat {
                format_id: Some(i.to_string()),
                vcodec: Some("avc1".to_string()),
                height: Some(i * 100),
                ..Default::default()
            })
            .collect();
        let downloader = Downloader::new(
            config(tmp.path()),
            vec![
                Box::new(Scripted { probe: Ok(RawInfo::default()) }),
                Box::new(Scripted {
                    probe: Ok(RawInfo {
                        title: Some("T".to_string()),
                        formats,
                        ..Default::default()
                    }),
                }),
            ],
        );

        let info = downloader.probe("abc").await.unwrap();
        assert_eq!(info.title.as_deref(), Some("T"));
        let heights: Vec<_> = info.video_streams.iter().map(|s| s.height).collect();
        assert_eq!(heights, [Some(400), Some(300)]);
    }

    #[tokio::test]
    async fn empty_chain_reports_exhaustion() {
        let tmp = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(config(tmp.path()), Vec::new());

        let outcome = downloader.download("abc", "best").await;
        assert!(!outcome.succeeded);
        assert_eq!(
            outcome.failure_reason.as_deref(),
            Some("No download strategy configured")
        );
        assert!(downloader.probe("abc").await.is_err());
    }

    #[tokio::test]
    async fn download_dir_is_created_on_first_use() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("static").join("downloads");
        let downloader = Downloader::new(
            config(&dir),
            vec![Box::new(Scripted { probe: Ok(RawInfo::default()) })],
        );

        let outcome = downloader.download("abc", "best").await;
        assert_eq!(outcome.failure_reason.as_deref(), Some("cannot fetch abc"));
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn invalid_id_never_reaches_a_strategy() {
        let tmp = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(
            config(tmp.path()),
            vec![Box::new(Scripted { probe: Ok(RawInfo::default()) })],
        );

        let outcome = downloader.download("", "best").await;
        assert_eq!(outcome.failure_reason.as_deref(), Some("Invalid video id: \"\""));
        assert!(downloader.probe("a/b").await.is_err());
    }
}
