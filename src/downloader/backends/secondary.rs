// Secondary strategy - pytube, independent of yt-dlp's extractor code

use std::sync::Arc;

use async_trait::async_trait;

use crate::downloader::config::DownloaderConfig;
use crate::downloader::errors::DownloadError;
use crate::downloader::extractors::{StreamHandle, StreamSource};
use crate::downloader::models::RawInfo;
use crate::downloader::traits::{ExtractionStrategy, StrategyArtifact};
use crate::downloader::utils::watch_url;

pub struct SecondaryStrategy {
    source: Arc<dyn StreamSource>,
    config: Arc<DownloaderConfig>,
}

impl SecondaryStrategy {
    pub fn new(source: Arc<dyn StreamSource>, config: Arc<DownloaderConfig>) -> Self {
        Self { source, config }
    }
}

/// A numeric key is an itag and must be listed. Anything else (including
/// `best`) means the tallest video stream, progressive winning ties.
pub fn select_stream<'a>(
    streams: &'a [StreamHandle],
    format_key: &str,
) -> Result<&'a StreamHandle, DownloadError> {
    if let Ok(itag) = format_key.trim().parse::<u32>() {
        return streams
            .iter()
            .find(|s| s.itag == itag)
            .ok_or_else(|| DownloadError::Selection(format_key.to_string()));
    }

    let score = |s: &StreamHandle| (s.height().unwrap_or(0), s.is_progressive);

    // Strict comparison keeps the first listed among equals
    streams
        .iter()
        .filter(|s| s.includes_video)
        .fold(None, |best: Option<&StreamHandle>, s| match best {
            Some(b) if score(b) >= score(s) => Some(b),
            _ => Some(s),
        })
        .ok_or_else(|| DownloadError::Selection(format_key.to_string()))
}

#[async_trait]
impl ExtractionStrategy for SecondaryStrategy {
    fn name(&self) -> &'static str {
        "secondary"
    }

    async fn probe(&self, video_id: &str) -> Result<RawInfo, DownloadError> {
        let listing = self
            .source
            .list_available_streams(&watch_url(video_id))
            .await?;
        Ok(listing.to_raw_info(video_id))
    }

    async fn download(
        &self,
        video_id: &str,
        format_key: &str,
    ) -> Result<StrategyArtifact, DownloadError> {
        let url = watch_url(video_id);
        let listing = self.source.list_available_streams(&url).await?;
        let stream = select_stream(&listing.streams, format_key)?;

        let ext = stream.subtype().unwrap_or("mp4").to_string();
        let dest = self
            .config
            .download_dir
            .join(format!("{}_pytube.{}", video_id, ext));

        tracing::debug!(
            "[{}] {} itag {} -> {}",
            self.source.name(),
            video_id,
            stream.itag,
            dest.display()
        );
        let written = self.source.download(&url, stream, &dest).await?;

        let mut info = listing.to_raw_info(video_id);
        info.ext = Some(ext);
        info.filepath = Some(written.to_string_lossy().into_owned());

        Ok(StrategyArtifact {
            expected_path: written,
            info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::extractors::StreamListing;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Serves a fixed listing and records where it was asked to write
    struct FakeSource {
        listing: StreamListing,
        written: Mutex<Vec<(String, u32, PathBuf)>>,
    }

    impl FakeSource {
        fn new(streams: Vec<StreamHandle>) -> Arc<Self> {
            Arc::new(Self {
                listing: StreamListing {
                    title: Some("Clip".to_string()),
                    author: Some("Someone".to_string()),
                    length: Some(42),
                    thumbnail_url: None,
                    streams,
                },
                written: Mutex::new(Vec::new()),
            })
        }

        fn written(&self) -> Vec<(String, u32, PathBuf)> {
            self.written.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StreamSource for FakeSource {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn list_available_streams(&self, _url: &str) -> Result<StreamListing, DownloadError> {
            Ok(self.listing.clone())
        }

        async fn download(
            &self,
            url: &str,
            stream: &StreamHandle,
            dest: &Path,
        ) -> Result<PathBuf, DownloadError> {
            self.written
                .lock()
                .unwrap()
                .push((url.to_string(), stream.itag, dest.to_path_buf()));
            Ok(dest.to_path_buf())
        }
    }

    fn strategy(source: Arc<FakeSource>) -> SecondaryStrategy {
        let config = DownloaderConfig::default()
            .with_download_dir("out")
            .with_cookie_file(None);
        SecondaryStrategy::new(source, Arc::new(config))
    }

    fn stream(itag: u32, resolution: Option<&str>, progressive: bool) -> StreamHandle {
        StreamHandle {
            itag,
            mime_type: Some("video/mp4".to_string()),
            resolution: resolution.map(str::to_string),
            abr: None,
            is_progressive: progressive,
            includes_video: true,
            includes_audio: progressive,
            filesize: None,
        }
    }

    #[test]
    fn numeric_key_selects_itag() {
        let streams = vec![stream(18, Some("360p"), true), stream(137, Some("1080p"), false)];
        assert_eq!(select_stream(&streams, "18").unwrap().itag, 18);
    }

    #[test]
    fn missing_itag_is_selection_failure() {
        let streams = vec![stream(18, Some("360p"), true)];
        let err = select_stream(&streams, "22").unwrap_err();
        assert!(matches!(err, DownloadError::Selection(k) if k == "22"));
    }

    #[test]
    fn best_picks_tallest_and_prefers_progressive_on_ties() {
        let streams = vec![
            stream(136, Some("720p"), false),
            stream(22, Some("720p"), true),
            stream(18, Some("360p"), true),
        ];
        assert_eq!(select_stream(&streams, "best").unwrap().itag, 22);
    }

    #[test]
    fn non_numeric_key_without_video_fails() {
        let audio = StreamHandle {
            includes_video: false,
            includes_audio: true,
            ..stream(140, None, false)
        };
        assert!(select_stream(&[audio], "hd").is_err());
    }

    #[tokio::test]
    async fn download_writes_pytube_template_and_stamps_info() {
        let mut webm = stream(248, Some("1080p"), false);
        webm.mime_type = Some("video/webm".to_string());
        let source = FakeSource::new(vec![stream(18, Some("360p"), true), webm]);

        let artifact = strategy(source.clone()).download("abc", "best").await.unwrap();

        let expected = Path::new("out").join("abc_pytube.webm");
        assert_eq!(artifact.expected_path, expected);
        assert_eq!(artifact.info.ext.as_deref(), Some("webm"));
        assert_eq!(
            artifact.info.filepath.as_deref(),
            Some(expected.to_string_lossy().as_ref())
        );
        assert_eq!(artifact.info.title.as_deref(), Some("Clip"));
        assert_eq!(
            source.written(),
            [(watch_url("abc"), 248, expected.clone())]
        );
    }

    #[tokio::test]
    async fn missing_mime_defaults_to_mp4() {
        let mut bare = stream(18, Some("360p"), true);
        bare.mime_type = None;
        let source = FakeSource::new(vec![bare]);

        let artifact = strategy(source).download("abc", "18").await.unwrap();

        assert_eq!(artifact.expected_path, Path::new("out").join("abc_pytube.mp4"));
        assert_eq!(artifact.info.ext.as_deref(), Some("mp4"));
    }

    #[tokio::test]
    async fn unlisted_itag_fails_before_downloading() {
        let source = FakeSource::new(vec![stream(18, Some("360p"), true)]);

        let err = strategy(source.clone()).download("abc", "137").await.unwrap_err();

        assert!(matches!(err, DownloadError::Selection(k) if k == "137"));
        assert!(source.written().is_empty());
    }

    #[tokio::test]
    async fn listing_maps_to_raw_formats() {
        let source = FakeSource::new(vec![stream(22, Some("720p"), true)]);

        let info = strategy(source).probe("abc").await.unwrap();

        assert_eq!(info.id.as_deref(), Some("abc"));
        assert_eq!(info.duration, Some(42));
        assert_eq!(info.uploader.as_deref(), Some("Someone"));
        assert_eq!(info.formats.len(), 1);
        assert_eq!(info.formats[0].format_id.as_deref(), Some("22"));
        assert_eq!(info.formats[0].height, Some(720));
    }
}
