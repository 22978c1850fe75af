// Capability traits for the external extraction libraries

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{RawFormat, RawInfo};

/// Options for a single extraction call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractOptions {
    /// Format expression (`-f`)
    pub format: Option<String>,
    /// Output template (`-o`), e.g. `static/downloads/%(title)s-%(id)s.%(ext)s`
    pub output_template: Option<String>,
    /// Container for merged video+audio
    pub merge_output_format: Option<String>,
    pub cookie_file: Option<PathBuf>,
    pub user_agent: Option<String>,
    /// Skip TLS certificate verification
    pub no_check_certificates: bool,
    /// YouTube player clients (empty = extractor default)
    pub player_clients: Vec<String>,
    pub proxy: Option<String>,
    pub timeout_secs: u64,
}

impl ExtractOptions {
    /// Quiet call with nothing but a timeout; the extractor picks its own defaults
    pub fn minimal(timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_output_template(mut self, template: impl Into<String>) -> Self {
        self.output_template = Some(template.into());
        self
    }
}

/// Primary extraction library (yt-dlp and friends)
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Metadata only, nothing is written
    async fn extract_metadata(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<RawInfo, DownloadError>;

    /// Metadata plus a file written according to `options.output_template`
    async fn extract_and_download(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<RawInfo, DownloadError>;

    /// Where the extractor says (or would say) the file went
    fn prepare_filename(&self, info: &RawInfo, options: &ExtractOptions) -> PathBuf;
}

/// Platform-native stream handle from a stream-listing library
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamHandle {
    pub itag: u32,
    pub mime_type: Option<String>,
    /// e.g. "720p"
    pub resolution: Option<String>,
    /// e.g. "128kbps"
    pub abr: Option<String>,
    #[serde(default)]
    pub is_progressive: bool,
    #[serde(default)]
    pub includes_video: bool,
    #[serde(default)]
    pub includes_audio: bool,
    pub filesize: Option<u64>,
}

impl StreamHandle {
    /// Container from the mime subtype (`video/mp4` -> `mp4`)
    pub fn subtype(&self) -> Option<&str> {
        self.mime_type
            .as_deref()
            .and_then(|m| m.split('/').nth(1))
            .filter(|s| !s.is_empty())
    }

    pub fn height(&self) -> Option<u32> {
        leading_number(self.resolution.as_deref()?)
    }

    pub fn bitrate_kbps(&self) -> Option<u32> {
        leading_number(self.abr.as_deref()?)
    }

    /// Same shape as an extractor format entry, so probes can share normalization
    pub fn to_raw_format(&self) -> RawFormat {
        RawFormat {
            format_id: Some(self.itag.to_string()),
            ext: self.subtype().map(str::to_string),
            vcodec: Some(if self.includes_video { "video" } else { "none" }.to_string()),
            acodec: Some(if self.includes_audio { "audio" } else { "none" }.to_string()),
            height: self.height(),
            abr: self.bitrate_kbps().map(f64::from),
            filesize: self.filesize,
            filesize_approx: None,
            format_note: self.resolution.clone().or_else(|| self.abr.clone()),
        }
    }
}

fn leading_number(s: &str) -> Option<u32> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Stream listing plus whatever metadata came along with it
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamListing {
    pub title: Option<String>,
    pub author: Option<String>,
    pub length: Option<u64>,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub streams: Vec<StreamHandle>,
}

impl StreamListing {
    pub fn to_raw_info(&self, video_id: &str) -> RawInfo {
        RawInfo {
            id: Some(video_id.to_string()),
            title: self.title.clone(),
            thumbnail: self.thumbnail_url.clone(),
            duration: self.length,
            uploader: self.author.clone(),
            formats: self.streams.iter().map(StreamHandle::to_raw_format).collect(),
            ..Default::default()
        }
    }
}

/// Secondary extraction library that exposes native stream handles
#[async_trait]
pub trait StreamSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn list_available_streams(&self, url: &str) -> Result<StreamListing, DownloadError>;

    /// Download one stream to `dest`, returning the path actually written
    async fn download(
        &self,
        url: &str,
        stream: &StreamHandle,
        dest: &Path,
    ) -> Result<PathBuf, DownloadError>;
}
