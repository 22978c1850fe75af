//! Resolve a YouTube video id into ranked streams and download one of them
//! through a chain of independent extraction strategies.

pub mod downloader;
pub mod service;

pub use downloader::{
    DownloadError, DownloadOutcome, Downloader, DownloaderConfig, MediaInfo, ProbeFailure,
    StreamDescriptor,
};
pub use service::{DownloadResponse, DownloadService, ProbeResponse};
