//! Downloader configuration: one immutable value threaded into every strategy.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::DownloadError;
use super::format_selector::DEFAULT_MAX_STREAMS;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const NETSCAPE_COOKIE_HEADER: &str = "# Netscape HTTP Cookie File\n\
# https://curl.se/docs/http-cookies.html\n\
# This file was generated by tubefetch. Edit at your own risk.\n\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Output folder, relative paths resolve against the working directory
    pub download_dir: PathBuf,
    /// Netscape cookie file handed to extractors when present
    pub cookie_file: Option<PathBuf>,
    pub user_agent: String,
    /// Cap on each ranked stream list
    pub max_streams: usize,
    /// YouTube player clients. Mobile clients need a PO token and are left out.
    pub player_clients: Vec<String>,
    /// Container used when separate video and audio streams are merged
    pub merge_output_format: String,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    pub probe_timeout_secs: u64,
    pub download_timeout_secs: u64,
    /// Python interpreter override (also read from `YTDLP_PYTHON`)
    pub python: Option<String>,
    /// yt-dlp binary override
    pub ytdlp_binary: Option<String>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("static").join("downloads"),
            cookie_file: Some(PathBuf::from("cookies.txt")),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_streams: DEFAULT_MAX_STREAMS,
            player_clients: vec!["web".to_string(), "web_safari".to_string()],
            merge_output_format: "mp4".to_string(),
            proxy: None,
            probe_timeout_secs: 60,
            download_timeout_secs: 1800,
            python: None,
            ytdlp_binary: None,
        }
    }
}

impl DownloaderConfig {
    /// Load from an explicit file, else the per-user config file if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self, DownloadError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path().filter(|p| p.exists()) {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        let data = fs::read_to_string(&path)?;
        let cfg: Self = toml::from_str(&data)
            .map_err(|e| DownloadError::Parse(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_cookie_file(mut self, path: Option<PathBuf>) -> Self {
        self.cookie_file = path;
        self
    }

    pub fn with_max_streams(mut self, max: usize) -> Self {
        self.max_streams = max;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Cookie file to pass along, only if it exists on disk
    pub fn active_cookie_file(&self) -> Option<&Path> {
        self.cookie_file.as_deref().filter(|p| p.is_file())
    }

    /// Create the download folder if absent
    pub fn ensure_download_dir(&self) -> Result<&Path, DownloadError> {
        fs::create_dir_all(&self.download_dir)?;
        Ok(&self.download_dir)
    }

    /// Create an empty Netscape cookie file if none exists
    pub fn ensure_cookie_file(&self) -> Result<(), DownloadError> {
        let Some(path) = &self.cookie_file else {
            return Ok(());
        };
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, NETSCAPE_COOKIE_HEADER)?;
        tracing::info!("created empty cookie file at {}", path.display());
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tubefetch").join("config.toml"))
}
