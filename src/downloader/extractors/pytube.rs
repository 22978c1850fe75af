// pytube source - an independent YouTube library driven through inline scripts
//
// Useful precisely because it shares nothing with yt-dlp: when yt-dlp's
// extractor breaks after a platform change, pytube often still works, and
// the other way round.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::traits::{StreamHandle, StreamListing, StreamSource};
use crate::downloader::errors::DownloadError;
use crate::downloader::utils::run_output_with_timeout;

const LIST_SCRIPT: &str = r#"
import json, sys
from pytube import YouTube
url, proxy = sys.argv[1], sys.argv[2]
yt = YouTube(url, proxies={"http": proxy, "https": proxy} if proxy else None)
streams = []
for s in yt.streams:
    streams.append({
        "itag": s.itag,
        "mime_type": s.mime_type,
        "resolution": getattr(s, "resolution", None),
        "abr": getattr(s, "abr", None),
        "is_progressive": s.is_progressive,
        "includes_video": s.includes_video_track,
        "includes_audio": s.includes_audio_track,
        "filesize": getattr(s, "_filesize", None) or None,
    })
print(json.dumps({
    "title": yt.title,
    "author": yt.author,
    "length": yt.length,
    "thumbnail_url": yt.thumbnail_url,
    "streams": streams,
}))
"#;

// Written under a `.part` name and renamed only once complete, so a killed
// download never sits under the final name
const DOWNLOAD_SCRIPT: &str = r#"
import os, sys
from pytube import YouTube
url, proxy, itag, out_dir, filename = sys.argv[1:6]
yt = YouTube(url, proxies={"http": proxy, "https": proxy} if proxy else None)
stream = yt.streams.get_by_itag(int(itag))
if stream is None:
    sys.exit("ERROR: itag %s is not available" % itag)
partial = stream.download(output_path=out_dir, filename=filename + ".part")
final = os.path.join(os.path.dirname(partial), filename)
os.replace(partial, final)
print(final)
"#;

pub struct PytubeSource {
    python: String,
    proxy: Option<String>,
    list_timeout_secs: u64,
    download_timeout_secs: u64,
}

impl PytubeSource {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
            proxy: None,
            list_timeout_secs: 60,
            download_timeout_secs: 1800,
        }
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeouts(mut self, list_secs: u64, download_secs: u64) -> Self {
        self.list_timeout_secs = list_secs;
        self.download_timeout_secs = download_secs;
        self
    }

    fn script_args(&self, script: &str, url: &str) -> Vec<String> {
        vec![
            "-c".to_string(),
            script.to_string(),
            url.to_string(),
            self.proxy.clone().unwrap_or_default(),
        ]
    }

    async fn run(&self, args: Vec<String>, timeout_secs: u64) -> Result<String, DownloadError> {
        let output = run_output_with_timeout(&self.python, args, timeout_secs).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::from_stderr(&stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn parse_listing(stdout: &str) -> Result<StreamListing, DownloadError> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with('{'))
        .ok_or_else(|| DownloadError::Parse("pytube printed no stream listing".to_string()))?;
    serde_json::from_str(line).map_err(|e| DownloadError::Parse(format!("Invalid JSON: {}", e)))
}

#[async_trait]
impl StreamSource for PytubeSource {
    fn name(&self) -> &'static str {
        "pytube"
    }

    async fn list_available_streams(&self, url: &str) -> Result<StreamListing, DownloadError> {
        let args = self.script_args(LIST_SCRIPT, url);
        tracing::debug!("[pytube] listing streams for {}", url);
        let stdout = self.run(args, self.list_timeout_secs).await?;
        parse_listing(&stdout)
    }

    async fn download(
        &self,
        url: &str,
        stream: &StreamHandle,
        dest: &Path,
    ) -> Result<PathBuf, DownloadError> {
        let out_dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let filename = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DownloadError::Io(format!("invalid destination {}", dest.display())))?;

        let mut args = self.script_args(DOWNLOAD_SCRIPT, url);
        args.push(stream.itag.to_string());
        args.push(out_dir.to_string_lossy().into_owned());
        args.push(filename);

        tracing::debug!("[pytube] downloading itag {} to {}", stream.itag, dest.display());
        let stdout = self.run(args, self.download_timeout_secs).await?;

        let written = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| dest.to_path_buf());
        Ok(written)
    }
}
