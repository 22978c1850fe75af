// Helper functions shared by extractors and strategies

use std::path::{Path, PathBuf};
use std::process::Stdio;

use regex::Regex;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration as TokioDuration};

use super::errors::DownloadError;
use super::models::RawInfo;

lazy_static::lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).unwrap();
    static ref TEMPLATE_FIELD: Regex = Regex::new(r"%\((\w+)\)s").unwrap();
    static ref VIDEO_ID: Regex = Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap();
}

/// Canonical watch URL for a video identifier
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// The id ends up in filenames and in the directory scan, so it must be a
/// plain token. An empty id would match every file in the folder.
pub fn validate_video_id(video_id: &str) -> Result<&str, DownloadError> {
    let trimmed = video_id.trim();
    if VIDEO_ID.is_match(trimmed) {
        Ok(trimmed)
    } else {
        Err(DownloadError::InvalidVideoId(video_id.to_string()))
    }
}

/// Run command with timeout, capturing stdout and stderr
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DownloadError::ToolNotFound(program.to_string()),
            _ => DownloadError::Io(format!("Failed to start {}: {}", program, e)),
        })?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::Io(format!("Failed to capture stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::Io(format!("Failed to capture stderr from {}", program)))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(TokioDuration::from_secs(timeout_secs), child.wait()).await {
        Ok(status_res) => {
            let status = status_res?;
            let stdout = stdout_task
                .await
                .map_err(|e| DownloadError::Io(format!("stdout task failed: {}", e)))??;
            let stderr = stderr_task
                .await
                .map_err(|e| DownloadError::Io(format!("stderr task failed: {}", e)))??;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::Timeout(timeout_secs))
        }
    }
}

/// Strip characters that are not portable in filenames
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(name, "_");
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Render a `%(field)s` output template against extractor metadata
pub fn render_template(template: &str, info: &RawInfo) -> String {
    TEMPLATE_FIELD
        .replace_all(template, |caps: &regex::Captures| {
            let value = match &caps[1] {
                "title" => info.title.as_deref().map(sanitize_filename),
                "id" => info.id.clone(),
                "ext" => info.ext.clone(),
                "uploader" => info.uploader.as_deref().map(sanitize_filename),
                _ => None,
            };
            value.unwrap_or_else(|| "NA".to_string())
        })
        .into_owned()
}

/// File size in megabytes, two decimals
pub fn file_size_mb(path: &Path) -> Result<f64, DownloadError> {
    let len = std::fs::metadata(path)?.len();
    Ok(super::format_selector::size_mb(len))
}

/// Path relative to the working directory when it lives below it
pub fn display_path(path: &Path) -> PathBuf {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
}
