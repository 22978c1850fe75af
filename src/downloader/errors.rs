// Error types for extraction strategies and the download chain

use std::path::PathBuf;

use thiserror::Error;

use super::extractors::{diagnose_error, BlockingReason};

#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// Network, parse or platform-side block reported by an extractor
    #[error("{message}")]
    Extraction {
        message: String,
        reason: Option<BlockingReason>,
    },

    #[error("Invalid video id: {0:?}")]
    InvalidVideoId(String),

    /// Requested format key could not be mapped to a stream
    #[error("Requested format '{0}' is not available")]
    Selection(String),

    /// Extractor reported success but no usable file is on disk
    #[error("Downloaded file not found for {video_id} (expected {})", expected.display())]
    ArtifactNotFound { video_id: String, expected: PathBuf },

    /// Terminal: every configured strategy failed. Carries the last strategy's error.
    #[error("{last_error}")]
    AllStrategiesExhausted { attempts: usize, last_error: String },

    /// yt-dlp, python or pytube not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Child process exceeded its time budget
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// Failed to parse extractor JSON output
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl DownloadError {
    /// Classify raw extractor stderr into an extraction failure
    pub fn from_stderr(stderr: &str) -> Self {
        let message = summarize_stderr(stderr);
        Self::Extraction {
            reason: diagnose_error(stderr),
            message,
        }
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Extraction {
            reason: diagnose_error(&message),
            message,
        }
    }

    /// Diagnosed blocking reason, when the failure came from the platform side
    pub fn blocking_reason(&self) -> Option<BlockingReason> {
        match self {
            Self::Extraction { reason, .. } => *reason,
            Self::Timeout(_) => Some(BlockingReason::NetworkTimeout),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Failure of the metadata-only path, after its own fallback chain is exhausted
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProbeFailure {
    /// Original error message, preserved for diagnostics
    pub message: String,
    pub reason: Option<BlockingReason>,
}

impl From<DownloadError> for ProbeFailure {
    fn from(e: DownloadError) -> Self {
        Self {
            reason: e.blocking_reason(),
            message: e.to_string(),
        }
    }
}

/// Keep the lines that say what went wrong; yt-dlp stderr is mostly noise
fn summarize_stderr(stderr: &str) -> String {
    let important: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR:") || l.contains("HTTP Error") || l.contains("Traceback"))
        .take(3)
        .collect();

    if !important.is_empty() {
        return important.join(" | ");
    }

    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("extractor failed without output")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_summary_prefers_error_lines() {
        let stderr = "[youtube] abc: Downloading webpage\nWARNING: noise\nERROR: [youtube] abc: Video unavailable\n";
        let err = DownloadError::from_stderr(stderr);
        assert_eq!(err.to_string(), "ERROR: [youtube] abc: Video unavailable");
        assert_eq!(err.blocking_reason(), Some(BlockingReason::VideoUnavailable));
    }

    #[test]
    fn stderr_summary_falls_back_to_last_line() {
        let err = DownloadError::from_stderr("first\nsecond line\n\n");
        assert_eq!(err.to_string(), "second line");
    }

    #[test]
    fn exhausted_displays_last_error_verbatim() {
        let err = DownloadError::AllStrategiesExhausted {
            attempts: 3,
            last_error: "HTTP Error 403: Forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP Error 403: Forbidden");
    }

    #[test]
    fn probe_failure_keeps_message() {
        let failure = ProbeFailure::from(DownloadError::Timeout(30));
        assert_eq!(failure.message, "Timed out after 30s");
        assert_eq!(failure.reason, Some(BlockingReason::NetworkTimeout));
    }
}
