// yt-dlp extractor - drives `python3 -m yt_dlp` or the native binary
//
// The Python module is preferred when importable: it tends to trip fewer
// bot checks. Either way the same flags apply.

use std::path::PathBuf;

use async_trait::async_trait;

use super::traits::{ExtractOptions, MediaExtractor};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::RawInfo;
use crate::downloader::tools::YtDlpLauncher;
use crate::downloader::utils::{render_template, run_output_with_timeout};

/// yt-dlp's own default output template
const DEFAULT_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";

const SOCKET_TIMEOUT_SECS: &str = "30";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallMode {
    Metadata,
    Download,
}

pub struct YtDlpExtractor {
    launcher: YtDlpLauncher,
}

impl YtDlpExtractor {
    pub fn new(launcher: YtDlpLauncher) -> Self {
        Self { launcher }
    }

    fn build_args(&self, url: &str, options: &ExtractOptions, mode: CallMode) -> Vec<String> {
        let mut args = self.launcher.prefix_args();

        match mode {
            CallMode::Metadata => {
                args.push("--dump-single-json".to_string());
            }
            CallMode::Download => {
                // JSON first, then the final path once post-processing is done
                args.extend([
                    "--no-simulate".to_string(),
                    "--dump-json".to_string(),
                    "--print".to_string(),
                    "after_move:filepath".to_string(),
                ]);
            }
        }

        args.extend([
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--quiet".to_string(),
            "--socket-timeout".to_string(),
            SOCKET_TIMEOUT_SECS.to_string(),
        ]);

        if let Some(format) = &options.format {
            args.push("-f".to_string());
            args.push(format.clone());
        }

        if mode == CallMode::Download {
            if let Some(template) = &options.output_template {
                args.push("-o".to_string());
                args.push(template.clone());
            }
            if let Some(container) = &options.merge_output_format {
                args.push("--merge-output-format".to_string());
                args.push(container.clone());
            }
        }

        if let Some(path) = &options.cookie_file {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().into_owned());
        }

        if let Some(ua) = &options.user_agent {
            args.push("--user-agent".to_string());
            args.push(ua.clone());
        }

        if options.no_check_certificates {
            args.push("--no-check-certificates".to_string());
        }

        if !options.player_clients.is_empty() {
            args.push("--extractor-args".to_string());
            args.push(format!(
                "youtube:player_client={}",
                options.player_clients.join(",")
            ));
        }

        if let Some(proxy) = &options.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args.push(url.to_string());
        args
    }

    async fn run(&self, args: Vec<String>, timeout_secs: u64) -> Result<Vec<u8>, DownloadError> {
        tracing::debug!(
            "[{}] running: {} {}",
            self.name(),
            self.launcher.program(),
            args.join(" ")
        );

        let output = run_output_with_timeout(self.launcher.program(), args, timeout_secs).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::from_stderr(&stderr));
        }

        Ok(output.stdout)
    }
}

/// Metadata JSON document from `--dump-single-json`
fn parse_metadata(stdout: &[u8]) -> Result<RawInfo, DownloadError> {
    let json_str = String::from_utf8_lossy(stdout);
    let json: serde_json::Value = serde_json::from_str(json_str.trim())
        .map_err(|e| DownloadError::Parse(format!("Invalid JSON: {}", e)))?;
    Ok(RawInfo::from_json(&json))
}

/// Download output: one JSON line, then the final path printed after moving
fn parse_download_output(stdout: &[u8]) -> Result<RawInfo, DownloadError> {
    let text = String::from_utf8_lossy(stdout);
    let mut info: Option<RawInfo> = None;
    let mut final_path: Option<String> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with('{') {
            let json: serde_json::Value = serde_json::from_str(line)
                .map_err(|e| DownloadError::Parse(format!("Invalid JSON: {}", e)))?;
            info = Some(RawInfo::from_json(&json));
        } else if !line.starts_with('[') {
            final_path = Some(line.to_string());
        }
    }

    let mut info = info.ok_or_else(|| {
        DownloadError::extraction("yt-dlp finished without reporting metadata")
    })?;
    if final_path.is_some() {
        info.filepath = final_path;
    }
    Ok(info)
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        match self.launcher {
            YtDlpLauncher::PythonModule { .. } => "python-yt-dlp",
            YtDlpLauncher::Binary { .. } => "cli-yt-dlp",
        }
    }

    async fn extract_metadata(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<RawInfo, DownloadError> {
        let args = self.build_args(url, options, CallMode::Metadata);
        let stdout = self.run(args, options.timeout_secs).await?;
        parse_metadata(&stdout)
    }

    async fn extract_and_download(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<RawInfo, DownloadError> {
        let args = self.build_args(url, options, CallMode::Download);
        let stdout = self.run(args, options.timeout_secs).await?;
        parse_download_output(&stdout)
    }

    fn prepare_filename(&self, info: &RawInfo, options: &ExtractOptions) -> PathBuf {
        if let Some(path) = info.filepath.as_ref().or(info.filename.as_ref()) {
            return PathBuf::from(path);
        }
        let template = options.output_template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
        PathBuf::from(render_template(template, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary() -> YtDlpExtractor {
        YtDlpExtractor::new(YtDlpLauncher::Binary {
            path: "yt-dlp".to_string(),
        })
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn full_download_args() {
        let options = ExtractOptions {
            format: Some("137/bestvideo+bestaudio/best".to_string()),
            output_template: Some("dl/%(title)s-%(id)s.%(ext)s".to_string()),
            merge_output_format: Some("mp4".to_string()),
            cookie_file: Some(PathBuf::from("cookies.txt")),
            user_agent: Some("UA".to_string()),
            no_check_certificates: true,
            player_clients: vec!["web".to_string(), "web_safari".to_string()],
            proxy: None,
            timeout_secs: 10,
        };
        let args = binary().build_args("URL", &options, CallMode::Download);

        assert!(has_pair(&args, "-f", "137/bestvideo+bestaudio/best"));
        assert!(has_pair(&args, "-o", "dl/%(title)s-%(id)s.%(ext)s"));
        assert!(has_pair(&args, "--merge-output-format", "mp4"));
        assert!(has_pair(&args, "--cookies", "cookies.txt"));
        assert!(has_pair(&args, "--user-agent", "UA"));
        assert!(has_pair(&args, "--extractor-args", "youtube:player_client=web,web_safari"));
        assert!(args.contains(&"--no-check-certificates".to_string()));
        assert!(args.contains(&"--no-simulate".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("URL"));
    }

    #[test]
    fn minimal_args_carry_no_headers() {
        let options = ExtractOptions::minimal(10).with_format("best");
        let args = binary().build_args("URL", &options, CallMode::Download);

        assert!(has_pair(&args, "-f", "best"));
        for flag in ["--cookies", "--user-agent", "--extractor-args", "--no-check-certificates"] {
            assert!(!args.contains(&flag.to_string()), "unexpected {}", flag);
        }
    }

    #[test]
    fn metadata_args_skip_output_flags() {
        let options = ExtractOptions::minimal(10)
            .with_output_template("x.%(ext)s")
            .with_format("best");
        let args = binary().build_args("URL", &options, CallMode::Metadata);
        assert!(args.contains(&"--dump-single-json".to_string()));
        assert!(!args.contains(&"-o".to_string()));
    }

    #[test]
    fn module_launcher_prefixes_python_args() {
        let ex = YtDlpExtractor::new(YtDlpLauncher::PythonModule {
            python: "python3".to_string(),
        });
        let args = ex.build_args("URL", &ExtractOptions::minimal(5), CallMode::Metadata);
        assert_eq!(&args[..2], ["-m", "yt_dlp"]);
        assert_eq!(ex.name(), "python-yt-dlp");
    }

    #[test]
    fn download_output_prefers_printed_path() {
        let stdout = b"{\"id\": \"abc\", \"title\": \"T\", \"ext\": \"webm\", \"_filename\": \"dl/T-abc.webm\"}\ndl/T-abc.mp4\n";
        let info = parse_download_output(stdout).unwrap();
        assert_eq!(info.filepath.as_deref(), Some("dl/T-abc.mp4"));

        let path = binary().prepare_filename(&info, &ExtractOptions::default());
        assert_eq!(path, PathBuf::from("dl/T-abc.mp4"));
    }

    #[test]
    fn download_output_without_json_is_extraction_failure() {
        let err = parse_download_output(b"dl/T-abc.mp4\n").unwrap_err();
        assert!(matches!(err, DownloadError::Extraction { .. }));
    }

    #[test]
    fn prepare_filename_renders_template_when_unreported() {
        let info = RawInfo {
            id: Some("abc".to_string()),
            ext: Some("mp4".to_string()),
            ..Default::default()
        };
        let options = ExtractOptions::minimal(5).with_output_template("dl/fallback_%(id)s.%(ext)s");
        assert_eq!(
            binary().prepare_filename(&info, &options),
            PathBuf::from("dl/fallback_abc.mp4")
        );
    }

    #[test]
    fn metadata_parse_rejects_garbage() {
        assert!(matches!(parse_metadata(b"not json"), Err(DownloadError::Parse(_))));
    }
}
