use serde::{Deserialize, Serialize};
use std::process::Command;

use super::config::DownloaderConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolType {
    /// `python -m yt_dlp`
    YtDlpModule,
    /// Native `yt-dlp` binary
    YtDlpBinary,
    /// `pytube` Python library
    Pytube,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlpModule => "yt_dlp (python)",
            ToolType::YtDlpBinary => "yt-dlp",
            ToolType::Pytube => "pytube (python)",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

/// How yt-dlp gets launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YtDlpLauncher {
    PythonModule { python: String },
    Binary { path: String },
}

impl YtDlpLauncher {
    pub fn program(&self) -> &str {
        match self {
            Self::PythonModule { python } => python,
            Self::Binary { path } => path,
        }
    }

    /// Arguments that come before yt-dlp's own flags
    pub fn prefix_args(&self) -> Vec<String> {
        match self {
            Self::PythonModule { .. } => vec!["-m".to_string(), "yt_dlp".to_string()],
            Self::Binary { .. } => Vec::new(),
        }
    }
}

pub struct ToolManager {
    python: String,
    ytdlp_override: Option<String>,
}

impl ToolManager {
    pub fn new(config: &DownloaderConfig) -> Self {
        Self {
            python: config.python.clone().unwrap_or_else(find_python),
            ytdlp_override: config.ytdlp_binary.clone(),
        }
    }

    pub fn python(&self) -> &str {
        &self.python
    }

    /// Python module when importable (better at avoiding bot checks), else the binary
    pub fn ytdlp_launcher(&self) -> YtDlpLauncher {
        if self.ytdlp_override.is_none() && self.python_has_module("yt_dlp") {
            return YtDlpLauncher::PythonModule {
                python: self.python.clone(),
            };
        }
        let path = self
            .ytdlp_override
            .clone()
            .or_else(|| self.find_binary("yt-dlp"))
            .unwrap_or_else(|| "yt-dlp".to_string());
        YtDlpLauncher::Binary { path }
    }

    pub fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let (path, version) = match tool_type {
            ToolType::YtDlpModule => self.module_info("yt_dlp", "yt_dlp.version.__version__"),
            ToolType::Pytube => self.module_info("pytube", "pytube.__version__"),
            ToolType::YtDlpBinary => {
                let path = self
                    .ytdlp_override
                    .clone()
                    .or_else(|| self.find_binary("yt-dlp"));
                let version = path.as_deref().and_then(|p| command_version(p, &["--version"]));
                (path, version)
            }
        };

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            is_available: path.is_some(),
            version,
            path,
        }
    }

    pub fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlpModule),
            self.get_tool_info(ToolType::YtDlpBinary),
            self.get_tool_info(ToolType::Pytube),
        ]
    }

    pub fn python_has_module(&self, module: &str) -> bool {
        let code = format!("import {}", module);
        match Command::new(&self.python).args(["-c", &code]).output() {
            Ok(out) => out.status.success(),
            Err(_) => false,
        }
    }

    fn module_info(&self, module: &str, version_expr: &str) -> (Option<String>, Option<String>) {
        if !self.python_has_module(module) {
            return (None, None);
        }
        let code = format!("import {}; print({})", module, version_expr);
        let version = command_version(&self.python, &["-c", &code]);
        (Some(self.python.clone()), version)
    }

    fn find_binary(&self, name: &str) -> Option<String> {
        which::which(name)
            .ok()
            .map(|p| p.to_string_lossy().into_owned())
    }
}

fn find_python() -> String {
    // Allow overriding the interpreter (e.g. a venv)
    if let Ok(custom) = std::env::var("YTDLP_PYTHON") {
        return custom;
    }
    for candidate in ["python3", "python"] {
        if let Ok(path) = which::which(candidate) {
            return path.to_string_lossy().into_owned();
        }
    }
    "python3".to_string()
}

fn command_version(program: &str, args: &[&str]) -> Option<String> {
    match Command::new(program).args(args).output() {
        Ok(output) if output.status.success() => {
            let out = String::from_utf8_lossy(&output.stdout).trim().to_string();
            Some(out).filter(|v| !v.is_empty())
        }
        _ => None,
    }
}
