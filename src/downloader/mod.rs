// Downloader module - strategy chain, stream selection and artifact checks

pub mod artifact;
pub mod backends;
pub mod config;
pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod tools;
pub mod traits;
pub mod utils;

pub use artifact::ArtifactResolver;
pub use config::DownloaderConfig;
pub use errors::{DownloadError, ProbeFailure};
pub use extractors::BlockingReason;
pub use format_selector::{FormatSelector, DEFAULT_MAX_STREAMS};
pub use models::{DownloadOutcome, MediaInfo, RawFormat, RawInfo, StreamDescriptor, StreamKind};
pub use orchestrator::{AttemptState, Downloader};
pub use traits::{ExtractionStrategy, StrategyArtifact};
