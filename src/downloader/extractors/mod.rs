// Extractor adapters - the external libraries behind each strategy
//
// - yt-dlp: `python3 -m yt_dlp` when importable, native `yt-dlp` otherwise
// - pytube: independent library, requested stream by stream
//
// Both are opaque capability providers. They may fail at any time; the
// strategies in `backends` decide what a failure means.

mod diagnostics;
mod pytube;
mod traits;
mod ytdlp;

pub use diagnostics::{diagnose_error, BlockingReason};
pub use pytube::PytubeSource;
pub use traits::{
    ExtractOptions, MediaExtractor, StreamHandle, StreamListing, StreamSource,
};
pub use ytdlp::YtDlpExtractor;
