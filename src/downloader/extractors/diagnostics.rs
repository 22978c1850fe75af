// Blocking diagnostics - names the reason an extractor was turned away
//
// Purely informational: strategies still fall through to the next one
// whatever the reason, but the reason makes the final error actionable.

use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static::lazy_static! {
    /// Places where yt-dlp echoes the video id: `[youtube] <id>:` and `watch?v=<id>`.
    /// Ids are random text, so "drm" or "403" can hide inside one.
    static ref ID_ECHO: Regex = Regex::new(r"\[[^\]\s]+\]\s+[^\s:]+:|watch\?v=[\w-]+").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    /// HTTP 403 Forbidden
    Http403Forbidden,
    /// Formats hidden behind SABR streaming
    SabrStreaming,
    /// Proof-of-origin token required (mobile clients)
    PoTokenRequired,
    AgeRestricted,
    PrivateVideo,
    VideoUnavailable,
    GeoBlocked,
    /// 429 or similar
    RateLimited,
    /// "Sign in to confirm you're not a bot"
    BotDetection,
    DrmProtected,
    MembersOnly,
    /// Soft IP block or plain network trouble
    NetworkTimeout,
    Unknown,
}

/// Checked in order; the first matching group wins
const PATTERNS: &[(BlockingReason, &[&str])] = &[
    (
        BlockingReason::DrmProtected,
        &["drm", "widevine", "playready", "fairplay", "requires purchase", "rental"],
    ),
    (
        BlockingReason::MembersOnly,
        &["members only", "members-only", "join this channel", "available to members"],
    ),
    (BlockingReason::SabrStreaming, &["sabr"]),
    (BlockingReason::PoTokenRequired, &["po token", "proof of origin"]),
    (
        BlockingReason::AgeRestricted,
        &["age-restricted", "confirm your age", "age_verification"],
    ),
    (
        BlockingReason::PrivateVideo,
        &["private video", "video is private", "been granted access"],
    ),
    (
        BlockingReason::VideoUnavailable,
        &["video unavailable", "video is unavailable", "has been removed", "no longer available"],
    ),
    (
        BlockingReason::GeoBlocked,
        &["not available in your country", "blocked in your country", "geo restrict"],
    ),
    (
        BlockingReason::RateLimited,
        &["429", "rate limit", "too many requests"],
    ),
    (
        BlockingReason::BotDetection,
        &["not a bot", "captcha", "unusual traffic", "automated"],
    ),
    (BlockingReason::Http403Forbidden, &["403", "forbidden"]),
    (
        BlockingReason::NetworkTimeout,
        &["timed out", "timeout", "connection refused", "network is unreachable", "name resolution"],
    ),
];

impl BlockingReason {
    /// Would the next strategy (different client / library / fewer headers) plausibly help?
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::DrmProtected | Self::VideoUnavailable | Self::PrivateVideo
        )
    }

    pub fn cookies_might_help(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden
                | Self::SabrStreaming
                | Self::AgeRestricted
                | Self::BotDetection
                | Self::PrivateVideo
                | Self::MembersOnly
        )
    }

    /// One-line advice for the log, if there is any worth giving
    pub fn hint(&self) -> Option<&'static str> {
        if !self.is_retryable() {
            Some("permanent restriction, the remaining strategies will likely fail too")
        } else if self.cookies_might_help() {
            Some("export cookies from a logged-in browser into the cookie file")
        } else {
            None
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::SabrStreaming => "SABR streaming protection active",
            Self::PoTokenRequired => "Proof of Origin token required",
            Self::AgeRestricted => "Age-restricted content",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::GeoBlocked => "Geographic restriction",
            Self::RateLimited => "Rate limited by YouTube",
            Self::BotDetection => "Bot detection triggered",
            Self::DrmProtected => "DRM-protected content",
            Self::MembersOnly => "Members-only content",
            Self::NetworkTimeout => "Network timeout (possible IP throttling)",
            Self::Unknown => "Unknown blocking reason",
        }
    }
}

/// Analyze an error message and return the blocking reason, if any text was given
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    if error.trim().is_empty() {
        return None;
    }
    let lower = ID_ECHO.replace_all(error, " ").to_lowercase();
    let reason = PATTERNS
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
        .map(|(reason, _)| *reason)
        .unwrap_or(BlockingReason::Unknown);
    Some(reason)
}
