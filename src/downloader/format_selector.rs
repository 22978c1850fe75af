// FormatSelector - turns raw extractor formats into ranked stream lists
//
// Handles:
// - Video/audio classification (progressive streams count as video)
// - Missing-field degradation (never fails on absent metadata)
// - Size estimation from exact or approximate byte counts
// - Deterministic ranking by resolution / bitrate

use std::collections::HashSet;

use super::models::{RawFormat, StreamDescriptor, StreamKind};

/// Ranked list length when no configuration overrides it
pub const DEFAULT_MAX_STREAMS: usize = 15;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub struct FormatSelector;

impl FormatSelector {
    /// Split raw formats into video and audio descriptors, discarding unusable entries
    pub fn normalize(raw_formats: &[RawFormat]) -> (Vec<StreamDescriptor>, Vec<StreamDescriptor>) {
        let mut video = Vec::new();
        let mut audio = Vec::new();
        let mut seen: HashSet<(StreamKind, String)> = HashSet::new();

        for f in raw_formats {
            let Some(stream) = Self::describe(f) else {
                continue;
            };
            // format_key must be unique within a kind
            if !seen.insert((stream.kind, stream.format_key.clone())) {
                continue;
            }
            match stream.kind {
                StreamKind::Video => video.push(stream),
                StreamKind::Audio => audio.push(stream),
            }
        }

        (video, audio)
    }

    /// Stable, descending by the kind's axis; truncated to `max`
    pub fn rank(mut streams: Vec<StreamDescriptor>, max: usize) -> Vec<StreamDescriptor> {
        streams.sort_by(|a, b| b.rank_axis().cmp(&a.rank_axis()));
        streams.truncate(max);
        streams
    }

    /// Normalize then rank both lists
    pub fn select(
        raw_formats: &[RawFormat],
        max: usize,
    ) -> (Vec<StreamDescriptor>, Vec<StreamDescriptor>) {
        let (video, audio) = Self::normalize(raw_formats);
        (Self::rank(video, max), Self::rank(audio, max))
    }

    fn describe(f: &RawFormat) -> Option<StreamDescriptor> {
        let format_key = f.format_id.as_deref().filter(|id| !id.is_empty())?;
        let kind = Self::classify(f)?;

        let height = match kind {
            StreamKind::Video => f.height.filter(|h| *h > 0),
            StreamKind::Audio => None,
        };
        let bitrate_kbps = match kind {
            StreamKind::Video => None,
            StreamKind::Audio => f.abr.filter(|b| b.is_finite() && *b > 0.0).map(|b| b as u32),
        };

        let mut stream = StreamDescriptor {
            format_key: format_key.to_string(),
            kind,
            height,
            bitrate_kbps,
            container: f.ext.clone().filter(|e| !e.is_empty()),
            size_estimate_mb: f.effective_size().map(size_mb),
            label: String::new(),
        };
        stream.label = Self::label(f.format_note.as_deref(), &stream);
        Some(stream)
    }

    fn classify(f: &RawFormat) -> Option<StreamKind> {
        if has_track(f.vcodec.as_deref()) {
            Some(StreamKind::Video)
        } else if has_track(f.acodec.as_deref()) {
            Some(StreamKind::Audio)
        } else {
            None
        }
    }

    fn label(note: Option<&str>, stream: &StreamDescriptor) -> String {
        let note = note
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| stream.kind.default_note());
        let detail = match stream.kind {
            StreamKind::Video => stream.resolution_display(),
            StreamKind::Audio => stream.bitrate_display(),
        };
        format!("{} ({})", note, detail)
    }
}

/// A codec field describes a decodable track unless absent, empty or "none"
fn has_track(codec: Option<&str>) -> bool {
    codec.map_or(false, |c| !c.is_empty() && c != "none")
}

/// Bytes to megabytes, rounded to two decimals
pub fn size_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}
