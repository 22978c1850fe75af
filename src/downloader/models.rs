// Common data models for the downloader

use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Marker emitted at the display boundary for any absent field
pub const UNKNOWN: &str = "unknown";

/// One entry of an extractor's `formats` array, as loosely typed as the source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFormat {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub height: Option<u32>,
    /// Average audio bitrate in kbps
    pub abr: Option<f64>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    pub format_note: Option<String>,
}

impl RawFormat {
    pub fn from_json(f: &Value) -> Self {
        Self {
            format_id: json_string(&f["format_id"]),
            ext: json_string(&f["ext"]),
            vcodec: json_string(&f["vcodec"]),
            acodec: json_string(&f["acodec"]),
            height: json_u64(&f["height"]).and_then(|h| u32::try_from(h).ok()),
            abr: f["abr"].as_f64(),
            filesize: json_u64(&f["filesize"]),
            filesize_approx: json_u64(&f["filesize_approx"]),
            format_note: json_string(&f["format_note"]),
        }
    }

    /// Exact size when known, otherwise the extractor's estimate
    pub fn effective_size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }
}

/// Metadata document returned by an extraction call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<u64>,
    pub uploader: Option<String>,
    pub ext: Option<String>,
    /// Filename the extractor predicted before post-processing
    pub filename: Option<String>,
    /// Final path after post-processing, when the extractor reported it
    pub filepath: Option<String>,
    pub formats: Vec<RawFormat>,
}

impl RawInfo {
    pub fn from_json(json: &Value) -> Self {
        let formats = json["formats"]
            .as_array()
            .map(|arr| arr.iter().map(RawFormat::from_json).collect())
            .unwrap_or_default();

        let filepath = json["requested_downloads"]
            .as_array()
            .and_then(|d| d.first())
            .and_then(|d| json_string(&d["filepath"]));

        Self {
            id: json_string(&json["id"]),
            title: json_string(&json["title"]),
            thumbnail: json_string(&json["thumbnail"]),
            duration: json_u64(&json["duration"]),
            uploader: json_string(&json["uploader"]).or_else(|| json_string(&json["channel"])),
            ext: json_string(&json["ext"]),
            filename: json_string(&json["_filename"]).or_else(|| json_string(&json["filename"])),
            filepath,
            formats,
        }
    }

    /// An extraction that produced nothing usable
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.title.is_none() && self.formats.is_empty()
    }
}

fn json_string(v: &Value) -> Option<String> {
    v.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

/// Integers sometimes arrive as floats (`duration: 212.0`)
fn json_u64(v: &Value) -> Option<u64> {
    v.as_u64()
        .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    pub fn default_note(&self) -> &'static str {
        match self {
            Self::Video => "Video",
            Self::Audio => "Audio",
        }
    }
}

/// One selectable media representation
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// Strategy-specific key used to request this exact stream
    pub format_key: String,
    pub kind: StreamKind,
    /// Height in pixels (video only)
    pub height: Option<u32>,
    /// Average bitrate in whole kbps (audio only)
    pub bitrate_kbps: Option<u32>,
    pub container: Option<String>,
    pub size_estimate_mb: Option<f64>,
    pub label: String,
}

impl StreamDescriptor {
    /// Numeric axis used for ranking; absent values rank as zero
    pub fn rank_axis(&self) -> u32 {
        match self.kind {
            StreamKind::Video => self.height.unwrap_or(0),
            StreamKind::Audio => self.bitrate_kbps.unwrap_or(0),
        }
    }

    pub fn resolution_display(&self) -> String {
        self.height
            .map(|h| format!("{}p", h))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn bitrate_display(&self) -> String {
        self.bitrate_kbps
            .map(|b| format!("{}kbps", b))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn container_display(&self) -> &str {
        self.container.as_deref().unwrap_or(UNKNOWN)
    }
}

/// Present numbers serialize as numbers, absent ones as the `unknown` marker
#[derive(Serialize)]
#[serde(untagged)]
enum Measure {
    Value(f64),
    Unknown(&'static str),
}

impl From<Option<f64>> for Measure {
    fn from(v: Option<f64>) -> Self {
        v.map(Measure::Value).unwrap_or(Measure::Unknown(UNKNOWN))
    }
}

impl Serialize for StreamDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("StreamDescriptor", 6)?;
        s.serialize_field("format_key", &self.format_key)?;
        match self.kind {
            StreamKind::Video => s.serialize_field("resolution", &self.resolution_display())?,
            StreamKind::Audio => s.serialize_field("bitrate", &self.bitrate_display())?,
        }
        s.serialize_field("container", self.container_display())?;
        s.serialize_field("size_mb", &Measure::from(self.size_estimate_mb))?;
        s.serialize_field("label", &self.label)?;
        s.serialize_field("kind", &self.kind)?;
        s.end()
    }
}

/// Metadata snapshot for one identifier. Built fresh per probe, never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaInfo {
    pub title: Option<String>,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "duration")]
    pub duration_seconds: Option<u64>,
    pub author: Option<String>,
    pub video_streams: Vec<StreamDescriptor>,
    pub audio_streams: Vec<StreamDescriptor>,
}

/// Result of one download request
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOutcome {
    pub succeeded: bool,
    pub resolved_path: Option<PathBuf>,
    pub size_mb: Option<f64>,
    pub container: Option<String>,
    pub title: Option<String>,
    pub failure_reason: Option<String>,
}

impl DownloadOutcome {
    pub fn success(
        path: PathBuf,
        size_mb: f64,
        container: Option<String>,
        title: Option<String>,
    ) -> Self {
        Self {
            succeeded: true,
            resolved_path: Some(path),
            size_mb: Some(size_mb),
            container,
            title,
            failure_reason: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            resolved_path: None,
            size_mb: None,
            container: None,
            title: None,
            failure_reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_info_reads_ytdlp_document() {
        let doc = json!({
            "id": "dQw4w9WgXcQ",
            "title": "Clip",
            "duration": 212.0,
            "channel": "Someone",
            "ext": "webm",
            "_filename": "static/downloads/Clip-dQw4w9WgXcQ.webm",
            "requested_downloads": [{"filepath": "static/downloads/Clip-dQw4w9WgXcQ.mp4"}],
            "formats": [
                {"format_id": "137", "vcodec": "avc1", "acodec": "none", "height": 1080, "filesize_approx": 5.0e6},
                {"format_id": "140", "vcodec": "none", "acodec": "mp4a", "abr": 129.5}
            ]
        });

        let info = RawInfo::from_json(&doc);
        assert_eq!(info.duration, Some(212));
        assert_eq!(info.uploader.as_deref(), Some("Someone"));
        assert_eq!(info.filepath.as_deref(), Some("static/downloads/Clip-dQw4w9WgXcQ.mp4"));
        assert_eq!(info.formats.len(), 2);
        assert_eq!(info.formats[0].effective_size(), Some(5_000_000));
        assert_eq!(info.formats[1].abr, Some(129.5));
    }

    #[test]
    fn empty_document_is_empty() {
        assert!(RawInfo::from_json(&json!({})).is_empty());
        assert!(!RawInfo::from_json(&json!({"id": "x"})).is_empty());
    }

    #[test]
    fn unknown_fields_serialize_as_marker() {
        let stream = StreamDescriptor {
            format_key: "18".to_string(),
            kind: StreamKind::Video,
            height: None,
            bitrate_kbps: None,
            container: None,
            size_estimate_mb: None,
            label: "Video (unknown)".to_string(),
        };
        let v = serde_json::to_value(&stream).unwrap();
        assert_eq!(v["resolution"], "unknown");
        assert_eq!(v["container"], "unknown");
        assert_eq!(v["size_mb"], "unknown");
        assert_eq!(v["kind"], "video");
    }
}
