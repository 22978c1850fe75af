// Artifact resolver - finds the file an extractor actually produced
//
// Post-processing (merging, re-encoding) changes the extension in ways the
// extractor's own metadata does not always reflect, so resolution is layered:
// 1. the expected path itself
// 2. the expected base name with each known container extension
// 3. any file in the output folder whose name contains the video id

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use super::errors::DownloadError;

lazy_static::lazy_static! {
    /// Single-format intermediate kept before merging (`Title-id.f137.mp4`)
    static ref FORMAT_INTERMEDIATE: Regex = Regex::new(r"\.f\d+\.\w+$").unwrap();
}

/// Containers commonly produced by merging or audio extraction
pub const PROBE_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "webm", "m4a", "mp3"];

/// Suffixes of in-flight or abandoned downloads
const PARTIAL_SUFFIXES: [&str; 4] = [".part", ".ytdl", ".temp", ".tmp"];

/// Infixes of in-flight files: the merger writes `Title-id.temp.mp4`
const PARTIAL_INFIXES: [&str; 2] = [".temp.", ".part-Frag"];

pub struct ArtifactResolver;

impl ArtifactResolver {
    pub fn resolve(expected: &Path, video_id: &str) -> Result<PathBuf, DownloadError> {
        if is_complete_artifact(expected) {
            return Ok(expected.to_path_buf());
        }

        for ext in PROBE_EXTENSIONS {
            let candidate = expected.with_extension(ext);
            if is_complete_artifact(&candidate) {
                tracing::debug!(
                    "artifact found by extension probe: {}",
                    candidate.display()
                );
                return Ok(candidate);
            }
        }

        let dir = expected
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if let Some(found) = scan_for_id(dir, video_id) {
            tracing::debug!("artifact found by directory scan: {}", found.display());
            return Ok(found);
        }

        Err(DownloadError::ArtifactNotFound {
            video_id: video_id.to_string(),
            expected: expected.to_path_buf(),
        })
    }

    /// Files for `video_id` already present before an attempt starts
    pub fn snapshot(dir: &Path, video_id: &str) -> BTreeSet<PathBuf> {
        entries_for_id(dir, video_id)
    }

    /// Remove files for `video_id` that appeared since `before` was taken.
    /// A killed writer can leave a non-empty file under its final name.
    pub fn discard_new(dir: &Path, video_id: &str, before: &BTreeSet<PathBuf>) -> usize {
        let mut removed = 0;
        for path in entries_for_id(dir, video_id).difference(before) {
            if path.is_file() && fs::remove_file(path).is_ok() {
                tracing::debug!("removed artifact of failed attempt {}", path.display());
                removed += 1;
            }
        }
        removed
    }

    /// Remove partial or empty leftovers for `video_id` so a later attempt
    /// cannot be satisfied by them
    pub fn cleanup_partials(dir: &Path, video_id: &str) -> usize {
        let Ok(entries) = fs::read_dir(dir) else {
            return 0;
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.contains(video_id) || !path.is_file() {
                continue;
            }
            let empty = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(false);
            if (is_partial_name(&name) || empty) && fs::remove_file(&path).is_ok() {
                tracing::debug!("removed partial artifact {}", path.display());
                removed += 1;
            }
        }
        removed
    }
}

/// A regular, non-empty file that is not an in-flight download
pub fn is_complete_artifact(path: &Path) -> bool {
    let name_ok = path
        .file_name()
        .map(|n| !is_partial_name(&n.to_string_lossy()))
        .unwrap_or(false);
    name_ok
        && fs::metadata(path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
}

fn is_partial_name(name: &str) -> bool {
    PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s))
        || PARTIAL_INFIXES.iter().any(|s| name.contains(s))
        || FORMAT_INTERMEDIATE.is_match(name)
}

/// Entries of `dir` whose name contains `video_id`
fn entries_for_id(dir: &Path, video_id: &str) -> BTreeSet<PathBuf> {
    if video_id.is_empty() {
        return BTreeSet::new();
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return BTreeSet::new();
    };
    entries
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().contains(video_id))
        .map(|e| e.path())
        .collect()
}

fn scan_for_id(dir: &Path, video_id: &str) -> Option<PathBuf> {
    entries_for_id(dir, video_id)
        .into_iter()
        .find(|p| is_complete_artifact(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, bytes: &[u8]) {
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn expected_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("Clip-abc.mp4");
        touch(&expected, b"data");
        assert_eq!(ArtifactResolver::resolve(&expected, "abc").unwrap(), expected);
    }

    #[test]
    fn extension_variant_is_found() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("X.webm");
        let merged = dir.path().join("X.mp4");
        touch(&merged, b"merged");
        assert_eq!(ArtifactResolver::resolve(&expected, "X").unwrap(), merged);
    }

    #[test]
    fn directory_scan_matches_id() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("Title-vid42.webm");
        let fallback = dir.path().join("fallback_vid42.mkv");
        touch(&fallback, b"x");
        touch(&dir.path().join("other.mp4"), b"x");
        assert_eq!(ArtifactResolver::resolve(&expected, "vid42").unwrap(), fallback);
    }

    #[test]
    fn partial_and_empty_files_do_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("Title-vid42.mp4");
        touch(&dir.path().join("Title-vid42.mp4.part"), b"half");
        touch(&dir.path().join("Title-vid42.mkv"), b"");
        touch(&dir.path().join("Title-vid42.temp.mp4"), b"merging");
        touch(&dir.path().join("Title-vid42.f137.mp4"), b"video only");
        touch(&dir.path().join("Title-vid42.f140.m4a"), b"audio only");
        let err = ArtifactResolver::resolve(&expected, "vid42").unwrap_err();
        assert!(matches!(err, DownloadError::ArtifactNotFound { .. }));
    }

    #[test]
    fn merger_temp_file_is_not_resolved() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Clip-abc.temp.mp4"), b"half merged");
        let expected = dir.path().join("Clip-abc.webm");
        assert!(ArtifactResolver::resolve(&expected, "abc").is_err());
    }

    #[test]
    fn discard_new_keeps_earlier_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Old-abc.mp4"), b"earlier download");
        let before = ArtifactResolver::snapshot(dir.path(), "abc");

        touch(&dir.path().join("abc_pytube.mp4"), b"killed mid-write");
        touch(&dir.path().join("unrelated.mp4"), b"x");

        assert_eq!(ArtifactResolver::discard_new(dir.path(), "abc", &before), 1);
        assert!(dir.path().join("Old-abc.mp4").exists());
        assert!(dir.path().join("unrelated.mp4").exists());
        assert!(!dir.path().join("abc_pytube.mp4").exists());
    }

    #[test]
    fn nothing_found_is_artifact_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("missing.mp4");
        assert!(ArtifactResolver::resolve(&expected, "zzz").is_err());
    }

    #[test]
    fn cleanup_removes_only_leftovers_for_id() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("T-id1.f137.mp4.part"), b"x");
        touch(&dir.path().join("T-id1.mp4.ytdl"), b"x");
        touch(&dir.path().join("T-id1.webm"), b"");
        touch(&dir.path().join("T-id1.mkv"), b"complete");
        touch(&dir.path().join("T-id1.temp.mp4"), b"x");
        touch(&dir.path().join("T-id1.f137.mp4"), b"x");
        touch(&dir.path().join("T-id2.mp4.part"), b"x");

        assert_eq!(ArtifactResolver::cleanup_partials(dir.path(), "id1"), 5);
        assert!(dir.path().join("T-id1.mkv").exists());
        assert!(dir.path().join("T-id2.mp4.part").exists());
    }
}
