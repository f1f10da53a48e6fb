// Manifest Writer: renders the live playlist from the retained window and swaps it in atomically.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::Result;
use crate::segment::Segment;

const PLAYLIST_VERSION: u32 = 3;

/// Writes `<stream>.m3u8` for a given window snapshot.
///
/// Holds no state between calls; the output is a pure function of the segment list and
/// the nominal duration.
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    dir: PathBuf,
    file_name: String,
    segment_duration: Duration,
}

impl ManifestWriter {
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>, segment_duration: Duration) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.into(),
            segment_duration,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!(".{}.tmp", self.file_name))
    }

    /// Render the complete playlist text.
    ///
    /// The media sequence is the first segment's index, or 0 for an empty list.
    pub fn render(&self, segments: &[Segment]) -> String {
        let sequence = segments.first().map_or(0, |s| s.index);
        let target_duration = segments
            .iter()
            .map(|s| s.duration)
            .max()
            .unwrap_or_default()
            .max(self.segment_duration)
            .as_secs_f64()
            .ceil() as u64;

        let mut out = String::with_capacity(96 + segments.len() * 48);
        // Writing into a String cannot fail.
        let _ = writeln!(out, "#EXTM3U");
        let _ = writeln!(out, "#EXT-X-VERSION:{PLAYLIST_VERSION}");
        let _ = writeln!(out, "#EXT-X-TARGETDURATION:{target_duration}");
        let _ = writeln!(out, "#EXT-X-MEDIA-SEQUENCE:{sequence}");
        for segment in segments {
            let _ = writeln!(out, "#EXTINF:{:.3},", segment.duration.as_secs_f64());
            let _ = writeln!(out, "{}", segment.file_name);
        }
        out
    }

    /// Replace the playlist on disk with one listing exactly `segments`.
    ///
    /// The text goes to a hidden sibling file first and is renamed into place, so a
    /// reader sees either the previous playlist or this one.
    pub fn publish(&self, segments: &[Segment]) -> Result<()> {
        let text = self.render(segments);
        let temp_path = self.temp_path();

        if let Err(e) = write_synced(&temp_path, text.as_bytes()) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp_path, self.path()) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        debug!(
            file = %self.file_name,
            sequence = segments.first().map_or(0, |s| s.index),
            entries = segments.len(),
            "Published playlist"
        );
        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
