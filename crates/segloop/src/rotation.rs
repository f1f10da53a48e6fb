// Rotation Controller: owns the retained window and the index counter, and turns fetch
// results into evictions and playlist publishes.

use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::config::SegloopConfig;
use crate::error::SegloopError;
use crate::fetcher::SegmentSource;
use crate::manifest::ManifestWriter;
use crate::segment::Segment;
use crate::window::RetainedWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Preloading,
    Live,
}

/// What the preload phase did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    /// Number of fetches issued
    pub attempted: usize,
    /// Number of segments added to the window
    pub fetched: usize,
    /// Indices consumed without producing a segment
    pub failed: Vec<u64>,
    /// Whether the initial playlist reached disk
    pub published: bool,
}

/// Result of one clock tick.
#[derive(Debug)]
pub enum RotationOutcome {
    /// A new segment joined the window.
    Rotated {
        index: u64,
        /// Indices dropped from the window, oldest first
        evicted: Vec<u64>,
        /// Whether the playlist reached disk
        published: bool,
    },
    /// The fetch failed; window and playlist are untouched.
    Skipped { index: u64, error: SegloopError },
}

impl RotationOutcome {
    pub fn index(&self) -> u64 {
        match self {
            Self::Rotated { index, .. } | Self::Skipped { index, .. } => *index,
        }
    }
}

pub struct RotationController<S> {
    source: S,
    manifest: ManifestWriter,
    dir: PathBuf,
    window: RetainedWindow,
    next_index: u64,
    preload_attempts: usize,
    phase: Phase,
    /// Evicted segments whose files stay until a playlist without them is on disk
    pending_removal: Vec<Segment>,
}

impl<S: SegmentSource> RotationController<S> {
    pub fn new(
        source: S,
        manifest: ManifestWriter,
        dir: impl Into<PathBuf>,
        capacity: usize,
        preload_attempts: usize,
    ) -> Self {
        Self {
            source,
            manifest,
            dir: dir.into(),
            window: RetainedWindow::new(capacity),
            next_index: 1,
            preload_attempts,
            phase: Phase::Preloading,
            pending_removal: Vec::new(),
        }
    }

    pub fn from_config(source: S, config: &SegloopConfig) -> Self {
        let dir = config.output_dir();
        let manifest = ManifestWriter::new(
            dir.clone(),
            config.manifest_file_name(),
            config.segment_duration,
        );
        Self::new(
            source,
            manifest,
            dir,
            config.capacity,
            config.preload_attempts(),
        )
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn window(&self) -> &RetainedWindow {
        &self.window
    }

    /// Index the next fetch will use.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Evicted segments whose files are still waiting for a successful publish.
    pub fn pending_removal(&self) -> usize {
        self.pending_removal.len()
    }

    fn take_index(&mut self) -> u64 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// Fill the window one fetch at a time, publish once, then go live.
    ///
    /// Failed indices are consumed and replaced by later ones until the window is full
    /// or the attempt budget runs out.
    pub async fn preload(&mut self) -> PreloadReport {
        info!(
            capacity = self.window.capacity(),
            max_attempts = self.preload_attempts,
            "Preloading segments"
        );
        let mut report = PreloadReport::default();

        while !self.window.is_full() && report.attempted < self.preload_attempts {
            let index = self.take_index();
            report.attempted += 1;
            match self.source.fetch(index).await {
                Ok(segment) => {
                    debug!(index, file = %segment.file_name, "Preloaded segment");
                    let evicted = self.window.push(segment);
                    self.pending_removal.extend(evicted);
                    report.fetched += 1;
                }
                Err(e) => {
                    warn!(index, error = %e, "Preload fetch failed, index skipped");
                    report.failed.push(index);
                }
            }
        }

        report.published = self.publish();
        self.phase = Phase::Live;

        if self.window.is_full() {
            info!(
                segments = self.window.len(),
                failed = report.failed.len(),
                "Preload complete, starting stream"
            );
        } else {
            warn!(
                segments = self.window.len(),
                capacity = self.window.capacity(),
                attempted = report.attempted,
                "Preload attempt budget exhausted, starting with a partial window"
            );
        }
        report
    }

    /// One rotation: fetch the next index, evict overflow, republish.
    pub async fn rotate(&mut self) -> RotationOutcome {
        let index = self.take_index();
        let segment = match self.source.fetch(index).await {
            Ok(segment) => segment,
            Err(error) => {
                if error.is_fetch_failure() {
                    warn!(index, error = %error, "Segment fetch failed, skipping tick");
                } else {
                    error!(index, error = %error, "Segment source error, skipping tick");
                }
                return RotationOutcome::Skipped { index, error };
            }
        };

        let file_name = segment.file_name.clone();
        let evicted = self.window.push(segment);
        let evicted_indices: Vec<u64> = evicted.iter().map(|s| s.index).collect();
        self.pending_removal.extend(evicted);

        let published = self.publish();
        info!(
            index,
            file = %file_name,
            sequence = self.window.first_sequence(),
            window = self.window.len(),
            "Added segment"
        );

        RotationOutcome::Rotated {
            index,
            evicted: evicted_indices,
            published,
        }
    }

    /// Write the playlist for the current window.
    ///
    /// Evicted files are deleted only after a playlist that no longer lists them is in
    /// place; on failure they wait for the next successful publish.
    fn publish(&mut self) -> bool {
        match self.manifest.publish(&self.window.snapshot()) {
            Ok(()) => {
                for segment in std::mem::take(&mut self.pending_removal) {
                    self.remove_segment_file(&segment);
                }
                true
            }
            Err(e) if self.pending_removal.len() > self.window.capacity() => {
                error!(
                    error = %e,
                    pending_removal = self.pending_removal.len(),
                    "Playlist not written for more than a full window, evicted segments are piling up"
                );
                false
            }
            Err(e) => {
                warn!(
                    error = %e,
                    pending_removal = self.pending_removal.len(),
                    "Failed to publish playlist"
                );
                false
            }
        }
    }

    fn remove_segment_file(&self, segment: &Segment) {
        let path = segment.path_in(&self.dir);
        match std::fs::remove_file(&path) {
            Ok(()) => info!(file = %segment.file_name, "Deleted old segment"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(file = %segment.file_name, "Old segment already gone");
            }
            Err(e) => warn!(
                file = %segment.file_name,
                error = %e,
                "Failed to delete old segment"
            ),
        }
    }
}
