//! # segloop engine
//!
//! Turns a continuous upstream media URL into a live HLS stream on disk: every segment
//! period one fetch becomes one segment file, the oldest file beyond the window is
//! removed, and `<stream>.m3u8` is rewritten to list exactly the retained segments.
//!
//! - [`HttpSegmentFetcher`] downloads one segment into its own file.
//! - [`ManifestWriter`] renders and atomically replaces the playlist.
//! - [`RotationController`] owns the window: preload, then one rotation per tick.
//! - [`RotationService`] is the clock, and serializes rotations.

pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod manifest;
pub mod rotation;
pub mod segment;
pub mod service;
pub mod window;

#[cfg(test)]
mod testing;

pub use client::create_client;
pub use config::SegloopConfig;
pub use error::{Result, SegloopError};
pub use fetcher::{HttpSegmentFetcher, SegmentSource};
pub use manifest::ManifestWriter;
pub use rotation::{Phase, PreloadReport, RotationController, RotationOutcome};
pub use segment::{Segment, SegmentNaming};
pub use service::{RotationHandle, RotationService};
pub use window::RetainedWindow;
