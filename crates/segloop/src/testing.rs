use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::{Result, SegloopError};
use crate::fetcher::SegmentSource;
use crate::segment::{Segment, SegmentNaming};

/// In-memory upstream: writes a small file per index unless told to fail it.
pub(crate) struct ScriptedSource {
    dir: PathBuf,
    naming: SegmentNaming,
    duration: Duration,
    delay: Option<Duration>,
    failing: Mutex<HashSet<u64>>,
    calls: Mutex<Vec<u64>>,
}

impl ScriptedSource {
    pub(crate) fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            naming: SegmentNaming::new("streamname", "ts"),
            duration: Duration::from_secs(5),
            delay: None,
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn fail(&self, index: u64) {
        self.failing.lock().unwrap().insert(index);
    }

    pub(crate) fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SegmentSource for ScriptedSource {
    async fn fetch(&self, index: u64) -> Result<Segment> {
        self.calls.lock().unwrap().push(index);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(&index) {
            return Err(SegloopError::http_status(
                StatusCode::BAD_GATEWAY,
                "scripted://upstream",
                index,
            ));
        }
        let file_name = self.naming.file_name(index);
        std::fs::write(self.dir.join(&file_name), format!("segment {index}"))?;
        Ok(Segment::new(index, file_name, self.duration))
    }
}
