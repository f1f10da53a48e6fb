use std::path::{Path, PathBuf};
use std::time::Duration;

/// Naming scheme shared by the fetcher and the controller.
///
/// Segment files are `<stream>.<index>.<ext>` inside one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentNaming {
    pub stream_name: String,
    pub extension: String,
}

impl SegmentNaming {
    pub fn new(stream_name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            extension: extension.into(),
        }
    }

    pub fn file_name(&self, index: u64) -> String {
        format!("{}.{}.{}", self.stream_name, index, self.extension)
    }
}

/// One fully written segment file.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub index: u64,
    pub file_name: String,
    pub duration: Duration,
}

impl Segment {
    pub fn new(index: u64, file_name: impl Into<String>, duration: Duration) -> Self {
        Self {
            index,
            file_name: file_name.into(),
            duration,
        }
    }

    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_embeds_index_between_stream_and_extension() {
        let naming = SegmentNaming::new("streamname", "ts");
        assert_eq!(naming.file_name(1), "streamname.1.ts");
        assert_eq!(naming.file_name(1234), "streamname.1234.ts");
    }
}
