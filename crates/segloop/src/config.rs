use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{Result, SegloopError};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Relay configuration.
///
/// Every field has a default so a TOML file only needs to name what it overrides
/// (in practice at least `url`). Durations are written in seconds and may be fractional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegloopConfig {
    /// Upstream endpoint; every fetch is a fresh GET of this URL
    pub url: String,

    /// Channel label, used for the output sub-directory and as a log field
    pub channel: String,

    /// Root under which `channels/<channel>` is created
    pub output_root: PathBuf,

    /// Base name shared by segment files and the playlist
    pub stream_name: String,

    /// Segment file extension, without the dot
    pub extension: String,

    /// Nominal duration of one segment, also the rotation period
    #[serde(with = "duration_secs")]
    pub segment_duration: Duration,

    /// Number of segments kept in the window
    pub capacity: usize,

    /// Ceiling for one whole fetch (headers and body).
    /// Must stay below `segment_duration`.
    #[serde(with = "duration_secs")]
    pub fetch_timeout: Duration,

    /// Connection establishment timeout
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Extra request headers
    pub headers: BTreeMap<String, String>,

    /// Total fetches allowed during preload (default: twice the capacity)
    pub preload_attempts: Option<usize>,
}

impl Default for SegloopConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            channel: "live".to_owned(),
            output_root: PathBuf::from("."),
            stream_name: "streamname".to_owned(),
            extension: "ts".to_owned(),
            segment_duration: Duration::from_secs(5),
            capacity: 60,
            fetch_timeout: Duration::from_secs(4),
            connect_timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: BTreeMap::new(),
            preload_attempts: None,
        }
    }
}

impl SegloopConfig {
    /// Parse a configuration from TOML text. The result is not validated.
    pub fn from_toml(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Read and parse a TOML configuration file. The result is not validated.
    pub fn load(path: &Path) -> Result<Self> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml(&input)
    }

    /// Directory holding the segments and the playlist.
    pub fn output_dir(&self) -> PathBuf {
        self.output_root.join("channels").join(&self.channel)
    }

    pub fn manifest_file_name(&self) -> String {
        format!("{}.m3u8", self.stream_name)
    }

    pub fn preload_attempts(&self) -> usize {
        self.preload_attempts
            .unwrap_or_else(|| self.capacity.saturating_mul(2))
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url)
            .map_err(|e| SegloopError::configuration(format!("invalid url `{}`: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SegloopError::configuration(format!(
                "unsupported url scheme `{}`",
                url.scheme()
            )));
        }

        if self.capacity == 0 {
            return Err(SegloopError::configuration("capacity must be at least 1"));
        }
        if self.segment_duration.is_zero() {
            return Err(SegloopError::configuration(
                "segment_duration must be positive",
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(SegloopError::configuration("fetch_timeout must be positive"));
        }
        if self.fetch_timeout >= self.segment_duration {
            return Err(SegloopError::configuration(format!(
                "fetch_timeout ({:?}) must be shorter than segment_duration ({:?})",
                self.fetch_timeout, self.segment_duration
            )));
        }
        if self.preload_attempts() < self.capacity {
            return Err(SegloopError::configuration(
                "preload_attempts must be at least capacity",
            ));
        }

        check_name_part("channel", &self.channel)?;
        check_name_part("stream_name", &self.stream_name)?;
        check_name_part("extension", &self.extension)?;
        if self.stream_name.contains('.') || self.extension.contains('.') {
            // `<stream>.<index>.<ext>` must stay unambiguous.
            return Err(SegloopError::configuration(
                "stream_name and extension must not contain '.'",
            ));
        }

        Ok(())
    }
}

fn check_name_part(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(SegloopError::configuration(format!(
            "{field} must not be empty"
        )));
    }
    if value.contains(['/', '\\']) || value == ".." {
        return Err(SegloopError::configuration(format!(
            "{field} `{value}` must not contain path separators"
        )));
    }
    Ok(())
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
