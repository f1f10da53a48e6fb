use reqwest::StatusCode;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SegloopError {
    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} for segment {index} from {url}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        index: u64,
    },

    #[error("segment {index} timed out after {timeout:?}")]
    Timeout { index: u64, timeout: Duration },

    #[error("segment {index} response body was empty")]
    EmptyBody { index: u64 },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("failed to parse configuration: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },
}

impl SegloopError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>, index: u64) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            index,
        }
    }

    /// Whether this error means "no segment this time" rather than a broken setup.
    ///
    /// Fetch failures are recovered by the rotation controller by skipping the index.
    pub fn is_fetch_failure(&self) -> bool {
        match self {
            Self::Network { .. }
            | Self::HttpStatus { .. }
            | Self::Timeout { .. }
            | Self::EmptyBody { .. }
            | Self::Io { .. } => true,
            Self::Configuration { .. } | Self::ConfigParse { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SegloopError>;
