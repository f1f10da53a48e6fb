use std::sync::OnceLock;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::config::SegloopConfig;
use crate::error::{Result, SegloopError};

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate installed one first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

fn build_headers(config: &SegloopConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(config.headers.len());
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            SegloopError::configuration(format!("invalid header name `{name}`: {e}"))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            SegloopError::configuration(format!("invalid value for header `{name}`: {e}"))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Create the HTTP client shared by every segment fetch.
///
/// The per-request ceiling is `fetch_timeout`; the fetcher additionally bounds the whole
/// download including the body.
pub fn create_client(config: &SegloopConfig) -> Result<Client> {
    install_rustls_provider();

    Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(build_headers(config)?)
        .connect_timeout(config.connect_timeout)
        .timeout(config.fetch_timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(SegloopError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_header_names() {
        let mut config = SegloopConfig::default();
        config
            .headers
            .insert("bad header".to_owned(), "x".to_owned());
        assert!(matches!(
            build_headers(&config),
            Err(SegloopError::Configuration { .. })
        ));
    }

    #[test]
    fn builds_client_with_custom_headers() {
        let mut config = SegloopConfig::default();
        config
            .headers
            .insert("Referer".to_owned(), "https://example.com/".to_owned());
        assert_eq!(build_headers(&config).unwrap().len(), 1);
        create_client(&config).unwrap();
    }
}
