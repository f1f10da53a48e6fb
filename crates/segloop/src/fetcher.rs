// Segment Fetcher: downloads one segment's worth of upstream bytes into its own file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};
use url::Url;

use crate::config::SegloopConfig;
use crate::error::{Result, SegloopError};
use crate::segment::{Segment, SegmentNaming};

/// Source of segment files, keyed by index.
///
/// A returned [`Segment`] refers to a file that is completely written and closed. On
/// error no file for that index is left behind.
#[async_trait]
pub trait SegmentSource: Send + Sync {
    async fn fetch(&self, index: u64) -> Result<Segment>;
}

#[async_trait]
impl<T: SegmentSource + ?Sized> SegmentSource for Arc<T> {
    async fn fetch(&self, index: u64) -> Result<Segment> {
        (**self).fetch(index).await
    }
}

pub struct HttpSegmentFetcher {
    client: Client,
    url: Url,
    dir: PathBuf,
    naming: SegmentNaming,
    segment_duration: Duration,
    timeout: Duration,
}

impl HttpSegmentFetcher {
    pub fn new(client: Client, config: &SegloopConfig) -> Result<Self> {
        let url = Url::parse(&config.url).map_err(|e| {
            SegloopError::configuration(format!("invalid url `{}`: {e}", config.url))
        })?;
        Ok(Self {
            client,
            url,
            dir: config.output_dir(),
            naming: SegmentNaming::new(&config.stream_name, &config.extension),
            segment_duration: config.segment_duration,
            timeout: config.fetch_timeout,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn download(&self, index: u64, path: &Path) -> Result<u64> {
        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SegloopError::http_status(status, self.url.as_str(), index));
        }

        let file = tokio::fs::File::create(path).await?;
        let mut writer = BufWriter::with_capacity(256 * 1024, file);
        let mut body = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        if written == 0 {
            return Err(SegloopError::EmptyBody { index });
        }

        writer.flush().await?;
        let file = writer.into_inner();
        file.sync_all().await?;
        drop(file);
        Ok(written)
    }
}

#[async_trait]
impl SegmentSource for HttpSegmentFetcher {
    async fn fetch(&self, index: u64) -> Result<Segment> {
        let file_name = self.naming.file_name(index);
        let path = self.dir.join(&file_name);
        let started = Instant::now();

        let result = match tokio::time::timeout(self.timeout, self.download(index, &path)).await {
            Ok(result) => result,
            Err(_) => Err(SegloopError::Timeout {
                index,
                timeout: self.timeout,
            }),
        };

        match result {
            Ok(bytes) => {
                debug!(
                    index,
                    file = %file_name,
                    bytes,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Segment written"
                );
                Ok(Segment::new(index, file_name, self.segment_duration))
            }
            Err(e) => {
                remove_partial(&path).await;
                Err(e)
            }
        }
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial segment"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial segment"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::create_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn fetcher_for(server: &MockServer, root: &Path) -> HttpSegmentFetcher {
        let config = SegloopConfig {
            url: format!("{}/box.ts", server.uri()),
            output_root: root.to_path_buf(),
            fetch_timeout: Duration::from_millis(300),
            segment_duration: Duration::from_secs(1),
            ..Default::default()
        };
        std::fs::create_dir_all(config.output_dir()).unwrap();
        HttpSegmentFetcher::new(create_client(&config).unwrap(), &config).unwrap()
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn writes_body_to_indexed_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/box.ts"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x47u8; 188 * 4]))
            .mount(&server)
            .await;
        let root = tempfile::tempdir().unwrap();
        let fetcher = fetcher_for(&server, root.path()).await;

        let segment = fetcher.fetch(7).await.unwrap();

        assert_eq!(segment.index, 7);
        assert_eq!(segment.file_name, "streamname.7.ts");
        assert_eq!(segment.duration, Duration::from_secs(1));
        let bytes = std::fs::read(segment.path_in(fetcher.dir())).unwrap();
        assert_eq!(bytes.len(), 188 * 4);
    }

    #[tokio::test]
    async fn non_success_status_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;
        let root = tempfile::tempdir().unwrap();
        let fetcher = fetcher_for(&server, root.path()).await;

        let err = fetcher.fetch(1).await.unwrap_err();

        assert!(matches!(err, SegloopError::HttpStatus { index: 1, .. }));
        assert!(files_in(fetcher.dir()).is_empty());
    }

    #[tokio::test]
    async fn stalled_response_times_out_and_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![1u8; 1024])
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;
        let root = tempfile::tempdir().unwrap();
        let fetcher = fetcher_for(&server, root.path()).await;

        let err = fetcher.fetch(2).await.unwrap_err();

        assert!(err.is_fetch_failure());
        assert!(files_in(fetcher.dir()).is_empty());
    }

    #[tokio::test]
    async fn empty_body_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let root = tempfile::tempdir().unwrap();
        let fetcher = fetcher_for(&server, root.path()).await;

        let err = fetcher.fetch(3).await.unwrap_err();

        assert!(matches!(err, SegloopError::EmptyBody { index: 3 }));
        assert!(files_in(fetcher.dir()).is_empty());
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_network_failure() {
        let root = tempfile::tempdir().unwrap();
        let config = SegloopConfig {
            // Port 9 (discard) is not expected to accept HTTP.
            url: "http://127.0.0.1:9/box.ts".to_owned(),
            output_root: root.path().to_path_buf(),
            fetch_timeout: Duration::from_millis(300),
            segment_duration: Duration::from_secs(1),
            ..Default::default()
        };
        std::fs::create_dir_all(config.output_dir()).unwrap();
        let fetcher =
            HttpSegmentFetcher::new(create_client(&config).unwrap(), &config).unwrap();

        let err = fetcher.fetch(4).await.unwrap_err();

        assert!(err.is_fetch_failure());
        assert!(files_in(fetcher.dir()).is_empty());
    }
}
