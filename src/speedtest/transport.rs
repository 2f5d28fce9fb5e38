//! HTTP transport used by the speed test phases
//!
//! The engine only talks to `SpeedTestTransport`; `HttpTransport` is the production
//! implementation and owns the single connection pool shared by every worker and phase.

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use log::trace;
use reqwest::Client;
use std::io;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::speedtest::errors::TransportError;

/// A response body opened for streaming
pub struct DownloadBody {
    pub reader: Pin<Box<dyn AsyncRead + Send>>,
    /// Advertised body length, if the server sent one
    pub content_length: Option<u64>,
}

impl std::fmt::Debug for DownloadBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Requests issued by the speed test phases
///
/// A response with a non-success status is an error for every operation.
#[async_trait]
pub trait SpeedTestTransport: Send + Sync {
    /// Issues one small request and waits for the full response
    async fn probe(&self, url: &str) -> Result<(), TransportError>;

    /// Starts a download and returns once headers arrived
    async fn open_download(&self, url: &str) -> Result<DownloadBody, TransportError>;

    /// POSTs one block and waits for the response
    async fn upload(&self, url: &str, body: Bytes) -> Result<(), TransportError>;
}

/// `reqwest` implementation sharing one client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("throughput/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Client {
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    fn check_status(url: &str, response: &reqwest::Response) -> Result<(), TransportError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl SpeedTestTransport for HttpTransport {
    async fn probe(&self, url: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::request(url, e))?;
        Self::check_status(url, &response)?;

        // Drain so the connection returns to the pool
        response
            .bytes()
            .await
            .map_err(|e| TransportError::body(url, e))?;
        Ok(())
    }

    async fn open_download(&self, url: &str) -> Result<DownloadBody, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::request(url, e))?;
        Self::check_status(url, &response)?;

        let content_length = response.content_length();
        trace!("Opened download {} ({:?} bytes)", url, content_length);

        let stream = response.bytes_stream().map_err(io::Error::other);
        Ok(DownloadBody {
            reader: Box::pin(StreamReader::new(stream)),
            content_length,
        })
    }

    async fn upload(&self, url: &str, body: Bytes) -> Result<(), TransportError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::request(url, e))?;
        Self::check_status(url, &response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_timeout() {
        tokio_test::assert_ok!(HttpTransport::new(Duration::from_secs(30)));
    }

    #[test]
    fn test_unreachable_probe_is_a_request_error() {
        let transport = HttpTransport::new(Duration::from_secs(2)).expect("client");
        // Port 9 on loopback is discard; nothing listens there in test environments
        let result = tokio_test::block_on(transport.probe("http://127.0.0.1:9/"));
        assert!(matches!(result, Err(TransportError::Request { .. })));
    }
}
