//! Scripted in-memory transport for speed test integration tests
//!
//! All delays go through `tokio::time`, so tests run under paused time and the
//! measured rates are deterministic.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::io::StreamReader;

use throughput::settings::SpeedTestConfig;
use throughput::speedtest::{DownloadBody, SpeedTestEvent, SpeedTestTransport, TransportError};

/// Outcome of one scripted latency probe
#[derive(Debug, Clone, Copy)]
pub enum ProbeStep {
    Respond(Duration),
    Fail,
}

/// Shape of every download body: `chunks` chunks of `chunk_bytes`, one per `every`
#[derive(Debug, Clone, Copy)]
pub struct StreamPlan {
    pub chunk_bytes: usize,
    pub every: Duration,
    pub chunks: usize,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    probe_script: Mutex<VecDeque<ProbeStep>>,
    /// Used once the script runs out; `None` fails every probe
    default_probe: Option<Duration>,
    /// `None` fails every download request
    download: Option<StreamPlan>,
    failing_download_urls: Vec<String>,
    /// `None` fails every upload
    upload_delay: Option<Duration>,
    upload_failures_before_success: AtomicUsize,
    panic_on_probe: bool,

    pub probes: AtomicUsize,
    pub downloads_opened: AtomicUsize,
    pub upload_attempts: AtomicUsize,
    pub uploads_succeeded: AtomicUsize,
}

impl MockTransport {
    /// 10 ms probes, 2.5 MB/s per download stream, 100 ms uploads
    pub fn healthy() -> Self {
        Self {
            default_probe: Some(Duration::from_millis(10)),
            download: Some(StreamPlan {
                chunk_bytes: 250_000,
                every: Duration::from_millis(100),
                chunks: 10,
            }),
            upload_delay: Some(Duration::from_millis(100)),
            ..Self::default()
        }
    }

    pub fn with_probe_script(self, steps: &[ProbeStep]) -> Self {
        *self.probe_script.lock().unwrap() = steps.iter().copied().collect();
        self
    }

    pub fn failing_probes(mut self) -> Self {
        self.default_probe = None;
        self
    }

    pub fn failing_downloads(mut self) -> Self {
        self.download = None;
        self
    }

    pub fn failing_download_url(mut self, url: &str) -> Self {
        self.failing_download_urls.push(url.to_string());
        self
    }

    pub fn failing_uploads(mut self) -> Self {
        self.upload_delay = None;
        self
    }

    pub fn upload_failures_before_success(self, failures: usize) -> Self {
        self.upload_failures_before_success
            .store(failures, Ordering::SeqCst);
        self
    }

    pub fn panicking_probe(mut self) -> Self {
        self.panic_on_probe = true;
        self
    }
}

#[async_trait]
impl SpeedTestTransport for MockTransport {
    async fn probe(&self, url: &str) -> Result<(), TransportError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_probe {
            panic!("probe exploded");
        }

        let step = self.probe_script.lock().unwrap().pop_front();
        let step = step.unwrap_or(match self.default_probe {
            Some(delay) => ProbeStep::Respond(delay),
            None => ProbeStep::Fail,
        });

        match step {
            ProbeStep::Respond(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            ProbeStep::Fail => Err(TransportError::Request {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }

    async fn open_download(&self, url: &str) -> Result<DownloadBody, TransportError> {
        self.downloads_opened.fetch_add(1, Ordering::SeqCst);

        let plan = match self.download {
            Some(plan) if !self.failing_download_urls.iter().any(|u| u == url) => plan,
            _ => {
                return Err(TransportError::Request {
                    url: url.to_string(),
                    message: "connection reset".to_string(),
                });
            }
        };

        let stream = futures::stream::unfold(0usize, move |sent| async move {
            if sent >= plan.chunks {
                return None;
            }
            tokio::time::sleep(plan.every).await;
            let chunk = Bytes::from(vec![0u8; plan.chunk_bytes]);
            Some((Ok::<_, io::Error>(chunk), sent + 1))
        });

        Ok(DownloadBody {
            reader: Box::pin(StreamReader::new(stream)),
            content_length: Some((plan.chunk_bytes * plan.chunks) as u64),
        })
    }

    async fn upload(&self, url: &str, _body: Bytes) -> Result<(), TransportError> {
        self.upload_attempts.fetch_add(1, Ordering::SeqCst);

        let Some(delay) = self.upload_delay else {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: 503,
            });
        };

        let should_fail = self
            .upload_failures_before_success
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: 500,
            });
        }

        tokio::time::sleep(delay).await;
        self.uploads_succeeded.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Default engine constants pointed at mock endpoints
pub fn test_config() -> SpeedTestConfig {
    SpeedTestConfig {
        latency_url: "mock://latency".to_string(),
        download_url: "mock://download".to_string(),
        upload_url: "mock://upload".to_string(),
        fallback_urls: vec![
            "mock://fallback-1".to_string(),
            "mock://fallback-2".to_string(),
        ],
        server_info: "mock server".to_string(),
        ..SpeedTestConfig::default()
    }
}

/// Drains every event already published
pub fn drain_events(
    receiver: &mut tokio::sync::broadcast::Receiver<SpeedTestEvent>,
) -> Vec<SpeedTestEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

pub fn completed_count(events: &[SpeedTestEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, SpeedTestEvent::TestCompleted(_)))
        .count()
}
