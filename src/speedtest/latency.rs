//! Latency phase
//!
//! Sequential probes against a zero-byte endpoint, each timed on its own. Failed probes
//! are skipped; they are neither retried nor counted.

use log::{debug, info};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use crate::speedtest::errors::{LastError, SpeedTestError};
use crate::speedtest::transport::SpeedTestTransport;
use crate::settings::SpeedTestConfig;

/// Summary of the successful probes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatencyStats {
    /// Mean round trip in ms, 0 without samples
    pub latency_ms: f64,
    /// Mean absolute deviation from `latency_ms`, 0 with fewer than two samples
    pub jitter_ms: f64,
    pub samples: usize,
}

/// Computes latency and jitter from round-trip samples in ms
pub fn summarize_latency(samples: &[f64]) -> LatencyStats {
    if samples.is_empty() {
        return LatencyStats::default();
    }

    let count = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / count;
    let jitter = if samples.len() < 2 {
        0.0
    } else {
        samples.iter().map(|s| (s - mean).abs()).sum::<f64>() / count
    };

    LatencyStats {
        latency_ms: mean,
        jitter_ms: jitter,
        samples: samples.len(),
    }
}

/// Runs the latency probes
///
/// `on_probe` receives each successful round trip in ms and the phase-local progress.
pub async fn measure_latency<F>(
    transport: &dyn SpeedTestTransport,
    config: &SpeedTestConfig,
    cancel: &CancellationToken,
    last_error: &LastError,
    mut on_probe: F,
) -> Result<LatencyStats, SpeedTestError>
where
    F: FnMut(f64, f64),
{
    let mut samples = Vec::with_capacity(config.latency_probes);

    for probe in 0..config.latency_probes {
        if probe > 0 {
            tokio::select! {
                _ = cancel.cancelled() => return Err(SpeedTestError::Cancelled),
                _ = sleep(config.probe_delay()) => {}
            }
        }

        let started = Instant::now();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(SpeedTestError::Cancelled),
            outcome = transport.probe(&config.latency_url) => outcome,
        };

        match outcome {
            Ok(()) => {
                let rtt_ms = started.elapsed().as_secs_f64() * 1000.0;
                samples.push(rtt_ms);
                let percent = (probe + 1) as f64 / config.latency_probes as f64 * 100.0;
                on_probe(rtt_ms, percent);
            }
            Err(error) => {
                debug!("Latency probe {} failed: {}", probe + 1, error);
                last_error.record(error);
            }
        }
    }

    let stats = summarize_latency(&samples);
    info!(
        "Latency phase: {:.1} ms, jitter {:.1} ms over {}/{} probes",
        stats.latency_ms, stats.jitter_ms, stats.samples, config.latency_probes
    );
    Ok(stats)
}
