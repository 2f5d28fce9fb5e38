//! Single-stream quick test
//!
//! Downloads one fallback file at a time over a single stream and reports the first
//! positive speed. Shares the admission gate and completion contract of the full test.

use log::{debug, info, warn};
use tokio::io::AsyncReadExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::collectors::bandwidth::formatting::mbps_from_transfer;
use crate::speedtest::engine::SpeedTester;
use crate::speedtest::errors::{SpeedTestError, TransportError};
use crate::speedtest::models::{SpeedTestEvent, SpeedTestPhase, SpeedTestProgress, SpeedTestResult};
use crate::speedtest::transport::SpeedTestTransport;

impl SpeedTester {
    /// Measures download speed against the fallback URLs, first success wins
    ///
    /// Returns `None` when another run is in progress.
    pub async fn run_quick_test(&self, cancel: CancellationToken) -> Option<SpeedTestResult> {
        let _guard = self.try_begin_run()?;
        let mut context = self.new_run_context(cancel);
        let mut result = SpeedTestResult::new();
        let mut outcome = Err(SpeedTestError::Unreachable);

        for url in &self.config().fallback_urls {
            let throttle = &mut context.throttle;
            let measured = measure_single_download(
                self.transport().as_ref(),
                url,
                self.config().chunk_size,
                &context.cancel,
                |speed_mbps, percent| {
                    self.emit_progress(
                        throttle,
                        SpeedTestProgress::transfer(SpeedTestPhase::Download, speed_mbps, percent),
                    )
                },
            )
            .await;

            match measured {
                Ok(speed) if speed > 0.0 => {
                    result.download_speed_mbps = speed;
                    outcome = Ok(url.clone());
                    break;
                }
                Ok(_) => debug!("Quick test against {} moved no data", url),
                Err(SpeedTestError::Cancelled) => {
                    outcome = Err(SpeedTestError::Cancelled);
                    break;
                }
                Err(error) => debug!("Quick test against {} failed: {}", url, error),
            }
        }

        match outcome {
            Ok(url) => {
                info!(
                    "Quick test complete: {:.2} Mbps from {}",
                    result.download_speed_mbps, url
                );
                result.succeed(url);
                self.emit_progress(&mut context.throttle, SpeedTestProgress::complete());
            }
            Err(error) => {
                warn!("Quick test failed: {}", error);
                result.fail(&error);
            }
        }

        self.publish(SpeedTestEvent::TestCompleted(result.clone()));
        Some(result)
    }
}

/// Downloads one body in full and returns its speed in Mbps
async fn measure_single_download<F>(
    transport: &dyn SpeedTestTransport,
    url: &str,
    chunk_size: usize,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<f64, SpeedTestError>
where
    F: FnMut(f64, f64),
{
    let started = Instant::now();
    let mut body = tokio::select! {
        _ = cancel.cancelled() => return Err(SpeedTestError::Cancelled),
        opened = transport.open_download(url) => opened?,
    };

    let mut buffer = vec![0u8; chunk_size];
    let mut total_bytes = 0u64;

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => return Err(SpeedTestError::Cancelled),
            read = body.reader.read(&mut buffer) => read,
        };
        let n = read.map_err(|e| TransportError::body(url, e))?;
        if n == 0 {
            break;
        }
        total_bytes += n as u64;

        let elapsed = started.elapsed().as_secs_f64();
        let percent = match body.content_length {
            Some(length) if length > 0 => total_bytes as f64 / length as f64 * 100.0,
            _ => 0.0,
        };
        on_progress(mbps_from_transfer(total_bytes, elapsed), percent);
    }

    Ok(mbps_from_transfer(total_bytes, started.elapsed().as_secs_f64()))
}
