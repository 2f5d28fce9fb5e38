//! Download and upload phases
//!
//! Each phase runs a fixed number of parallel workers for a fixed duration. Workers add
//! to one shared `TransferCounter` under a mutex; the orchestrating task reads the same
//! counter for progress. Bytes moved during the warm-up window are left out of the
//! reported speed.

use bytes::Bytes;
use log::{debug, info, warn};
use rand::RngCore;
use rand::rngs::OsRng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::collectors::bandwidth::formatting::mbps_from_transfer;
use crate::settings::SpeedTestConfig;
use crate::speedtest::errors::{LastError, SpeedTestError, TransportError};
use crate::speedtest::models::{SpeedTestPhase, phase_percent};
use crate::speedtest::transport::SpeedTestTransport;

/// Which way a transfer phase moves data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
}

impl Direction {
    pub fn phase(self) -> SpeedTestPhase {
        match self {
            Direction::Download => SpeedTestPhase::Download,
            Direction::Upload => SpeedTestPhase::Upload,
        }
    }
}

/// Byte accounting for one transfer phase
#[derive(Debug, Clone)]
pub struct TransferCounter {
    started: Instant,
    warmup: Duration,
    total_bytes: u64,
    post_warmup_bytes: u64,
    warmup_crossed_at: Option<Instant>,
}

impl TransferCounter {
    pub fn new(started: Instant, warmup: Duration) -> Self {
        Self {
            started,
            warmup,
            total_bytes: 0,
            post_warmup_bytes: 0,
            warmup_crossed_at: None,
        }
    }

    /// Adds bytes moved at `now`
    ///
    /// The write that first lands past the warm-up window starts the measured span and
    /// is itself excluded from it.
    pub fn record(&mut self, bytes: u64, now: Instant) {
        self.total_bytes += bytes;

        if self.warmup_crossed_at.is_some() {
            self.post_warmup_bytes += bytes;
        } else if now.saturating_duration_since(self.started) >= self.warmup {
            self.warmup_crossed_at = Some(now);
            self.post_warmup_bytes = 0;
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn post_warmup_bytes(&self) -> u64 {
        self.post_warmup_bytes
    }

    pub fn warmup_reached(&self) -> bool {
        self.warmup_crossed_at.is_some()
    }

    /// Whole-phase speed so far, warm-up included
    pub fn running_mbps(&self, now: Instant) -> f64 {
        mbps_from_transfer(
            self.total_bytes,
            now.saturating_duration_since(self.started).as_secs_f64(),
        )
    }

    /// Reported speed for a phase that ended at `ended`
    ///
    /// Uses the post-warm-up span; falls back to the whole phase when warm-up was never
    /// reached or the measured speed is not positive.
    pub fn final_mbps(&self, ended: Instant) -> f64 {
        if let Some(crossed) = self.warmup_crossed_at {
            let measured = ended.saturating_duration_since(crossed).as_secs_f64();
            let speed = mbps_from_transfer(self.post_warmup_bytes, measured);
            if speed > 0.0 {
                return speed;
            }
        }
        self.running_mbps(ended)
    }
}

type SharedCounter = Arc<Mutex<TransferCounter>>;

fn lock_counter(counter: &Mutex<TransferCounter>) -> MutexGuard<'_, TransferCounter> {
    counter.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of a finished transfer phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferOutcome {
    pub speed_mbps: f64,
    pub total_bytes: u64,
    pub post_warmup_bytes: u64,
    pub elapsed: Duration,
}

/// Runs one transfer phase to its deadline, to caller cancellation, or until every
/// worker has exited
///
/// `on_tick` receives the running speed and the phase-local progress percentage.
pub async fn run_transfer_phase<F>(
    direction: Direction,
    transport: Arc<dyn SpeedTestTransport>,
    config: &SpeedTestConfig,
    cancel: &CancellationToken,
    last_error: &LastError,
    mut on_tick: F,
) -> Result<TransferOutcome, SpeedTestError>
where
    F: FnMut(f64, f64),
{
    let started = Instant::now();
    let deadline = started + config.test_duration();
    let counter: SharedCounter = Arc::new(Mutex::new(TransferCounter::new(
        started,
        config.warmup(),
    )));
    let workers_token = cancel.child_token();

    let mut workers = JoinSet::new();
    for worker_id in 0..config.workers {
        let transport = Arc::clone(&transport);
        let counter = Arc::clone(&counter);
        let token = workers_token.clone();
        let last_error = last_error.clone();
        match direction {
            Direction::Download => {
                let url = config.download_url.clone();
                let chunk_size = config.chunk_size;
                workers.spawn(download_worker(
                    worker_id, transport, url, chunk_size, counter, token, last_error,
                ));
            }
            Direction::Upload => {
                let url = config.upload_url.clone();
                let block = random_block(config.upload_block_size);
                let retry_delay = config.upload_retry_delay();
                workers.spawn(upload_worker(
                    worker_id,
                    transport,
                    url,
                    block,
                    retry_delay,
                    counter,
                    token,
                    last_error,
                ));
            }
        }
    }

    let tick = (config.progress_interval() / 4).max(Duration::from_millis(1));
    let mut ticker = interval_at(started + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = sleep_until(deadline) => break,
            _ = cancel.cancelled() => break,
            Some(joined) = workers.join_next() => {
                log_worker_exit(direction, joined);
                if workers.is_empty() {
                    debug!("All {:?} workers exited before the deadline", direction);
                    break;
                }
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                let running = lock_counter(&counter).running_mbps(now);
                on_tick(running, phase_percent(now - started, config.test_duration()));
            }
        }
    }

    workers_token.cancel();
    while let Some(joined) = workers.join_next().await {
        log_worker_exit(direction, joined);
    }
    let ended = Instant::now();

    if cancel.is_cancelled() {
        return Err(SpeedTestError::Cancelled);
    }

    let counter = lock_counter(&counter);
    let outcome = TransferOutcome {
        speed_mbps: counter.final_mbps(ended),
        total_bytes: counter.total_bytes(),
        post_warmup_bytes: counter.post_warmup_bytes(),
        elapsed: ended - started,
    };

    info!(
        "{:?} phase: {:.2} Mbps ({} bytes, {} after warm-up, {:.1}s)",
        direction,
        outcome.speed_mbps,
        outcome.total_bytes,
        outcome.post_warmup_bytes,
        outcome.elapsed.as_secs_f64()
    );
    Ok(outcome)
}

fn log_worker_exit(direction: Direction, joined: Result<(), tokio::task::JoinError>) {
    if let Err(error) = joined {
        if error.is_panic() {
            warn!("{:?} worker panicked: {}", direction, error);
        }
    }
}

/// Generates the random block an upload worker sends repeatedly
fn random_block(size: usize) -> Bytes {
    let mut block = vec![0u8; size];
    OsRng.fill_bytes(&mut block);
    Bytes::from(block)
}

/// Streams the download endpoint until cancelled; exits on the first error
async fn download_worker(
    worker_id: usize,
    transport: Arc<dyn SpeedTestTransport>,
    url: String,
    chunk_size: usize,
    counter: SharedCounter,
    cancel: CancellationToken,
    last_error: LastError,
) {
    let mut buffer = vec![0u8; chunk_size];

    while !cancel.is_cancelled() {
        let opened = tokio::select! {
            _ = cancel.cancelled() => return,
            opened = transport.open_download(&url) => opened,
        };
        let mut body = match opened {
            Ok(body) => body,
            Err(error) => {
                debug!("Download worker {} stopped: {}", worker_id, error);
                last_error.record(error);
                return;
            }
        };

        let mut body_bytes = 0u64;
        loop {
            let read = tokio::select! {
                _ = cancel.cancelled() => return,
                read = body.reader.read(&mut buffer) => read,
            };
            match read {
                Ok(0) => break,
                Ok(n) => {
                    body_bytes += n as u64;
                    lock_counter(&counter).record(n as u64, Instant::now());
                }
                Err(error) => {
                    debug!("Download worker {} stopped mid-stream: {}", worker_id, error);
                    last_error.record(TransportError::body(&url, error));
                    return;
                }
            }
        }

        if body_bytes == 0 {
            debug!("Download worker {} got an empty body", worker_id);
            last_error.record(TransportError::body(&url, "empty response body"));
            return;
        }
    }
}

/// POSTs its block until cancelled; failed POSTs are retried after a short pause
#[allow(clippy::too_many_arguments)]
async fn upload_worker(
    worker_id: usize,
    transport: Arc<dyn SpeedTestTransport>,
    url: String,
    block: Bytes,
    retry_delay: Duration,
    counter: SharedCounter,
    cancel: CancellationToken,
    last_error: LastError,
) {
    let block_len = block.len() as u64;

    loop {
        let sent = tokio::select! {
            _ = cancel.cancelled() => return,
            sent = transport.upload(&url, block.clone()) => sent,
        };

        match sent {
            Ok(()) => lock_counter(&counter).record(block_len, Instant::now()),
            Err(error) => {
                debug!("Upload worker {} retrying: {}", worker_id, error);
                last_error.record(error);
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = sleep(retry_delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WARMUP: Duration = Duration::from_secs(2);

    #[test]
    fn test_warmup_write_starts_measured_span() {
        let start = Instant::now();
        let mut counter = TransferCounter::new(start, WARMUP);

        counter.record(1_000, start + Duration::from_secs(1));
        assert!(!counter.warmup_reached());

        counter.record(500, start + Duration::from_secs(2));
        assert!(counter.warmup_reached());
        assert_eq!(counter.post_warmup_bytes(), 0);

        counter.record(2_500_000, start + Duration::from_secs(3));
        assert_eq!(counter.total_bytes(), 2_501_500);
        assert_eq!(counter.post_warmup_bytes(), 2_500_000);

        // 2.5 MB over the 1s after warm-up
        let speed = counter.final_mbps(start + Duration::from_secs(3));
        assert!((speed - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_phase_falls_back_to_whole_duration() {
        let start = Instant::now();
        let mut counter = TransferCounter::new(start, WARMUP);
        counter.record(1_250_000, start + Duration::from_millis(500));

        let speed = counter.final_mbps(start + Duration::from_secs(1));
        assert!((speed - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_post_warmup_bytes_falls_back() {
        let start = Instant::now();
        let mut counter = TransferCounter::new(start, WARMUP);
        counter.record(4_000_000, start + Duration::from_secs(1));
        counter.record(1_000_000, start + Duration::from_secs(2));

        // Measured span is empty, so the whole 4s phase is used
        let speed = counter.final_mbps(start + Duration::from_secs(4));
        assert!((speed - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_phase_reports_zero() {
        let start = Instant::now();
        let counter = TransferCounter::new(start, WARMUP);
        assert_eq!(counter.final_mbps(start), 0.0);
        assert_eq!(counter.running_mbps(start + Duration::from_secs(5)), 0.0);
    }

    #[test]
    fn test_random_blocks_differ() {
        let a = random_block(1024);
        let b = random_block(1024);
        assert_eq!(a.len(), 1024);
        assert_ne!(a, b);
    }
}
