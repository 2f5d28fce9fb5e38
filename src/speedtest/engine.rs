//! Speed test orchestration
//!
//! `SpeedTester` runs latency, download and upload phases in strict order and publishes
//! progress and the final result on a broadcast channel. Clones share one admission
//! gate, one channel and one transport, so at most one run is in flight per tester.

use futures::FutureExt;
use log::{debug, info, trace, warn};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::settings::SpeedTestConfig;
use crate::speedtest::errors::{LastError, SpeedTestError, TransportError};
use crate::speedtest::latency::measure_latency;
use crate::speedtest::models::{SpeedTestEvent, SpeedTestProgress, SpeedTestResult};
use crate::speedtest::throttle::ProgressThrottle;
use crate::speedtest::transfer::{Direction, TransferOutcome, run_transfer_phase};
use crate::speedtest::transport::{HttpTransport, SpeedTestTransport};

struct TesterShared {
    config: SpeedTestConfig,
    transport: Arc<dyn SpeedTestTransport>,
    events: broadcast::Sender<SpeedTestEvent>,
    running: AtomicBool,
}

/// Multi-phase bandwidth and latency tester
#[derive(Clone)]
pub struct SpeedTester {
    shared: Arc<TesterShared>,
}

impl std::fmt::Debug for SpeedTester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeedTester")
            .field("config", &self.shared.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Holds the admission gate for the duration of one run
pub(crate) struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { running })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Per-run state shared by the phases of one run
pub(crate) struct RunContext {
    pub(crate) cancel: CancellationToken,
    pub(crate) last_error: LastError,
    pub(crate) throttle: ProgressThrottle,
}

impl SpeedTester {
    /// Creates a tester backed by HTTP against the configured endpoints
    pub fn new(config: SpeedTestConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config.request_timeout())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a tester over any transport
    pub fn with_transport(config: SpeedTestConfig, transport: Arc<dyn SpeedTestTransport>) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            shared: Arc::new(TesterShared {
                config,
                transport,
                events,
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Registers an observer; dropping the receiver unsubscribes
    pub fn subscribe(&self) -> broadcast::Receiver<SpeedTestEvent> {
        self.shared.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &SpeedTestConfig {
        &self.shared.config
    }

    pub(crate) fn transport(&self) -> &Arc<dyn SpeedTestTransport> {
        &self.shared.transport
    }

    pub(crate) fn try_begin_run(&self) -> Option<RunGuard<'_>> {
        let guard = RunGuard::acquire(&self.shared.running);
        if guard.is_none() {
            debug!("Speed test already running; ignoring request");
        }
        guard
    }

    pub(crate) fn new_run_context(&self, cancel: CancellationToken) -> RunContext {
        RunContext {
            cancel,
            last_error: LastError::default(),
            throttle: ProgressThrottle::new(self.shared.config.progress_interval()),
        }
    }

    /// Publishes a progress update if the throttle admits it
    pub(crate) fn emit_progress(&self, throttle: &mut ProgressThrottle, progress: SpeedTestProgress) {
        if throttle.admit(progress.phase, Instant::now()) {
            self.publish(SpeedTestEvent::ProgressChanged(progress));
        }
    }

    pub(crate) fn publish(&self, event: SpeedTestEvent) {
        // Fails only when nobody is subscribed
        if self.shared.events.send(event).is_err() {
            trace!("No speed test subscribers");
        }
    }

    /// Runs one full latency, download and upload pass
    ///
    /// Returns `None` without emitting anything when another run is in progress.
    /// Otherwise exactly one `TestCompleted` is published, and its result returned,
    /// whether the run succeeded, failed or was cancelled.
    pub async fn run_full_test(&self, cancel: CancellationToken) -> Option<SpeedTestResult> {
        let _guard = self.try_begin_run()?;
        info!("Starting speed test");

        let mut context = self.new_run_context(cancel);
        let mut result = SpeedTestResult::new();

        let outcome = AssertUnwindSafe(self.run_phases(&mut context, &mut result))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {
                result.succeed(self.shared.config.server_info.clone());
                self.emit_progress(&mut context.throttle, SpeedTestProgress::complete());
                info!(
                    "Speed test complete: down {:.2} Mbps, up {:.2} Mbps, latency {:.1} ms",
                    result.download_speed_mbps, result.upload_speed_mbps, result.latency_ms
                );
            }
            Ok(Err(error)) => {
                warn!("Speed test failed: {}", error);
                result.fail(&error);
            }
            Err(panic) => {
                let error = SpeedTestError::Failed(panic_message(panic.as_ref()));
                warn!("Speed test aborted: {}", error);
                result.fail(&error);
            }
        }

        self.publish(SpeedTestEvent::TestCompleted(result.clone()));
        Some(result)
    }

    async fn run_phases(
        &self,
        context: &mut RunContext,
        result: &mut SpeedTestResult,
    ) -> Result<(), SpeedTestError> {
        let config = &self.shared.config;

        let latency = {
            let throttle = &mut context.throttle;
            measure_latency(
                self.shared.transport.as_ref(),
                config,
                &context.cancel,
                &context.last_error,
                |rtt_ms, percent| {
                    self.emit_progress(throttle, SpeedTestProgress::latency(rtt_ms, percent))
                },
            )
            .await?
        };
        result.latency_ms = latency.latency_ms;
        result.jitter_ms = latency.jitter_ms;

        let download = self.run_transfer(Direction::Download, context).await?;
        result.download_speed_mbps = download.speed_mbps;

        let upload = self.run_transfer(Direction::Upload, context).await?;
        result.upload_speed_mbps = upload.speed_mbps;

        if latency.samples == 0 && download.total_bytes == 0 && upload.total_bytes == 0 {
            return Err(match context.last_error.take() {
                Some(error) => SpeedTestError::Network(error),
                None => SpeedTestError::Unreachable,
            });
        }

        Ok(())
    }

    async fn run_transfer(
        &self,
        direction: Direction,
        context: &mut RunContext,
    ) -> Result<TransferOutcome, SpeedTestError> {
        let phase = direction.phase();
        self.emit_progress(
            &mut context.throttle,
            SpeedTestProgress::transfer(phase, 0.0, 0.0),
        );

        let throttle = &mut context.throttle;
        run_transfer_phase(
            direction,
            Arc::clone(&self.shared.transport),
            &self.shared.config,
            &context.cancel,
            &context.last_error,
            |speed_mbps, percent| {
                self.emit_progress(throttle, SpeedTestProgress::transfer(phase, speed_mbps, percent))
            },
        )
        .await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unexpected error during speed test".to_string()
    }
}
