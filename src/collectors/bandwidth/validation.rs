//! Rate calculation and validation for counter readings
//!
//! Converts two cumulative counter readings into bytes-per-second rates, rejecting
//! readings that cannot produce a trustworthy rate: counters that went backwards
//! (interface restart, driver reload, wraparound) and readings taken out of order.

use log::trace;
use std::time::{Duration, Instant};

use crate::collectors::bandwidth::errors::SamplerError;
use crate::collectors::platform::CounterTotals;

/// A cumulative counter reading and when it was taken
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterReading {
    pub totals: CounterTotals,
    pub taken_at: Instant,
}

impl CounterReading {
    pub fn new(totals: CounterTotals, taken_at: Instant) -> Self {
        Self { totals, taken_at }
    }
}

/// Result of comparing two readings
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateOutcome {
    /// A fresh rate in bytes per second
    Rate { download_bps: f64, upload_bps: f64 },
    /// Readings too close together; keep the previous rate and baseline
    TooSoon,
}

/// Detects counter reset conditions for network interface counters
///
/// Returns `true` when either current counter is smaller than its previous value.
pub fn detect_counter_reset(current: CounterTotals, previous: CounterTotals) -> bool {
    current.bytes_received < previous.bytes_received || current.bytes_sent < previous.bytes_sent
}

/// Calculates download and upload rates between two readings of one instance
///
/// # Errors
///
/// * `SamplerError::InvalidTimeInterval` if `current` was taken before `previous`
/// * `SamplerError::CounterReset` if either counter decreased
pub fn calculate_rates(
    instance: &str,
    previous: &CounterReading,
    current: &CounterReading,
    min_interval: Duration,
) -> Result<RateOutcome, SamplerError> {
    let elapsed = current
        .taken_at
        .checked_duration_since(previous.taken_at)
        .ok_or_else(|| SamplerError::InvalidTimeInterval {
            interval_ms: -(previous.taken_at.duration_since(current.taken_at).as_millis() as i64),
        })?;

    if elapsed.is_zero() || elapsed < min_interval {
        trace!(
            "Counter '{}': interval too small for reliable calculation: {:?} < {:?}",
            instance, elapsed, min_interval
        );
        return Ok(RateOutcome::TooSoon);
    }

    if detect_counter_reset(current.totals, previous.totals) {
        return Err(SamplerError::CounterReset {
            instance: instance.to_string(),
            previous_rx: previous.totals.bytes_received,
            current_rx: current.totals.bytes_received,
            previous_tx: previous.totals.bytes_sent,
            current_tx: current.totals.bytes_sent,
        });
    }

    let seconds = elapsed.as_secs_f64();
    let download_bps =
        (current.totals.bytes_received - previous.totals.bytes_received) as f64 / seconds;
    let upload_bps = (current.totals.bytes_sent - previous.totals.bytes_sent) as f64 / seconds;

    trace!(
        "Counter '{}': down {:.2} B/s, up {:.2} B/s over {:.3}s",
        instance, download_bps, upload_bps, seconds
    );

    Ok(RateOutcome::Rate {
        download_bps,
        upload_bps,
    })
}
