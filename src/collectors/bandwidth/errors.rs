//! Error types for passive throughput sampling
//!
//! None of these ever reach callers of `ThroughputSampler::get_current_speed`; the sampler
//! logs them and self-heals. They exist so that every counter and enumeration boundary
//! returns an explicit `Result` instead of swallowing failures silently.

use log::{debug, warn};
use thiserror::Error;

/// Failures raised while discovering adapters or reading interface counters
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SamplerError {
    /// The operating system refused or failed to enumerate interfaces
    #[error("Failed to enumerate network interfaces: {message}")]
    EnumerationFailed { message: String },

    /// No operational, non-loopback adapter could be found
    #[error("No active network adapter found")]
    NoActiveAdapter,

    /// The bound counter instance vanished (adapter removed or renamed)
    #[error("Counter instance '{instance}' is no longer available")]
    InstanceNotFound { instance: String },

    /// A cumulative counter went backwards between two reads
    #[error(
        "Counter reset detected on '{instance}' (rx: {previous_rx} -> {current_rx}, tx: {previous_tx} -> {current_tx})"
    )]
    CounterReset {
        instance: String,
        previous_rx: u64,
        current_rx: u64,
        previous_tx: u64,
        current_tx: u64,
    },

    /// Two reads arrived with a non-positive time difference
    #[error("Invalid time interval between counter reads: {interval_ms}ms")]
    InvalidTimeInterval { interval_ms: i64 },
}

impl SamplerError {
    /// Whether the failure indicates the bound adapter must be rediscovered
    pub fn requires_rebind(&self) -> bool {
        matches!(
            self,
            SamplerError::InstanceNotFound { .. } | SamplerError::CounterReset { .. }
        )
    }
}

/// Logs an absorbed sampler failure with the action taken
pub fn log_absorbed_error(error: &SamplerError, action: &str) {
    if error.requires_rebind() {
        warn!("Throughput sampler error absorbed ({}): {}", action, error);
    } else {
        debug!("Throughput sampler error absorbed ({}): {}", action, error);
    }
}
