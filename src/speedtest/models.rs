//! Speed test data structures
//!
//! Progress updates are transient and consumed immediately by observers. A result is
//! built once per run and published exactly once through `SpeedTestEvent::TestCompleted`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::speedtest::errors::SpeedTestError;

/// Phase of a speed test run
///
/// Phases only ever advance in declaration order during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum SpeedTestPhase {
    /// Not currently running a test
    #[default]
    Idle,
    /// Measuring round-trip latency
    Latency,
    /// Measuring download speed
    Download,
    /// Measuring upload speed
    Upload,
    /// Run finished
    Complete,
}

impl fmt::Display for SpeedTestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SpeedTestPhase::Idle => "Idle",
            SpeedTestPhase::Latency => "Latency",
            SpeedTestPhase::Download => "Download",
            SpeedTestPhase::Upload => "Upload",
            SpeedTestPhase::Complete => "Complete",
        };
        f.write_str(label)
    }
}

/// A progress update emitted during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedTestProgress {
    pub phase: SpeedTestPhase,
    /// Running speed in Mbps; only meaningful in Download and Upload
    pub current_speed_mbps: f64,
    /// Latest probe round trip in ms; only meaningful in Latency
    pub current_latency_ms: f64,
    /// Phase-local progress, 0 to 100
    pub progress_percent: f64,
    pub status_message: String,
}

impl SpeedTestProgress {
    pub fn latency(latency_ms: f64, progress_percent: f64) -> Self {
        Self {
            phase: SpeedTestPhase::Latency,
            current_speed_mbps: 0.0,
            current_latency_ms: latency_ms,
            progress_percent: clamp_percent(progress_percent),
            status_message: "Measuring latency...".to_string(),
        }
    }

    pub fn transfer(phase: SpeedTestPhase, speed_mbps: f64, progress_percent: f64) -> Self {
        let status_message = match phase {
            SpeedTestPhase::Upload => "Testing upload speed...",
            _ => "Testing download speed...",
        };
        Self {
            phase,
            current_speed_mbps: speed_mbps,
            current_latency_ms: 0.0,
            progress_percent: clamp_percent(progress_percent),
            status_message: status_message.to_string(),
        }
    }

    pub fn complete() -> Self {
        Self {
            phase: SpeedTestPhase::Complete,
            current_speed_mbps: 0.0,
            current_latency_ms: 0.0,
            progress_percent: 100.0,
            status_message: "Test complete".to_string(),
        }
    }
}

/// Clamps a percentage into `[0, 100]`, mapping NaN to 0
pub fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

/// Elapsed share of a phase as a percentage
pub fn phase_percent(elapsed: Duration, phase_duration: Duration) -> f64 {
    if phase_duration.is_zero() {
        return 100.0;
    }
    clamp_percent(elapsed.as_secs_f64() / phase_duration.as_secs_f64() * 100.0)
}

/// Outcome of one speed test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedTestResult {
    pub success: bool,
    pub download_speed_mbps: f64,
    pub upload_speed_mbps: f64,
    pub latency_ms: f64,
    pub jitter_ms: f64,
    pub server_info: Option<String>,
    pub error_message: Option<String>,
    pub test_timestamp: DateTime<Utc>,
}

impl Default for SpeedTestResult {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeedTestResult {
    pub fn new() -> Self {
        Self {
            success: false,
            download_speed_mbps: 0.0,
            upload_speed_mbps: 0.0,
            latency_ms: 0.0,
            jitter_ms: 0.0,
            server_info: None,
            error_message: None,
            test_timestamp: Utc::now(),
        }
    }

    /// Marks the run successful; completion time is taken now
    pub fn succeed(&mut self, server_info: impl Into<String>) {
        self.success = true;
        self.server_info = Some(server_info.into());
        self.error_message = None;
        self.test_timestamp = Utc::now();
    }

    /// Marks the run failed, keeping any phase results already recorded
    pub fn fail(&mut self, error: &SpeedTestError) {
        self.success = false;
        self.error_message = Some(error.to_string());
        self.test_timestamp = Utc::now();
    }
}

/// Notifications delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpeedTestEvent {
    ProgressChanged(SpeedTestProgress),
    TestCompleted(SpeedTestResult),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        assert!(SpeedTestPhase::Latency < SpeedTestPhase::Download);
        assert!(SpeedTestPhase::Download < SpeedTestPhase::Upload);
        assert!(SpeedTestPhase::Upload < SpeedTestPhase::Complete);
        assert_eq!(SpeedTestPhase::default(), SpeedTestPhase::Idle);
    }

    #[test]
    fn test_phase_percent_is_clamped() {
        let ten = Duration::from_secs(10);
        assert_eq!(phase_percent(Duration::ZERO, ten), 0.0);
        assert_eq!(phase_percent(Duration::from_secs(5), ten), 50.0);
        assert_eq!(phase_percent(Duration::from_secs(12), ten), 100.0);
        assert_eq!(phase_percent(Duration::from_secs(1), Duration::ZERO), 100.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
        assert_eq!(clamp_percent(-4.0), 0.0);
    }

    #[test]
    fn test_failed_result_keeps_partial_values() {
        let mut result = SpeedTestResult::new();
        result.latency_ms = 12.5;
        result.download_speed_mbps = 80.0;

        result.fail(&SpeedTestError::Cancelled);

        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("Speed test cancelled"));
        assert_eq!(result.latency_ms, 12.5);
        assert_eq!(result.download_speed_mbps, 80.0);
    }

    #[test]
    fn test_result_serializes_for_json_output() {
        let mut result = SpeedTestResult::new();
        result.succeed("lab server");
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["success"], true);
        assert_eq!(json["server_info"], "lab server");
        assert!(json["error_message"].is_null());
    }
}
