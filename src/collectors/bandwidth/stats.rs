//! Throughput sample data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collectors::bandwidth::formatting::{bytes_to_mbps, format_speed};

/// One reading of the passive sampler
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThroughputSample {
    /// UTC timestamp when the sample was taken
    pub timestamp: DateTime<Utc>,
    /// Counter instance the sample was read from, if an adapter is bound
    pub adapter: Option<String>,
    /// Current download speed in bytes per second
    pub download_bps: f64,
    /// Current upload speed in bytes per second
    pub upload_bps: f64,
}

impl ThroughputSample {
    /// A zero reading, used whenever no adapter is bound or a read failed
    pub fn idle(adapter: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            adapter,
            download_bps: 0.0,
            upload_bps: 0.0,
        }
    }

    pub fn download_mbps(&self) -> f64 {
        bytes_to_mbps(self.download_bps)
    }

    pub fn upload_mbps(&self) -> f64 {
        bytes_to_mbps(self.upload_bps)
    }

    /// Checks if the sample shows any traffic
    pub fn has_activity(&self) -> bool {
        self.download_bps > 0.0 || self.upload_bps > 0.0
    }

    /// One-line display, e.g. `eth0  ↓ 1.5 MB/s  ↑ 12.0 KB/s`
    pub fn display_line(&self) -> String {
        format!(
            "{}  ↓ {}  ↑ {}",
            self.adapter.as_deref().unwrap_or("(no adapter)"),
            format_speed(self.download_bps),
            format_speed(self.upload_bps)
        )
    }
}
