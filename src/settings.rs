//! Layered configuration
//!
//! Defaults are compiled in; an optional TOML file and `THROUGHPUT_*` environment
//! variables override them (`THROUGHPUT_SPEEDTEST__WORKERS=8`). All durations are
//! stored as integer milliseconds and exposed as `Duration` through accessors.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "THROUGHPUT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub speedtest: SpeedTestConfig,
    pub sampler: SamplerConfig,
}

/// Endpoints and timing constants of the active bandwidth tester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedTestConfig {
    /// Low-payload URL probed for round-trip latency
    pub latency_url: String,
    /// Large fixed-size payload streamed by download workers
    pub download_url: String,
    /// Sink accepting POSTed upload blocks
    pub upload_url: String,
    /// Alternate large files tried in order by the single-shot quick test
    pub fallback_urls: Vec<String>,
    /// Server identifier reported in successful results
    pub server_info: String,
    /// Number of sequential latency probes
    pub latency_probes: usize,
    /// Pause between latency probes
    pub probe_delay_ms: u64,
    /// Parallel workers per transfer phase
    pub workers: usize,
    /// Length of each transfer phase
    pub test_duration_ms: u64,
    /// Initial span of each transfer phase excluded from the speed
    pub warmup_ms: u64,
    /// Read buffer size for download bodies
    pub chunk_size: usize,
    /// Size of the random block each upload worker POSTs
    pub upload_block_size: usize,
    /// Pause before an upload worker retries a failed POST
    pub upload_retry_delay_ms: u64,
    /// Minimum spacing between progress events
    pub progress_interval_ms: u64,
    /// Overall timeout for a single HTTP request
    pub request_timeout_ms: u64,
    /// Capacity of the observer event channel
    pub event_buffer: usize,
}

impl Default for SpeedTestConfig {
    fn default() -> Self {
        Self {
            latency_url: "https://speed.cloudflare.com/__down?bytes=0".to_string(),
            download_url: "https://speed.cloudflare.com/__down?bytes=25000000".to_string(),
            upload_url: "https://speed.cloudflare.com/__up".to_string(),
            fallback_urls: vec![
                "https://speed.cloudflare.com/__down?bytes=10000000".to_string(),
                "https://proof.ovh.net/files/10Mb.dat".to_string(),
                "http://speedtest.tele2.net/10MB.zip".to_string(),
            ],
            server_info: "Cloudflare (speed.cloudflare.com)".to_string(),
            latency_probes: 5,
            probe_delay_ms: 100,
            workers: 4,
            test_duration_ms: 10_000,
            warmup_ms: 2_000,
            chunk_size: 81_920,
            upload_block_size: 1024 * 1024,
            upload_retry_delay_ms: 100,
            progress_interval_ms: 200,
            request_timeout_ms: 30_000,
            event_buffer: 256,
        }
    }
}

impl SpeedTestConfig {
    pub fn probe_delay(&self) -> Duration {
        Duration::from_millis(self.probe_delay_ms)
    }

    pub fn test_duration(&self) -> Duration {
        Duration::from_millis(self.test_duration_ms)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn upload_retry_delay(&self) -> Duration {
        Duration::from_millis(self.upload_retry_delay_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Rejects values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };

        if self.workers == 0 {
            return invalid("speedtest.workers", "must be at least 1");
        }
        if self.test_duration_ms == 0 {
            return invalid("speedtest.test_duration_ms", "must be positive");
        }
        if self.warmup_ms >= self.test_duration_ms {
            return invalid(
                "speedtest.warmup_ms",
                "must be shorter than speedtest.test_duration_ms",
            );
        }
        if self.chunk_size == 0 {
            return invalid("speedtest.chunk_size", "must be positive");
        }
        if self.upload_block_size == 0 {
            return invalid("speedtest.upload_block_size", "must be positive");
        }
        if self.event_buffer == 0 {
            return invalid("speedtest.event_buffer", "must be at least 1");
        }
        Ok(())
    }
}

/// Timing of the passive throughput sampler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// How often the bound adapter is checked against the active one
    pub adapter_check_interval_ms: u64,
    /// Reads closer together than this reuse the previous rate
    pub min_sample_interval_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            adapter_check_interval_ms: 30_000,
            min_sample_interval_ms: 100,
        }
    }
}

impl SamplerConfig {
    pub fn adapter_check_interval(&self) -> Duration {
        Duration::from_millis(self.adapter_check_interval_ms)
    }

    pub fn min_sample_interval(&self) -> Duration {
        Duration::from_millis(self.min_sample_interval_ms)
    }
}

impl AppConfig {
    /// Loads defaults, then the optional file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        let settings = builder.build()?;
        let app_config: AppConfig = settings.try_deserialize()?;
        app_config.speedtest.validate()?;

        Ok(app_config)
    }
}
