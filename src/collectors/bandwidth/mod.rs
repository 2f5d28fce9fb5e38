//! Passive bandwidth sampling module
//!
//! Reads the instantaneous throughput of the machine's active network adapter from
//! cumulative OS byte counters, and provides the unit conversions and display
//! formatting shared with the active speed tester.
//!
//! ## Module Organization
//!
//! - `sampler`: `ThroughputSampler`, the self-healing rate reader
//! - `adapter`: active adapter discovery and counter instance matching
//! - `errors`: sampler error type and absorbed-error logging
//! - `stats`: `ThroughputSample` and display helpers
//! - `validation`: rate calculation and counter reset detection
//! - `formatting`: speed, size and latency formatting
//!
//! ## Usage
//!
//! ```rust,no_run
//! use throughput::collectors::bandwidth::ThroughputSampler;
//!
//! let mut sampler = ThroughputSampler::new();
//! let (download_bps, upload_bps) = sampler.get_current_speed();
//! println!("down {download_bps} B/s, up {upload_bps} B/s");
//! ```

pub mod adapter;
pub mod errors;
pub mod formatting;
pub mod sampler;
pub mod stats;
pub mod validation;

pub use sampler::ThroughputSampler;

pub use adapter::{AdapterMatch, MatchKind};
pub use stats::ThroughputSample;

pub use errors::SamplerError;

pub use formatting::{
    bytes_to_mbps, format_bytes, format_latency, format_mbps, format_speed, mbps_to_bytes,
};

#[cfg(test)]
pub mod tests;
