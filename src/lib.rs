//! Network throughput monitoring and internet speed testing
//!
//! - [`collectors`]: passive sampling of the active adapter's live throughput
//! - [`speedtest`]: multi-phase latency, download and upload measurement
//! - [`settings`]: layered configuration for both

pub mod cli;
pub mod collectors;
pub mod settings;
pub mod speedtest;
