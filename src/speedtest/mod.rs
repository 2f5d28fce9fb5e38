//! Active bandwidth tester
//!
//! ## Module Organization
//!
//! - `engine`: `SpeedTester`, run admission and phase orchestration
//! - `latency`: sequential latency probes, mean and jitter
//! - `transfer`: parallel download and upload phases with warm-up exclusion
//! - `quick`: single-stream download test over fallback URLs
//! - `throttle`: progress event rate limiting
//! - `transport`: HTTP transport abstraction and `reqwest` implementation
//! - `models`: phases, progress, results and events
//! - `errors`: transport and run-level errors
//!
//! ## Usage
//!
//! ```rust,no_run
//! use throughput::settings::SpeedTestConfig;
//! use throughput::speedtest::{SpeedTestEvent, SpeedTester};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let tester = SpeedTester::new(SpeedTestConfig::default())?;
//! let mut events = tester.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(SpeedTestEvent::ProgressChanged(progress)) = events.recv().await {
//!         println!("{} {:.0}%", progress.phase, progress.progress_percent);
//!     }
//! });
//!
//! if let Some(result) = tester.run_full_test(CancellationToken::new()).await {
//!     println!("down {:.1} Mbps", result.download_speed_mbps);
//! }
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod errors;
pub mod latency;
pub mod models;
pub mod quick;
pub mod throttle;
pub mod transfer;
pub mod transport;

pub use engine::SpeedTester;
pub use errors::{SpeedTestError, TransportError};
pub use models::{SpeedTestEvent, SpeedTestPhase, SpeedTestProgress, SpeedTestResult};
pub use transport::{DownloadBody, HttpTransport, SpeedTestTransport};
