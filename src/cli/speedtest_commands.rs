use anyhow::{Context, Result};
use log::{debug, trace};
use std::io::Write;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::collectors::bandwidth::formatting::{format_latency, format_mbps};
use crate::settings::SpeedTestConfig;
use crate::speedtest::{
    SpeedTestEvent, SpeedTestPhase, SpeedTestProgress, SpeedTestResult, SpeedTester,
};

/// Which speed test mode to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedTestMode {
    Full,
    Quick,
}

/// Handles the active speed test commands
pub struct SpeedTestCommandHandler {
    tester: SpeedTester,
}

impl SpeedTestCommandHandler {
    pub fn new(config: SpeedTestConfig) -> Result<Self> {
        let tester = SpeedTester::new(config).context("Failed to create speed tester")?;
        Ok(Self { tester })
    }

    pub async fn handle(&self, mode: SpeedTestMode, json: bool) -> Result<()> {
        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });

        let progress = (!json).then(|| tokio::spawn(print_progress(self.tester.subscribe())));

        let result = match mode {
            SpeedTestMode::Full => self.tester.run_full_test(cancel).await,
            SpeedTestMode::Quick => self.tester.run_quick_test(cancel).await,
        };
        ctrl_c.abort();

        if let Some(progress) = progress {
            if result.is_none() {
                progress.abort();
            } else if let Err(error) = progress.await {
                // Printer exits on TestCompleted
                debug!("Progress printer ended abnormally: {}", error);
            }
        }

        let result = result.context("A speed test is already running")?;
        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("Failed to serialize result")?
            );
        } else {
            print_summary(&result, mode);
        }

        Ok(())
    }
}

async fn print_progress(mut events: tokio::sync::broadcast::Receiver<SpeedTestEvent>) {
    let mut stdout = std::io::stdout();
    loop {
        match events.recv().await {
            Ok(SpeedTestEvent::ProgressChanged(progress)) => {
                if let Err(error) = write_progress(&mut stdout, &progress) {
                    trace!("Failed to write progress line: {}", error);
                }
            }
            Ok(SpeedTestEvent::TestCompleted(_)) | Err(RecvError::Closed) => break,
            Err(RecvError::Lagged(skipped)) => debug!("Skipped {} progress events", skipped),
        }
    }
    println!();
}

/// Overwrites the current terminal line with one progress update
fn write_progress(out: &mut impl Write, progress: &SpeedTestProgress) -> std::io::Result<()> {
    let reading = match progress.phase {
        SpeedTestPhase::Latency => format_latency(progress.current_latency_ms),
        SpeedTestPhase::Download | SpeedTestPhase::Upload => {
            format_mbps(progress.current_speed_mbps)
        }
        _ => String::new(),
    };
    write!(
        out,
        "\r{:<9} {:>5.1}%  {:<14} {:<28}",
        progress.phase.to_string(),
        progress.progress_percent,
        reading,
        progress.status_message
    )?;
    out.flush()
}

fn print_summary(result: &SpeedTestResult, mode: SpeedTestMode) {
    println!("Speed Test Results");
    println!("==================");
    if let Some(server) = &result.server_info {
        println!("  Server:    {server}");
    }
    if mode == SpeedTestMode::Full {
        println!("  Latency:   {}", format_latency(result.latency_ms));
        println!("  Jitter:    {}", format_latency(result.jitter_ms));
    }
    println!("  Download:  {}", format_mbps(result.download_speed_mbps));
    if mode == SpeedTestMode::Full {
        println!("  Upload:    {}", format_mbps(result.upload_speed_mbps));
    }
    if let Some(error) = &result.error_message {
        println!("  Error:     {error}");
    }
    println!(
        "  Completed: {}",
        result.test_timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Accepts writes but cannot flush, like a closed terminal
    struct BrokenPipe(Vec<u8>);

    impl Write for BrokenPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal closed"))
        }
    }

    #[test]
    fn test_progress_line_shows_phase_reading() {
        let mut out = Vec::new();
        write_progress(&mut out, &SpeedTestProgress::latency(12.4, 40.0)).expect("write");
        let line = String::from_utf8(out).expect("utf8");

        assert!(line.starts_with("\rLatency"));
        assert!(line.contains("40.0%"));
        assert!(line.contains("12 ms"));
        assert!(line.contains("Measuring latency..."));
    }

    #[test]
    fn test_flush_failure_is_reported() {
        let mut out = BrokenPipe(Vec::new());
        let progress = SpeedTestProgress::transfer(SpeedTestPhase::Download, 85.0, 50.0);

        let error = write_progress(&mut out, &progress).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
        assert!(String::from_utf8_lossy(&out.0).contains("85.0 Mbps"));
    }
}
