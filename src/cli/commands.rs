use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure for the thru application
/// Uses clap's derive macros for automatic CLI generation
#[derive(Parser, Debug)]
#[command(author = "Kaipo Chen")]
#[command(version)] // Automatically uses version from Cargo.toml
#[command(about = "Network throughput monitor and internet speed tester")]
#[command(long_about = "thru samples the live throughput of the active network adapter from OS byte \
counters, and measures internet latency, jitter, download and upload speed with a multi-phase \
parallel speed test.")]
pub struct Cli {
    /// Optional TOML configuration file; THROUGHPUT_* environment variables override it
    #[arg(short, long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Raise log output to debug (RUST_LOG takes precedence)
    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Live throughput of the active adapter
    #[command(about = "Print live download/upload rates of the active adapter")]
    #[command(long_about = "Polls the passive throughput sampler and prints one line per sample. \
The sampler follows the active adapter and recovers by itself from counter resets.\n\n\
Examples:\n  \
thru live                      # One sample per second until Ctrl-C\n  \
thru live --interval 500       # Sample every 500 ms\n  \
thru live --count 10           # Stop after 10 samples")]
    Live {
        /// Sampling interval in milliseconds
        #[arg(short, long, default_value = "1000", help = "Sampling interval in milliseconds")]
        interval: u64,

        /// Number of samples to print before exiting
        #[arg(short = 'n', long, help = "Stop after this many samples")]
        count: Option<u64>,
    },

    /// Adapter discovery report
    #[command(about = "Show candidate adapters and the counter instance the sampler binds")]
    Adapters,

    /// Full multi-phase speed test
    #[command(about = "Run latency, download and upload tests")]
    #[command(long_about = "Runs the full speed test: latency probes, then parallel download and \
upload phases with warm-up exclusion. Press Ctrl-C to cancel; a cancelled run still reports its \
partial results.\n\n\
Examples:\n  \
thru speedtest                 # Live progress then a summary\n  \
thru speedtest --json          # Result as JSON")]
    Speedtest {
        /// Print the result as JSON instead of a summary
        #[arg(long, help = "Output the result as JSON")]
        json: bool,
    },

    /// Single-stream download test over the fallback URLs
    #[command(about = "Quick single-stream download test")]
    Quick {
        /// Print the result as JSON instead of a summary
        #[arg(long, help = "Output the result as JSON")]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_live_with_global_flags() {
        let cli = Cli::try_parse_from(["thru", "-v", "live", "--interval", "250", "-n", "3"])
            .expect("should parse");
        assert!(cli.verbose);
        match cli.command {
            Commands::Live { interval, count } => {
                assert_eq!(interval, 250);
                assert_eq!(count, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_speedtest_json_with_config() {
        let cli = Cli::try_parse_from(["thru", "speedtest", "--json", "--config", "thru.toml"])
            .expect("should parse");
        assert_eq!(cli.config, Some(PathBuf::from("thru.toml")));
        assert!(matches!(cli.command, Commands::Speedtest { json: true }));
    }
}
