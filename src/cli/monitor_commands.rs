use anyhow::{Context, Result};
use log::debug;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

use crate::collectors::bandwidth::ThroughputSampler;
use crate::collectors::bandwidth::adapter::{
    adapter_relevance, discover_active_adapter, is_candidate_adapter,
};
use crate::collectors::platform::{InterfaceManager, NetworkCounters, SystemCounters};
use crate::settings::SamplerConfig;

/// Handles the passive sampling commands
pub struct MonitorCommandHandler {
    config: SamplerConfig,
}

impl MonitorCommandHandler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// Prints one sample per interval until Ctrl-C or `count` samples
    pub async fn handle_live(&self, interval_ms: u64, count: Option<u64>) -> Result<()> {
        let mut sampler = ThroughputSampler::with_config(&self.config);
        match sampler.bound_adapter() {
            Some(adapter) => println!("Monitoring {adapter} (Ctrl-C to stop)"),
            None => println!("No active adapter found yet; waiting (Ctrl-C to stop)"),
        }

        let period = Duration::from_millis(interval_ms.max(self.config.min_sample_interval_ms));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately and only primes the baseline
        ticker.tick().await;

        let mut printed = 0u64;
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    debug!("Interrupted after {} samples", printed);
                    break;
                }
                _ = ticker.tick() => {
                    let sample = sampler.sample();
                    println!("{}  {}", sample.timestamp.format("%H:%M:%S"), sample.display_line());
                    printed += 1;
                    if count.is_some_and(|limit| printed >= limit) {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Prints enumerated adapters, counter instances and the resulting binding
    pub fn handle_adapters(&self) -> Result<()> {
        let mut counters = SystemCounters::new();
        let mut classifier = InterfaceManager::new();

        let adapters = counters
            .adapters()
            .context("Failed to enumerate network adapters")?;

        println!("Network Adapters");
        println!("================");
        for adapter in &adapters {
            println!(
                "  {:<16} {:<9} {:<5} relevance {:>3}{}",
                adapter.name,
                format!("{:?}", adapter.kind),
                if adapter.is_up { "up" } else { "down" },
                adapter_relevance(adapter, &mut classifier),
                if is_candidate_adapter(adapter) { "  (candidate)" } else { "" }
            );
        }

        let instances = counters
            .counter_instances()
            .context("Failed to list counter instances")?;
        println!("\nCounter instances: {}", instances.join(", "));

        match discover_active_adapter(&mut counters, &mut classifier) {
            Ok(found) => println!("Sampler binds: {} ({:?})", found.instance, found.match_kind),
            Err(error) => println!("Sampler binds nothing: {error}"),
        }

        Ok(())
    }
}
