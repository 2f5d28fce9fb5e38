//! Passive throughput sampler
//!
//! Reports the instantaneous download and upload rate of the active network adapter
//! from OS byte counters. The sampler binds to one counter instance, re-checks which
//! adapter is active on a fixed interval, and rebinds when it changes. It never
//! returns an error: any counter failure tears the binding down, reinitializes it and
//! yields a zero reading until the counters recover.

use log::{debug, info, warn};
use std::time::{Duration, Instant};

use crate::collectors::bandwidth::adapter::{AdapterMatch, MatchKind, discover_active_adapter};
use crate::collectors::bandwidth::errors::{SamplerError, log_absorbed_error};
use crate::collectors::bandwidth::stats::ThroughputSample;
use crate::collectors::bandwidth::validation::{CounterReading, RateOutcome, calculate_rates};
use crate::collectors::platform::interface_manager::InterfaceManager;
use crate::collectors::platform::{NetworkCounters, SystemCounters};
use crate::settings::SamplerConfig;

/// The counter instance currently read, with the baseline for the next rate
#[derive(Debug, Clone)]
struct AdapterBinding {
    instance: String,
    match_kind: MatchKind,
    last_reading: CounterReading,
}

/// Samples live adapter throughput on demand
#[derive(Debug)]
pub struct ThroughputSampler<C: NetworkCounters = SystemCounters> {
    counters: C,
    classifier: InterfaceManager,
    binding: Option<AdapterBinding>,
    /// When the bound adapter was last compared with the active one
    last_adapter_check: Option<Instant>,
    adapter_check_interval: Duration,
    min_sample_interval: Duration,
    /// Rate returned for reads that come too soon after the previous one
    last_rates: (f64, f64),
    reinitialize_count: u64,
}

impl ThroughputSampler<SystemCounters> {
    /// Creates a sampler over the system counters with default timing
    pub fn new() -> Self {
        Self::with_counters(SystemCounters::new(), &SamplerConfig::default())
    }

    /// Creates a sampler over the system counters with the given timing
    pub fn with_config(config: &SamplerConfig) -> Self {
        Self::with_counters(SystemCounters::new(), config)
    }
}

impl Default for ThroughputSampler<SystemCounters> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: NetworkCounters> ThroughputSampler<C> {
    /// Creates a sampler over any counter source and binds the active adapter
    pub fn with_counters(counters: C, config: &SamplerConfig) -> Self {
        let mut sampler = Self {
            counters,
            classifier: InterfaceManager::new(),
            binding: None,
            last_adapter_check: None,
            adapter_check_interval: config.adapter_check_interval(),
            min_sample_interval: config.min_sample_interval(),
            last_rates: (0.0, 0.0),
            reinitialize_count: 0,
        };
        sampler.initialize_counters();
        sampler
    }

    /// Gets the current download and upload speed in bytes per second
    ///
    /// Returns `(0.0, 0.0)` when no adapter is bound or the read failed.
    pub fn get_current_speed(&mut self) -> (f64, f64) {
        let now = Instant::now();

        let check_due = self
            .last_adapter_check
            .is_none_or(|last| now.duration_since(last) >= self.adapter_check_interval);
        if check_due {
            self.last_adapter_check = Some(now);
            self.check_and_switch_adapter();
        }

        match self.read_rates(now) {
            Ok(rates) => rates,
            Err(error) => {
                log_absorbed_error(&error, "reinitializing counters");
                self.reinitialize();
                (0.0, 0.0)
            }
        }
    }

    /// Takes a timestamped sample, carrying the bound adapter name
    pub fn sample(&mut self) -> ThroughputSample {
        let (download_bps, upload_bps) = self.get_current_speed();
        ThroughputSample {
            download_bps,
            upload_bps,
            ..ThroughputSample::idle(self.bound_adapter().map(str::to_string))
        }
    }

    /// Name of the counter instance currently bound, if any
    pub fn bound_adapter(&self) -> Option<&str> {
        self.binding.as_ref().map(|binding| binding.instance.as_str())
    }

    /// Whether the bound instance came from the no-match fallback
    pub fn is_fallback_binding(&self) -> bool {
        self.binding
            .as_ref()
            .is_some_and(|binding| binding.match_kind == MatchKind::Fallback)
    }

    /// How many times the counters were torn down and rebuilt
    pub fn reinitialize_count(&self) -> u64 {
        self.reinitialize_count
    }

    /// Tears down the binding and rediscovers the active adapter
    pub fn reinitialize(&mut self) {
        self.reinitialize_count += 1;
        self.dispose_counters();
        self.classifier.clear_cache();
        self.initialize_counters();
    }

    fn read_rates(&mut self, now: Instant) -> Result<(f64, f64), SamplerError> {
        let Some(binding) = self.binding.as_mut() else {
            return Ok((0.0, 0.0));
        };

        let totals = self.counters.read_totals(&binding.instance)?;
        let current = CounterReading::new(totals, now);

        match calculate_rates(
            &binding.instance,
            &binding.last_reading,
            &current,
            self.min_sample_interval,
        )? {
            RateOutcome::Rate {
                download_bps,
                upload_bps,
            } => {
                binding.last_reading = current;
                self.last_rates = (download_bps, upload_bps);
                Ok(self.last_rates)
            }
            RateOutcome::TooSoon => Ok(self.last_rates),
        }
    }

    fn initialize_counters(&mut self) {
        match discover_active_adapter(&mut self.counters, &mut self.classifier) {
            Ok(found) => self.bind(found),
            Err(error) => {
                debug!("Failed to initialize network counters: {}", error);
            }
        }
    }

    fn bind(&mut self, found: AdapterMatch) {
        // Initial read primes the baseline so the next call yields a rate
        match self.counters.read_totals(&found.instance) {
            Ok(totals) => {
                info!(
                    "Bound throughput sampler to '{}' ({:?})",
                    found.instance, found.match_kind
                );
                self.binding = Some(AdapterBinding {
                    instance: found.instance,
                    match_kind: found.match_kind,
                    last_reading: CounterReading::new(totals, Instant::now()),
                });
                self.last_rates = (0.0, 0.0);
            }
            Err(error) => {
                warn!(
                    "Failed to prime counters for '{}': {}",
                    found.instance, error
                );
                self.binding = None;
            }
        }
    }

    /// Rebinds when the active adapter differs from the bound one
    fn check_and_switch_adapter(&mut self) {
        match discover_active_adapter(&mut self.counters, &mut self.classifier) {
            Ok(found) => {
                if self.bound_adapter() != Some(found.instance.as_str()) {
                    info!(
                        "Active adapter changed from {:?} to '{}'",
                        self.bound_adapter(),
                        found.instance
                    );
                    self.dispose_counters();
                    self.bind(found);
                }
            }
            Err(error) => {
                // Keep the current binding; a vanished adapter surfaces on the next read
                debug!("Adapter check found no active adapter: {}", error);
            }
        }
    }

    fn dispose_counters(&mut self) {
        self.binding = None;
        self.last_rates = (0.0, 0.0);
    }
}
