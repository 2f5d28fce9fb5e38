//! Tests for the throughput sampler
//!
//! Rates depend on wall-clock time between reads, so assertions check bounds
//! rather than exact values.

#[cfg(test)]
mod tests {
    use std::thread::sleep;
    use std::time::Duration;

    use crate::collectors::bandwidth::ThroughputSampler;
    use crate::collectors::bandwidth::tests::fake_counters::{FakeCounters, adapter};
    use crate::collectors::platform::interface_manager::InterfaceKind;
    use crate::settings::SamplerConfig;

    fn fast_config() -> SamplerConfig {
        SamplerConfig {
            adapter_check_interval_ms: 30_000,
            min_sample_interval_ms: 10,
        }
    }

    fn always_check_config() -> SamplerConfig {
        SamplerConfig {
            adapter_check_interval_ms: 0,
            min_sample_interval_ms: 10,
        }
    }

    #[test]
    fn test_no_adapter_reads_zero() {
        let fake = FakeCounters::default();
        let mut sampler = ThroughputSampler::with_counters(fake, &fast_config());

        assert_eq!(sampler.bound_adapter(), None);
        assert_eq!(sampler.get_current_speed(), (0.0, 0.0));

        let sample = sampler.sample();
        assert_eq!(sample.adapter, None);
        assert!(!sample.has_activity());
    }

    #[test]
    fn test_rates_follow_counter_deltas() {
        let fake = FakeCounters::with_ethernet("eth0");
        let mut sampler = ThroughputSampler::with_counters(fake.clone(), &fast_config());
        assert_eq!(sampler.bound_adapter(), Some("eth0"));
        assert!(!sampler.is_fallback_binding());

        sleep(Duration::from_millis(20));
        fake.add_traffic("eth0", 100_000, 10_000);

        let (download, upload) = sampler.get_current_speed();
        // At least 20ms elapsed, so rates are at most delta / 0.02
        assert!(download > 0.0 && download <= 5_000_000.0);
        assert!(upload > 0.0 && upload <= 500_000.0);
        assert!(download > upload);
    }

    #[test]
    fn test_read_too_soon_reuses_previous_rate() {
        let fake = FakeCounters::with_ethernet("eth0");
        let config = SamplerConfig {
            adapter_check_interval_ms: 30_000,
            min_sample_interval_ms: 60_000,
        };
        let mut sampler = ThroughputSampler::with_counters(fake.clone(), &config);

        fake.add_traffic("eth0", 1_000, 1_000);
        assert_eq!(sampler.get_current_speed(), (0.0, 0.0));
        assert_eq!(sampler.reinitialize_count(), 0);
    }

    #[test]
    fn test_counter_reset_reinitializes_and_recovers() {
        let fake = FakeCounters::with_ethernet("eth0");
        fake.set_totals("eth0", 50_000, 50_000);
        let mut sampler = ThroughputSampler::with_counters(fake.clone(), &fast_config());

        sleep(Duration::from_millis(20));
        fake.set_totals("eth0", 10, 10);

        assert_eq!(sampler.get_current_speed(), (0.0, 0.0));
        assert_eq!(sampler.reinitialize_count(), 1);
        assert_eq!(sampler.bound_adapter(), Some("eth0"));

        sleep(Duration::from_millis(20));
        fake.add_traffic("eth0", 4_000, 0);
        let (download, upload) = sampler.get_current_speed();
        assert!(download > 0.0);
        assert_eq!(upload, 0.0);
    }

    #[test]
    fn test_read_failure_is_absorbed() {
        let fake = FakeCounters::with_ethernet("eth0");
        let mut sampler = ThroughputSampler::with_counters(fake.clone(), &fast_config());

        fake.set_fail_reads(true);
        sleep(Duration::from_millis(20));
        assert_eq!(sampler.get_current_speed(), (0.0, 0.0));
        assert_eq!(sampler.reinitialize_count(), 1);
        // Priming read failed as well, so nothing is bound
        assert_eq!(sampler.bound_adapter(), None);
        assert_eq!(sampler.get_current_speed(), (0.0, 0.0));

        fake.set_fail_reads(false);
        sampler.reinitialize();
        assert_eq!(sampler.bound_adapter(), Some("eth0"));
    }

    #[test]
    fn test_vanished_instance_rebinds_to_new_adapter() {
        let fake = FakeCounters::with_ethernet("eth0");
        let mut sampler = ThroughputSampler::with_counters(fake.clone(), &fast_config());

        fake.set_adapters(vec![adapter("wlan0", InterfaceKind::Wireless, true)]);
        fake.set_instances(&["wlan0"]);
        fake.set_totals("wlan0", 0, 0);
        // Drop eth0's counters so the next read fails
        fake.set_fail_reads(true);
        sleep(Duration::from_millis(20));
        assert_eq!(sampler.get_current_speed(), (0.0, 0.0));

        fake.set_fail_reads(false);
        sampler.reinitialize();
        assert_eq!(sampler.bound_adapter(), Some("wlan0"));
    }

    #[test]
    fn test_periodic_check_switches_active_adapter() {
        let fake = FakeCounters::with_ethernet("wlan0");
        fake.set_adapters(vec![adapter("wlan0", InterfaceKind::Wireless, true)]);
        let mut sampler = ThroughputSampler::with_counters(fake.clone(), &always_check_config());
        assert_eq!(sampler.bound_adapter(), Some("wlan0"));

        // Wired link comes up and outranks wireless
        fake.set_adapters(vec![
            adapter("wlan0", InterfaceKind::Wireless, true),
            adapter("eth0", InterfaceKind::Ethernet, true),
        ]);
        fake.set_instances(&["eth0", "wlan0"]);
        fake.set_totals("eth0", 0, 0);

        sampler.get_current_speed();
        assert_eq!(sampler.bound_adapter(), Some("eth0"));
        assert_eq!(sampler.reinitialize_count(), 0);
    }

    #[test]
    fn test_adapter_check_is_rate_limited() {
        let fake = FakeCounters::with_ethernet("eth0");
        let mut sampler = ThroughputSampler::with_counters(fake.clone(), &fast_config());
        assert_eq!(fake.adapter_calls(), 1);

        sampler.get_current_speed();
        sampler.get_current_speed();
        sampler.get_current_speed();

        // One discovery at construction, one on the first read
        assert_eq!(fake.adapter_calls(), 2);
    }

    #[test]
    fn test_enumeration_failure_keeps_binding() {
        let fake = FakeCounters::with_ethernet("eth0");
        let mut sampler = ThroughputSampler::with_counters(fake.clone(), &always_check_config());

        fake.set_fail_enumeration(true);
        sleep(Duration::from_millis(20));
        fake.add_traffic("eth0", 2_000, 2_000);

        let (download, upload) = sampler.get_current_speed();
        assert_eq!(sampler.bound_adapter(), Some("eth0"));
        assert!(download > 0.0 && upload > 0.0);
    }

    #[test]
    fn test_fallback_binding_is_reported() {
        let fake = FakeCounters::default();
        fake.set_adapters(vec![adapter("wlan0", InterfaceKind::Wireless, true)]);
        fake.set_instances(&["isatap.{1234}", "ppp9"]);
        fake.set_totals("ppp9", 0, 0);

        let sampler = ThroughputSampler::with_counters(fake, &fast_config());
        assert_eq!(sampler.bound_adapter(), Some("ppp9"));
        assert!(sampler.is_fallback_binding());
    }
}
