//! Counter source for the local machine
//!
//! Interface enumeration comes from `if-addrs` (an interface that holds an address is a
//! candidate), enriched with sysfs operational state and link type where available.
//! Byte counters come from `sysinfo`, whose network names are the counter instance names.

use log::{debug, trace};
use sysinfo::Networks;

use super::interface_manager::{InterfaceKind, InterfaceManager};
use super::{CounterTotals, NetworkAdapter, NetworkCounters, link_kind_hint, operational_state};
use crate::collectors::bandwidth::errors::SamplerError;

/// Reads adapters and byte counters from the operating system
#[derive(Debug)]
pub struct SystemCounters {
    /// System network interfaces manager from sysinfo crate
    networks: Networks,
    /// Name-based classifier used when the OS gives no link type
    classifier: InterfaceManager,
}

impl Default for SystemCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCounters {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            classifier: InterfaceManager::new(),
        }
    }

    fn refresh(&mut self) {
        // refresh(true) refreshes statistics and drops interfaces that disappeared
        self.networks.refresh(true);
    }
}

impl NetworkCounters for SystemCounters {
    fn adapters(&mut self) -> Result<Vec<NetworkAdapter>, SamplerError> {
        let interfaces =
            if_addrs::get_if_addrs().map_err(|e| SamplerError::EnumerationFailed {
                message: e.to_string(),
            })?;

        let mut adapters: Vec<NetworkAdapter> = Vec::new();

        // if-addrs yields one entry per address; fold them into one adapter per name
        for interface in interfaces {
            if let Some(existing) = adapters.iter_mut().find(|a| a.name == interface.name) {
                if interface.is_loopback() {
                    existing.kind = InterfaceKind::Loopback;
                }
                continue;
            }

            let kind = if interface.is_loopback() {
                InterfaceKind::Loopback
            } else {
                link_kind_hint(&interface.name)
                    .unwrap_or_else(|| self.classifier.classify(&interface.name).kind)
            };
            let is_up = operational_state(&interface.name).unwrap_or(true);

            trace!(
                "Enumerated adapter '{}': kind={:?}, up={}",
                interface.name, kind, is_up
            );

            adapters.push(NetworkAdapter {
                description: interface.name.clone(),
                name: interface.name,
                is_up,
                kind,
            });
        }

        debug!("Enumerated {} network adapters", adapters.len());
        Ok(adapters)
    }

    fn counter_instances(&mut self) -> Result<Vec<String>, SamplerError> {
        self.refresh();

        let mut instances: Vec<String> = self
            .networks
            .list()
            .keys()
            .map(|name| name.to_string())
            .collect();
        // sysinfo keeps interfaces in a hash map; sort for a stable fallback choice
        instances.sort();

        Ok(instances)
    }

    fn read_totals(&mut self, instance: &str) -> Result<CounterTotals, SamplerError> {
        self.refresh();

        let data = self.networks.list().get(instance).ok_or_else(|| {
            SamplerError::InstanceNotFound {
                instance: instance.to_string(),
            }
        })?;

        Ok(CounterTotals {
            bytes_received: data.total_received(),
            bytes_sent: data.total_transmitted(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_instance_is_reported() {
        let mut counters = SystemCounters::new();
        let result = counters.read_totals("definitely-not-an-interface0");
        assert!(matches!(
            result,
            Err(SamplerError::InstanceNotFound { .. })
        ));
    }

    #[test]
    fn test_counter_instances_are_sorted() {
        let mut counters = SystemCounters::new();
        if let Ok(instances) = counters.counter_instances() {
            let mut sorted = instances.clone();
            sorted.sort();
            assert_eq!(instances, sorted);
        }
    }
}
