use serde::{Deserialize, Serialize};

use crate::collectors::bandwidth::errors::SamplerError;

// Platform access for the passive throughput sampler
// The sampler only talks to the `NetworkCounters` trait so its rebinding and
// self-healing logic stays platform neutral and testable with fake counters

/// Cross-platform network interface classification
/// Provides interface kind detection and relevance scoring from naming conventions
pub mod interface_manager;

/// Linux sysfs helpers
/// Reads operational state and link type from /sys/class/net
#[cfg(target_os = "linux")]
pub mod linux;

/// Counter source backed by sysinfo byte counters and if-addrs enumeration
pub mod system;

pub use interface_manager::{InterfaceKind, InterfaceManager};
pub use system::SystemCounters;

/// A network adapter as reported by interface enumeration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAdapter {
    /// Short interface name (e.g. "eth0", "en0", "Wi-Fi")
    pub name: String,
    /// Human description; equals the name where the platform has none
    pub description: String,
    /// Whether the adapter is operationally up
    pub is_up: bool,
    /// Classified adapter kind
    pub kind: InterfaceKind,
}

/// Cumulative byte counters for one counter instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterTotals {
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

/// Capability interface for reading live adapter throughput
///
/// Implementations expose three views of the system: the adapters known to interface
/// enumeration, the names under which byte counters are published (which may differ
/// from adapter names on some platforms), and the cumulative totals of one counter.
pub trait NetworkCounters: Send {
    /// Enumerates network adapters with their operational state and kind
    fn adapters(&mut self) -> Result<Vec<NetworkAdapter>, SamplerError>;

    /// Lists the names of all available counter instances
    fn counter_instances(&mut self) -> Result<Vec<String>, SamplerError>;

    /// Reads cumulative received/sent bytes for one counter instance
    fn read_totals(&mut self, instance: &str) -> Result<CounterTotals, SamplerError>;
}

/// Reports whether an interface is operationally up, if the platform can tell
pub fn operational_state(interface_name: &str) -> Option<bool> {
    #[cfg(target_os = "linux")]
    {
        linux::operational_state(interface_name)
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = interface_name;
        None
    }
}

/// Returns a kind derived from the OS link type, if the platform exposes one
pub fn link_kind_hint(interface_name: &str) -> Option<InterfaceKind> {
    #[cfg(target_os = "linux")]
    {
        linux::link_kind_hint(interface_name)
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = interface_name;
        None
    }
}
