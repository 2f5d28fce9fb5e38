use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of a network interface, as far as naming conventions and link types reveal it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
    /// Physical Ethernet connection
    Ethernet,
    /// Wireless network interface
    Wireless,
    /// Loopback interface (localhost)
    Loopback,
    /// Point-to-point tunnel (VPN, tun/tap, 6to4, Teredo, ...)
    Tunnel,
    /// Bridges, container veths, hypervisor switches
    Virtual,
    /// Unknown or unclassified interface type
    Unknown,
}

impl InterfaceKind {
    /// Base relevance for choosing which adapter carries the user's traffic
    pub fn base_relevance(self) -> u8 {
        match self {
            InterfaceKind::Ethernet => 90,
            InterfaceKind::Wireless => 85,
            InterfaceKind::Unknown => 50,
            InterfaceKind::Tunnel => 40,
            InterfaceKind::Virtual => 25,
            InterfaceKind::Loopback => 10,
        }
    }
}

/// Classification result for a single interface name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterfaceClassification {
    pub name: String,
    pub kind: InterfaceKind,
    /// Relevance score (0-100, higher is more likely the primary adapter)
    pub relevance: u8,
}

/// Supported platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Windows,
    Unknown,
}

/// Cross-platform interface classifier
#[derive(Debug)]
pub struct InterfaceManager {
    platform: Platform,
    cache: HashMap<String, InterfaceClassification>,
}

impl InterfaceManager {
    /// Create a new interface manager for the current platform
    pub fn new() -> Self {
        Self::for_platform(Self::detect_platform())
    }

    /// Create an interface manager that applies one platform's naming rules
    pub fn for_platform(platform: Platform) -> Self {
        debug!("Initializing InterfaceManager for platform: {:?}", platform);
        Self {
            platform,
            cache: HashMap::new(),
        }
    }

    fn detect_platform() -> Platform {
        match std::env::consts::OS {
            "macos" => Platform::MacOS,
            "linux" => Platform::Linux,
            "windows" => Platform::Windows,
            _ => Platform::Unknown,
        }
    }

    /// Classify an interface by name, caching the result
    pub fn classify(&mut self, interface_name: &str) -> InterfaceClassification {
        if let Some(cached) = self.cache.get(interface_name) {
            trace!("Using cached classification for: {}", interface_name);
            return cached.clone();
        }

        let name_lower = interface_name.to_lowercase();
        let kind = match self.platform {
            Platform::MacOS => Self::analyze_macos_interface(&name_lower),
            Platform::Linux => Self::analyze_linux_interface(&name_lower),
            Platform::Windows => Self::analyze_windows_interface(&name_lower),
            Platform::Unknown => Self::analyze_generic_interface(&name_lower),
        };
        let relevance = self.adjust_relevance(&name_lower, kind.base_relevance());

        let classification = InterfaceClassification {
            name: interface_name.to_string(),
            kind,
            relevance,
        };

        debug!(
            "Classified interface '{}': kind={:?}, relevance={}",
            interface_name, kind, relevance
        );
        self.cache
            .insert(interface_name.to_string(), classification.clone());
        classification
    }

    fn analyze_macos_interface(name: &str) -> InterfaceKind {
        match name {
            n if n.starts_with("lo") => InterfaceKind::Loopback,
            n if n.starts_with("utun") || n.starts_with("ipsec") || n.starts_with("ppp") => {
                InterfaceKind::Tunnel
            }
            n if n.starts_with("gif") || n.starts_with("stf") => InterfaceKind::Tunnel,
            // AirDrop, low-latency WLAN and Apple network interfaces
            n if n.starts_with("awdl")
                || n.starts_with("llw")
                || n.starts_with("anpi")
                || n.starts_with("ap") =>
            {
                InterfaceKind::Virtual
            }
            n if n.starts_with("bridge") || n.starts_with("vmnet") => InterfaceKind::Virtual,
            // en0/en1 carry both wired and Wi-Fi on macOS; treat as ethernet-class
            n if n.starts_with("en") => InterfaceKind::Ethernet,
            n => Self::analyze_generic_interface(n),
        }
    }

    fn analyze_linux_interface(name: &str) -> InterfaceKind {
        match name {
            n if n == "lo" || n.starts_with("lo:") => InterfaceKind::Loopback,
            n if n.starts_with("eth") || n.starts_with("en") || n.starts_with("em") => {
                InterfaceKind::Ethernet
            }
            n if n.starts_with("wl") => InterfaceKind::Wireless,
            n if n.starts_with("tun")
                || n.starts_with("tap")
                || n.starts_with("wg")
                || n.starts_with("ppp")
                || n.starts_with("sit")
                || n.starts_with("gre")
                || n.starts_with("ip6tnl") =>
            {
                InterfaceKind::Tunnel
            }
            n if n.starts_with("veth")
                || n.starts_with("docker")
                || n.starts_with("br-")
                || n.starts_with("virbr")
                || n.starts_with("cni")
                || n.starts_with("vmnet") =>
            {
                InterfaceKind::Virtual
            }
            n => Self::analyze_generic_interface(n),
        }
    }

    fn analyze_windows_interface(name: &str) -> InterfaceKind {
        // Windows interface names and descriptions are descriptive phrases
        match name {
            n if n.contains("loopback") => InterfaceKind::Loopback,
            n if n.contains("isatap") || n.contains("teredo") || n.contains("tunnel") => {
                InterfaceKind::Tunnel
            }
            n if n.contains("vpn") || n.contains("wireguard") || n.contains("tap-windows") => {
                InterfaceKind::Tunnel
            }
            n if n.contains("virtual") || n.contains("hyper-v") || n.contains("vmware") => {
                InterfaceKind::Virtual
            }
            n if n.contains("wi-fi")
                || n.contains("wifi")
                || n.contains("wireless")
                || n.contains("802.11") =>
            {
                InterfaceKind::Wireless
            }
            n if n.contains("ethernet") || n.contains("gbe") || n.contains("realtek") => {
                InterfaceKind::Ethernet
            }
            n => Self::analyze_generic_interface(n),
        }
    }

    fn analyze_generic_interface(name: &str) -> InterfaceKind {
        match name {
            n if n.starts_with("lo") => InterfaceKind::Loopback,
            n if n.starts_with("eth") || n.starts_with("en") => InterfaceKind::Ethernet,
            n if n.starts_with("wl") || n.contains("wifi") => InterfaceKind::Wireless,
            n if n.starts_with("tun") || n.starts_with("tap") => InterfaceKind::Tunnel,
            _ => InterfaceKind::Unknown,
        }
    }

    fn adjust_relevance(&self, name: &str, base: u8) -> u8 {
        let mut score = base;

        match self.platform {
            Platform::MacOS => {
                // en0 is the built-in primary adapter
                if name == "en0" {
                    score = score.saturating_add(10).min(100);
                } else if name == "en1" {
                    score = score.saturating_add(5).min(100);
                }
            }
            Platform::Linux => {
                if name.starts_with("eno") || name == "eth0" {
                    score = score.saturating_add(5).min(100);
                }
            }
            Platform::Windows | Platform::Unknown => {}
        }

        score
    }

    /// Clear the classification cache (useful when interfaces change)
    pub fn clear_cache(&mut self) {
        debug!("Clearing interface cache ({} entries)", self.cache.len());
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

impl Default for InterfaceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_classification() {
        let mut manager = InterfaceManager::for_platform(Platform::Linux);

        let cases = vec![
            ("eth0", InterfaceKind::Ethernet),
            ("enp3s0", InterfaceKind::Ethernet),
            ("wlan0", InterfaceKind::Wireless),
            ("wlp2s0", InterfaceKind::Wireless),
            ("lo", InterfaceKind::Loopback),
            ("tun0", InterfaceKind::Tunnel),
            ("wg0", InterfaceKind::Tunnel),
            ("docker0", InterfaceKind::Virtual),
            ("veth1a2b", InterfaceKind::Virtual),
            ("mystery7", InterfaceKind::Unknown),
        ];

        for (name, expected) in cases {
            assert_eq!(
                manager.classify(name).kind,
                expected,
                "Interface {} kind mismatch",
                name
            );
        }
    }

    #[test]
    fn test_macos_classification() {
        let mut manager = InterfaceManager::for_platform(Platform::MacOS);

        assert_eq!(manager.classify("en0").kind, InterfaceKind::Ethernet);
        assert_eq!(manager.classify("utun3").kind, InterfaceKind::Tunnel);
        assert_eq!(manager.classify("awdl0").kind, InterfaceKind::Virtual);
        assert_eq!(manager.classify("lo0").kind, InterfaceKind::Loopback);
        assert_eq!(manager.classify("en0").relevance, 100);
    }

    #[test]
    fn test_windows_classification() {
        let mut manager = InterfaceManager::for_platform(Platform::Windows);

        assert_eq!(
            manager.classify("Intel(R) Ethernet Connection I219-V").kind,
            InterfaceKind::Ethernet
        );
        assert_eq!(
            manager.classify("Intel(R) Wi-Fi 6 AX201 160MHz").kind,
            InterfaceKind::Wireless
        );
        assert_eq!(
            manager.classify("Hyper-V Virtual Ethernet Adapter").kind,
            InterfaceKind::Virtual
        );
        assert_eq!(
            manager.classify("Teredo Tunneling Pseudo-Interface").kind,
            InterfaceKind::Tunnel
        );
        assert_eq!(
            manager.classify("Software Loopback Interface 1").kind,
            InterfaceKind::Loopback
        );
    }

    #[test]
    fn test_cache_functionality() {
        let mut manager = InterfaceManager::for_platform(Platform::Linux);

        let first = manager.classify("eth0");
        assert_eq!(manager.cache_len(), 1);

        let second = manager.classify("eth0");
        assert_eq!(first, second);
        assert_eq!(manager.cache_len(), 1);

        manager.clear_cache();
        assert_eq!(manager.cache_len(), 0);
    }
}
