use log::trace;
use std::fs;
use std::path::{Path, PathBuf};

use super::InterfaceKind;

const SYS_CLASS_NET: &str = "/sys/class/net";

// ARPHRD_* link types from <linux/if_arp.h>
const ARPHRD_LOOPBACK: u32 = 772;
const ARPHRD_TUNNEL: u32 = 768;
const ARPHRD_TUNNEL6: u32 = 769;
const ARPHRD_SIT: u32 = 776;
const ARPHRD_IPGRE: u32 = 778;
const ARPHRD_IP6GRE: u32 = 823;
const ARPHRD_NONE: u32 = 65534;

fn interface_dir(interface_name: &str) -> PathBuf {
    Path::new(SYS_CLASS_NET).join(interface_name)
}

fn read_attribute(interface_name: &str, attribute: &str) -> Option<String> {
    let path = interface_dir(interface_name).join(attribute);
    match fs::read_to_string(&path) {
        Ok(value) => Some(value.trim().to_string()),
        Err(e) => {
            trace!("Could not read {}: {}", path.display(), e);
            None
        }
    }
}

/// Parses the contents of an `operstate` file
///
/// "unknown" is reported by loopback and many tun devices that are in fact usable,
/// so only an explicit non-up state counts as down.
pub fn parse_operstate(value: &str) -> bool {
    !matches!(
        value,
        "down" | "lowerlayerdown" | "notpresent" | "dormant" | "testing"
    )
}

/// Maps an ARPHRD link type number to a kind, when it identifies one
pub fn kind_from_link_type(link_type: u32) -> Option<InterfaceKind> {
    match link_type {
        ARPHRD_LOOPBACK => Some(InterfaceKind::Loopback),
        ARPHRD_TUNNEL | ARPHRD_TUNNEL6 | ARPHRD_SIT | ARPHRD_IPGRE | ARPHRD_IP6GRE
        | ARPHRD_NONE => Some(InterfaceKind::Tunnel),
        _ => None,
    }
}

pub fn operational_state(interface_name: &str) -> Option<bool> {
    read_attribute(interface_name, "operstate").map(|state| parse_operstate(&state))
}

pub fn link_kind_hint(interface_name: &str) -> Option<InterfaceKind> {
    read_attribute(interface_name, "type")
        .and_then(|value| value.parse::<u32>().ok())
        .and_then(kind_from_link_type)
}
