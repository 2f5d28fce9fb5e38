//! Active adapter discovery
//!
//! Chooses the counter instance that carries the machine's real traffic: enumerate
//! adapters, keep the operational non-loopback non-tunnel ones, and match them against
//! counter instance names. Counter sources may publish instance names that differ from
//! adapter names (character substitutions, truncation), so matching is fuzzy and
//! best-effort; when nothing matches the first plausible instance is used.

use log::{debug, trace};
use serde::Serialize;

use crate::collectors::bandwidth::errors::SamplerError;
use crate::collectors::platform::interface_manager::{InterfaceKind, InterfaceManager};
use crate::collectors::platform::{NetworkAdapter, NetworkCounters};

/// Instance name fragments that never carry user traffic
const IGNORED_INSTANCE_FRAGMENTS: [&str; 3] = ["loopback", "isatap", "teredo"];

/// Description fragments that disqualify an adapter
const IGNORED_DESCRIPTION_FRAGMENTS: [&str; 2] = ["virtual", "loopback"];

/// How a counter instance was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchKind {
    /// Matched one of the active adapters
    Adapter,
    /// No adapter matched; first plausible instance was taken
    Fallback,
}

/// A selected counter instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterMatch {
    pub instance: String,
    pub match_kind: MatchKind,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Rewrites a name the way counter sources substitute reserved characters
///
/// Parentheses become brackets; `#`, `/` and `\` become underscores.
pub fn sanitize_instance_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '(' => '[',
            ')' => ']',
            '#' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// Whether an adapter may be bound by the sampler
pub fn is_candidate_adapter(adapter: &NetworkAdapter) -> bool {
    if !adapter.is_up {
        return false;
    }
    if matches!(adapter.kind, InterfaceKind::Loopback | InterfaceKind::Tunnel) {
        return false;
    }
    !IGNORED_DESCRIPTION_FRAGMENTS
        .iter()
        .any(|fragment| contains_ignore_case(&adapter.description, fragment))
}

/// Relevance of an adapter: the better of its name classification and its kind
pub fn adapter_relevance(adapter: &NetworkAdapter, classifier: &mut InterfaceManager) -> u8 {
    classifier
        .classify(&adapter.name)
        .relevance
        .max(adapter.kind.base_relevance())
}

/// Filters adapters to candidates and orders them by relevance, highest first
///
/// Enumeration order is kept between adapters of equal relevance.
pub fn candidate_adapters(
    adapters: &[NetworkAdapter],
    classifier: &mut InterfaceManager,
) -> Vec<NetworkAdapter> {
    let mut candidates: Vec<(u8, NetworkAdapter)> = adapters
        .iter()
        .filter(|adapter| is_candidate_adapter(adapter))
        .map(|adapter| (adapter_relevance(adapter, classifier), adapter.clone()))
        .collect();

    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    candidates.into_iter().map(|(_, adapter)| adapter).collect()
}

/// Whether a counter instance name refers to the given adapter name
///
/// Case-insensitive containment in either direction, or equality after sanitizing both.
pub fn instance_matches(instance: &str, possible_name: &str) -> bool {
    if instance.is_empty() || possible_name.is_empty() {
        return false;
    }

    contains_ignore_case(instance, possible_name)
        || contains_ignore_case(possible_name, instance)
        || sanitize_instance_name(instance) == sanitize_instance_name(possible_name)
}

/// Names under which a counter source may publish an adapter's instance
fn possible_names(adapter: &NetworkAdapter) -> [String; 3] {
    [
        adapter.description.clone(),
        adapter.name.clone(),
        sanitize_instance_name(&adapter.description),
    ]
}

/// Whether an instance is published under one of the given adapters' exact names
fn owned_by_any<'a>(
    instance: &str,
    mut adapters: impl Iterator<Item = &'a NetworkAdapter>,
) -> bool {
    let instance = instance.to_lowercase();
    adapters.any(|adapter| {
        possible_names(adapter)
            .iter()
            .any(|possible| !possible.is_empty() && instance == possible.to_lowercase())
    })
}

fn is_ignored_instance(instance: &str) -> bool {
    IGNORED_INSTANCE_FRAGMENTS
        .iter()
        .any(|fragment| contains_ignore_case(instance, fragment))
}

/// Picks the counter instance for the first candidate adapter that matches one
///
/// Exact case-insensitive names win over fuzzy matches across all candidates, so
/// `wlo1` binds `wlo1` rather than the `lo` it contains. The fuzzy pass then tries
/// each candidate's description, name and sanitized description, skipping tunnel
/// instances and instances owned by an `ineligible` adapter. With no match, falls
/// back to the first instance that is neither a transition tunnel nor a loopback.
pub fn match_counter_instance(
    candidates: &[NetworkAdapter],
    ineligible: &[NetworkAdapter],
    instances: &[String],
) -> Option<AdapterMatch> {
    let matched = |adapter: &NetworkAdapter, instance: &String| {
        trace!(
            "Counter instance '{}' matched adapter '{}'",
            instance, adapter.name
        );
        Some(AdapterMatch {
            instance: instance.clone(),
            match_kind: MatchKind::Adapter,
        })
    };

    for adapter in candidates {
        if let Some(instance) = instances
            .iter()
            .find(|instance| owned_by_any(instance, std::iter::once(adapter)))
        {
            return matched(adapter, instance);
        }
    }

    let fuzzy_instances: Vec<&String> = instances
        .iter()
        .filter(|instance| {
            !is_ignored_instance(instance) && !owned_by_any(instance, ineligible.iter())
        })
        .collect();

    for adapter in candidates {
        let names = possible_names(adapter);
        if let Some(instance) = fuzzy_instances
            .iter()
            .find(|instance| {
                names
                    .iter()
                    .any(|possible| instance_matches(instance, possible))
            })
        {
            return matched(adapter, *instance);
        }
    }

    let loopbacks = ineligible
        .iter()
        .filter(|adapter| adapter.kind == InterfaceKind::Loopback);

    instances
        .iter()
        .find(|instance| {
            !is_ignored_instance(instance) && !owned_by_any(instance, loopbacks.clone())
        })
        .map(|instance| {
            debug!(
                "No counter instance matched an active adapter, falling back to '{}'",
                instance
            );
            AdapterMatch {
                instance: instance.clone(),
                match_kind: MatchKind::Fallback,
            }
        })
}

/// Discovers the counter instance of the currently active adapter
///
/// Returns `SamplerError::NoActiveAdapter` when no adapter is a candidate, mirroring
/// the rule that the fallback only applies once at least one adapter is active.
pub fn discover_active_adapter<C: NetworkCounters + ?Sized>(
    counters: &mut C,
    classifier: &mut InterfaceManager,
) -> Result<AdapterMatch, SamplerError> {
    let adapters = counters.adapters()?;
    let candidates = candidate_adapters(&adapters, classifier);

    if candidates.is_empty() {
        debug!(
            "No candidate adapters among {} enumerated interfaces",
            adapters.len()
        );
        return Err(SamplerError::NoActiveAdapter);
    }

    let ineligible: Vec<NetworkAdapter> = adapters
        .into_iter()
        .filter(|adapter| !is_candidate_adapter(adapter))
        .collect();

    let instances = counters.counter_instances()?;
    match_counter_instance(&candidates, &ineligible, &instances)
        .ok_or(SamplerError::NoActiveAdapter)
}
