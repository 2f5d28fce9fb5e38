pub mod bandwidth;
pub mod platform;

pub use bandwidth::ThroughputSampler;
pub use platform::{NetworkCounters, SystemCounters};
