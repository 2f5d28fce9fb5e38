//! Test module organization for passive sampling
//!
//! Shared fake counter source plus focused test modules for adapter discovery and
//! the sampler's rebinding and self-healing behaviour.

pub mod sampler_tests;
