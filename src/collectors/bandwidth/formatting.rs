//! Formatting and unit conversion utilities for throughput data
//!
//! This module converts between bytes per second and megabits per second and renders
//! speeds, byte counts and latencies as human-readable strings. Every display surface
//! (CLI output, progress lines, result summaries) goes through these functions so the
//! same value always renders the same way.

/// Byte-rate unit tiers, each 1024 times the previous one
const BYTE_RATE_UNITS: [&str; 4] = ["B/s", "KB/s", "MB/s", "GB/s"];

/// Byte-count unit tiers, each 1024 times the previous one
const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Converts bytes per second to megabits per second
///
/// ```
/// use throughput::collectors::bandwidth::formatting::bytes_to_mbps;
///
/// assert_eq!(bytes_to_mbps(125_000.0), 1.0);
/// ```
pub fn bytes_to_mbps(bytes_per_second: f64) -> f64 {
    (bytes_per_second * 8.0) / 1_000_000.0
}

/// Converts megabits per second to bytes per second
///
/// This is the exact inverse of [`bytes_to_mbps`].
pub fn mbps_to_bytes(mbps: f64) -> f64 {
    (mbps * 1_000_000.0) / 8.0
}

/// Computes megabits per second for `bytes` transferred over `elapsed_secs`
///
/// Returns 0.0 when the elapsed time is not a positive finite number, so callers never
/// divide by zero when a transfer ended before any time was measured.
pub fn mbps_from_transfer(bytes: u64, elapsed_secs: f64) -> f64 {
    if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
        return 0.0;
    }
    (bytes as f64 * 8.0) / (elapsed_secs * 1_000_000.0)
}

/// Returns the scaled value and unit tier index for a byte quantity
///
/// The tier advances while the value is at least 1024 and a larger unit exists.
/// Negative and NaN inputs are clamped to zero in the lowest tier.
fn scale_binary(value: f64, max_tier: usize) -> (f64, usize) {
    let mut scaled = if value.is_nan() || value < 0.0 { 0.0 } else { value };
    let mut tier = 0;

    while scaled >= 1024.0 && tier < max_tier {
        scaled /= 1024.0;
        tier += 1;
    }

    (scaled, tier)
}

/// Returns the unit tier index `format_speed` would use for the given rate
///
/// Exposed so callers can compare tiers without parsing formatted strings.
pub fn speed_unit_tier(bytes_per_second: f64) -> usize {
    scale_binary(bytes_per_second, BYTE_RATE_UNITS.len() - 1).1
}

/// Formats speed in bytes per second with appropriate units
///
/// Converts raw bytes per second values into human-readable format with appropriate
/// unit prefixes (B/s, KB/s, MB/s, GB/s). Values in the B/s tier are shown without
/// decimals, larger tiers with one decimal.
///
/// # Examples
///
/// ```
/// use throughput::collectors::bandwidth::formatting::format_speed;
///
/// assert_eq!(format_speed(0.0), "0 B/s");
/// assert_eq!(format_speed(512.0), "512 B/s");
/// assert_eq!(format_speed(1024.0), "1.0 KB/s");
/// assert_eq!(format_speed(1048576.0), "1.0 MB/s");
/// assert_eq!(format_speed(1073741824.0), "1.0 GB/s");
/// ```
pub fn format_speed(bytes_per_second: f64) -> String {
    let (speed, tier) = scale_binary(bytes_per_second, BYTE_RATE_UNITS.len() - 1);

    if tier == 0 {
        format!("{:.0} {}", speed, BYTE_RATE_UNITS[tier])
    } else {
        format!("{:.1} {}", speed, BYTE_RATE_UNITS[tier])
    }
}

/// Formats byte values with appropriate units
///
/// Converts raw byte values into human-readable format with appropriate
/// unit prefixes (B, KB, MB, GB, TB).
///
/// # Examples
///
/// ```
/// use throughput::collectors::bandwidth::formatting::format_bytes;
///
/// assert_eq!(format_bytes(0.0), "0 B");
/// assert_eq!(format_bytes(1024.0), "1.00 KB");
/// assert_eq!(format_bytes(1099511627776.0), "1.00 TB");
/// ```
pub fn format_bytes(bytes: f64) -> String {
    let (value, tier) = scale_binary(bytes, BYTE_UNITS.len() - 1);

    if tier == 0 {
        format!("{:.0} {}", value, BYTE_UNITS[tier])
    } else {
        format!("{:.2} {}", value, BYTE_UNITS[tier])
    }
}

/// Formats megabits per second, switching to Gbps at 1000 Mbps
///
/// Precision shrinks as the magnitude grows so the string stays short.
pub fn format_mbps(mbps: f64) -> String {
    if mbps >= 1000.0 {
        format!("{:.2} Gbps", mbps / 1000.0)
    } else if mbps >= 100.0 {
        format!("{:.0} Mbps", mbps)
    } else if mbps >= 10.0 {
        format!("{:.1} Mbps", mbps)
    } else {
        format!("{:.2} Mbps", mbps)
    }
}

/// Formats a latency in milliseconds, using microseconds below 1 ms
pub fn format_latency(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.0} µs", ms * 1000.0)
    } else if ms < 10.0 {
        format!("{:.1} ms", ms)
    } else {
        format!("{:.0} ms", ms)
    }
}
