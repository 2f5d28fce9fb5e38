use tokio::time::Instant;

use std::time::Duration;

use crate::speedtest::models::SpeedTestPhase;

/// Rate limiter for progress events
///
/// One timestamp is shared across all phases of a run. `Complete` updates always pass.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emitted: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emitted: None,
        }
    }

    /// Returns whether an update for `phase` may be emitted at `now`, and records it if so
    pub fn admit(&mut self, phase: SpeedTestPhase, now: Instant) -> bool {
        let due = match self.last_emitted {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };

        if due || phase == SpeedTestPhase::Complete {
            self.last_emitted = Some(now);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_are_spaced() {
        let start = Instant::now();
        let mut throttle = ProgressThrottle::new(Duration::from_millis(200));

        assert!(throttle.admit(SpeedTestPhase::Latency, start));
        assert!(!throttle.admit(SpeedTestPhase::Latency, start + Duration::from_millis(100)));
        assert!(!throttle.admit(SpeedTestPhase::Download, start + Duration::from_millis(199)));
        assert!(throttle.admit(SpeedTestPhase::Download, start + Duration::from_millis(200)));
    }

    #[test]
    fn test_complete_always_passes() {
        let start = Instant::now();
        let mut throttle = ProgressThrottle::new(Duration::from_millis(200));

        assert!(throttle.admit(SpeedTestPhase::Upload, start));
        assert!(throttle.admit(SpeedTestPhase::Complete, start + Duration::from_millis(1)));
        // Complete resets the spacing window
        assert!(!throttle.admit(SpeedTestPhase::Upload, start + Duration::from_millis(50)));
    }
}
