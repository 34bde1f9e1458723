//! Reconnect delays with jittered exponential growth.

use std::time::Duration;

/// Delay policy between reconnect attempts.
///
/// There is no give-up threshold: the relay is meant to stay available
/// indefinitely, so attempts continue forever with the delay capped.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Upper bound on the delay.
    pub cap: Duration,
    /// Growth factor per failed attempt.
    pub factor: f64,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            cap: Duration::from_secs(60),
            factor: 2.0,
        }
    }
}

impl ReconnectBackoff {
    /// Delay for the given attempt number (0-indexed), capped, with up to
    /// 25% jitter so restarting fleets don't reconnect in lockstep.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms = self.initial.as_millis() as f64;
        let grown_ms = base_ms * self.factor.powi(attempt.min(32) as i32);
        let capped_ms = grown_ms.min(self.cap.as_millis() as f64);
        let jitter_ms = capped_ms * 0.25 * spread(attempt);
        Duration::from_millis((capped_ms + jitter_ms) as u64)
    }
}

/// Deterministic fraction in [0, 1) derived from the attempt number.
/// Not random in any meaningful sense; just enough to de-synchronize.
fn spread(attempt: u32) -> f64 {
    let hashed = attempt.wrapping_mul(2_654_435_761);
    f64::from(hashed) / f64::from(u32::MAX)
}
