//! Cooldown timing that tolerates a skewed local clock.

/// Cooldown derived from a submission response.
///
/// The server reports both the cooldown length and the absolute time it will
/// accept answers again. When the remaining time measured against the local
/// clock disagrees with the length by more than the threshold, the local
/// clock is not trusted and the length is used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownClock {
    started_at_ms: i64,
    wait_ms: u64,
    skew_detected: bool,
}

impl CooldownClock {
    /// `timeout_end_ms` is `None` when the server omitted the deadline or it
    /// could not be parsed; that is treated like a skewed clock.
    pub fn start(
        timeout_length_ms: f64,
        timeout_end_ms: Option<i64>,
        now_ms: i64,
        threshold_ms: u64,
    ) -> Self {
        let length = if timeout_length_ms.is_finite() && timeout_length_ms > 0.0 {
            timeout_length_ms.round() as i64
        } else {
            0
        };
        let trusted = timeout_end_ms
            .map(|end| end.saturating_sub(now_ms))
            .filter(|remaining| remaining.abs_diff(length) <= threshold_ms);
        let (wait, skew_detected) = match trusted {
            Some(remaining) => (remaining, false),
            None => (length, timeout_end_ms.is_some() || length > 0),
        };
        Self {
            started_at_ms: now_ms,
            wait_ms: wait.max(0) as u64,
            skew_detected,
        }
    }

    /// A clock that has already elapsed.
    pub fn elapsed_at(now_ms: i64) -> Self {
        Self {
            started_at_ms: now_ms,
            wait_ms: 0,
            skew_detected: false,
        }
    }

    pub fn wait_ms(&self) -> u64 {
        self.wait_ms
    }

    pub fn skew_detected(&self) -> bool {
        self.skew_detected
    }

    pub fn remaining_ms(&self, now_ms: i64) -> u64 {
        let spent = now_ms.saturating_sub(self.started_at_ms).max(0) as u64;
        self.wait_ms.saturating_sub(spent)
    }

    pub fn is_elapsed(&self, now_ms: i64) -> bool {
        self.remaining_ms(now_ms) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trusts_local_clock_within_threshold() {
        let clock = CooldownClock::start(5_000.0, Some(10_000 + 4_600), 10_000, 2_000);
        assert_eq!(clock.wait_ms(), 4_600);
        assert!(!clock.skew_detected());
        assert_eq!(clock.remaining_ms(12_000), 2_600);
        assert!(clock.is_elapsed(20_000));
    }

    #[test]
    fn falls_back_to_length_when_skewed() {
        let clock = CooldownClock::start(5_000.0, Some(10_000 + 60_000), 10_000, 2_000);
        assert_eq!(clock.wait_ms(), 5_000);
        assert!(clock.skew_detected());

        let behind = CooldownClock::start(5_000.0, Some(10_000 - 60_000), 10_000, 2_000);
        assert_eq!(behind.wait_ms(), 5_000);
        assert!(behind.skew_detected());
    }

    #[test]
    fn expired_deadline_within_threshold_clamps_to_zero() {
        let clock = CooldownClock::start(1_000.0, Some(10_000 - 500), 10_000, 2_000);
        assert_eq!(clock.wait_ms(), 0);
        assert!(!clock.skew_detected());
    }

    #[test]
    fn missing_fields_mean_no_wait() {
        let clock = CooldownClock::start(f64::NAN, None, 10_000, 2_000);
        assert_eq!(clock.wait_ms(), 0);
        assert!(!clock.skew_detected());
    }
}
