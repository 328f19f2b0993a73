//! Tunables shared by the browser page and the native client.

/// Allowed disagreement between the server's cooldown deadline and the
/// locally measured remaining time before the local clock is distrusted.
pub const CLOCK_SKEW_THRESHOLD_MS: u64 = 2_000;
pub const RECONNECT_BASE_MS: u32 = 500;
pub const RECONNECT_MAX_MS: u32 = 30_000;
pub const RECONNECT_JITTER_MS: u32 = 1_000;
pub const SOLVED_REDIRECT_DELAY_MS: u32 = 3_000;
pub const NOTICE_DURATION_MS: u32 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub clock_skew_threshold_ms: u64,
    pub reconnect_base_ms: u32,
    pub reconnect_max_ms: u32,
    pub reconnect_jitter_ms: u32,
    pub solved_redirect_delay_ms: u32,
    pub notice_duration_ms: u32,
    /// Clients without a server-rendered page ask for every released hint
    /// on their first connection as well.
    pub request_hints_on_first_load: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            clock_skew_threshold_ms: CLOCK_SKEW_THRESHOLD_MS,
            reconnect_base_ms: RECONNECT_BASE_MS,
            reconnect_max_ms: RECONNECT_MAX_MS,
            reconnect_jitter_ms: RECONNECT_JITTER_MS,
            solved_redirect_delay_ms: SOLVED_REDIRECT_DELAY_MS,
            notice_duration_ms: NOTICE_DURATION_MS,
            request_hints_on_first_load: false,
        }
    }
}

/// Artificial latency applied to socket traffic while debugging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetDelayConfig {
    pub inbound_ms: u32,
    pub outbound_ms: u32,
    pub jitter_ms: u32,
}

impl NetDelayConfig {
    pub fn is_active(&self) -> bool {
        self.inbound_ms > 0 || self.outbound_ms > 0 || self.jitter_ms > 0
    }

    pub fn inbound_delay_ms(&self, sample: f64) -> u32 {
        compute_delay_ms(self.inbound_ms, self.jitter_ms, sample)
    }

    pub fn outbound_delay_ms(&self, sample: f64) -> u32 {
        compute_delay_ms(self.outbound_ms, self.jitter_ms, sample)
    }
}

/// `sample` is a uniform draw in `[0, 1)`; anything else is clamped.
pub fn compute_delay_ms(base: u32, jitter: u32, sample: f64) -> u32 {
    if jitter == 0 {
        return base;
    }
    let sample = if sample.is_finite() {
        sample.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let extra = (sample * jitter as f64).round() as u32;
    base.saturating_add(extra)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_without_jitter_is_base() {
        assert_eq!(compute_delay_ms(120, 0, 0.9), 120);
    }

    #[test]
    fn delay_jitter_scales_with_sample() {
        assert_eq!(compute_delay_ms(100, 50, 0.0), 100);
        assert_eq!(compute_delay_ms(100, 50, 1.0), 150);
        assert_eq!(compute_delay_ms(100, 50, f64::NAN), 100);
    }
}
