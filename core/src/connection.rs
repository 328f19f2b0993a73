//! Live socket lifecycle: status, reconnect backoff and the handshake that
//! asks the server to replay whatever was missed.

use crate::config::SyncConfig;
use crate::protocol::{BackfillFrom, ClientRequest};
use crate::time::EventTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    #[default]
    Closed,
}

impl ConnectionStatus {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Open => "open",
            ConnectionStatus::Closed => "closed",
        }
    }
}

/// Exponential reconnect delay with additive jitter.
///
/// The exponential part is capped at `max_ms`; jitter of up to `jitter_ms`
/// is added on top so clients that dropped together spread out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base_ms: u32,
    max_ms: u32,
    jitter_ms: u32,
    attempt: u32,
}

impl Backoff {
    pub fn new(base_ms: u32, max_ms: u32, jitter_ms: u32) -> Self {
        Self {
            base_ms,
            max_ms,
            jitter_ms,
            attempt: 0,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.reconnect_base_ms,
            config.reconnect_max_ms,
            config.reconnect_jitter_ms,
        )
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// `sample` is a uniform draw in `[0, 1)`.
    pub fn next_delay_ms(&mut self, sample: f64) -> u32 {
        let factor = 1u32.checked_shl(self.attempt).unwrap_or(u32::MAX);
        let exponential = self.base_ms.saturating_mul(factor).min(self.max_ms);
        self.attempt = self.attempt.saturating_add(1);
        crate::config::compute_delay_ms(exponential, self.jitter_ms, sample)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Requests sent right after the socket opens.
///
/// The first connection replays the whole guess history. Later connections
/// ask only for what happened after the last processed event. The unlock
/// snapshot is always requested since unlocks have no timestamp to anchor a
/// replay on.
pub fn handshake(last_event_time: EventTime, config: &SyncConfig) -> Vec<ClientRequest> {
    match last_event_time.as_millis() {
        None => {
            let mut requests = vec![ClientRequest::Guesses {
                from: BackfillFrom::All,
            }];
            if config.request_hints_on_first_load {
                requests.push(ClientRequest::Hints {
                    from: BackfillFrom::Since(0),
                });
            }
            requests.push(ClientRequest::Unlocks);
            requests
        }
        Some(ms) => vec![
            ClientRequest::Guesses {
                from: BackfillFrom::Since(ms),
            },
            ClientRequest::Hints {
                from: BackfillFrom::Since(ms),
            },
            ClientRequest::Unlocks,
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    status: ConnectionStatus,
    last_event_time: EventTime,
    backoff: Backoff,
    opened: u64,
}

impl ConnectionState {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            status: ConnectionStatus::Closed,
            last_event_time: EventTime::Never,
            backoff: Backoff::from_config(config),
            opened: 0,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn last_event_time(&self) -> EventTime {
        self.last_event_time
    }

    /// Number of times the socket has opened.
    pub fn opened(&self) -> u64 {
        self.opened
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn begin_connect(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    pub fn on_open(&mut self, config: &SyncConfig) -> Vec<ClientRequest> {
        self.status = ConnectionStatus::Open;
        self.opened += 1;
        self.backoff.reset();
        handshake(self.last_event_time, config)
    }

    /// Unexpected close or failed attempt; returns the delay before retrying.
    pub fn on_close(&mut self, sample: f64) -> u32 {
        self.status = ConnectionStatus::Closed;
        self.backoff.next_delay_ms(sample)
    }

    /// Deliberate close; no retry follows.
    pub fn on_disconnect(&mut self) {
        self.status = ConnectionStatus::Closed;
        self.backoff.reset();
    }

    pub fn record_event(&mut self, now_ms: i64) -> bool {
        self.last_event_time.advance(now_ms)
    }

    pub fn restore_last_event_time(&mut self, time: EventTime) {
        if let Some(ms) = time.as_millis() {
            self.last_event_time.advance(ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_cap() {
        let mut backoff = Backoff::new(500, 4_000, 0);
        let delays: Vec<u32> = (0..6).map(|_| backoff.next_delay_ms(0.5)).collect();
        assert_eq!(delays, [500, 1_000, 2_000, 4_000, 4_000, 4_000]);
        backoff.reset();
        assert_eq!(backoff.next_delay_ms(0.5), 500);
    }

    #[test]
    fn backoff_survives_many_attempts() {
        let mut backoff = Backoff::new(500, 30_000, 1_000);
        for _ in 0..100 {
            let delay = backoff.next_delay_ms(0.99);
            assert!(delay <= 31_000);
        }
    }
}
