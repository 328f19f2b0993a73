//! One open puzzle page: stores, socket lifecycle and the submission gate.
//!
//! Platform adapters feed socket frames, HTTP results and timer expiries in
//! and render whatever the returned [`SessionUpdate`] says changed.

use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::connection::ConnectionState;
use crate::protocol::{decode_event, ClientRequest, EventKind};
use crate::router::{route, RouteError};
use crate::snapshot::SessionSnapshot;
use crate::store::{Guess, PuzzleStores, StoreKind};
use crate::submission::{
    AnswerRequest, AnswerResponse, SolvedSignal, SubmissionController, SubmissionOutcome,
    SubmitError, SubmitRejected,
};

pub const CLOCK_MISMATCH_NOTICE: &str = "Possible clock mismatch. Cooldown may be inaccurate.";
pub const STALE_STATE_NOTICE: &str = "The page may be out of date. Reload if something looks wrong.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub detail: Option<String>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub event: Option<EventKind>,
    pub changed: Vec<StoreKind>,
    pub notices: Vec<Notice>,
    /// Start a cooldown timer for this long.
    pub cooldown_ms: Option<u64>,
    pub solved: Option<SolvedSignal>,
    pub submission_changed: bool,
}

impl SessionUpdate {
    fn mark_changed(&mut self, store: StoreKind) {
        if !self.changed.contains(&store) {
            self.changed.push(store);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
            && self.notices.is_empty()
            && self.cooldown_ms.is_none()
            && self.solved.is_none()
            && !self.submission_changed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PuzzleSession {
    config: SyncConfig,
    stores: PuzzleStores,
    connection: ConnectionState,
    submission: SubmissionController,
}

impl PuzzleSession {
    pub fn new(config: SyncConfig, now_ms: i64) -> Self {
        Self {
            stores: PuzzleStores::new(),
            connection: ConnectionState::new(&config),
            submission: SubmissionController::new(now_ms),
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn stores(&self) -> &PuzzleStores {
        &self.stores
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn submission(&self) -> &SubmissionController {
        &self.submission
    }

    pub fn begin_connect(&mut self) {
        self.connection.begin_connect();
    }

    /// Socket opened; returns the handshake to send, in order.
    pub fn on_open(&mut self) -> Vec<ClientRequest> {
        let requests = self.connection.on_open(&self.config);
        info!(
            opened = self.connection.opened(),
            last_event_ms = ?self.connection.last_event_time().as_millis(),
            requests = requests.len(),
            "live socket open"
        );
        requests
    }

    pub fn on_message(&mut self, text: &str, now_ms: i64) -> SessionUpdate {
        let mut update = SessionUpdate::default();
        let inbound = match decode_event(text) {
            Ok(inbound) => inbound,
            Err(err) => {
                warn!(error = %err, "dropping server message");
                update.notices.push(
                    Notice::new(NoticeLevel::Error, "Received a message that could not be read.")
                        .with_detail(err.to_string()),
                );
                return update;
            }
        };
        let kind = inbound.kind;
        update.event = Some(kind);

        match route(&mut self.stores, inbound) {
            Ok(routed) => {
                if let Some(store) = routed.changed_store() {
                    update.mark_changed(store);
                }
                if let Some(signal) = routed.solved {
                    if self.submission.mark_solved(signal.clone()) {
                        info!(url = ?signal.url, "puzzle solved by team");
                        update.solved = Some(signal);
                        update.submission_changed = true;
                    }
                }
            }
            Err(RouteError::Store(err)) => {
                // Not applied, so a later backfill may still carry it.
                warn!(kind = %kind, error = %err, "server event referenced missing state");
                update.notices.push(
                    Notice::new(NoticeLevel::Warning, STALE_STATE_NOTICE).with_detail(err.to_string()),
                );
                return update;
            }
            Err(RouteError::Server(message)) => {
                warn!(message = %message, "server reported an error");
                update
                    .notices
                    .push(Notice::new(NoticeLevel::Error, format!("Server error: {message}")));
            }
        }
        self.connection.record_event(now_ms);
        update
    }

    pub fn on_transport_error(&mut self, detail: &str) -> Notice {
        warn!(detail, "live socket error");
        Notice::new(NoticeLevel::Warning, "Connection trouble: live updates may be stale.")
            .with_detail(detail)
    }

    /// Returns the reconnect delay in milliseconds.
    pub fn on_close(&mut self, sample: f64) -> u32 {
        let delay = self.connection.on_close(sample);
        info!(
            attempt = self.connection.backoff().attempt(),
            delay_ms = delay,
            "live socket closed; scheduling reconnect"
        );
        delay
    }

    pub fn on_disconnect(&mut self) {
        debug!("live socket closed by client");
        self.connection.on_disconnect();
    }

    pub fn submit(&mut self, answer: &str) -> Result<AnswerRequest, SubmitRejected> {
        let request = self.submission.begin(answer)?;
        debug!(answer = %request.answer, "submitting answer");
        Ok(request)
    }

    pub fn on_submit_result(
        &mut self,
        result: Result<AnswerResponse, SubmitError>,
        now_ms: i64,
    ) -> SessionUpdate {
        let mut update = SessionUpdate {
            submission_changed: true,
            ..SessionUpdate::default()
        };
        match self.submission.resolve(result, now_ms, &self.config) {
            SubmissionOutcome::Cooldown {
                wait_ms,
                skew_detected,
                provisional,
            } => {
                self.record_provisional(provisional, &mut update);
                if skew_detected {
                    warn!(wait_ms, "cooldown deadline disagrees with local clock");
                    update
                        .notices
                        .push(Notice::new(NoticeLevel::Warning, CLOCK_MISMATCH_NOTICE));
                }
                update.cooldown_ms = Some(wait_ms);
            }
            SubmissionOutcome::Solved {
                signal,
                provisional,
            } => {
                self.record_provisional(provisional, &mut update);
                info!(url = ?signal.url, "answer correct");
                update.solved = Some(signal);
            }
            SubmissionOutcome::Failed(err) => {
                warn!(error = %err, "answer submission failed");
                update.notices.push(
                    Notice::new(NoticeLevel::Error, err.user_message()).with_detail(err.to_string()),
                );
            }
            SubmissionOutcome::Ignored => {
                update.submission_changed = false;
            }
        }
        update
    }

    fn record_provisional(&mut self, provisional: Option<Guess>, update: &mut SessionUpdate) {
        if let Some(guess) = provisional {
            if self.stores.apply_guess(guess).is_visible() {
                update.mark_changed(StoreKind::Guesses);
            }
        }
    }

    pub fn on_cooldown_elapsed(&mut self) -> bool {
        self.submission.on_cooldown_elapsed()
    }

    pub fn snapshot(&self, page_url: &str) -> SessionSnapshot {
        SessionSnapshot::capture(page_url, &self.stores, self.connection.last_event_time())
    }

    pub fn restore(&mut self, snapshot: &SessionSnapshot) {
        self.stores = snapshot.to_stores();
        self.connection
            .restore_last_event_time(snapshot.last_event_time());
        info!(
            guesses = self.stores.guesses().len(),
            unlocks = self.stores.unlocks().len(),
            "restored session snapshot"
        );
    }
}
