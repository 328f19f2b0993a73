//! Answer submission gate: one request in flight, then cooldown or solved.
//!
//! The controller is transport-free. Callers take the [`AnswerRequest`] from
//! [`SubmissionController::begin`], POST it however their platform does, and
//! hand the decoded result back to [`SubmissionController::resolve`].

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::clock::CooldownClock;
use crate::config::SyncConfig;
use crate::ids::GuessUid;
use crate::protocol::flexible_bool;
use crate::store::Guess;
use crate::time::parse_server_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    Submitting,
    Cooldown,
    Solved,
}

impl SubmissionPhase {
    pub fn label(self) -> &'static str {
        match self {
            SubmissionPhase::Idle => "idle",
            SubmissionPhase::Submitting => "submitting",
            SubmissionPhase::Cooldown => "cooldown",
            SubmissionPhase::Solved => "solved",
        }
    }
}

/// Where to go once the puzzle is solved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedSignal {
    pub url: Option<String>,
    /// Human description of the destination, e.g. "to the next puzzle".
    pub text: Option<String>,
}

impl SolvedSignal {
    pub fn message(&self) -> String {
        match &self.text {
            Some(text) => format!("Correct! Taking you {text}."),
            None => "Correct!".to_string(),
        }
    }
}

/// Form body of an answer POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRequest {
    pub answer: String,
    pub last_updated_ms: i64,
}

impl AnswerRequest {
    pub fn form_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("last_updated", &self.last_updated_ms.to_string())
            .append_pair("answer", &self.answer)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnswerResponse {
    #[serde(deserialize_with = "flexible_bool")]
    pub correct: bool,
    #[serde(default)]
    pub guess: Option<String>,
    #[serde(default)]
    pub guess_uid: Option<GuessUid>,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub timeout_length: Option<f64>,
    #[serde(default)]
    pub timeout_end: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("submitted too fast")]
    TooFast,
    #[error("puzzle already answered")]
    AlreadyAnswered,
    #[error("server rejected the answer: {0}")]
    Rejected(String),
    #[error("unexpected response (status {status})")]
    InvalidResponse { status: u16 },
}

impl SubmitError {
    pub fn user_message(&self) -> &'static str {
        match self {
            SubmitError::TooFast => "Slow down there, sparky! You're supposed to wait between submissions.",
            SubmitError::AlreadyAnswered => "Your team has already correctly answered this puzzle!",
            SubmitError::Network(_) | SubmitError::Rejected(_) | SubmitError::InvalidResponse { .. } => {
                "There was an error submitting the answer."
            }
        }
    }
}

/// Maps an HTTP status and body onto a response or a typed failure.
pub fn interpret_answer_response(status: u16, body: &str) -> Result<AnswerResponse, SubmitError> {
    if (200..300).contains(&status) {
        return serde_json::from_str(body).map_err(|err| {
            warn!(status, error = %err, "answer response did not decode");
            SubmitError::InvalidResponse { status }
        });
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error }) if error == "too fast" => Err(SubmitError::TooFast),
        Ok(ErrorBody { error }) if error == "already answered" => Err(SubmitError::AlreadyAnswered),
        Ok(ErrorBody { error }) => Err(SubmitError::Rejected(error)),
        Err(_) => Err(SubmitError::InvalidResponse { status }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("answer is empty")]
    Empty,
    #[error("a submission is already in flight")]
    Busy,
    #[error("waiting for cooldown")]
    CoolingDown,
    #[error("puzzle already solved")]
    Solved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Cooldown {
        wait_ms: u64,
        skew_detected: bool,
        provisional: Option<Guess>,
    },
    Solved {
        signal: SolvedSignal,
        provisional: Option<Guess>,
    },
    Failed(SubmitError),
    /// A result arrived while no submission was in flight.
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Submitting { answer: String },
    Cooldown(CooldownClock),
    Solved(SolvedSignal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionController {
    phase: Phase,
    last_updated_ms: i64,
}

impl SubmissionController {
    pub fn new(now_ms: i64) -> Self {
        Self {
            phase: Phase::Idle,
            last_updated_ms: now_ms,
        }
    }

    pub fn phase(&self) -> SubmissionPhase {
        match self.phase {
            Phase::Idle => SubmissionPhase::Idle,
            Phase::Submitting { .. } => SubmissionPhase::Submitting,
            Phase::Cooldown(_) => SubmissionPhase::Cooldown,
            Phase::Solved(_) => SubmissionPhase::Solved,
        }
    }

    pub fn can_submit(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    pub fn pending_answer(&self) -> Option<&str> {
        match &self.phase {
            Phase::Submitting { answer } => Some(answer),
            _ => None,
        }
    }

    pub fn solved(&self) -> Option<&SolvedSignal> {
        match &self.phase {
            Phase::Solved(signal) => Some(signal),
            _ => None,
        }
    }

    pub fn last_updated_ms(&self) -> i64 {
        self.last_updated_ms
    }

    pub fn cooldown_remaining_ms(&self, now_ms: i64) -> u64 {
        match &self.phase {
            Phase::Cooldown(clock) => clock.remaining_ms(now_ms),
            _ => 0,
        }
    }

    /// Moves Idle to Submitting. Any other phase rejects the attempt without
    /// touching state, which is what keeps a second request off the wire.
    pub fn begin(&mut self, answer: &str) -> Result<AnswerRequest, SubmitRejected> {
        match self.phase {
            Phase::Idle => {}
            Phase::Submitting { .. } => return Err(SubmitRejected::Busy),
            Phase::Cooldown(_) => return Err(SubmitRejected::CoolingDown),
            Phase::Solved(_) => return Err(SubmitRejected::Solved),
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(SubmitRejected::Empty);
        }
        self.phase = Phase::Submitting {
            answer: answer.to_string(),
        };
        Ok(AnswerRequest {
            answer: answer.to_string(),
            last_updated_ms: self.last_updated_ms,
        })
    }

    pub fn resolve(
        &mut self,
        result: Result<AnswerResponse, SubmitError>,
        now_ms: i64,
        config: &SyncConfig,
    ) -> SubmissionOutcome {
        let answer = match &self.phase {
            Phase::Submitting { answer } => answer.clone(),
            _ => {
                debug!(phase = self.phase().label(), "ignoring stray submission result");
                return SubmissionOutcome::Ignored;
            }
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.phase = Phase::Idle;
                return SubmissionOutcome::Failed(err);
            }
        };
        self.last_updated_ms = now_ms;
        let provisional = provisional_guess(&response, &answer);

        if response.correct {
            let signal = SolvedSignal {
                url: response.url,
                text: response.text,
            };
            self.phase = Phase::Solved(signal.clone());
            return SubmissionOutcome::Solved {
                signal,
                provisional,
            };
        }

        let timeout_end = response.timeout_end.as_deref().and_then(parse_server_timestamp);
        if response.timeout_end.is_some() && timeout_end.is_none() {
            warn!(raw = ?response.timeout_end, "unparseable cooldown deadline");
        }
        let clock = CooldownClock::start(
            response.timeout_length.unwrap_or(0.0),
            timeout_end,
            now_ms,
            config.clock_skew_threshold_ms,
        );
        self.phase = Phase::Cooldown(clock);
        SubmissionOutcome::Cooldown {
            wait_ms: clock.wait_ms(),
            skew_detected: clock.skew_detected(),
            provisional,
        }
    }

    /// Cooldown timer fired. Returns whether the gate reopened.
    pub fn on_cooldown_elapsed(&mut self) -> bool {
        if matches!(self.phase, Phase::Cooldown(_)) {
            self.phase = Phase::Idle;
            return true;
        }
        false
    }

    /// A teammate solved the puzzle; nothing more is submitted.
    pub fn mark_solved(&mut self, signal: SolvedSignal) -> bool {
        if matches!(self.phase, Phase::Solved(_)) {
            return false;
        }
        self.phase = Phase::Solved(signal);
        true
    }
}

fn provisional_guess(response: &AnswerResponse, answer: &str) -> Option<Guess> {
    let uid = response.guess_uid.clone()?;
    Some(Guess {
        uid,
        author: response.by.clone().unwrap_or_default(),
        text: response.guess.clone().unwrap_or_else(|| answer.to_string()),
        correct: response.correct,
        server_time: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_body_is_urlencoded() {
        let request = AnswerRequest {
            answer: "red & blue".to_string(),
            last_updated_ms: 17,
        };
        assert_eq!(request.form_body(), "last_updated=17&answer=red+%26+blue");
    }

    #[test]
    fn error_bodies_map_to_variants() {
        assert_eq!(
            interpret_answer_response(429, r#"{"error":"too fast"}"#),
            Err(SubmitError::TooFast)
        );
        assert_eq!(
            interpret_answer_response(422, r#"{"error":"already answered"}"#),
            Err(SubmitError::AlreadyAnswered)
        );
        assert_eq!(
            interpret_answer_response(400, r#"{"error":"no answer given"}"#),
            Err(SubmitError::Rejected("no answer given".to_string()))
        );
        assert_eq!(
            interpret_answer_response(502, "<html>bad gateway</html>"),
            Err(SubmitError::InvalidResponse { status: 502 })
        );
    }

    #[test]
    fn empty_answer_is_rejected_without_state_change() {
        let mut controller = SubmissionController::new(0);
        assert_eq!(controller.begin("   "), Err(SubmitRejected::Empty));
        assert_eq!(controller.phase(), SubmissionPhase::Idle);
    }
}
