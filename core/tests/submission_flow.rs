use hunter2_live_core::session::CLOCK_MISMATCH_NOTICE;
use hunter2_live_core::{
    AnswerResponse, BackfillFrom, ClientRequest, GuessUid, PuzzleSession, SessionSnapshot,
    StoreKind, SubmissionPhase, SubmitError, SubmitRejected, SyncConfig,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const NOW: i64 = 1_700_000_000_000;

fn incorrect(guess_uid: &str, timeout_end: &str) -> AnswerResponse {
    serde_json::from_value(json!({
        "correct": "false",
        "guess": "WRONG",
        "guess_uid": guess_uid,
        "by": "ann",
        "timeout_length": 5000,
        "timeout_end": timeout_end,
    }))
    .unwrap()
}

fn broadcast_guess(uid: &str, correct: bool) -> String {
    json!({
        "type": "new_guess",
        "content": {
            "guess_uid": uid,
            "by": "bob",
            "guess": if correct { "RIGHT" } else { "WRONG" },
            "correct": correct,
            "timestamp": "2023-11-14T22:13:20Z",
            "redirect": "/hunt/ep/1/",
        }
    })
    .to_string()
}

#[test]
fn second_submit_is_rejected_while_in_flight() {
    let mut session = PuzzleSession::new(SyncConfig::default(), NOW);
    let request = session.submit("wrong").unwrap();
    assert_eq!(request.answer, "wrong");
    assert_eq!(request.last_updated_ms, NOW);
    assert_eq!(session.submit("again"), Err(SubmitRejected::Busy));
    assert_eq!(session.submission().phase(), SubmissionPhase::Submitting);
    assert_eq!(session.submission().pending_answer(), Some("wrong"));
}

#[test]
fn incorrect_answer_cools_down_then_reopens() {
    let mut session = PuzzleSession::new(SyncConfig::default(), NOW);
    session.submit("wrong").unwrap();
    let update = session.on_submit_result(
        Ok(incorrect("g-1", "2023-11-14T22:13:24.800Z")),
        NOW,
    );
    assert_eq!(update.cooldown_ms, Some(4_800));
    assert!(update.notices.is_empty());
    assert_eq!(update.changed, [StoreKind::Guesses]);
    assert_eq!(session.submission().phase(), SubmissionPhase::Cooldown);
    assert_eq!(session.submit("wrong"), Err(SubmitRejected::CoolingDown));
    assert_eq!(session.submission().cooldown_remaining_ms(NOW + 800), 4_000);

    assert!(session.on_cooldown_elapsed());
    assert_eq!(session.submission().phase(), SubmissionPhase::Idle);
    let next = session.submit("again").unwrap();
    assert_eq!(next.last_updated_ms, NOW);
}

#[test]
fn skewed_deadline_uses_length_and_warns() {
    let mut session = PuzzleSession::new(SyncConfig::default(), NOW);
    session.submit("wrong").unwrap();
    let update = session.on_submit_result(Ok(incorrect("g-1", "2023-11-14T23:13:25Z")), NOW);
    assert_eq!(update.cooldown_ms, Some(5_000));
    assert_eq!(update.notices.len(), 1);
    assert_eq!(update.notices[0].message, CLOCK_MISMATCH_NOTICE);
}

#[test]
fn provisional_guess_and_broadcast_collapse() {
    let mut session = PuzzleSession::new(SyncConfig::default(), NOW);
    session.submit("wrong").unwrap();
    session.on_submit_result(Ok(incorrect("g-1", "2023-11-14T22:13:25Z")), NOW);
    let update = session.on_message(&broadcast_guess("g-1", false), NOW + 10);
    assert!(update.changed.is_empty());

    let guesses: Vec<&str> = session
        .stores()
        .guesses()
        .iter()
        .map(|guess| guess.uid.as_str())
        .collect();
    assert_eq!(guesses, ["g-1"]);
    let recorded = session.stores().guesses().get(&GuessUid::from("g-1")).unwrap();
    assert_eq!(recorded.author, "ann");
}

#[test]
fn deadline_far_from_length_falls_back_to_length() {
    let mut session = PuzzleSession::new(SyncConfig::default(), NOW);
    session.submit("wrong").unwrap();
    // 9000 ms left by the local clock against a 5000 ms cooldown.
    let update = session.on_submit_result(Ok(incorrect("g-1", "2023-11-14T22:13:29Z")), NOW);
    assert_eq!(update.cooldown_ms, Some(5_000));
    assert_eq!(update.notices.len(), 1);
    assert_eq!(update.notices[0].message, CLOCK_MISMATCH_NOTICE);
}

#[test]
fn deadline_close_to_length_is_trusted() {
    let mut session = PuzzleSession::new(SyncConfig::default(), NOW);
    session.submit("wrong").unwrap();
    // 5200 ms left against a 5000 ms cooldown.
    let update = session.on_submit_result(
        Ok(incorrect("g-1", "2023-11-14T22:13:25.200Z")),
        NOW,
    );
    assert_eq!(update.cooldown_ms, Some(5_200));
    assert!(update.notices.is_empty());
}

#[test]
fn broadcast_before_response_still_shows_one_guess() {
    let mut session = PuzzleSession::new(SyncConfig::default(), NOW);
    session.submit("wrong").unwrap();
    let broadcast = session.on_message(&broadcast_guess("g-1", false), NOW + 5);
    assert_eq!(broadcast.changed, [StoreKind::Guesses]);

    let update = session.on_submit_result(Ok(incorrect("g-1", "2023-11-14T22:13:25Z")), NOW + 10);
    assert!(update.changed.is_empty());
    assert_eq!(session.submission().phase(), SubmissionPhase::Cooldown);

    assert_eq!(session.stores().guesses().len(), 1);
    let recorded = session.stores().guesses().get(&GuessUid::from("g-1")).unwrap();
    assert_eq!(recorded.author, "bob");
}

#[test]
fn failed_submission_returns_to_idle_with_message() {
    let mut session = PuzzleSession::new(SyncConfig::default(), NOW);
    session.submit("wrong").unwrap();
    let update = session.on_submit_result(Err(SubmitError::TooFast), NOW);
    assert_eq!(session.submission().phase(), SubmissionPhase::Idle);
    assert_eq!(update.notices[0].message, SubmitError::TooFast.user_message());
    assert!(update.cooldown_ms.is_none());
}

#[test]
fn correct_answer_is_terminal() {
    let mut session = PuzzleSession::new(SyncConfig::default(), NOW);
    session.submit("right").unwrap();
    let response: AnswerResponse = serde_json::from_value(json!({
        "correct": "true",
        "guess_uid": "g-9",
        "url": "/hunt/ep/1/",
        "text": "back to the episode",
    }))
    .unwrap();
    let update = session.on_submit_result(Ok(response), NOW);
    let solved = update.solved.unwrap();
    assert_eq!(solved.url.as_deref(), Some("/hunt/ep/1/"));
    assert_eq!(solved.message(), "Correct! Taking you back to the episode.");
    assert_eq!(session.submit("more"), Err(SubmitRejected::Solved));
}

#[test]
fn teammate_solve_closes_the_form() {
    let mut session = PuzzleSession::new(SyncConfig::default(), NOW);
    let update = session.on_message(&broadcast_guess("g-7", true), NOW);
    let solved = update.solved.unwrap();
    assert_eq!(solved.url.as_deref(), Some("/hunt/ep/1/"));
    assert_eq!(session.submission().phase(), SubmissionPhase::Solved);
    assert_eq!(session.submit("late"), Err(SubmitRejected::Solved));
}

#[test]
fn replayed_correct_guess_does_not_redirect() {
    let mut session = PuzzleSession::new(SyncConfig::default(), NOW);
    let replay = broadcast_guess("g-7", true).replace("new_guess", "old_guess");
    let update = session.on_message(&replay, NOW);
    assert!(update.solved.is_none());
    assert_eq!(session.submission().phase(), SubmissionPhase::Idle);
}

#[test]
fn handshake_depends_on_history() {
    let mut session = PuzzleSession::new(SyncConfig::default(), NOW);
    session.begin_connect();
    assert_eq!(
        session.on_open(),
        [
            ClientRequest::Guesses {
                from: BackfillFrom::All
            },
            ClientRequest::Unlocks,
        ]
    );

    session.on_message(&broadcast_guess("g-1", false), NOW + 500);
    session.on_close(0.5);
    session.begin_connect();
    assert_eq!(
        session.on_open(),
        [
            ClientRequest::Guesses {
                from: BackfillFrom::Since(NOW + 500)
            },
            ClientRequest::Hints {
                from: BackfillFrom::Since(NOW + 500)
            },
            ClientRequest::Unlocks,
        ]
    );
}

#[test]
fn native_first_load_also_requests_hints() {
    let config = SyncConfig {
        request_hints_on_first_load: true,
        ..SyncConfig::default()
    };
    let mut session = PuzzleSession::new(config, NOW);
    let requests = session.on_open();
    assert_eq!(requests.len(), 3);
    assert_eq!(
        requests[1],
        ClientRequest::Hints {
            from: BackfillFrom::Since(0)
        }
    );
}

#[test]
fn reconnect_delay_resets_after_open() {
    let config = SyncConfig {
        reconnect_base_ms: 100,
        reconnect_max_ms: 1_000,
        reconnect_jitter_ms: 0,
        ..SyncConfig::default()
    };
    let mut session = PuzzleSession::new(config, NOW);
    assert_eq!(session.on_close(0.0), 100);
    assert_eq!(session.on_close(0.0), 200);
    assert_eq!(session.on_close(0.0), 400);
    session.on_open();
    assert_eq!(session.on_close(0.0), 100);
}

#[test]
fn snapshot_restores_stores_and_backfill_anchor() {
    let page = "https://hunt.example/hunt/ep/1/pz/2/";
    let mut session = PuzzleSession::new(SyncConfig::default(), NOW);
    for text in [
        broadcast_guess("g-1", false),
        json!({"type": "new_unlock", "content": {"unlock_uid": "u1", "unlock": "Birds", "guess": "WRONG"}}).to_string(),
        json!({"type": "new_hint", "content": {"hint_uid": "h1", "hint": "Look up", "time": "0:10:00", "depends_on_unlock_uid": "u1"}}).to_string(),
        json!({"type": "new_hint", "content": {"hint_uid": "h2", "hint": "Look down", "time": "0:20:00"}}).to_string(),
    ] {
        session.on_message(&text, NOW + 1_000);
    }

    let bytes = session.snapshot(page).to_bytes().unwrap();
    let snapshot = SessionSnapshot::from_bytes(&bytes, page).unwrap();
    let mut resumed = PuzzleSession::new(SyncConfig::default(), NOW);
    resumed.restore(&snapshot);

    assert_eq!(resumed.stores(), session.stores());
    assert_eq!(
        resumed.on_open()[0],
        ClientRequest::Guesses {
            from: BackfillFrom::Since(NOW + 1_000)
        }
    );
    assert!(SessionSnapshot::from_bytes(&bytes, "https://hunt.example/other/").is_err());
    assert!(SessionSnapshot::from_bytes(&bytes[..bytes.len() / 2], page).is_err());
}
