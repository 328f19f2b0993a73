use hunter2_live_core::session::STALE_STATE_NOTICE;
use hunter2_live_core::{
    EventKind, HintUid, NoticeLevel, PuzzleSession, PuzzleStores, StoreKind, SyncConfig,
    UnlockUid,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn frame(kind: &str, content: serde_json::Value) -> String {
    json!({ "type": kind, "content": content }).to_string()
}

fn guess(kind: &str, uid: &str, text: &str) -> String {
    frame(
        kind,
        json!({
            "guess_uid": uid,
            "by": "ann",
            "guess": text,
            "correct": false,
            "timestamp": "2024-01-13T10:00:00Z",
        }),
    )
}

fn unlock(kind: &str, uid: &str, text: &str, guess: &str) -> String {
    frame(kind, json!({ "unlock_uid": uid, "unlock": text, "guess": guess }))
}

fn hint(kind: &str, uid: &str, time: &str, depends_on: Option<&str>) -> String {
    frame(
        kind,
        json!({
            "hint_uid": uid,
            "hint": format!("hint {uid}"),
            "time": time,
            "depends_on_unlock_uid": depends_on,
        }),
    )
}

fn session() -> PuzzleSession {
    PuzzleSession::new(SyncConfig::default(), 0)
}

fn feed(session: &mut PuzzleSession, frames: &[String]) {
    for (idx, text) in frames.iter().enumerate() {
        session.on_message(text, 1_000 + idx as i64);
    }
}

/// Store contents with arrival order factored out.
fn canonical(stores: &PuzzleStores) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut guesses: Vec<String> = stores
        .guesses()
        .iter()
        .map(|guess| format!("{}:{}", guess.uid, guess.text))
        .collect();
    guesses.sort();
    let unlocks = stores
        .unlocks()
        .sorted()
        .into_iter()
        .map(|unlock| {
            let mut guesses = unlock.guesses().to_vec();
            guesses.sort();
            let hints: Vec<String> = unlock.hints().iter().map(|hint| hint.uid.to_string()).collect();
            format!("{}:{:?}:{guesses:?}:{hints:?}", unlock.uid, unlock.text())
        })
        .collect();
    let hints = stores
        .hints()
        .sorted()
        .into_iter()
        .map(|hint| format!("{}@{}", hint.uid, hint.time))
        .collect();
    (guesses, unlocks, hints)
}

#[test]
fn every_event_is_idempotent() {
    let frames = [
        frame(
            "announcement",
            json!({"announcement_id": 3, "title": "Heads up", "message": "Lunch", "css_class": "info"}),
        ),
        guess("new_guess", "g1", "ABC"),
        guess("old_guess", "g2", "DEF"),
        unlock("new_unlock", "u1", "Think about birds", "ABC"),
        unlock("old_unlock", "u1", "Think about birds", "DEF"),
        frame("change_unlock", json!({"unlock_uid": "u1", "unlock": "Think about fish"})),
        hint("new_hint", "h1", "0:10:00", None),
        hint("old_hint", "h2", "0:20:00", Some("u1")),
    ];
    for text in &frames {
        let mut once = session();
        once.on_message(text, 1_000);
        let mut twice = once.clone();
        let update = twice.on_message(text, 1_000);
        assert!(update.changed.is_empty(), "re-delivery of {text} reported a change");
        assert_eq!(once.stores(), twice.stores());
    }
}

#[test]
fn replay_with_redelivery_converges() {
    let history = vec![
        guess("old_guess", "g1", "ABC"),
        guess("old_guess", "g2", "DEF"),
        guess("old_guess", "g3", "GHI"),
        unlock("old_unlock", "u1", "Birds", "ABC"),
        unlock("old_unlock", "u2", "Fish", "GHI"),
        hint("old_hint", "h1", "0:10:00", None),
        hint("old_hint", "h2", "0:05:00", Some("u2")),
    ];
    let mut reference = session();
    feed(&mut reference, &history);

    let live_copies = vec![
        guess("new_guess", "g2", "DEF"),
        unlock("new_unlock", "u1", "Birds", "ABC"),
        hint("new_hint", "h2", "0:05:00", Some("u2")),
        guess("new_guess", "g3", "GHI"),
    ];
    let orders: [Vec<String>; 3] = [
        history.iter().chain(&live_copies).cloned().collect(),
        live_copies.iter().chain(&history).cloned().collect(),
        history
            .iter()
            .zip(live_copies.iter().chain(live_copies.iter()))
            .flat_map(|(a, b)| [b.clone(), a.clone()])
            .collect(),
    ];
    for order in orders {
        let mut replayed = session();
        feed(&mut replayed, &order);
        assert_eq!(canonical(replayed.stores()), canonical(reference.stores()));
        assert_eq!(replayed.stores().guesses().len(), 3);
    }
}

#[test]
fn hints_live_in_exactly_one_place() {
    let mut session = session();
    feed(
        &mut session,
        &[
            hint("new_hint", "h1", "0:10:00", None),
            hint("new_hint", "h1", "0:10:00", Some("u1")),
            hint("new_hint", "h2", "0:30:00", Some("u1")),
            hint("new_hint", "h2", "0:30:00", None),
        ],
    );
    let stores = session.stores();
    let top: Vec<&str> = stores.hints().sorted().into_iter().map(|hint| hint.uid.as_str()).collect();
    assert_eq!(top, ["h2"]);
    let nested = stores.unlocks().get(&UnlockUid::from("u1")).unwrap();
    assert_eq!(nested.hint_count(), 1);
    assert!(nested.hint(&HintUid::from("h1")).is_some());
    assert_eq!(stores.hint_count(), 2);
}

#[test]
fn placeholder_unlock_keeps_hints_when_filled() {
    let mut session = session();
    let update = session.on_message(&hint("new_hint", "h1", "0:10:00", Some("u7")), 1_000);
    assert_eq!(update.changed, [StoreKind::Unlocks]);
    assert!(session
        .stores()
        .unlocks()
        .get(&UnlockUid::from("u7"))
        .unwrap()
        .is_placeholder());

    session.on_message(&unlock("new_unlock", "u7", "Count the legs", "SPIDER"), 1_001);
    let filled = session.stores().unlocks().get(&UnlockUid::from("u7")).unwrap();
    assert_eq!(filled.text(), Some("Count the legs"));
    assert_eq!(filled.guesses(), ["SPIDER".to_string()]);
    assert_eq!(filled.hint_count(), 1);
}

#[test]
fn unlock_survives_losing_its_last_guess() {
    let mut session = session();
    feed(
        &mut session,
        &[
            unlock("new_unlock", "u1", "Birds", "ABC"),
            frame("delete_unlockguess", json!({"unlock_uid": "u1", "guess": "ABC"})),
        ],
    );
    let unlock = session.stores().unlocks().get(&UnlockUid::from("u1")).unwrap();
    assert!(unlock.guesses().is_empty());
    assert_eq!(unlock.text(), Some("Birds"));

    session.on_message(&frame("delete_unlock", json!({"unlock_uid": "u1"})), 2_000);
    assert!(session.stores().unlocks().is_empty());
}

#[test]
fn missing_targets_warn_and_leave_stores_untouched() {
    let mut session = session();
    session.on_message(&guess("new_guess", "g1", "ABC"), 1_000);
    let before = session.stores().clone();
    for text in [
        frame("delete_hint", json!({"hint_uid": "h404", "depends_on_unlock_uid": null})),
        frame("delete_unlock", json!({"unlock_uid": "u404"})),
        frame("delete_unlockguess", json!({"unlock_uid": "u404", "guess": "X"})),
        frame("delete_announcement", json!({"announcement_id": "a404"})),
    ] {
        let update = session.on_message(&text, 2_000);
        assert!(update.changed.is_empty());
        assert_eq!(update.notices.len(), 1);
        assert_eq!(update.notices[0].level, NoticeLevel::Warning);
        assert_eq!(update.notices[0].message, STALE_STATE_NOTICE);
        assert!(update.notices[0].detail.is_some());
    }
    assert_eq!(session.stores(), &before);
    assert_eq!(session.connection().last_event_time().as_millis(), Some(1_000));
}

#[test]
fn removing_a_guess_the_unlock_never_had_is_reported() {
    let mut session = session();
    session.on_message(&unlock("new_unlock", "u1", "Birds", "ABC"), 1_000);
    let before = session.stores().clone();

    let update = session.on_message(
        &frame("delete_unlockguess", json!({"unlock_uid": "u1", "guess": "ZZZ"})),
        2_000,
    );

    assert!(update.changed.is_empty());
    assert_eq!(update.notices.len(), 1);
    let detail = update.notices[0].detail.as_deref().unwrap();
    assert!(detail.contains("ZZZ"), "detail was {detail}");
    assert_eq!(session.stores(), &before);
    let unlock = session.stores().unlocks().get(&UnlockUid::from("u1")).unwrap();
    assert_eq!(unlock.guesses(), ["ABC".to_string()]);
    assert_eq!(session.connection().last_event_time().as_millis(), Some(1_000));
}

#[test]
fn unreadable_frames_do_not_move_event_time() {
    let mut session = session();
    session.on_message(&guess("new_guess", "g1", "ABC"), 5_000);
    assert_eq!(session.connection().last_event_time().as_millis(), Some(5_000));

    for text in [
        "not json".to_string(),
        json!({"type": "new_guess"}).to_string(),
        frame("new_puzzle", json!({})),
        frame("new_guess", json!({"guess_uid": "g2"})),
    ] {
        let update = session.on_message(&text, 9_000);
        assert_eq!(update.notices.len(), 1, "{text} should raise one notice");
        assert!(update.changed.is_empty());
    }
    assert_eq!(session.connection().last_event_time().as_millis(), Some(5_000));
    assert_eq!(session.stores().guesses().len(), 1);
}

#[test]
fn event_time_never_moves_backwards() {
    let mut session = session();
    session.on_message(&guess("new_guess", "g1", "ABC"), 5_000);
    session.on_message(&guess("new_guess", "g2", "DEF"), 4_000);
    assert_eq!(session.connection().last_event_time().as_millis(), Some(5_000));
}

#[test]
fn server_error_frames_surface_as_notices() {
    let mut session = session();
    let update = session.on_message(&frame("error", json!({"error": "not on a team"})), 1_000);
    assert_eq!(update.event, Some(EventKind::Error));
    assert_eq!(update.notices[0].message, "Server error: not on a team");
}

#[test]
fn announcement_edits_replace_in_place() {
    let mut session_with_news = session();
    feed(
        &mut session_with_news,
        &[
            frame("announcement", json!({"announcement_id": 1, "title": "A", "message": "first", "css_class": ""})),
            frame("announcement", json!({"announcement_id": 2, "title": "B", "message": "second", "css_class": ""})),
            frame("announcement", json!({"announcement_id": 1, "title": "A", "message": "edited", "css_class": "warning"})),
        ],
    );
    let announcements: Vec<(&str, &str)> = session_with_news
        .stores()
        .announcements()
        .iter()
        .map(|a| (a.id.as_str(), a.message.as_str()))
        .collect();
    assert_eq!(announcements, [("1", "edited"), ("2", "second")]);
    let stores = session_with_news.stores();
    assert_eq!(
        stores.announcements().iter().next().map(|a| a.css_class.as_str()),
        Some("warning")
    );
}
