//! JSON messages exchanged over the live puzzle socket.
//!
//! Every server frame is an envelope `{"type": ..., "content": {...}}`.
//! Decoding happens in two steps so an unknown `type` can be told apart from
//! a known one with a broken payload.

use std::fmt;

use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::ser::{Serialize, Serializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::ids::{AnnouncementId, GuessUid, HintUid, UnlockUid};
use crate::time::HintTime;

/// Lower bound for a backfill request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillFrom {
    All,
    Since(i64),
}

impl Serialize for BackfillFrom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BackfillFrom::All => serializer.serialize_str("all"),
            BackfillFrom::Since(ms) => serializer.serialize_i64(*ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    #[serde(rename = "guesses-plz")]
    Guesses { from: BackfillFrom },
    #[serde(rename = "hints-plz")]
    Hints { from: BackfillFrom },
    #[serde(rename = "unlocks-plz")]
    Unlocks,
}

impl ClientRequest {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Announcement,
    DeleteAnnouncement,
    NewGuess,
    OldGuess,
    NewUnlock,
    OldUnlock,
    ChangeUnlock,
    DeleteUnlock,
    DeleteUnlockGuess,
    NewHint,
    OldHint,
    DeleteHint,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 13] = [
        EventKind::Announcement,
        EventKind::DeleteAnnouncement,
        EventKind::NewGuess,
        EventKind::OldGuess,
        EventKind::NewUnlock,
        EventKind::OldUnlock,
        EventKind::ChangeUnlock,
        EventKind::DeleteUnlock,
        EventKind::DeleteUnlockGuess,
        EventKind::NewHint,
        EventKind::OldHint,
        EventKind::DeleteHint,
        EventKind::Error,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            EventKind::Announcement => "announcement",
            EventKind::DeleteAnnouncement => "delete_announcement",
            EventKind::NewGuess => "new_guess",
            EventKind::OldGuess => "old_guess",
            EventKind::NewUnlock => "new_unlock",
            EventKind::OldUnlock => "old_unlock",
            EventKind::ChangeUnlock => "change_unlock",
            EventKind::DeleteUnlock => "delete_unlock",
            EventKind::DeleteUnlockGuess => "delete_unlockguess",
            EventKind::NewHint => "new_hint",
            EventKind::OldHint => "old_hint",
            EventKind::DeleteHint => "delete_hint",
            EventKind::Error => "error",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Replayed history rather than a live change.
    pub fn is_backfill(self) -> bool {
        matches!(
            self,
            EventKind::OldGuess | EventKind::OldUnlock | EventKind::OldHint
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuessContent {
    pub guess_uid: GuessUid,
    pub by: String,
    pub guess: String,
    #[serde(deserialize_with = "flexible_bool")]
    pub correct: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnlockContent {
    pub unlock_uid: UnlockUid,
    pub unlock: String,
    pub guess: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeUnlockContent {
    pub unlock_uid: UnlockUid,
    pub unlock: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnlockRef {
    pub unlock_uid: UnlockUid,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnlockGuessRef {
    pub unlock_uid: UnlockUid,
    pub guess: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HintContent {
    pub hint_uid: HintUid,
    pub hint: String,
    pub time: HintTime,
    #[serde(default)]
    pub depends_on_unlock_uid: Option<UnlockUid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HintRef {
    pub hint_uid: HintUid,
    #[serde(default)]
    pub depends_on_unlock_uid: Option<UnlockUid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnnouncementContent {
    pub announcement_id: AnnouncementId,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub css_class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnnouncementRef {
    pub announcement_id: AnnouncementId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorContent {
    #[serde(alias = "message")]
    pub error: String,
}

/// A decoded server event. `new_*` and `old_*` frames share a payload shape
/// and are applied identically; the originating kind travels alongside in
/// [`InboundEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Announcement(AnnouncementContent),
    DeleteAnnouncement(AnnouncementRef),
    Guess(GuessContent),
    Unlock(UnlockContent),
    ChangeUnlock(ChangeUnlockContent),
    DeleteUnlock(UnlockRef),
    DeleteUnlockGuess(UnlockGuessRef),
    Hint(HintContent),
    DeleteHint(HintRef),
    Error(ErrorContent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub event: ServerEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("invalid `{kind}` content: {reason}")]
    InvalidContent { kind: EventKind, reason: String },
}

pub fn decode_event(text: &str) -> Result<InboundEvent, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|err| ProtocolError::MalformedEnvelope(err.to_string()))?;
    let kind = EventKind::from_tag(&envelope.kind)
        .ok_or_else(|| ProtocolError::UnknownType(envelope.kind.clone()))?;
    let content = Value::Object(envelope.content);
    let event = match kind {
        EventKind::Announcement => ServerEvent::Announcement(content_as(kind, content)?),
        EventKind::DeleteAnnouncement => {
            ServerEvent::DeleteAnnouncement(content_as(kind, content)?)
        }
        EventKind::NewGuess | EventKind::OldGuess => ServerEvent::Guess(content_as(kind, content)?),
        EventKind::NewUnlock | EventKind::OldUnlock => {
            ServerEvent::Unlock(content_as(kind, content)?)
        }
        EventKind::ChangeUnlock => ServerEvent::ChangeUnlock(content_as(kind, content)?),
        EventKind::DeleteUnlock => ServerEvent::DeleteUnlock(content_as(kind, content)?),
        EventKind::DeleteUnlockGuess => {
            ServerEvent::DeleteUnlockGuess(content_as(kind, content)?)
        }
        EventKind::NewHint | EventKind::OldHint => ServerEvent::Hint(content_as(kind, content)?),
        EventKind::DeleteHint => ServerEvent::DeleteHint(content_as(kind, content)?),
        EventKind::Error => ServerEvent::Error(content_as(kind, content)?),
    };
    Ok(InboundEvent { kind, event })
}

fn content_as<T: DeserializeOwned>(kind: EventKind, content: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(content).map_err(|err| ProtocolError::InvalidContent {
        kind,
        reason: err.to_string(),
    })
}

/// Accepts JSON booleans as well as the `"true"`/`"false"` strings some
/// server paths emit.
pub(crate) fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlexibleBool;

    impl<'de> Visitor<'de> for FlexibleBool {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean or the strings \"true\"/\"false\"")
        }

        fn visit_bool<E: de::Error>(self, value: bool) -> Result<bool, E> {
            Ok(value)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<bool, E> {
            match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" | "" => Ok(false),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<bool, E> {
            Ok(value != 0)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<bool, E> {
            Ok(value != 0)
        }
    }

    deserializer.deserialize_any(FlexibleBool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_serialize_to_wire_shape() {
        let all = ClientRequest::Guesses {
            from: BackfillFrom::All,
        };
        let since = ClientRequest::Hints {
            from: BackfillFrom::Since(1_700_000_000_000),
        };
        assert_eq!(
            all.to_json().unwrap(),
            r#"{"type":"guesses-plz","from":"all"}"#
        );
        assert_eq!(
            since.to_json().unwrap(),
            r#"{"type":"hints-plz","from":1700000000000}"#
        );
        assert_eq!(
            ClientRequest::Unlocks.to_json().unwrap(),
            r#"{"type":"unlocks-plz"}"#
        );
    }

    #[test]
    fn tags_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(EventKind::from_tag("new_puzzle"), None);
    }

    #[test]
    fn correct_accepts_string_booleans() {
        let raw = r#"{"type":"new_guess","content":{"guess_uid":7,"by":"ann","guess":"x","correct":"true"}}"#;
        let inbound = decode_event(raw).unwrap();
        let ServerEvent::Guess(guess) = inbound.event else {
            panic!("expected guess");
        };
        assert!(guess.correct);
        assert_eq!(guess.guess_uid.as_str(), "7");
    }
}
