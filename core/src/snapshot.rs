//! Resume file for native clients: the stores plus the backfill anchor.

use rkyv::{Archive, Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{decode, encode};
use crate::ids::{AnnouncementId, GuessUid, HintUid, UnlockUid};
use crate::store::{Announcement, Guess, Hint, PuzzleStores};
use crate::time::{EventTime, HintTime};

pub const SESSION_SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct GuessRecord {
    pub uid: String,
    pub author: String,
    pub text: String,
    pub correct: bool,
    pub server_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct UnlockRecord {
    pub uid: String,
    pub text: Option<String>,
    pub guesses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct HintRecord {
    pub uid: String,
    pub time: String,
    pub text: String,
    pub depends_on: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct AnnouncementRecord {
    pub id: String,
    pub title: String,
    pub message: String,
    pub css_class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub page_url: String,
    pub last_event_ms: Option<i64>,
    pub guesses: Vec<GuessRecord>,
    pub unlocks: Vec<UnlockRecord>,
    pub hints: Vec<HintRecord>,
    pub announcements: Vec<AnnouncementRecord>,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot codec failed: {0}")]
    Codec(#[from] crate::codec::CodecError),
    #[error("snapshot version {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("snapshot was taken for {found}, not {expected}")]
    WrongPage { found: String, expected: String },
}

fn hint_record(hint: &Hint) -> HintRecord {
    HintRecord {
        uid: hint.uid.to_string(),
        time: hint.time.to_string(),
        text: hint.text.clone(),
        depends_on: hint.depends_on.as_ref().map(ToString::to_string),
    }
}

impl SessionSnapshot {
    pub fn capture(page_url: &str, stores: &PuzzleStores, last_event_time: EventTime) -> Self {
        let guesses = stores
            .guesses()
            .iter()
            .map(|guess| GuessRecord {
                uid: guess.uid.to_string(),
                author: guess.author.clone(),
                text: guess.text.clone(),
                correct: guess.correct,
                server_time: guess.server_time.clone(),
            })
            .collect();

        let mut hints: Vec<HintRecord> = stores.hints().sorted().into_iter().map(hint_record).collect();
        let mut unlocks = Vec::with_capacity(stores.unlocks().len());
        for unlock in stores.unlocks().sorted() {
            hints.extend(unlock.hints().into_iter().map(hint_record));
            unlocks.push(UnlockRecord {
                uid: unlock.uid.to_string(),
                text: unlock.text().map(str::to_string),
                guesses: unlock.guesses().to_vec(),
            });
        }

        let announcements = stores
            .announcements()
            .iter()
            .map(|announcement| AnnouncementRecord {
                id: announcement.id.to_string(),
                title: announcement.title.clone(),
                message: announcement.message.clone(),
                css_class: announcement.css_class.clone(),
            })
            .collect();

        Self {
            version: SESSION_SNAPSHOT_VERSION,
            page_url: page_url.to_string(),
            last_event_ms: last_event_time.as_millis(),
            guesses,
            unlocks,
            hints,
            announcements,
        }
    }

    pub fn last_event_time(&self) -> EventTime {
        self.last_event_ms.map_or(EventTime::Never, EventTime::At)
    }

    /// Rebuilds stores through the regular upsert paths so every store
    /// invariant holds for restored data too.
    pub fn to_stores(&self) -> PuzzleStores {
        let mut stores = PuzzleStores::new();
        for record in &self.guesses {
            stores.apply_guess(Guess {
                uid: GuessUid::from(record.uid.as_str()),
                author: record.author.clone(),
                text: record.text.clone(),
                correct: record.correct,
                server_time: record.server_time.clone(),
            });
        }
        for record in &self.unlocks {
            let uid = UnlockUid::from(record.uid.as_str());
            let Some(text) = &record.text else {
                continue;
            };
            if record.guesses.is_empty() {
                stores.change_unlock(uid, text.clone());
                continue;
            }
            for guess in &record.guesses {
                stores.apply_unlock(uid.clone(), text.clone(), guess.clone());
            }
        }
        for record in &self.hints {
            stores.apply_hint(Hint {
                uid: HintUid::from(record.uid.as_str()),
                time: HintTime::new(record.time.as_str()),
                text: record.text.clone(),
                depends_on: record.depends_on.as_deref().map(UnlockUid::from),
            });
        }
        for record in &self.announcements {
            stores.apply_announcement(Announcement {
                id: AnnouncementId::from(record.id.as_str()),
                title: record.title.clone(),
                message: record.message.clone(),
                css_class: record.css_class.clone(),
            });
        }
        stores
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(encode(self)?)
    }

    /// Decodes and checks the snapshot belongs to `page_url`.
    pub fn from_bytes(bytes: &[u8], page_url: &str) -> Result<Self, SnapshotError> {
        let snapshot: SessionSnapshot = decode(bytes)?;
        if snapshot.version != SESSION_SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: snapshot.version,
                expected: SESSION_SNAPSHOT_VERSION,
            });
        }
        if snapshot.page_url != page_url {
            return Err(SnapshotError::WrongPage {
                found: snapshot.page_url,
                expected: page_url.to_string(),
            });
        }
        Ok(snapshot)
    }
}
