//! Client-side mirror of the team's puzzle state.
//!
//! Every mutation is idempotent under re-delivery: the server replays
//! history after each reconnect and may also broadcast the same change more
//! than once, so applying an event twice must leave the same state as
//! applying it once.

mod announcement;
mod guess;
mod hint;
mod unlock;

use std::collections::HashMap;

use thiserror::Error;

pub use announcement::{Announcement, AnnouncementStore};
pub use guess::{Guess, GuessStore};
pub use hint::{Hint, HintStore};
pub use unlock::{Unlock, UnlockStore};

use crate::ids::{AnnouncementId, HintUid, UnlockUid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Inserted,
    Updated,
    Unchanged,
    Removed,
}

impl Change {
    pub fn is_visible(self) -> bool {
        !matches!(self, Change::Unchanged)
    }
}

/// Which rendered collection a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Guesses,
    Unlocks,
    Hints,
    Announcements,
}

impl StoreKind {
    pub fn label(self) -> &'static str {
        match self {
            StoreKind::Guesses => "guesses",
            StoreKind::Unlocks => "unlocks",
            StoreKind::Hints => "hints",
            StoreKind::Announcements => "announcements",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("announcement {0} is not present")]
    MissingAnnouncement(AnnouncementId),
    #[error("unlock {0} is not present")]
    MissingUnlock(UnlockUid),
    #[error("guess `{guess}` is not recorded against unlock {unlock}")]
    MissingUnlockGuess { unlock: UnlockUid, guess: String },
    #[error("hint {0} is not present")]
    MissingHint(HintUid),
    #[error("hint {hint} is not present under unlock {unlock}")]
    MissingUnlockHint { unlock: UnlockUid, hint: HintUid },
}

/// All four collections plus the record of where each hint lives.
///
/// A hint sits either at the top level (no dependency) or inside exactly one
/// unlock, never both; `hint_locations` is what keeps that true when a hint
/// is re-sent with a different dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PuzzleStores {
    guesses: GuessStore,
    unlocks: UnlockStore,
    hints: HintStore,
    hint_locations: HashMap<HintUid, Option<UnlockUid>>,
    announcements: AnnouncementStore,
}

impl PuzzleStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guesses(&self) -> &GuessStore {
        &self.guesses
    }

    pub fn unlocks(&self) -> &UnlockStore {
        &self.unlocks
    }

    /// Hints that do not depend on an unlock.
    pub fn hints(&self) -> &HintStore {
        &self.hints
    }

    pub fn announcements(&self) -> &AnnouncementStore {
        &self.announcements
    }

    /// Where a hint currently lives: `Some(None)` for the top level.
    pub fn hint_location(&self, uid: &HintUid) -> Option<Option<&UnlockUid>> {
        self.hint_locations.get(uid).map(Option::as_ref)
    }

    pub fn hint_count(&self) -> usize {
        self.hint_locations.len()
    }

    pub fn apply_guess(&mut self, guess: Guess) -> Change {
        self.guesses.upsert(guess)
    }

    pub fn apply_unlock(&mut self, uid: UnlockUid, text: String, guess: String) -> Change {
        self.unlocks.upsert(uid, text, guess)
    }

    pub fn change_unlock(&mut self, uid: UnlockUid, text: String) -> Change {
        self.unlocks.set_text(uid, text)
    }

    pub fn delete_unlock(&mut self, uid: &UnlockUid) -> Result<Change, StoreError> {
        let removed = self.unlocks.remove(uid)?;
        for hint in removed.hints() {
            self.hint_locations.remove(&hint.uid);
        }
        Ok(Change::Removed)
    }

    pub fn delete_unlock_guess(&mut self, uid: &UnlockUid, guess: &str) -> Result<Change, StoreError> {
        self.unlocks.remove_guess(uid, guess)
    }

    /// Places the hint by its dependency, moving it if an earlier delivery
    /// put it somewhere else.
    pub fn apply_hint(&mut self, hint: Hint) -> Change {
        let location = hint.depends_on.clone();
        let previous = self.hint_locations.get(&hint.uid).cloned();
        let moved = matches!(&previous, Some(prev) if *prev != location);
        if let (true, Some(prev)) = (moved, previous.as_ref()) {
            let _ = self.detach_hint(&hint.uid, prev.as_ref());
        }

        let uid = hint.uid.clone();
        let change = match location.clone() {
            None => self.hints.upsert(hint),
            Some(unlock_uid) => self.unlocks.upsert_hint(unlock_uid, hint),
        };
        self.hint_locations.insert(uid, location);
        if moved {
            Change::Updated
        } else {
            change
        }
    }

    pub fn delete_hint(
        &mut self,
        uid: &HintUid,
        depends_on: Option<&UnlockUid>,
    ) -> Result<Change, StoreError> {
        self.detach_hint(uid, depends_on)?;
        self.hint_locations.remove(uid);
        Ok(Change::Removed)
    }

    fn detach_hint(&mut self, uid: &HintUid, location: Option<&UnlockUid>) -> Result<Hint, StoreError> {
        match location {
            None => self.hints.remove(uid),
            Some(unlock_uid) => self.unlocks.remove_hint(unlock_uid, uid),
        }
    }

    pub fn apply_announcement(&mut self, announcement: Announcement) -> Change {
        self.announcements.upsert(announcement)
    }

    pub fn delete_announcement(&mut self, id: &AnnouncementId) -> Result<Change, StoreError> {
        self.announcements.remove(id)?;
        Ok(Change::Removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::GuessUid;
    use crate::time::HintTime;

    fn hint(uid: &str, time: &str, depends_on: Option<&str>) -> Hint {
        Hint {
            uid: HintUid::from(uid),
            time: HintTime::new(time),
            text: format!("hint {uid}"),
            depends_on: depends_on.map(UnlockUid::from),
        }
    }

    #[test]
    fn guess_redelivery_is_unchanged() {
        let mut stores = PuzzleStores::new();
        let guess = Guess {
            uid: GuessUid::from("g1"),
            author: "ann".to_string(),
            text: "PLUGH".to_string(),
            correct: false,
            server_time: None,
        };
        assert_eq!(stores.apply_guess(guess.clone()), Change::Inserted);
        assert_eq!(stores.apply_guess(guess), Change::Unchanged);
        assert_eq!(stores.guesses().len(), 1);
    }

    #[test]
    fn dependent_hint_creates_placeholder_unlock() {
        let mut stores = PuzzleStores::new();
        assert_eq!(stores.apply_hint(hint("h1", "0:10:00", Some("u1"))), Change::Inserted);
        let unlock = stores.unlocks().get(&UnlockUid::from("u1")).unwrap();
        assert!(unlock.is_placeholder());
        assert_eq!(unlock.hint_count(), 1);
        assert!(stores.hints().is_empty());

        stores.apply_unlock(UnlockUid::from("u1"), "Look left".to_string(), "LEFT".to_string());
        let unlock = stores.unlocks().get(&UnlockUid::from("u1")).unwrap();
        assert_eq!(unlock.text(), Some("Look left"));
        assert_eq!(unlock.hint_count(), 1);
    }

    #[test]
    fn hint_moves_when_dependency_changes() {
        let mut stores = PuzzleStores::new();
        stores.apply_hint(hint("h1", "0:10:00", None));
        assert_eq!(stores.apply_hint(hint("h1", "0:10:00", Some("u1"))), Change::Updated);
        assert!(stores.hints().is_empty());
        assert_eq!(
            stores.hint_location(&HintUid::from("h1")),
            Some(Some(&UnlockUid::from("u1")))
        );
        assert_eq!(stores.hint_count(), 1);
    }

    #[test]
    fn deleting_unknown_entities_reports_not_found() {
        let mut stores = PuzzleStores::new();
        assert_eq!(
            stores.delete_hint(&HintUid::from("h9"), None),
            Err(StoreError::MissingHint(HintUid::from("h9")))
        );
        assert_eq!(
            stores.delete_unlock(&UnlockUid::from("u9")),
            Err(StoreError::MissingUnlock(UnlockUid::from("u9")))
        );
        assert!(matches!(
            stores.delete_announcement(&AnnouncementId::from("7")),
            Err(StoreError::MissingAnnouncement(_))
        ));
    }

    #[test]
    fn deleting_unlock_forgets_its_hints() {
        let mut stores = PuzzleStores::new();
        stores.apply_hint(hint("h1", "0:10:00", Some("u1")));
        assert_eq!(stores.delete_unlock(&UnlockUid::from("u1")), Ok(Change::Removed));
        assert_eq!(stores.hint_location(&HintUid::from("h1")), None);
        assert_eq!(stores.hint_count(), 0);
    }
}
