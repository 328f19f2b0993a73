use std::cmp::Ordering;
use std::collections::HashMap;

use crate::ids::{HintUid, UnlockUid};
use crate::store::hint::{sorted_hints, upsert_hint, Hint};
use crate::store::{Change, StoreError};

/// Content revealed by one or more guesses, plus any hints gated behind it.
///
/// An unlock created only to hold a dependent hint has no text yet; it is a
/// placeholder until a `new_unlock`/`old_unlock` or `change_unlock` fills it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unlock {
    pub uid: UnlockUid,
    text: Option<String>,
    guesses: Vec<String>,
    hints: HashMap<HintUid, Hint>,
}

impl Unlock {
    fn placeholder(uid: UnlockUid) -> Self {
        Self {
            uid,
            text: None,
            guesses: Vec::new(),
            hints: HashMap::new(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_placeholder(&self) -> bool {
        self.text.is_none()
    }

    /// Guess texts that revealed this unlock, first-seen order, no repeats.
    pub fn guesses(&self) -> &[String] {
        &self.guesses
    }

    pub fn hints(&self) -> Vec<&Hint> {
        sorted_hints(&self.hints)
    }

    pub fn hint(&self, uid: &HintUid) -> Option<&Hint> {
        self.hints.get(uid)
    }

    pub fn hint_count(&self) -> usize {
        self.hints.len()
    }

    fn display_order(left: &Unlock, right: &Unlock) -> Ordering {
        match (left.text(), right.text()) {
            (Some(l), Some(r)) => l.cmp(r),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| left.uid.cmp(&right.uid))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockStore {
    unlocks: HashMap<UnlockUid, Unlock>,
}

impl UnlockStore {
    fn entry(&mut self, uid: UnlockUid) -> (&mut Unlock, bool) {
        let created = !self.unlocks.contains_key(&uid);
        let unlock = self
            .unlocks
            .entry(uid.clone())
            .or_insert_with(|| Unlock::placeholder(uid));
        (unlock, created)
    }

    /// Records that `guess` revealed the unlock, filling its text.
    pub fn upsert(&mut self, uid: UnlockUid, text: String, guess: String) -> Change {
        let (unlock, created) = self.entry(uid);
        let mut touched = false;
        if unlock.text.as_deref() != Some(text.as_str()) {
            unlock.text = Some(text);
            touched = true;
        }
        if !unlock.guesses.contains(&guess) {
            unlock.guesses.push(guess);
            touched = true;
        }
        match (created, touched) {
            (true, _) => Change::Inserted,
            (false, true) => Change::Updated,
            (false, false) => Change::Unchanged,
        }
    }

    /// Replaces the text only. An unknown uid is created so a later
    /// `new_unlock` finds the edited text already in place.
    pub fn set_text(&mut self, uid: UnlockUid, text: String) -> Change {
        let (unlock, created) = self.entry(uid);
        if created {
            unlock.text = Some(text);
            return Change::Inserted;
        }
        if unlock.text.as_deref() == Some(text.as_str()) {
            return Change::Unchanged;
        }
        unlock.text = Some(text);
        Change::Updated
    }

    pub fn remove(&mut self, uid: &UnlockUid) -> Result<Unlock, StoreError> {
        self.unlocks
            .remove(uid)
            .ok_or_else(|| StoreError::MissingUnlock(uid.clone()))
    }

    /// Drops one guess from the unlock. The unlock itself stays even when
    /// no guesses remain; only `delete_unlock` removes it.
    pub fn remove_guess(&mut self, uid: &UnlockUid, guess: &str) -> Result<Change, StoreError> {
        let unlock = self
            .unlocks
            .get_mut(uid)
            .ok_or_else(|| StoreError::MissingUnlock(uid.clone()))?;
        let idx = unlock
            .guesses
            .iter()
            .position(|known| known == guess)
            .ok_or_else(|| StoreError::MissingUnlockGuess {
                unlock: uid.clone(),
                guess: guess.to_string(),
            })?;
        unlock.guesses.remove(idx);
        Ok(Change::Updated)
    }

    pub(crate) fn upsert_hint(&mut self, unlock_uid: UnlockUid, hint: Hint) -> Change {
        let (unlock, created) = self.entry(unlock_uid);
        let change = upsert_hint(&mut unlock.hints, hint);
        if created {
            Change::Inserted
        } else {
            change
        }
    }

    pub(crate) fn remove_hint(
        &mut self,
        unlock_uid: &UnlockUid,
        hint_uid: &HintUid,
    ) -> Result<Hint, StoreError> {
        self.unlocks
            .get_mut(unlock_uid)
            .and_then(|unlock| unlock.hints.remove(hint_uid))
            .ok_or_else(|| StoreError::MissingUnlockHint {
                unlock: unlock_uid.clone(),
                hint: hint_uid.clone(),
            })
    }

    pub fn get(&self, uid: &UnlockUid) -> Option<&Unlock> {
        self.unlocks.get(uid)
    }

    pub fn len(&self) -> usize {
        self.unlocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unlocks.is_empty()
    }

    /// Unlocks by text, placeholders last.
    pub fn sorted(&self) -> Vec<&Unlock> {
        let mut sorted: Vec<&Unlock> = self.unlocks.values().collect();
        sorted.sort_by(|left, right| Unlock::display_order(left, right));
        sorted
    }
}
