use std::cmp::Ordering;
use std::collections::HashMap;

use crate::ids::{HintUid, UnlockUid};
use crate::protocol::HintContent;
use crate::store::{Change, StoreError};
use crate::time::HintTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub uid: HintUid,
    pub time: HintTime,
    pub text: String,
    pub depends_on: Option<UnlockUid>,
}

impl Hint {
    /// Display order: release time, then uid so equal times stay stable.
    pub fn display_order(left: &Hint, right: &Hint) -> Ordering {
        left.time
            .cmp(&right.time)
            .then_with(|| left.uid.cmp(&right.uid))
    }
}

impl From<HintContent> for Hint {
    fn from(content: HintContent) -> Self {
        Self {
            uid: content.hint_uid,
            time: content.time,
            text: content.hint,
            depends_on: content.depends_on_unlock_uid,
        }
    }
}

pub(crate) fn upsert_hint(hints: &mut HashMap<HintUid, Hint>, hint: Hint) -> Change {
    match hints.get_mut(&hint.uid) {
        Some(existing) if *existing == hint => Change::Unchanged,
        Some(existing) => {
            *existing = hint;
            Change::Updated
        }
        None => {
            hints.insert(hint.uid.clone(), hint);
            Change::Inserted
        }
    }
}

pub(crate) fn sorted_hints(hints: &HashMap<HintUid, Hint>) -> Vec<&Hint> {
    let mut sorted: Vec<&Hint> = hints.values().collect();
    sorted.sort_by(|left, right| Hint::display_order(left, right));
    sorted
}

/// Hints that do not depend on any unlock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintStore {
    hints: HashMap<HintUid, Hint>,
}

impl HintStore {
    pub fn upsert(&mut self, hint: Hint) -> Change {
        upsert_hint(&mut self.hints, hint)
    }

    pub fn remove(&mut self, uid: &HintUid) -> Result<Hint, StoreError> {
        self.hints
            .remove(uid)
            .ok_or_else(|| StoreError::MissingHint(uid.clone()))
    }

    pub fn get(&self, uid: &HintUid) -> Option<&Hint> {
        self.hints.get(uid)
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }

    pub fn sorted(&self) -> Vec<&Hint> {
        sorted_hints(&self.hints)
    }
}
