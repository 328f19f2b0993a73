use std::collections::HashMap;

use crate::ids::GuessUid;
use crate::protocol::GuessContent;
use crate::store::Change;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guess {
    pub uid: GuessUid,
    pub author: String,
    pub text: String,
    pub correct: bool,
    /// Server timestamp as sent; absent on rows recorded from a submission
    /// response before the broadcast arrives.
    pub server_time: Option<String>,
}

impl From<GuessContent> for Guess {
    fn from(content: GuessContent) -> Self {
        Self {
            uid: content.guess_uid,
            author: content.by,
            text: content.guess,
            correct: content.correct,
            server_time: content.timestamp,
        }
    }
}

/// Append-only guess log. A recorded guess is never rewritten, so any
/// re-delivery of the same uid is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuessStore {
    arrived: Vec<Guess>,
    by_uid: HashMap<GuessUid, usize>,
}

impl GuessStore {
    pub fn upsert(&mut self, guess: Guess) -> Change {
        if self.by_uid.contains_key(&guess.uid) {
            return Change::Unchanged;
        }
        self.by_uid.insert(guess.uid.clone(), self.arrived.len());
        self.arrived.push(guess);
        Change::Inserted
    }

    pub fn get(&self, uid: &GuessUid) -> Option<&Guess> {
        self.by_uid.get(uid).and_then(|idx| self.arrived.get(*idx))
    }

    pub fn contains(&self, uid: &GuessUid) -> bool {
        self.by_uid.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.arrived.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrived.is_empty()
    }

    /// Guesses in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Guess> {
        self.arrived.iter()
    }
}
