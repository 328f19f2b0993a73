//! Applies decoded server events to the stores.

use thiserror::Error;
use tracing::debug;

use crate::protocol::{EventKind, InboundEvent, ServerEvent};
use crate::store::{Announcement, Change, Guess, Hint, PuzzleStores, StoreError, StoreKind};
use crate::submission::SolvedSignal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub kind: EventKind,
    pub store: Option<StoreKind>,
    pub change: Change,
    /// Set when a live broadcast says a teammate solved the puzzle.
    pub solved: Option<SolvedSignal>,
}

impl Routed {
    fn applied(kind: EventKind, store: StoreKind, change: Change) -> Self {
        Self {
            kind,
            store: Some(store),
            change,
            solved: None,
        }
    }

    pub fn changed_store(&self) -> Option<StoreKind> {
        self.store.filter(|_| self.change.is_visible())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("server reported an error: {0}")]
    Server(String),
}

/// Hints that depend on an unlock render inside it, so their changes are
/// reported against the unlock list.
fn hint_store(depends_on: bool) -> StoreKind {
    if depends_on {
        StoreKind::Unlocks
    } else {
        StoreKind::Hints
    }
}

pub fn route(stores: &mut PuzzleStores, inbound: InboundEvent) -> Result<Routed, RouteError> {
    let kind = inbound.kind;
    let routed = match inbound.event {
        ServerEvent::Announcement(content) => {
            let change = stores.apply_announcement(Announcement::from(content));
            Routed::applied(kind, StoreKind::Announcements, change)
        }
        ServerEvent::DeleteAnnouncement(target) => {
            let change = stores.delete_announcement(&target.announcement_id)?;
            Routed::applied(kind, StoreKind::Announcements, change)
        }
        ServerEvent::Guess(content) => {
            let solved = (kind == EventKind::NewGuess && content.correct).then(|| SolvedSignal {
                url: content.redirect.clone(),
                text: None,
            });
            let change = stores.apply_guess(Guess::from(content));
            Routed {
                solved,
                ..Routed::applied(kind, StoreKind::Guesses, change)
            }
        }
        ServerEvent::Unlock(content) => {
            let change = stores.apply_unlock(content.unlock_uid, content.unlock, content.guess);
            Routed::applied(kind, StoreKind::Unlocks, change)
        }
        ServerEvent::ChangeUnlock(content) => {
            let change = stores.change_unlock(content.unlock_uid, content.unlock);
            Routed::applied(kind, StoreKind::Unlocks, change)
        }
        ServerEvent::DeleteUnlock(target) => {
            let change = stores.delete_unlock(&target.unlock_uid)?;
            Routed::applied(kind, StoreKind::Unlocks, change)
        }
        ServerEvent::DeleteUnlockGuess(target) => {
            let change = stores.delete_unlock_guess(&target.unlock_uid, &target.guess)?;
            Routed::applied(kind, StoreKind::Unlocks, change)
        }
        ServerEvent::Hint(content) => {
            let hint = Hint::from(content);
            let previous = stores
                .hint_location(&hint.uid)
                .map(|location| location.is_some());
            let store = hint_store(hint.depends_on.is_some() || previous == Some(true));
            let change = stores.apply_hint(hint);
            Routed::applied(kind, store, change)
        }
        ServerEvent::DeleteHint(target) => {
            let store = hint_store(target.depends_on_unlock_uid.is_some());
            let change =
                stores.delete_hint(&target.hint_uid, target.depends_on_unlock_uid.as_ref())?;
            Routed::applied(kind, store, change)
        }
        ServerEvent::Error(content) => return Err(RouteError::Server(content.error)),
    };
    debug!(
        kind = %routed.kind,
        change = ?routed.change,
        "applied server event"
    );
    Ok(routed)
}
