//! Render-ready view of a session, in display order.

use serde::Serialize;

use crate::session::PuzzleSession;
use crate::store::Hint;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuessView {
    pub uid: String,
    pub by: String,
    pub guess: String,
    pub correct: bool,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HintView {
    pub uid: String,
    pub time: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockView {
    pub uid: String,
    pub text: Option<String>,
    pub guesses: Vec<String>,
    pub hints: Vec<HintView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnouncementView {
    pub id: String,
    pub title: String,
    pub message: String,
    pub css_class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub connection: &'static str,
    pub submission: &'static str,
    pub pending_answer: Option<String>,
    pub guesses: Vec<GuessView>,
    pub unlocks: Vec<UnlockView>,
    pub hints: Vec<HintView>,
    pub announcements: Vec<AnnouncementView>,
}

fn hint_view(hint: &Hint) -> HintView {
    HintView {
        uid: hint.uid.to_string(),
        time: hint.time.to_string(),
        text: hint.text.clone(),
    }
}

impl PageView {
    pub fn build(session: &PuzzleSession) -> Self {
        let stores = session.stores();
        Self {
            connection: session.connection().status().label(),
            submission: session.submission().phase().label(),
            pending_answer: session.submission().pending_answer().map(str::to_string),
            guesses: stores
                .guesses()
                .iter()
                .map(|guess| GuessView {
                    uid: guess.uid.to_string(),
                    by: guess.author.clone(),
                    guess: guess.text.clone(),
                    correct: guess.correct,
                    timestamp: guess.server_time.clone(),
                })
                .collect(),
            unlocks: stores
                .unlocks()
                .sorted()
                .into_iter()
                .map(|unlock| UnlockView {
                    uid: unlock.uid.to_string(),
                    text: unlock.text().map(str::to_string),
                    guesses: unlock.guesses().to_vec(),
                    hints: unlock.hints().into_iter().map(hint_view).collect(),
                })
                .collect(),
            hints: stores.hints().sorted().into_iter().map(hint_view).collect(),
            announcements: stores
                .announcements()
                .iter()
                .map(|announcement| AnnouncementView {
                    id: announcement.id.to_string(),
                    title: announcement.title.clone(),
                    message: announcement.message.clone(),
                    css_class: announcement.css_class.clone(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
