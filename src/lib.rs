//! Browser side of the live puzzle page.
//!
//! `PuzzlePage` is the handle the page script holds. Rendering stays in the
//! page: it registers callbacks, reads [`PuzzlePage::view`] when told a
//! collection changed, and forwards form submissions to [`PuzzlePage::submit`].

mod answer;
mod hooks;
mod page_router;
mod socket;
mod sync_runtime;

use std::rc::Rc;

use js_sys::Function;
use wasm_bindgen::prelude::*;

use hunter2_live_core::{
    ConnectionStatus, Notice, NoticeLevel, SolvedSignal, StoreKind, SubmissionPhase,
};

fn call(function: &Function, args: &[JsValue]) {
    let result = match args {
        [] => function.call0(&JsValue::NULL),
        [a] => function.call1(&JsValue::NULL, a),
        [a, b] => function.call2(&JsValue::NULL, a, b),
        [a, b, c, ..] => function.call3(&JsValue::NULL, a, b, c),
    };
    if let Err(err) = result {
        gloo::console::error!("page callback threw", err);
    }
}

fn notice_level(notice: &Notice) -> &'static str {
    match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    }
}

#[wasm_bindgen]
pub struct PuzzlePage {
    _private: (),
}

#[wasm_bindgen]
impl PuzzlePage {
    /// Reads the page location and prepares, but does not open, the socket.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<PuzzlePage, JsValue> {
        let page = page_router::load_page_config()
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        gloo::console::log!("live puzzle page", page.socket_url.to_string());
        sync_runtime::install(page);
        Ok(PuzzlePage { _private: () })
    }

    pub fn connect(&self) {
        sync_runtime::connect();
    }

    pub fn disconnect(&self) {
        sync_runtime::disconnect();
    }

    /// Returns `false` when the form is closed (in flight, cooling down,
    /// solved, or empty input).
    pub fn submit(&self, answer: &str) -> bool {
        match sync_runtime::submit(answer) {
            Ok(()) => true,
            Err(rejected) => {
                gloo::console::log!("answer not sent", rejected.to_string());
                false
            }
        }
    }

    /// `callback(collection)` with one of `guesses`, `unlocks`, `hints`,
    /// `announcements`.
    pub fn set_on_change(&self, callback: Function) {
        sync_runtime::set_hooks(|hooks| {
            hooks.on_change = Rc::new(move |store: StoreKind| {
                call(&callback, &[JsValue::from_str(store.label())]);
            });
        });
    }

    /// `callback(level, message, detail)`.
    pub fn set_on_notice(&self, callback: Function) {
        sync_runtime::set_hooks(|hooks| {
            hooks.on_notice = Rc::new(move |notice: Notice| {
                let detail = notice
                    .detail
                    .as_deref()
                    .map(JsValue::from_str)
                    .unwrap_or(JsValue::NULL);
                call(
                    &callback,
                    &[
                        JsValue::from_str(notice_level(&notice)),
                        JsValue::from_str(&notice.message),
                        detail,
                    ],
                );
            });
        });
    }

    /// `callback(message, url)`; the page navigates to `url` after a delay.
    pub fn set_on_solved(&self, callback: Function) {
        sync_runtime::set_hooks(|hooks| {
            hooks.on_solved = Rc::new(move |signal: SolvedSignal| {
                let url = signal
                    .url
                    .as_deref()
                    .map(JsValue::from_str)
                    .unwrap_or(JsValue::NULL);
                call(&callback, &[JsValue::from_str(&signal.message()), url]);
            });
        });
    }

    /// `callback(status)` with `connecting`, `open` or `closed`.
    pub fn set_on_status(&self, callback: Function) {
        sync_runtime::set_hooks(|hooks| {
            hooks.on_status = Rc::new(move |status: ConnectionStatus| {
                call(&callback, &[JsValue::from_str(status.label())]);
            });
        });
    }

    /// `callback(phase, cooldown_ms)`.
    pub fn set_on_submission(&self, callback: Function) {
        sync_runtime::set_hooks(|hooks| {
            hooks.on_submission = Rc::new(move |phase: SubmissionPhase, cooldown_ms: u64| {
                call(
                    &callback,
                    &[JsValue::from_str(phase.label()), JsValue::from_f64(cooldown_ms as f64)],
                );
            });
        });
    }

    /// Current state in display order, as a plain JS object.
    pub fn view(&self) -> Result<JsValue, JsValue> {
        let view = sync_runtime::view().ok_or_else(|| JsValue::from_str("page not installed"))?;
        let json = view
            .to_json()
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        js_sys::JSON::parse(&json)
    }

    pub fn phase(&self) -> String {
        sync_runtime::submission_state()
            .map(|(phase, _)| phase.label().to_string())
            .unwrap_or_default()
    }

    pub fn cooldown_remaining_ms(&self) -> f64 {
        sync_runtime::submission_state()
            .map(|(_, remaining)| remaining as f64)
            .unwrap_or(0.0)
    }

    pub fn page_url(&self) -> Option<String> {
        sync_runtime::page_url()
    }
}
