use std::cell::RefCell;
use std::rc::Rc;

use gloo::timers::callback::Timeout;
use js_sys::{Date, Math};
use wasm_bindgen_futures::spawn_local;

use hunter2_live_core::{
    AnswerResponse, ConnectionStatus, PageView, PuzzleSession, SessionUpdate, SubmissionPhase,
    SubmitError, SubmitRejected,
};

use crate::answer::post_answer;
use crate::hooks::PageHooks;
use crate::page_router::{self, PageConfig};
use crate::socket::{LiveSocketAdapter, SocketCallbacks};

struct PageRuntime {
    page: PageConfig,
    session: PuzzleSession,
    socket: LiveSocketAdapter,
    hooks: PageHooks,
    wanted: bool,
    retry_timer: Option<Timeout>,
    cooldown_timer: Option<Timeout>,
    redirect_timer: Option<Timeout>,
}

impl PageRuntime {
    fn new(page: PageConfig) -> Self {
        Self {
            session: PuzzleSession::new(page.sync, now_ms()),
            page,
            socket: LiveSocketAdapter::new(),
            hooks: PageHooks::empty(),
            wanted: false,
            retry_timer: None,
            cooldown_timer: None,
            redirect_timer: None,
        }
    }

    /// Starts the timers an update asks for.
    fn schedule(&mut self, update: &SessionUpdate) {
        if let Some(wait_ms) = update.cooldown_ms {
            let wait_ms = u32::try_from(wait_ms).unwrap_or(u32::MAX);
            self.cooldown_timer = Some(Timeout::new(wait_ms, handle_cooldown_elapsed));
        }
        if let Some(url) = update.solved.as_ref().and_then(|signal| signal.url.clone()) {
            let delay = self.page.sync.solved_redirect_delay_ms;
            self.redirect_timer = Some(Timeout::new(delay, move || page_router::navigate(&url)));
        }
    }

    fn submission_state(&self) -> (SubmissionPhase, u64) {
        let submission = self.session.submission();
        (submission.phase(), submission.cooldown_remaining_ms(now_ms()))
    }
}

struct Dispatch {
    update: SessionUpdate,
    hooks: PageHooks,
    submission: (SubmissionPhase, u64),
}

impl Dispatch {
    fn run(self) {
        let Dispatch {
            update,
            hooks,
            submission,
        } = self;
        for store in update.changed {
            (hooks.on_change)(store);
        }
        for notice in update.notices {
            (hooks.on_notice)(notice);
        }
        if update.submission_changed {
            (hooks.on_submission)(submission.0, submission.1);
        }
        if let Some(signal) = update.solved {
            (hooks.on_solved)(signal);
        }
    }
}

thread_local! {
    static RUNTIME: RefCell<Option<PageRuntime>> = RefCell::new(None);
}

fn now_ms() -> i64 {
    Date::now() as i64
}

fn with_runtime<R>(f: impl FnOnce(&mut PageRuntime) -> R) -> Option<R> {
    RUNTIME.with(|slot| slot.borrow_mut().as_mut().map(f))
}

fn updated(runtime: &mut PageRuntime, update: SessionUpdate) -> Dispatch {
    runtime.schedule(&update);
    Dispatch {
        update,
        hooks: runtime.hooks.clone(),
        submission: runtime.submission_state(),
    }
}

pub(crate) fn install(page: PageConfig) {
    let previous = RUNTIME.with(|slot| slot.borrow_mut().replace(PageRuntime::new(page)));
    if let Some(previous) = previous {
        previous.socket.disconnect();
    }
}

pub(crate) fn set_hooks(update: impl FnOnce(&mut PageHooks)) {
    with_runtime(|runtime| update(&mut runtime.hooks));
}

pub(crate) fn connect() {
    let Some((socket, url, net, hooks)) = with_runtime(|runtime| {
        runtime.wanted = true;
        runtime.retry_timer.take();
        runtime.session.begin_connect();
        (
            runtime.socket.clone(),
            runtime.page.socket_url.to_string(),
            runtime.page.net,
            runtime.hooks.clone(),
        )
    }) else {
        return;
    };
    (hooks.on_status)(ConnectionStatus::Connecting);
    socket.connect(
        &url,
        net,
        SocketCallbacks {
            on_open: Rc::new(handle_open),
            on_text: Rc::new(handle_text),
            on_error: Rc::new(handle_error),
            on_close: Rc::new(handle_close),
        },
    );
}

pub(crate) fn disconnect() {
    let Some(hooks) = with_runtime(|runtime| {
        runtime.wanted = false;
        runtime.retry_timer.take();
        runtime.socket.disconnect();
        runtime.session.on_disconnect();
        runtime.hooks.clone()
    }) else {
        return;
    };
    (hooks.on_status)(ConnectionStatus::Closed);
}

fn handle_open() {
    let Some((socket, requests, hooks)) = with_runtime(|runtime| {
        let requests = runtime.session.on_open();
        (runtime.socket.clone(), requests, runtime.hooks.clone())
    }) else {
        return;
    };
    for request in requests {
        match request.to_json() {
            Ok(text) => socket.send_text(text),
            Err(err) => gloo::console::error!("failed to encode live request", err.to_string()),
        }
    }
    (hooks.on_status)(ConnectionStatus::Open);
}

fn handle_text(text: String) {
    let now = now_ms();
    let dispatch = with_runtime(|runtime| {
        let update = runtime.session.on_message(&text, now);
        updated(runtime, update)
    });
    if let Some(dispatch) = dispatch {
        dispatch.run();
    }
}

fn handle_error(detail: String) {
    gloo::console::warn!("live socket reported an error", detail.clone());
    let reported = with_runtime(|runtime| {
        let notice = runtime.session.on_transport_error(&detail);
        (notice, runtime.hooks.clone())
    });
    if let Some((notice, hooks)) = reported {
        (hooks.on_notice)(notice);
    }
}

fn handle_close() {
    let scheduled = with_runtime(|runtime| {
        if !runtime.wanted {
            return None;
        }
        let delay = runtime.session.on_close(Math::random());
        runtime.retry_timer = Some(Timeout::new(delay, connect));
        Some((delay, runtime.hooks.clone()))
    })
    .flatten();
    let Some((delay, hooks)) = scheduled else {
        return;
    };
    gloo::console::log!("live socket reconnecting in ms", delay);
    (hooks.on_status)(ConnectionStatus::Closed);
}

pub(crate) fn submit(answer: &str) -> Result<(), SubmitRejected> {
    let Some(started) = with_runtime(|runtime| {
        runtime.session.submit(answer).map(|request| {
            (
                request,
                runtime.page.answer_url.to_string(),
                runtime.hooks.clone(),
            )
        })
    }) else {
        return Ok(());
    };
    let (request, url, hooks) = started?;
    (hooks.on_submission)(SubmissionPhase::Submitting, 0);
    spawn_local(async move {
        let result = post_answer(&url, &request, page_router::csrf_token()).await;
        handle_submit_result(result);
    });
    Ok(())
}

fn handle_submit_result(result: Result<AnswerResponse, SubmitError>) {
    let now = now_ms();
    let dispatch = with_runtime(|runtime| {
        let update = runtime.session.on_submit_result(result, now);
        updated(runtime, update)
    });
    if let Some(dispatch) = dispatch {
        dispatch.run();
    }
}

fn handle_cooldown_elapsed() {
    let reopened = with_runtime(|runtime| {
        runtime
            .session
            .on_cooldown_elapsed()
            .then(|| runtime.hooks.clone())
    })
    .flatten();
    if let Some(hooks) = reopened {
        (hooks.on_submission)(SubmissionPhase::Idle, 0);
    }
}

pub(crate) fn view() -> Option<PageView> {
    with_runtime(|runtime| PageView::build(&runtime.session))
}

pub(crate) fn submission_state() -> Option<(SubmissionPhase, u64)> {
    with_runtime(|runtime| runtime.submission_state())
}

pub(crate) fn page_url() -> Option<String> {
    with_runtime(|runtime| runtime.page.page_url.to_string())
}
