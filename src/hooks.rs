use std::rc::Rc;

use hunter2_live_core::{ConnectionStatus, Notice, SolvedSignal, StoreKind, SubmissionPhase};

/// Callbacks into the page's renderer.
#[derive(Clone)]
pub(crate) struct PageHooks {
    pub(crate) on_change: Rc<dyn Fn(StoreKind)>,
    pub(crate) on_notice: Rc<dyn Fn(Notice)>,
    pub(crate) on_solved: Rc<dyn Fn(SolvedSignal)>,
    pub(crate) on_status: Rc<dyn Fn(ConnectionStatus)>,
    /// Phase plus the cooldown to animate, zero outside cooldown.
    pub(crate) on_submission: Rc<dyn Fn(SubmissionPhase, u64)>,
}

impl PageHooks {
    pub(crate) fn empty() -> Self {
        Self {
            on_change: Rc::new(|_| {}),
            on_notice: Rc::new(|_| {}),
            on_solved: Rc::new(|_| {}),
            on_status: Rc::new(|_| {}),
            on_submission: Rc::new(|_, _| {}),
        }
    }
}
