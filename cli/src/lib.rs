pub mod answer;
pub mod live;
pub mod render;

pub use answer::{AnswerClient, PageAuth};
pub use live::{run, LiveCommand, LiveError, LiveEvent, LiveOptions};

pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
