#![cfg(target_arch = "wasm32")]

use hunter2_live::PuzzlePage;
use js_sys::Reflect;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn field(view: &JsValue, name: &str) -> JsValue {
    Reflect::get(view, &JsValue::from_str(name)).expect("view is an object")
}

#[wasm_bindgen_test]
fn fresh_page_starts_closed_and_idle() {
    let page = PuzzlePage::new().expect("test runner serves the page over http");
    assert_eq!(page.phase(), "idle");
    assert_eq!(page.cooldown_remaining_ms(), 0.0);

    let view = page.view().expect("view renders");
    assert_eq!(field(&view, "connection").as_string().as_deref(), Some("closed"));
    assert_eq!(field(&view, "submission").as_string().as_deref(), Some("idle"));
    let guesses = js_sys::Array::from(&field(&view, "guesses"));
    assert_eq!(guesses.length(), 0);
}

#[wasm_bindgen_test]
fn blank_answer_is_not_sent() {
    let page = PuzzlePage::new().expect("page handle");
    assert!(!page.submit("   "));
    assert_eq!(page.phase(), "idle");
}
