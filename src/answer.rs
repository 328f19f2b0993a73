use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestCredentials, RequestInit, Response};

use hunter2_live_core::{interpret_answer_response, AnswerRequest, AnswerResponse, SubmitError};

fn network(err: JsValue) -> SubmitError {
    SubmitError::Network(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

/// POSTs the answer form the way the page's own form would.
pub(crate) async fn post_answer(
    url: &str,
    request: &AnswerRequest,
    csrf_token: Option<String>,
) -> Result<AnswerResponse, SubmitError> {
    let window = web_sys::window().ok_or_else(|| SubmitError::Network("no window".to_string()))?;

    let headers = Headers::new().map_err(network)?;
    headers
        .set("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8")
        .map_err(network)?;
    headers.set("Accept", "application/json").map_err(network)?;
    if let Some(token) = csrf_token {
        headers.set("X-CSRFToken", &token).map_err(network)?;
    }

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_credentials(RequestCredentials::SameOrigin);
    init.set_headers(&headers);
    init.set_body(&JsValue::from_str(&request.form_body()));
    let fetch_request = Request::new_with_str_and_init(url, &init).map_err(network)?;

    let response: Response = JsFuture::from(window.fetch_with_request(&fetch_request))
        .await
        .map_err(network)?
        .dyn_into()
        .map_err(network)?;
    let status = response.status();
    let body = JsFuture::from(response.text().map_err(network)?)
        .await
        .map_err(network)?
        .as_string()
        .unwrap_or_default();
    interpret_answer_response(status, &body)
}
