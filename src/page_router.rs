use thiserror::Error;
use url::Url;

use hunter2_live_core::{answer_url, live_socket_url_with_base, EndpointError, NetDelayConfig, SyncConfig};

const WS_BASE_KEY: &str = "hunter2.live.ws_base";
const SKEW_THRESHOLD_KEY: &str = "hunter2.live.skew_threshold_ms";
const WS_DELAY_IN_KEY: &str = "hunter2.debug.ws_in_ms";
const WS_DELAY_OUT_KEY: &str = "hunter2.debug.ws_out_ms";
const WS_DELAY_JITTER_KEY: &str = "hunter2.debug.ws_jitter_ms";
const CSRF_COOKIE: &str = "csrftoken";

#[derive(Clone, Debug)]
pub(crate) struct PageConfig {
    pub(crate) page_url: Url,
    pub(crate) socket_url: Url,
    pub(crate) answer_url: Url,
    pub(crate) sync: SyncConfig,
    pub(crate) net: NetDelayConfig,
}

#[derive(Debug, Error)]
pub(crate) enum PageConfigError {
    #[error("no window available")]
    NoWindow,
    #[error("page location is unreadable")]
    Location,
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

impl From<url::ParseError> for PageConfigError {
    fn from(err: url::ParseError) -> Self {
        PageConfigError::Endpoint(EndpointError::InvalidUrl(err))
    }
}

pub(crate) fn load_page_config() -> Result<PageConfig, PageConfigError> {
    let window = web_sys::window().ok_or(PageConfigError::NoWindow)?;
    let href = window.location().href().map_err(|_| PageConfigError::Location)?;
    let page_url = Url::parse(&href)?;
    let ws_base = default_ws_base();
    let socket_url = live_socket_url_with_base(&page_url, ws_base.as_deref())?;
    let answer_url = answer_url(&page_url)?;

    let mut sync = SyncConfig::default();
    if let Some(threshold) = read_storage_u32(SKEW_THRESHOLD_KEY) {
        sync.clock_skew_threshold_ms = u64::from(threshold);
    }

    Ok(PageConfig {
        page_url,
        socket_url,
        answer_url,
        sync,
        net: load_ws_delay_config(),
    })
}

/// Build-time override first, then a per-browser one from localStorage.
fn default_ws_base() -> Option<String> {
    if let Some(raw) = option_env!("HUNTER2_LIVE_WS_BASE") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    read_storage_string(WS_BASE_KEY)
}

fn read_storage_string(key: &str) -> Option<String> {
    let window = web_sys::window()?;
    let storage = window.local_storage().ok()??;
    let raw = storage.get_item(key).ok()??;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

fn read_storage_u32(key: &str) -> Option<u32> {
    read_storage_string(key)?.parse::<u32>().ok()
}

fn load_ws_delay_config() -> NetDelayConfig {
    NetDelayConfig {
        inbound_ms: read_storage_u32(WS_DELAY_IN_KEY).unwrap_or(0),
        outbound_ms: read_storage_u32(WS_DELAY_OUT_KEY).unwrap_or(0),
        jitter_ms: read_storage_u32(WS_DELAY_JITTER_KEY).unwrap_or(0),
    }
}

pub(crate) fn csrf_token() -> Option<String> {
    let document = web_sys::window()?.document()?;
    let cookies = js_sys::Reflect::get(&document, &"cookie".into()).ok()?.as_string()?;
    cookie_value(&cookies, CSRF_COOKIE)
}

fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name).then(|| value.trim().to_string())
    })
}

pub(crate) fn navigate(url: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if window.location().set_href(url).is_err() {
        gloo::console::warn!("failed to navigate", url);
    }
}

#[cfg(test)]
mod tests {
    use super::{cookie_value, PageConfigError};
    use hunter2_live_core::EndpointError;
    use url::Url;

    #[test]
    fn finds_cookie_among_others() {
        let cookies = "sessionid=abc; csrftoken=tok123 ; theme=dark";
        assert_eq!(cookie_value(cookies, "csrftoken").as_deref(), Some("tok123"));
        assert_eq!(cookie_value(cookies, "missing"), None);
    }

    #[test]
    fn config_errors_read_like_their_cause() {
        let err = PageConfigError::from(EndpointError::UnsupportedScheme("file".to_string()));
        assert_eq!(err.to_string(), "unsupported page scheme `file`");

        let parse = Url::parse("not a url").unwrap_err();
        let err = PageConfigError::from(parse);
        assert_eq!(err.to_string(), format!("invalid url: {parse}"));
        assert_eq!(PageConfigError::NoWindow.to_string(), "no window available");
    }
}
