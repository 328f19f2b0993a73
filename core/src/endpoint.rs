//! URLs derived from the puzzle page address.

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported page scheme `{0}`")]
    UnsupportedScheme(String),
    #[error("cannot derive a socket url from {0}")]
    NotSocketBase(String),
}

/// Accepts `http(s)://` as shorthand for `ws(s)://`.
pub fn normalize_ws_base(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else {
        trimmed.to_string()
    }
}

/// Live socket for a puzzle page: same host, `ws`/`wss` by page scheme, and
/// the page path under `/ws`.
pub fn live_socket_url(page: &Url) -> Result<Url, EndpointError> {
    let scheme = match page.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
    };
    let mut socket = page.clone();
    socket
        .set_scheme(scheme)
        .map_err(|_| EndpointError::NotSocketBase(page.to_string()))?;
    socket.set_path(&format!("/ws{}", page.path()));
    socket.set_query(None);
    socket.set_fragment(None);
    Ok(socket)
}

/// Like [`live_socket_url`], but an explicit base (e.g. `ws://127.0.0.1:9000`
/// or `wss://live.example/ws`) replaces scheme, host and path prefix.
pub fn live_socket_url_with_base(page: &Url, ws_base: Option<&str>) -> Result<Url, EndpointError> {
    let Some(base) = ws_base.map(str::trim).filter(|base| !base.is_empty()) else {
        return live_socket_url(page);
    };
    let mut socket = Url::parse(&normalize_ws_base(base))?;
    if !matches!(socket.scheme(), "ws" | "wss") {
        return Err(EndpointError::UnsupportedScheme(socket.scheme().to_string()));
    }
    let prefix = socket.path().trim_end_matches('/').to_string();
    let prefix = if prefix.is_empty() { "/ws" } else { prefix.as_str() };
    socket.set_path(&format!("{prefix}{}", page.path()));
    socket.set_query(None);
    socket.set_fragment(None);
    Ok(socket)
}

/// Answer endpoint, resolved relative to the page the same way a browser
/// resolves the form's `an` action.
pub fn answer_url(page: &Url) -> Result<Url, EndpointError> {
    Ok(page.join("an")?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_url_follows_page_scheme_and_path() {
        let page = Url::parse("https://hunt.example/hunt/ep/1/pz/2/?x=1#top").unwrap();
        assert_eq!(
            live_socket_url(&page).unwrap().as_str(),
            "wss://hunt.example/ws/hunt/ep/1/pz/2/"
        );
        let local = Url::parse("http://localhost:8000/hunt/ep/1/pz/2/").unwrap();
        assert_eq!(
            live_socket_url(&local).unwrap().as_str(),
            "ws://localhost:8000/ws/hunt/ep/1/pz/2/"
        );
    }

    #[test]
    fn explicit_base_replaces_host() {
        let page = Url::parse("https://hunt.example/hunt/ep/1/pz/2/").unwrap();
        let socket = live_socket_url_with_base(&page, Some("http://127.0.0.1:9000")).unwrap();
        assert_eq!(socket.as_str(), "ws://127.0.0.1:9000/ws/hunt/ep/1/pz/2/");
        let prefixed = live_socket_url_with_base(&page, Some("wss://live.example/sock/")).unwrap();
        assert_eq!(prefixed.as_str(), "wss://live.example/sock/hunt/ep/1/pz/2/");
    }

    #[test]
    fn answer_url_is_relative_to_page() {
        let page = Url::parse("https://hunt.example/hunt/ep/1/pz/2/").unwrap();
        assert_eq!(
            answer_url(&page).unwrap().as_str(),
            "https://hunt.example/hunt/ep/1/pz/2/an"
        );
    }

    #[test]
    fn rejects_non_http_pages() {
        let page = Url::parse("file:///tmp/puzzle.html").unwrap();
        assert_eq!(
            live_socket_url(&page),
            Err(EndpointError::UnsupportedScheme("file".to_string()))
        );
    }
}
