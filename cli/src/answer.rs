use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, REFERER};
use tracing::debug;
use url::Url;

use hunter2_live_core::{answer_url, interpret_answer_response, AnswerRequest, AnswerResponse, SubmitError};

use crate::live::LiveError;

const CSRF_HEADER: &str = "X-CSRFToken";

/// Credentials a logged-in browser would send with the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAuth {
    /// Raw `Cookie` header, e.g. `sessionid=...`.
    pub cookie: Option<String>,
    pub csrf_token: Option<String>,
}

impl PageAuth {
    /// The CSRF token travels both as cookie and header; the server checks
    /// that they match.
    pub fn cookie_header(&self) -> Option<String> {
        match (&self.cookie, &self.csrf_token) {
            (Some(cookie), Some(token)) if !cookie.contains("csrftoken=") => {
                Some(format!("{cookie}; csrftoken={token}"))
            }
            (Some(cookie), _) => Some(cookie.clone()),
            (None, Some(token)) => Some(format!("csrftoken={token}")),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnswerClient {
    http: reqwest::Client,
    url: Url,
    referer: String,
    auth: PageAuth,
}

impl AnswerClient {
    pub fn new(page_url: &Url, auth: PageAuth) -> Result<Self, LiveError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hunter2-live/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            url: answer_url(page_url)?,
            referer: page_url.to_string(),
            auth,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn submit(&self, request: &AnswerRequest) -> Result<AnswerResponse, SubmitError> {
        let mut builder = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=UTF-8")
            .header(ACCEPT, "application/json")
            .header(REFERER, self.referer.as_str())
            .body(request.form_body());
        if let Some(cookie) = self.auth.cookie_header() {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(token) = &self.auth.csrf_token {
            builder = builder.header(CSRF_HEADER, token.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| SubmitError::Network(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| SubmitError::Network(err.to_string()))?;
        debug!(status, url = %self.url, "answer response");
        interpret_answer_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_header_carries_the_csrf_cookie_once() {
        let mut auth = PageAuth {
            cookie: Some("sessionid=s3ss".to_string()),
            csrf_token: Some("tok".to_string()),
        };
        assert_eq!(auth.cookie_header().as_deref(), Some("sessionid=s3ss; csrftoken=tok"));

        auth.cookie = Some("csrftoken=tok; sessionid=s3ss".to_string());
        assert_eq!(auth.cookie_header().as_deref(), Some("csrftoken=tok; sessionid=s3ss"));

        auth.cookie = None;
        assert_eq!(auth.cookie_header().as_deref(), Some("csrftoken=tok"));
        assert_eq!(PageAuth::default().cookie_header(), None);
    }
}
