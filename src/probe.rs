use std::future::Future;
use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{redirect, Client, StatusCode};
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use crate::config::ProbeConfig;
use crate::error::LivePulseError;
use crate::video_id::VideoId;

const CLIENT_USER_AGENT: &str = "Mozilla/5.0 (compatible; YTLiveMonitor/1.0)";
const CLIENT_ACCEPT_LANGUAGE: &str = "zh-TW,zh;q=0.9,en;q=0.8";
const MAX_REDIRECTS: usize = 10;

// Matched against the lower-cased page body
const LIVE_MARKERS: [&str; 3] = ["islivecontent", "\"islive\"", "\"is_live\""];
const UPCOMING_MARKER: &str = "upcoming";
const LIVESTREAM_MARKER: &str = "livestream";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LiveStatus {
    Live,
    Upcoming,
    Off,
}

/// What one look at a watch page told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub is_live: bool,
    pub live_status: Option<LiveStatus>,
    pub note: Option<String>,
}

impl ProbeOutcome {
    fn http_status(code: StatusCode) -> Self {
        ProbeOutcome {
            is_live: false,
            live_status: None,
            note: Some(format!("HTTP {}", code.as_u16())),
        }
    }

    fn status(live_status: LiveStatus) -> Self {
        ProbeOutcome {
            is_live: live_status == LiveStatus::Live,
            live_status: Some(live_status),
            note: None,
        }
    }
}

/// Transport-level failure while fetching a watch page.
///
/// HTTP error statuses are not errors here; they come back as a
/// [`ProbeOutcome`] with a note.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("too many redirects: {0}")]
    Redirect(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl ProbeError {
    pub fn category(&self) -> &'static str {
        match self {
            ProbeError::Timeout(_) => "timeout",
            ProbeError::Connect(_) => "connection error",
            ProbeError::Redirect(_) => "redirect error",
            ProbeError::Body(_) => "body error",
            ProbeError::Request(_) => "request error",
        }
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        let msg = err.to_string();
        if err.is_timeout() {
            ProbeError::Timeout(msg)
        } else if err.is_connect() {
            ProbeError::Connect(msg)
        } else if err.is_redirect() {
            ProbeError::Redirect(msg)
        } else if err.is_body() || err.is_decode() {
            ProbeError::Body(msg)
        } else {
            ProbeError::Request(msg)
        }
    }
}

/// Decides whether a video is live.
pub trait LiveProber: Send + Sync {
    fn probe(&self, id: &VideoId) -> impl Future<Output = Result<ProbeOutcome, ProbeError>> + Send;
}

/// Fetches the public watch page and looks for live markers in its text.
///
/// This is a best-effort heuristic over rendered HTML, not a parse of the
/// player response. False positives and negatives are expected.
pub struct HttpProber {
    client: Client,
    base_url: String,
}

impl HttpProber {
    pub fn new(config: &ProbeConfig) -> Result<Self, LivePulseError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(CLIENT_ACCEPT_LANGUAGE));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| LivePulseError::Error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(HttpProber {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn page_url(&self, id: &VideoId) -> String {
        format!("{}/watch?v={}", self.base_url, id.as_str())
    }
}

impl LiveProber for HttpProber {
    async fn probe(&self, id: &VideoId) -> Result<ProbeOutcome, ProbeError> {
        let url = self.page_url(id);
        debug!("Probing {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Ok(ProbeOutcome::http_status(status));
        }

        let body = response.text().await?;
        let outcome = classify_page(&body);
        if let Some(live_status) = outcome.live_status {
            debug!("{} classified as {}", id, live_status);
        }
        Ok(outcome)
    }
}

/// Classifies a successfully fetched watch page. Live markers win over
/// everything else.
pub(crate) fn classify_page(body: &str) -> ProbeOutcome {
    let text = body.to_lowercase();

    if LIVE_MARKERS.iter().any(|marker| text.contains(marker)) {
        return ProbeOutcome::status(LiveStatus::Live);
    }

    if text.contains(UPCOMING_MARKER) && text.contains(LIVESTREAM_MARKER) {
        return ProbeOutcome::status(LiveStatus::Upcoming);
    }

    ProbeOutcome::status(LiveStatus::Off)
}
