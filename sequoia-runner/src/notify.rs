//! Notification sinks for run summaries and detector batches.
//!
//! Delivery is fire-and-forget from the pipeline's point of view: a failed
//! `notify` is logged by the caller and the run carries on. Delivery is still
//! synchronous, so a slow push endpoint delays the run by at most the client
//! timeout per message.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use sequoia_core::Symbol;

use crate::config::PushConfig;

const PUSH_TIMEOUT: Duration = Duration::from_secs(15);

pub const WXPUSHER_URL: &str = "https://wxpusher.zjiecode.com/api/send/message";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("push request failed: {0}")]
    Http(String),

    #[error("push rejected: {0}")]
    Rejected(String),
}

/// A destination for human-readable run messages.
///
/// `notify` blocks until the sink has answered. Callers only log the result,
/// so message order is the order of the calls.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// Writes every message to the log. The default sink when push is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) -> Result<(), NotifyError> {
        info!("{message}");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WxPusherMessage<'a> {
    app_token: &'a str,
    content: &'a str,
    content_type: u8,
    topic_ids: [u64; 1],
}

#[derive(Debug, Deserialize)]
struct WxPusherResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    msg: String,
}

/// Pushes messages to a WxPusher topic.
pub struct WxPusherNotifier {
    client: reqwest::blocking::Client,
    url: String,
    token: String,
    topic_id: u64,
}

impl WxPusherNotifier {
    pub fn new(token: impl Into<String>, topic_id: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            url: WXPUSHER_URL.to_string(),
            token: token.into(),
            topic_id,
        }
    }

    /// Send to a different endpoint (self-hosted relay, tests).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn body(&self, message: &str) -> Result<String, NotifyError> {
        let body = WxPusherMessage {
            app_token: &self.token,
            content: message,
            content_type: 1,
            topic_ids: [self.topic_id],
        };
        serde_json::to_string(&body).map_err(|e| NotifyError::Http(e.to_string()))
    }
}

impl Notifier for WxPusherNotifier {
    fn notify(&self, message: &str) -> Result<(), NotifyError> {
        info!("{message}");
        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(self.body(message)?)
            .send()
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Http(format!("HTTP {status}")));
        }
        let text = resp.text().map_err(|e| NotifyError::Http(e.to_string()))?;
        parse_response(&text)
    }
}

fn parse_response(text: &str) -> Result<(), NotifyError> {
    let parsed: WxPusherResponse =
        serde_json::from_str(text).map_err(|e| NotifyError::Rejected(format!("bad response: {e}")))?;
    if parsed.success {
        Ok(())
    } else {
        Err(NotifyError::Rejected(parsed.msg))
    }
}

/// The configured sink: WxPusher when push is enabled, the log otherwise.
pub fn from_config(push: &PushConfig) -> Box<dyn Notifier> {
    if push.enable {
        Box::new(WxPusherNotifier::new(push.wxpusher_token.clone(), push.topic_id))
    } else {
        Box::new(LogNotifier)
    }
}

/// One detector's matches as a single message, fenced by its label.
pub fn format_batch(label: &str, matches: &[Symbol]) -> String {
    let fence = format!("**************\"{label}\"**************");
    let mut out = String::with_capacity(fence.len() * 2 + matches.len() * 16);
    out.push_str(&fence);
    out.push('\n');
    for s in matches {
        out.push_str(&s.code);
        if !s.name.is_empty() {
            out.push(' ');
            out.push_str(&s.name);
        }
        out.push('\n');
    }
    out.push_str(&fence);
    out.push('\n');
    out
}
