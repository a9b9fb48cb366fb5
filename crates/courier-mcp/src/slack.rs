//! Slack Web API client for the `read_thread` and `send_message` tools.
//!
//! Both operations return structured results instead of errors: a missing
//! credential, a network failure or an `ok: false` reply from Slack all come
//! back as `success: false` with a readable `error` string, so the protocol
//! engine always has a well-formed result to send.
//!
//! `send_message` posts on the caller's behalf. Getting human approval before
//! calling it is the caller's obligation; the server does not enforce it.

use courier_core::config::SlackConfig;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Page size requested from `conversations.replies`. Longer threads are
/// read page by page through `next_cursor`.
const REPLIES_PAGE_SIZE: usize = 200;

/// Errors building the client.
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Author class of a thread message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of a thread, as seen by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub role: Role,
    pub text: String,
}

/// Result of `read_thread`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadReadResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ThreadMessage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ThreadReadResult {
    fn ok(messages: Vec<ThreadMessage>) -> Self {
        Self {
            success: true,
            messages: Some(messages),
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            messages: None,
            error: Some(error.into()),
        }
    }
}

/// Result of `send_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResult {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            channel: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RepliesResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<SlackMessage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
    #[serde(default)]
    error: Option<String>,
}

impl RepliesResponse {
    /// Cursor of the next page, if Slack reports one.
    fn next_cursor(&self) -> Option<&str> {
        self.response_metadata
            .as_ref()
            .map(|meta| meta.next_cursor.as_str())
            .filter(|cursor| self.has_more && !cursor.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct SlackMessage {
    #[serde(default)]
    text: String,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Thin client over the two Web API methods the tools need.
#[derive(Debug, Clone)]
pub struct SlackClient {
    config: SlackConfig,
    client: reqwest::Client,
}

impl SlackClient {
    /// Create a client using the configured base URL and request timeout.
    pub fn new(config: SlackConfig) -> Result<Self, SlackError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { config, client })
    }

    /// Fetch the `limit` most recent replies of a thread, oldest first,
    /// dropping bot status chatter.
    pub async fn read_thread(&self, channel: &str, thread_ts: &str, limit: usize) -> ThreadReadResult {
        let Some(token) = self.config.resolve_token() else {
            return ThreadReadResult::failure(self.missing_token_message());
        };

        tracing::debug!(%channel, %thread_ts, limit, "Fetching Slack thread replies");

        // Replies arrive oldest first; keep the newest `limit` across pages.
        let mut window: VecDeque<SlackMessage> = VecDeque::with_capacity(limit);
        let mut cursor: Option<String> = None;
        let mut pages = 0u32;
        loop {
            let page = self
                .replies_page(&token, channel, thread_ts, cursor.as_deref())
                .await;
            let body = match page {
                Ok(body) => body,
                Err(error) => return ThreadReadResult::failure(error),
            };
            pages += 1;

            if !body.ok {
                let error = body.error.unwrap_or_else(|| "unknown_error".to_string());
                tracing::warn!(%channel, %error, "Slack rejected conversations.replies");
                return ThreadReadResult::failure(error);
            }

            let next = body.next_cursor().map(str::to_string);
            for message in body.messages {
                window.push_back(message);
                if window.len() > limit {
                    window.pop_front();
                }
            }

            match next {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }
        tracing::debug!(%channel, pages, kept = window.len(), "Slack thread read");

        let messages = window
            .into_iter()
            .filter(|m| !self.is_status_message(&m.text))
            .map(|m| ThreadMessage {
                role: if m.bot_id.is_some() || m.subtype.as_deref() == Some("bot_message") {
                    Role::Assistant
                } else {
                    Role::User
                },
                text: m.text,
            })
            .collect();

        ThreadReadResult::ok(messages)
    }

    async fn replies_page(
        &self,
        token: &str,
        channel: &str,
        thread_ts: &str,
        cursor: Option<&str>,
    ) -> Result<RepliesResponse, String> {
        let page_size = REPLIES_PAGE_SIZE.to_string();
        let mut query = vec![
            ("channel", channel),
            ("ts", thread_ts),
            ("limit", page_size.as_str()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        let response = self
            .client
            .get(self.method_url("conversations.replies"))
            .bearer_auth(token)
            .query(&query)
            .send()
            .await;
        decode(response).await
    }

    /// Post `text` to `channel`.
    pub async fn send_message(&self, channel: &str, text: &str) -> SendResult {
        let Some(token) = self.config.resolve_token() else {
            return SendResult::failure(self.missing_token_message());
        };

        tracing::debug!(%channel, "Posting Slack message");

        let response = self
            .client
            .post(self.method_url("chat.postMessage"))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "channel": channel,
                "text": text,
            }))
            .send()
            .await;

        let body: PostMessageResponse = match decode(response).await {
            Ok(body) => body,
            Err(error) => return SendResult::failure(error),
        };

        if body.ok {
            tracing::info!(%channel, "Slack message sent");
            SendResult {
                success: true,
                channel: body.channel.or_else(|| Some(channel.to_string())),
                error: None,
            }
        } else {
            let error = body.error.unwrap_or_else(|| "unknown_error".to_string());
            tracing::warn!(%channel, %error, "Slack rejected chat.postMessage");
            SendResult::failure(error)
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), method)
    }

    fn missing_token_message(&self) -> String {
        format!("{} not configured", self.config.token_env)
    }

    fn is_status_message(&self, text: &str) -> bool {
        let text = text.trim_start();
        self.config
            .status_markers
            .iter()
            .any(|marker| !marker.is_empty() && text.starts_with(marker.as_str()))
    }
}

/// Turn a send outcome into a decoded body or a readable failure cause.
async fn decode<T: serde::de::DeserializeOwned>(
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, String> {
    let response = response.map_err(|e| {
        tracing::warn!(error = %e, "Slack API request failed");
        format!("Slack API request failed: {e}")
    })?;

    let status = response.status();
    match response.json::<T>().await {
        Ok(body) => Ok(body),
        Err(_) if !status.is_success() => Err(format!("Slack API returned HTTP {status}")),
        Err(e) => Err(format!("Invalid Slack API response: {e}")),
    }
}
