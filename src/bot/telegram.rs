//! Telegram Bot API transport (long polling)

use crate::error::{InsightsError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct GetUpdates<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'a str; 1],
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
}

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    /// `poll_timeout` is the long-poll wait; the HTTP timeout is set above it.
    pub fn new(api_url: &str, token: &str, poll_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()
            .map_err(|e| InsightsError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>> {
        let request = GetUpdates {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &request).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<()> {
        let request = SendMessage {
            chat_id,
            text,
            reply_to_message_id: reply_to,
        };
        let _: Message = self.call("sendMessage", &request).await?;
        Ok(())
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .json(body)
            .send()
            .await
            .map_err(|e| InsightsError::Transport(format!("{} failed: {}", method, e.without_url())))?;

        let status = response.status();
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| InsightsError::Transport(format!("{} returned invalid JSON ({}): {}", method, status, e)))?;

        match (parsed.ok, parsed.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(InsightsError::Transport(format!(
                "{} rejected ({}): {}",
                method,
                status,
                parsed.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }
}
