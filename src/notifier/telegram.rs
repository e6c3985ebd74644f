use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::{Notifier, NotifyError, RetryPolicy};
use crate::config::TelegramConfig;
use crate::errors::Result;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Telegram Bot API `sendMessage` transport.
pub struct TelegramNotifier {
    http: reqwest::Client,
    endpoint: Url,
    chat_id: String,
    policy: RetryPolicy,
}

impl TelegramNotifier {
    pub fn new(http: reqwest::Client, config: &TelegramConfig, policy: RetryPolicy) -> Result<Self> {
        let mut base = Url::parse(&config.api_url)?;
        // Keep any path prefix (e.g. a proxy mount) when joining below.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        // Tokens contain ':', so without "./" the segment parses as a scheme.
        let endpoint = base.join(&format!("./bot{}/sendMessage", config.bot_token))?;
        Ok(Self {
            http,
            endpoint,
            chat_id: config.chat_id.clone(),
            policy,
        })
    }

    /// Exactly one outbound request.
    async fn send_once(&self, text: &str) -> std::result::Result<(), NotifyError> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            // reqwest errors embed the URL, which carries the bot token.
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        if status.is_success() {
            debug!(%status, "[NOTIFY] delivered");
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify_failure(status, body))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> std::result::Result<(), NotifyError> {
        self.policy.run(|| self.send_once(message)).await
    }
}

fn classify_failure(status: StatusCode, body: String) -> NotifyError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        NotifyError::RateLimited
    } else {
        NotifyError::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}
