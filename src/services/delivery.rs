use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::models::job::Requester;
use crate::models::telegram::ApiResponse;

/// Sends progress, errors and finished files back to whoever asked.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn notify_text(&self, to: &Requester, message: &str) -> Result<(), DeliveryError>;

    async fn notify_file(
        &self,
        to: &Requester,
        path: &Path,
        filename: &str,
        caption: &str,
    ) -> Result<(), DeliveryError>;
}

/// Client for the Telegram Bot API.
pub struct TelegramClient {
    http: Client,
    base_url: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
    disable_web_page_preview: bool,
}

#[derive(Serialize)]
struct SetWebhookRequest<'a> {
    url: &'a str,
    allowed_updates: [&'a str; 1],
    drop_pending_updates: bool,
}

impl TelegramClient {
    pub fn new(api_url: &str, bot_token: &str) -> Result<Self, DeliveryError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(DeliveryError::Http)?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), bot_token),
        })
    }

    /// Register `url` as the webhook receiving message updates.
    pub async fn set_webhook(&self, url: &str) -> Result<(), DeliveryError> {
        let body = SetWebhookRequest {
            url,
            allowed_updates: ["message"],
            drop_pending_updates: false,
        };
        let response = self
            .http
            .post(self.method_url("setWebhook"))
            .json(&body)
            .send()
            .await
            .map_err(DeliveryError::Http)?;
        check_response(response).await
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }
}

#[async_trait]
impl DeliverySink for TelegramClient {
    async fn notify_text(&self, to: &Requester, message: &str) -> Result<(), DeliveryError> {
        let body = SendMessageRequest {
            chat_id: to.chat_id,
            text: message,
            reply_to_message_id: to.reply_to,
            disable_web_page_preview: true,
        };
        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(DeliveryError::Http)?;
        check_response(response).await
    }

    async fn notify_file(
        &self,
        to: &Requester,
        path: &Path,
        filename: &str,
        caption: &str,
    ) -> Result<(), DeliveryError> {
        let file = tokio::fs::File::open(path).await.map_err(DeliveryError::Io)?;
        let len = file.metadata().await.map_err(DeliveryError::Io)?.len();

        let video = Part::stream_with_length(Body::from(file), len)
            .file_name(filename.to_string())
            .mime_str("video/mp4")
            .map_err(DeliveryError::Http)?;

        let mut form = Form::new()
            .text("chat_id", to.chat_id.to_string())
            .text("caption", caption.to_string())
            .text("supports_streaming", "true")
            .part("video", video);
        if let Some(reply_to) = to.reply_to {
            form = form.text("reply_to_message_id", reply_to.to_string());
        }

        let response = self
            .http
            .post(self.method_url("sendVideo"))
            .multipart(form)
            .send()
            .await
            .map_err(DeliveryError::Http)?;
        check_response(response).await
    }
}

async fn check_response(response: reqwest::Response) -> Result<(), DeliveryError> {
    let status = response.status();
    let body: ApiResponse = match response.json().await {
        Ok(body) => body,
        Err(e) if status.is_success() => return Err(DeliveryError::Http(e)),
        Err(_) => {
            return Err(DeliveryError::Api {
                description: format!("HTTP {status}"),
            })
        }
    };

    if body.ok {
        Ok(())
    } else {
        Err(DeliveryError::Api {
            description: body
                .description
                .unwrap_or_else(|| format!("HTTP {status}")),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bot API rejected request: {description}")]
    Api { description: String },

    #[error("Failed to read file for upload: {0}")]
    Io(#[from] std::io::Error),
}
