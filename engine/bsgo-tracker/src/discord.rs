//! Discord webhook client

use crate::error::{Result, TrackerError};
use crate::fetcher::USER_AGENT;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// File uploaded alongside a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn png(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self { filename: filename.into(), content_type: "image/png".to_string(), data }
    }
}

/// Body of a webhook message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WebhookMessage {
    pub content: String,
    pub attachments: Vec<Attachment>,
}

/// Result of editing an existing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Edited,
    /// The message was deleted or expired
    NotFound,
}

#[async_trait]
pub trait WebhookClient: Send + Sync {
    /// Post a new message and return its id
    async fn create(&self, webhook_url: &str, message: &WebhookMessage) -> Result<String>;

    /// Replace the content and attachments of an existing message
    async fn edit(
        &self,
        webhook_url: &str,
        message_id: &str,
        message: &WebhookMessage,
    ) -> Result<EditOutcome>;
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

/// reqwest-backed Discord webhook client
pub struct DiscordWebhookClient {
    client: Client,
}

impl DiscordWebhookClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TrackerError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Use an already configured HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn form(message: &WebhookMessage, replace_attachments: bool) -> Result<Form> {
        let mut payload = serde_json::json!({ "content": message.content });
        if replace_attachments {
            // an empty list drops the previous files; the new ones are added from the parts below
            payload["attachments"] = serde_json::json!([]);
        }

        let mut form = Form::new().text("payload_json", payload.to_string());
        for (index, attachment) in message.attachments.iter().enumerate() {
            let part = Part::bytes(attachment.data.clone())
                .file_name(attachment.filename.clone())
                .mime_str(&attachment.content_type)
                .map_err(|e| TrackerError::publish(format!("invalid attachment type: {e}")))?;
            form = form.part(format!("files[{index}]"), part);
        }

        Ok(form)
    }
}

#[async_trait]
impl WebhookClient for DiscordWebhookClient {
    async fn create(&self, webhook_url: &str, message: &WebhookMessage) -> Result<String> {
        let url = create_url(webhook_url)?;
        let form = Self::form(message, false)?;

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TrackerError::publish(format!("create request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::publish(format!("create rejected with {status}: {body}")));
        }

        let created: MessageResponse = response
            .json()
            .await
            .map_err(|e| TrackerError::publish(format!("create response has no message id: {e}")))?;

        debug!("Created webhook message {}", created.id);
        Ok(created.id)
    }

    async fn edit(
        &self,
        webhook_url: &str,
        message_id: &str,
        message: &WebhookMessage,
    ) -> Result<EditOutcome> {
        let url = edit_url(webhook_url, message_id)?;
        let form = Self::form(message, true)?;

        let response = self
            .client
            .patch(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TrackerError::publish(format!("edit request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(EditOutcome::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::publish(format!("edit rejected with {status}: {body}")));
        }

        debug!("Edited webhook message {}", message_id);
        Ok(EditOutcome::Edited)
    }
}

/// Webhook URL for creating a message, asking Discord to return the message object
pub fn create_url(webhook_url: &str) -> Result<Url> {
    let mut url = parse_webhook_url(webhook_url)?;
    if !url.query_pairs().any(|(key, _)| key == "wait") {
        url.query_pairs_mut().append_pair("wait", "true");
    }
    Ok(url)
}

/// Webhook URL for editing `message_id`, keeping any query (e.g. `thread_id`)
pub fn edit_url(webhook_url: &str, message_id: &str) -> Result<Url> {
    let mut url = parse_webhook_url(webhook_url)?;
    url.path_segments_mut()
        .map_err(|_| TrackerError::publish(format!("webhook URL cannot take a path: {webhook_url}")))?
        .pop_if_empty()
        .push("messages")
        .push(message_id);
    Ok(url)
}

fn parse_webhook_url(webhook_url: &str) -> Result<Url> {
    Url::parse(webhook_url)
        .map_err(|e| TrackerError::publish(format!("invalid webhook URL '{webhook_url}': {e}")))
}
