//! Outbound collaborators used by the concrete workers.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::email::EmailJob;
use super::notification::NotificationJob;
use crate::config::schema::DispatchConfig;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("endpoint rejected message with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

/// Sends one email message.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, email: &EmailJob) -> Result<Value, DispatchError>;
}

/// Delivers one WhatsApp notification.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn deliver(&self, notification: &NotificationJob) -> Result<Value, DispatchError>;
}

/// POSTs JSON messages to the configured email relay and WhatsApp gateway.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    email_endpoint: String,
    notification_endpoint: String,
}

impl HttpDispatcher {
    pub fn new(config: &DispatchConfig) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            email_endpoint: config.email_endpoint.clone(),
            notification_endpoint: config.notification_endpoint.clone(),
        })
    }

    async fn post<B: Serialize + Sync>(&self, url: &str, body: &B) -> Result<Value, DispatchError> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

#[async_trait]
impl EmailTransport for HttpDispatcher {
    async fn send(&self, email: &EmailJob) -> Result<Value, DispatchError> {
        self.post(&self.email_endpoint, email).await
    }
}

#[async_trait]
impl NotificationGateway for HttpDispatcher {
    async fn deliver(&self, notification: &NotificationJob) -> Result<Value, DispatchError> {
        self.post(&self.notification_endpoint, notification).await
    }
}
