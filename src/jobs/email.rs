//! Email delivery worker.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::dispatch::EmailTransport;
use super::job::{Job, JobResult};
use super::worker::JobProcessor;
use crate::clock::epoch_millis;
use crate::resilience::{CircuitBreaker, Outcome};

/// One address or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    pub fn is_empty(&self) -> bool {
        match self {
            Recipients::One(address) => address.trim().is_empty(),
            Recipients::Many(addresses) => addresses.iter().all(|a| a.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAttachment {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailJob {
    pub to: Recipients,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<EmailAttachment>,
}

impl EmailJob {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: Recipients::One(to.into()),
            subject: subject.into(),
            html: None,
            text: Some(text.into()),
            template: None,
            template_data: None,
            from: None,
            reply_to: None,
            cc: Vec::new(),
            bcc: Vec::new(),
            attachments: Vec::new(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.to.is_empty() {
            return Err("recipient is required".to_string());
        }
        if self.html.is_none() && self.text.is_none() && self.template.is_none() {
            return Err("one of html, text or template is required".to_string());
        }
        Ok(())
    }
}

/// Sends [`EmailJob`]s through the `email` breaker.
pub struct EmailProcessor {
    transport: Arc<dyn EmailTransport>,
    breaker: CircuitBreaker,
}

impl EmailProcessor {
    pub fn new(transport: Arc<dyn EmailTransport>, breaker: CircuitBreaker) -> Self {
        Self { transport, breaker }
    }
}

#[async_trait]
impl JobProcessor for EmailProcessor {
    type Payload = EmailJob;

    async fn process(&self, job: &Job<EmailJob>) -> JobResult {
        let email = &job.payload;
        if let Err(reason) = email.validate() {
            return JobResult::failed(reason);
        }

        tracing::info!(job_id = %job.id, to = ?email.to, "Sending email");
        let transport = Arc::clone(&self.transport);
        match self.breaker.execute(|| async move { transport.send(email).await }).await {
            Ok(Outcome::Completed(_)) => {
                tracing::info!(job_id = %job.id, "Email sent");
                JobResult::ok(json!({
                    "to": email.to,
                    "subject": email.subject,
                    "sentAt": epoch_millis(),
                }))
            }
            Ok(Outcome::Fallback(value)) => {
                JobResult::failed(format!("email delivery deferred by open circuit: {value}"))
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to send email");
                JobResult::failed(e.to_string())
            }
        }
    }
}
