//! WhatsApp notification worker.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::dispatch::NotificationGateway;
use super::job::{Job, JobResult};
use super::worker::JobProcessor;
use crate::clock::epoch_millis;
use crate::resilience::{CircuitBreaker, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewLead,
    Proposal,
    VisitReminder,
    VisitConfirmation,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewLead => "new_lead",
            NotificationKind::Proposal => "proposal",
            NotificationKind::VisitReminder => "visit_reminder",
            NotificationKind::VisitConfirmation => "visit_confirmation",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationJob {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl NotificationJob {
    pub fn new(kind: NotificationKind) -> Self {
        Self {
            kind,
            lead_id: None,
            proposal_id: None,
            visit_id: None,
            phone: None,
            message: None,
            metadata: None,
        }
    }

    /// Each kind names the record it is about; reminders are batch sends.
    fn validate(&self) -> Result<(), String> {
        let missing = match self.kind {
            NotificationKind::NewLead if self.lead_id.is_none() => {
                Some("leadId is required for new_lead notification")
            }
            NotificationKind::Proposal if self.proposal_id.is_none() => {
                Some("proposalId is required for proposal notification")
            }
            NotificationKind::VisitConfirmation if self.visit_id.is_none() => {
                Some("visitId is required for visit_confirmation")
            }
            _ => None,
        };
        match missing {
            Some(reason) => Err(reason.to_string()),
            None => Ok(()),
        }
    }
}

/// Delivers [`NotificationJob`]s through the `whatsapp-api` breaker.
pub struct NotificationProcessor {
    gateway: Arc<dyn NotificationGateway>,
    breaker: CircuitBreaker,
}

impl NotificationProcessor {
    pub fn new(gateway: Arc<dyn NotificationGateway>, breaker: CircuitBreaker) -> Self {
        Self { gateway, breaker }
    }
}

#[async_trait]
impl JobProcessor for NotificationProcessor {
    type Payload = NotificationJob;

    async fn process(&self, job: &Job<NotificationJob>) -> JobResult {
        let notification = &job.payload;
        if let Err(reason) = notification.validate() {
            tracing::error!(job_id = %job.id, kind = %notification.kind, error = %reason, "Rejected notification");
            return JobResult::failed(reason);
        }

        tracing::info!(job_id = %job.id, kind = %notification.kind, "Processing notification");
        let gateway = Arc::clone(&self.gateway);
        let delivery = self
            .breaker
            .execute(|| async move { gateway.deliver(notification).await })
            .await;

        match delivery {
            Ok(Outcome::Completed(result)) => JobResult::ok(json!({
                "type": notification.kind,
                "result": result,
                "sentAt": epoch_millis(),
            })),
            Ok(Outcome::Fallback(value)) => JobResult::failed(format!(
                "notification delivery deferred by open circuit: {value}"
            )),
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to send notification");
                JobResult::failed(e.to_string())
            }
        }
    }
}
