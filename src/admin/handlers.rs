use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use super::AdminState;
use crate::jobs::{ManagerError, QueueSizes, WorkerStatus};
use crate::resilience::{BreakerStats, CircuitBreaker, RegistrySummary};

#[derive(Debug)]
pub enum AdminError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AdminError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ManagerError> for AdminError {
    fn from(e: ManagerError) -> Self {
        match e {
            ManagerError::UnknownWorker(_) => AdminError::NotFound(e.to_string()),
            ManagerError::Worker(_) => AdminError::Internal(e.to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub breakers: RegistrySummary,
    pub workers: BTreeMap<String, WorkerStatus>,
}

#[derive(Serialize)]
pub struct BreakersOverview {
    pub breakers: BTreeMap<String, BreakerStats>,
    pub summary: RegistrySummary,
}

#[derive(Serialize)]
pub struct BreakerAction {
    pub action: &'static str,
    pub stats: BreakerStats,
}

#[derive(Serialize)]
pub struct WorkerOverview {
    #[serde(flatten)]
    pub status: WorkerStatus,
    pub queue: QueueSizes,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let summary = state.breakers.summary();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if summary.open > 0 { "degraded" } else { "operational" },
        breakers: summary,
        workers: state.workers.get_status(),
    })
}

pub async fn list_breakers(State(state): State<AdminState>) -> Json<BreakersOverview> {
    Json(BreakersOverview {
        breakers: state.breakers.all_stats(),
        summary: state.breakers.summary(),
    })
}

fn breaker(state: &AdminState, name: &str) -> Result<CircuitBreaker, AdminError> {
    state
        .breakers
        .get(name)
        .ok_or_else(|| AdminError::NotFound(format!("circuit breaker not found: {name}")))
}

pub async fn get_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerStats>, AdminError> {
    Ok(Json(breaker(&state, &name)?.stats()))
}

pub async fn open_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerAction>, AdminError> {
    let breaker = breaker(&state, &name)?;
    breaker.force_open();
    Ok(Json(BreakerAction { action: "open", stats: breaker.stats() }))
}

pub async fn close_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerAction>, AdminError> {
    let breaker = breaker(&state, &name)?;
    breaker.force_close();
    Ok(Json(BreakerAction { action: "close", stats: breaker.stats() }))
}

pub async fn clear_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerAction>, AdminError> {
    let breaker = breaker(&state, &name)?;
    breaker.force_clear();
    Ok(Json(BreakerAction { action: "clear", stats: breaker.stats() }))
}

pub async fn list_workers(State(state): State<AdminState>) -> Json<BTreeMap<String, WorkerOverview>> {
    let mut sizes = state.workers.get_queue_sizes().await;
    let overview = state
        .workers
        .get_status()
        .into_iter()
        .map(|(name, status)| {
            let queue = sizes.remove(&name).unwrap_or_default();
            (name, WorkerOverview { status, queue })
        })
        .collect();
    Json(overview)
}

pub async fn clear_failed_queue(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AdminError> {
    state.workers.clear_failed_queue(&name).await?;
    Ok(Json(json!({ "worker": name, "failedQueue": "cleared" })))
}
