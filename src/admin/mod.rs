//! Operator API.
//!
//! Read-only breaker and worker stats plus the few commands operators need
//! during an incident: force a breaker open or closed, clear its counters,
//! and empty a worker's failed queue. Every route sits behind bearer auth.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::jobs::WorkerManager;
use crate::lifecycle::ResilienceContext;
use crate::resilience::CircuitBreakerRegistry;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub breakers: Arc<CircuitBreakerRegistry>,
    pub workers: Arc<WorkerManager>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(context: &ResilienceContext, api_key: &str) -> Self {
        Self {
            breakers: Arc::clone(&context.breakers),
            workers: Arc::clone(&context.workers),
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/breakers", get(list_breakers))
        .route("/admin/breakers/{name}", get(get_breaker))
        .route("/admin/breakers/{name}/open", post(open_breaker))
        .route("/admin/breakers/{name}/close", post(close_breaker))
        .route("/admin/breakers/{name}/clear", post(clear_breaker))
        .route("/admin/workers", get(list_workers))
        .route("/admin/workers/{name}/failed/clear", post(clear_failed_queue))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
