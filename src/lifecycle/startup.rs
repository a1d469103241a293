//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the breaker registry from configuration
//! - Connect the queue store
//! - Wire the concrete workers to their breakers and outbound collaborators
//! - Hand back one explicit context instead of process-wide globals
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Collaborators are injectable so tests run without a network
//! - Workers are built here but only started by `WorkerManager::initialize`

use std::sync::Arc;

use thiserror::Error;

use crate::config::schema::{default_breakers, ResilienceConfig, StoreBackend, StoreConfig};
use crate::jobs::dispatch::{DispatchError, EmailTransport, HttpDispatcher, NotificationGateway};
use crate::jobs::email::EmailProcessor;
use crate::jobs::notification::NotificationProcessor;
use crate::jobs::{Worker, WorkerManager};
use crate::queue::{KvListStore, MemoryStore, StoreError};
use crate::resilience::{CircuitBreaker, CircuitBreakerRegistry};

/// Breaker guarding the email worker's transport.
pub const EMAIL_BREAKER: &str = "email";
/// Breaker guarding the notification worker's gateway.
pub const WHATSAPP_BREAKER: &str = "whatsapp-api";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("queue store: {0}")]
    Store(#[from] StoreError),

    #[error("dispatcher: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("redis backend selected but the `redis` feature is not enabled")]
    RedisUnsupported,
}

/// Everything request handlers and the daemon need, built once at boot.
pub struct ResilienceContext {
    pub breakers: Arc<CircuitBreakerRegistry>,
    pub store: Arc<dyn KvListStore>,
    pub workers: Arc<WorkerManager>,
    pub email: Worker<EmailProcessor>,
    pub notifications: Worker<NotificationProcessor>,
}

/// Builds a [`ResilienceContext`], optionally with injected collaborators.
pub struct ContextBuilder<'a> {
    config: &'a ResilienceConfig,
    store: Option<Arc<dyn KvListStore>>,
    email_transport: Option<Arc<dyn EmailTransport>>,
    notification_gateway: Option<Arc<dyn NotificationGateway>>,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(config: &'a ResilienceConfig) -> Self {
        Self {
            config,
            store: None,
            email_transport: None,
            notification_gateway: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn KvListStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn email_transport(mut self, transport: Arc<dyn EmailTransport>) -> Self {
        self.email_transport = Some(transport);
        self
    }

    pub fn notification_gateway(mut self, gateway: Arc<dyn NotificationGateway>) -> Self {
        self.notification_gateway = Some(gateway);
        self
    }

    pub async fn build(self) -> Result<ResilienceContext, StartupError> {
        let config = self.config;
        let breakers = Arc::new(CircuitBreakerRegistry::from_config(&config.breakers));
        tracing::info!(breakers = breakers.len(), "Circuit breakers registered");

        let store = match self.store {
            Some(store) => store,
            None => connect_store(&config.store).await?,
        };

        let (email_transport, notification_gateway) =
            match (self.email_transport, self.notification_gateway) {
                (Some(email), Some(gateway)) => (email, gateway),
                (email, gateway) => {
                    let http = Arc::new(HttpDispatcher::new(&config.dispatch)?);
                    (
                        email.unwrap_or_else(|| http.clone() as Arc<dyn EmailTransport>),
                        gateway.unwrap_or_else(|| http.clone() as Arc<dyn NotificationGateway>),
                    )
                }
            };

        let email = Worker::new(
            "email",
            config.workers.email.clone(),
            Arc::clone(&store),
            EmailProcessor::new(email_transport, ensure_breaker(&breakers, EMAIL_BREAKER)),
        );
        let notifications = Worker::new(
            "notification",
            config.workers.notification.clone(),
            Arc::clone(&store),
            NotificationProcessor::new(
                notification_gateway,
                ensure_breaker(&breakers, WHATSAPP_BREAKER),
            ),
        );

        let mut workers = WorkerManager::new();
        workers.register(Arc::new(email.clone()));
        workers.register(Arc::new(notifications.clone()));

        Ok(ResilienceContext {
            breakers,
            store,
            workers: Arc::new(workers),
            email,
            notifications,
        })
    }
}

/// Build the context with the configured store and HTTP dispatcher.
pub async fn bootstrap(config: &ResilienceConfig) -> Result<ResilienceContext, StartupError> {
    ContextBuilder::new(config).build().await
}

/// The named breaker, registering the built-in preset when config left it out.
fn ensure_breaker(registry: &CircuitBreakerRegistry, name: &str) -> CircuitBreaker {
    if let Some(breaker) = registry.get(name) {
        return breaker;
    }

    let config = default_breakers().remove(name).unwrap_or_default();
    tracing::warn!(breaker = %name, "Breaker missing from config, using built-in preset");
    let breaker = CircuitBreaker::new(name, config);
    registry.register(breaker.clone());
    breaker
}

async fn connect_store(config: &StoreConfig) -> Result<Arc<dyn KvListStore>, StartupError> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory queue store");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "redis")]
        StoreBackend::Redis => {
            let store = crate::queue::redis::RedisStore::connect(&config.redis_url).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        StoreBackend::Redis => Err(StartupError::RedisUnsupported),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BreakerConfig;

    #[tokio::test]
    async fn test_bootstrap_with_defaults() {
        let context = bootstrap(&ResilienceConfig::default()).await.unwrap();

        assert_eq!(context.breakers.len(), 5);
        assert_eq!(context.workers.names(), vec!["email", "notification"]);
        assert_eq!(context.email.config().concurrency, 10);
        assert_eq!(context.notifications.config().timeout_ms, 60_000);
    }

    #[tokio::test]
    async fn test_missing_worker_breakers_fall_back_to_presets() {
        let mut config = ResilienceConfig::default();
        config.breakers.clear();
        config.breakers.insert("crm".into(), BreakerConfig::default());

        let context = bootstrap(&config).await.unwrap();

        assert_eq!(context.breakers.names(), vec!["crm", "email", "whatsapp-api"]);
        let whatsapp = context.breakers.get(WHATSAPP_BREAKER).unwrap();
        assert_eq!(whatsapp.config().success_threshold, 3);
    }

    #[cfg(not(feature = "redis"))]
    #[tokio::test]
    async fn test_redis_backend_requires_feature() {
        let mut config = ResilienceConfig::default();
        config.store.backend = StoreBackend::Redis;

        assert!(matches!(
            bootstrap(&config).await,
            Err(StartupError::RedisUnsupported)
        ));
    }
}
