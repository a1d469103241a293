//! Circuit breaker for external dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast or get the fallback
//! - Half-Open: trial calls probe whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: reset timeout elapsed (armed timer, or first call after it)
//! Half-Open → Closed: consecutive_successes >= success_threshold
//! Half-Open → Open: first failure
//! ```
//!
//! # Design Decisions
//! - Per-dependency breaker, looked up by name through the registry
//! - Counter block behind one mutex so the threshold comparison never loses updates
//! - The lock is never held across the guarded call
//! - Half-Open does not limit concurrent trial calls
//! - No internal retries; retry policy belongs to the caller or the job worker

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::clock::epoch_millis;
use crate::config::schema::{BreakerConfig, FallbackPolicy};
use crate::observability::metrics;
use crate::resilience::timeouts::{with_timeout, OperationTimeout};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback invoked after every state change with `(name, from, to)`.
pub type StateListener = Arc<dyn Fn(&str, CircuitState, CircuitState) + Send + Sync>;

/// Substitute result produced instead of calling the dependency while open.
///
/// `Err(message)` refuses the call with an operator-facing message.
#[derive(Clone)]
pub struct Fallback(Arc<dyn Fn() -> Result<Value, String> + Send + Sync>);

impl Fallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Result<Value, String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Build the fallback described by a config policy.
    pub fn from_policy(policy: &FallbackPolicy) -> Option<Self> {
        match policy {
            FallbackPolicy::None => None,
            FallbackPolicy::Skip => Some(Self::new(|| Ok(Value::Null))),
            FallbackPolicy::Queued => {
                Some(Self::new(|| Ok(json!({ "queued": true, "success": false }))))
            }
            FallbackPolicy::Unavailable { message } => {
                let message = message.clone();
                Some(Self::new(move || Err(message.clone())))
            }
        }
    }

    fn invoke(&self) -> Result<Value, String> {
        (self.0)()
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Fallback(..)")
    }
}

/// Result of an admitted or degraded call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The guarded operation ran and succeeded.
    Completed(T),
    /// The breaker is open; this is the fallback's substitute value.
    Fallback(Value),
}

impl<T> Outcome<T> {
    /// The operation's value, or `None` for a degraded result.
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Fallback(_) => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback(_))
    }
}

/// Errors surfaced by [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// Rejected while open and no fallback is configured.
    #[error("Circuit breaker [{name}] is OPEN. Failing fast.")]
    Open { name: String },

    /// Rejected while open by a fallback that refuses the call.
    #[error("{message}")]
    Unavailable { name: String, message: String },

    /// The operation exceeded the call timeout (counted as a failure).
    #[error(transparent)]
    Timeout(OperationTimeout),

    /// The operation's own error, unchanged.
    #[error("{0}")]
    Inner(E),
}

impl<E> BreakerError<E> {
    /// True when the dependency must be treated as unavailable.
    pub fn is_rejection(&self) -> bool {
        matches!(self, BreakerError::Open { .. } | BreakerError::Unavailable { .. })
    }
}

/// Point-in-time snapshot of a breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerStats {
    pub name: String,
    pub state: CircuitState,
    pub total_calls: u64,
    pub total_failures: u64,
    pub total_successes: u64,
    pub consecutive_failures: u64,
    pub consecutive_successes: u64,
    /// Epoch millis of the most recent failure.
    pub last_failure_at: Option<u64>,
    /// Epoch millis at which an open breaker admits a trial call.
    pub next_attempt_at: Option<u64>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u64,
    consecutive_successes: u64,
    total_calls: u64,
    total_failures: u64,
    total_successes: u64,
    next_attempt_at: Option<Instant>,
    last_failure_at: Option<u64>,
    reset_timer: Option<JoinHandle<()>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            total_calls: 0,
            total_failures: 0,
            total_successes: 0,
            next_attempt_at: None,
            last_failure_at: None,
            reset_timer: None,
        }
    }

    fn cancel_reset_timer(&mut self) {
        if let Some(timer) = self.reset_timer.take() {
            timer.abort();
        }
    }
}

struct Shared {
    name: String,
    config: BreakerConfig,
    fallback: Option<Fallback>,
    listener: Option<StateListener>,
    inner: Mutex<Inner>,
}

type Transition = (CircuitState, CircuitState);

struct Admission {
    admitted: bool,
    transition: Option<Transition>,
}

/// Builder for a [`CircuitBreaker`].
pub struct CircuitBreakerBuilder {
    name: String,
    config: BreakerConfig,
    fallback: Option<Fallback>,
    listener: Option<StateListener>,
}

impl CircuitBreakerBuilder {
    /// Replace the fallback derived from the config policy.
    pub fn fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Remove any fallback so open-circuit calls fail with [`BreakerError::Open`].
    pub fn without_fallback(mut self) -> Self {
        self.fallback = None;
        self
    }

    pub fn on_state_change<F>(mut self, listener: F) -> Self
    where
        F: Fn(&str, CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn build(self) -> CircuitBreaker {
        CircuitBreaker {
            shared: Arc::new(Shared {
                name: self.name,
                config: self.config,
                fallback: self.fallback,
                listener: self.listener,
                inner: Mutex::new(Inner::new()),
            }),
        }
    }
}

/// A named circuit breaker. Cloning yields another handle to the same breaker.
#[derive(Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("config", &self.shared.config)
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a breaker whose fallback follows `config.fallback`.
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self::builder(name, config).build()
    }

    pub fn builder(name: impl Into<String>, config: BreakerConfig) -> CircuitBreakerBuilder {
        let fallback = Fallback::from_policy(&config.fallback);
        CircuitBreakerBuilder {
            name: name.into(),
            config,
            fallback,
            listener: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.shared.config
    }

    pub fn state(&self) -> CircuitState {
        self.shared.inner.lock().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    pub fn is_half_open(&self) -> bool {
        self.state() == CircuitState::HalfOpen
    }

    /// Run `operation` through the breaker.
    ///
    /// While open (and before the reset timeout) the operation is not
    /// invoked: the fallback's value is returned, or [`BreakerError::Open`]
    /// when none is configured. Failures below the threshold return the
    /// original error unchanged. The call that trips the breaker gets the
    /// fallback when one is configured.
    ///
    /// # Errors
    ///
    /// [`BreakerError::Open`] / [`BreakerError::Unavailable`] on rejection,
    /// [`BreakerError::Timeout`] past the call timeout, and
    /// [`BreakerError::Inner`] for the operation's own error.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<Outcome<T>, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let admission = self.admit();
        if let Some(transition) = admission.transition {
            self.notify(transition);
        }

        if !admission.admitted {
            metrics::record_breaker_call(self.name(), "rejected");
            tracing::warn!(
                breaker = %self.name(),
                state = %CircuitState::Open,
                "Circuit breaker rejected call"
            );
            return self.reject();
        }

        let timeout = self.shared.config.call_timeout();
        match with_timeout("Operation", timeout, operation()).await {
            Ok(Ok(value)) => {
                self.on_success();
                Ok(Outcome::Completed(value))
            }
            Ok(Err(err)) => {
                let opened = self.on_failure(&err.to_string(), "failure");
                self.after_failure(opened, BreakerError::Inner(err))
            }
            Err(elapsed) => {
                let opened = self.on_failure(&elapsed.to_string(), "timeout");
                self.after_failure(opened, BreakerError::Timeout(elapsed))
            }
        }
    }

    /// Snapshot of state, counters and timestamps.
    pub fn stats(&self) -> BreakerStats {
        let inner = self.shared.inner.lock();
        let next_attempt_at = inner.next_attempt_at.map(|at| {
            epoch_millis() + at.saturating_duration_since(Instant::now()).as_millis() as u64
        });

        BreakerStats {
            name: self.shared.name.clone(),
            state: inner.state,
            total_calls: inner.total_calls,
            total_failures: inner.total_failures,
            total_successes: inner.total_successes,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            last_failure_at: inner.last_failure_at,
            next_attempt_at,
        }
    }

    /// Trip the breaker regardless of counters.
    pub fn force_open(&self) {
        let transition = {
            let mut inner = self.shared.inner.lock();
            let transition = self.transition(&mut inner, CircuitState::Open);
            if transition.is_none() {
                self.open_window(&mut inner);
            }
            inner.consecutive_failures = 0;
            inner.consecutive_successes = 0;
            transition
        };
        tracing::warn!(breaker = %self.name(), "Circuit breaker forced OPEN");
        if let Some(transition) = transition {
            self.notify(transition);
        }
    }

    /// Close the breaker regardless of counters.
    pub fn force_close(&self) {
        let transition = {
            let mut inner = self.shared.inner.lock();
            let transition = self.transition(&mut inner, CircuitState::Closed);
            inner.consecutive_failures = 0;
            inner.consecutive_successes = 0;
            inner.next_attempt_at = None;
            inner.cancel_reset_timer();
            transition
        };
        tracing::info!(breaker = %self.name(), "Circuit breaker forced CLOSED");
        if let Some(transition) = transition {
            self.notify(transition);
        }
    }

    /// Zero lifetime and consecutive counters without changing state.
    pub fn force_clear(&self) {
        let mut inner = self.shared.inner.lock();
        inner.total_calls = 0;
        inner.total_failures = 0;
        inner.total_successes = 0;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.last_failure_at = None;
        drop(inner);
        tracing::info!(breaker = %self.name(), "Circuit breaker stats cleared");
    }

    fn admit(&self) -> Admission {
        let mut inner = self.shared.inner.lock();
        inner.total_calls += 1;

        if inner.state != CircuitState::Open {
            return Admission {
                admitted: true,
                transition: None,
            };
        }

        match inner.next_attempt_at {
            Some(at) if Instant::now() < at => Admission {
                admitted: false,
                transition: None,
            },
            _ => Admission {
                admitted: true,
                transition: self.transition(&mut inner, CircuitState::HalfOpen),
            },
        }
    }

    fn reject<T, E>(&self) -> Result<Outcome<T>, BreakerError<E>> {
        match &self.shared.fallback {
            Some(fallback) => {
                tracing::debug!(breaker = %self.name(), "Circuit breaker executing fallback");
                metrics::record_breaker_call(self.name(), "fallback");
                match fallback.invoke() {
                    Ok(value) => Ok(Outcome::Fallback(value)),
                    Err(message) => Err(BreakerError::Unavailable {
                        name: self.shared.name.clone(),
                        message,
                    }),
                }
            }
            None => Err(BreakerError::Open {
                name: self.shared.name.clone(),
            }),
        }
    }

    fn after_failure<T, E>(&self, opened: bool, error: BreakerError<E>) -> Result<Outcome<T>, BreakerError<E>> {
        if opened && self.shared.fallback.is_some() {
            tracing::info!(breaker = %self.name(), "Circuit breaker opened, executing fallback");
            return self.reject();
        }
        Err(error)
    }

    fn on_success(&self) {
        let transition = {
            let mut inner = self.shared.inner.lock();
            inner.total_successes += 1;
            inner.consecutive_successes += 1;
            inner.consecutive_failures = 0;

            if inner.state == CircuitState::HalfOpen
                && inner.consecutive_successes >= u64::from(self.shared.config.success_threshold)
            {
                tracing::info!(
                    breaker = %self.name(),
                    successes = inner.consecutive_successes,
                    "Circuit breaker recovered"
                );
                self.transition(&mut inner, CircuitState::Closed)
            } else {
                None
            }
        };

        metrics::record_breaker_call(self.name(), "success");
        if let Some(transition) = transition {
            self.notify(transition);
        }
    }

    /// Record a failure; returns whether the breaker is open afterwards.
    fn on_failure(&self, error: &str, outcome: &'static str) -> bool {
        let (transition, open) = {
            let mut inner = self.shared.inner.lock();
            inner.total_failures += 1;
            inner.consecutive_failures += 1;
            inner.consecutive_successes = 0;
            inner.last_failure_at = Some(epoch_millis());

            tracing::warn!(
                breaker = %self.name(),
                consecutive_failures = inner.consecutive_failures,
                threshold = self.shared.config.failure_threshold,
                state = %inner.state,
                error = %error,
                "Circuit breaker registered failure"
            );

            let trip = match inner.state {
                CircuitState::HalfOpen => true,
                CircuitState::Closed => {
                    inner.consecutive_failures >= u64::from(self.shared.config.failure_threshold)
                }
                CircuitState::Open => false,
            };

            let transition = if trip {
                tracing::error!(
                    breaker = %self.name(),
                    total_failures = inner.total_failures,
                    consecutive_failures = inner.consecutive_failures,
                    reset_timeout_ms = self.shared.config.reset_timeout_ms,
                    "Circuit breaker OPENED"
                );
                self.transition(&mut inner, CircuitState::Open)
            } else {
                None
            };
            (transition, inner.state == CircuitState::Open)
        };

        metrics::record_breaker_call(self.name(), outcome);
        if let Some(transition) = transition {
            self.notify(transition);
        }
        open
    }

    /// Move to `to`, resetting consecutive counters. Returns `None` if already there.
    fn transition(&self, inner: &mut Inner, to: CircuitState) -> Option<Transition> {
        let from = inner.state;
        if from == to {
            return None;
        }

        inner.state = to;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;

        if to == CircuitState::Open {
            self.open_window(inner);
        } else {
            inner.next_attempt_at = None;
            inner.cancel_reset_timer();
        }

        Some((from, to))
    }

    /// Set `next_attempt_at` and arm the timer that forces Half-Open.
    fn open_window(&self, inner: &mut Inner) {
        let reset_timeout = self.shared.config.reset_timeout();
        inner.next_attempt_at = Some(Instant::now() + reset_timeout);
        inner.cancel_reset_timer();

        // Without a runtime the first call after the window still moves to Half-Open.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        inner.reset_timer = Some(runtime.spawn(async move {
            tokio::time::sleep(reset_timeout).await;
            if let Some(shared) = shared.upgrade() {
                CircuitBreaker { shared }.on_reset_timer();
            }
        }));
    }

    fn on_reset_timer(&self) {
        let transition = {
            let mut inner = self.shared.inner.lock();
            // The running timer is this task; detach instead of aborting it.
            inner.reset_timer.take();

            let due = inner
                .next_attempt_at
                .map_or(true, |at| Instant::now() >= at);
            if inner.state == CircuitState::Open && due {
                tracing::info!(breaker = %self.name(), "Circuit breaker attempting recovery to HALF_OPEN");
                self.transition(&mut inner, CircuitState::HalfOpen)
            } else {
                None
            }
        };

        if let Some(transition) = transition {
            self.notify(transition);
        }
    }

    fn notify(&self, (from, to): Transition) {
        tracing::info!(
            breaker = %self.name(),
            from = %from,
            to = %to,
            "Circuit breaker state changed"
        );
        metrics::record_breaker_state(self.name(), to);
        if let Some(listener) = &self.shared.listener {
            listener(self.name(), from, to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn config(failure_threshold: u32, success_threshold: u32) -> BreakerConfig {
        BreakerConfig {
            failure_threshold,
            success_threshold,
            call_timeout_ms: 100,
            reset_timeout_ms: 1000,
            fallback: FallbackPolicy::None,
        }
    }

    async fn fail(breaker: &CircuitBreaker) -> Result<Outcome<()>, BreakerError<String>> {
        breaker.execute(|| async { Err::<(), _>("boom".to_string()) }).await
    }

    async fn succeed(breaker: &CircuitBreaker) -> Result<Outcome<u32>, BreakerError<String>> {
        breaker.execute(|| async { Ok::<_, String>(1) }).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_state() {
        let breaker = CircuitBreaker::new("crm", config(3, 1));
        let stats = breaker.stats();

        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.total_calls, 0);
        assert_eq!(stats.next_attempt_at, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_failure_propagates_original_error() {
        let mut cfg = config(3, 1);
        cfg.fallback = FallbackPolicy::Queued;
        let breaker = CircuitBreaker::new("email", cfg);

        match fail(&breaker).await {
            Err(BreakerError::Inner(e)) => assert_eq!(e, "boom"),
            other => panic!("expected inner error, got {other:?}"),
        }
        assert!(breaker.is_closed());
        assert_eq!(breaker.stats().consecutive_failures, 1);
        assert!(breaker.stats().last_failure_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tripping_call_receives_fallback() {
        let mut cfg = config(2, 1);
        cfg.fallback = FallbackPolicy::Queued;
        let breaker = CircuitBreaker::new("whatsapp-api", cfg);

        assert!(matches!(fail(&breaker).await, Err(BreakerError::Inner(_))));
        let outcome = fail(&breaker).await.unwrap();

        assert_eq!(outcome, Outcome::Fallback(json!({ "queued": true, "success": false })));
        assert!(breaker.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_fallback_refuses() {
        let mut cfg = config(1, 1);
        cfg.fallback = FallbackPolicy::Unavailable { message: "db down".into() };
        let breaker = CircuitBreaker::new("database", cfg);

        let err = fail(&breaker).await.unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(err.to_string(), "db down");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let breaker = CircuitBreaker::new("external-api", config(1, 1));

        let result = breaker
            .execute(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, String>(())
            })
            .await;

        match result {
            Err(BreakerError::Timeout(t)) => {
                assert_eq!(t.to_string(), "Operation timeout after 100ms")
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(breaker.is_open());
        assert_eq!(breaker.stats().total_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_timer_moves_to_half_open_without_calls() {
        let breaker = CircuitBreaker::new("redis", config(1, 1));
        let _ = fail(&breaker).await;
        assert!(breaker.is_open());
        assert!(breaker.stats().next_attempt_at.is_some());

        tokio::time::sleep(Duration::from_millis(1001)).await;

        assert!(breaker.is_half_open());
        assert_eq!(breaker.stats().next_attempt_at, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_listener_sees_every_transition() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let breaker = CircuitBreaker::builder("crm", config(1, 1))
            .on_state_change(move |name, from, to| {
                assert_eq!(name, "crm");
                sink.lock().push((from, to));
            })
            .build();

        let _ = fail(&breaker).await;
        tokio::time::sleep(Duration::from_millis(1001)).await;
        let _ = succeed(&breaker).await;

        assert_eq!(
            *seen.lock(),
            vec![
                (CircuitState::Closed, CircuitState::Open),
                (CircuitState::Open, CircuitState::HalfOpen),
                (CircuitState::HalfOpen, CircuitState::Closed),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_open_and_close() {
        let breaker = CircuitBreaker::new("crm", config(5, 1));
        let calls = AtomicU32::new(0);

        breaker.force_open();
        let result = breaker
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await;
        assert!(matches!(result, Err(BreakerError::Open { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        breaker.force_close();
        assert!(breaker.is_closed());
        assert_eq!(breaker.stats().next_attempt_at, None);
        assert!(succeed(&breaker).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_clear_keeps_state() {
        let breaker = CircuitBreaker::new("crm", config(2, 1));
        let _ = fail(&breaker).await;
        let _ = fail(&breaker).await;
        assert!(breaker.is_open());

        breaker.force_clear();
        let stats = breaker.stats();

        assert_eq!(stats.state, CircuitState::Open);
        assert_eq!(stats.total_calls, 0);
        assert_eq!(stats.total_failures, 0);
        assert_eq!(stats.total_successes, 0);
        assert_eq!(stats.last_failure_at, None);
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_all_counted() {
        let breaker = CircuitBreaker::new("crm", config(1_000, 1));
        let mut handles = Vec::new();

        for i in 0..50u32 {
            let breaker = breaker.clone();
            handles.push(tokio::spawn(async move {
                breaker
                    .execute(|| async move {
                        if i % 2 == 0 {
                            Ok(i)
                        } else {
                            Err(format!("odd {i}"))
                        }
                    })
                    .await
            }));
        }
        for handle in handles {
            let _ = handle.await.unwrap();
        }

        let stats = breaker.stats();
        assert_eq!(stats.total_calls, 50);
        assert_eq!(stats.total_successes, 25);
        assert_eq!(stats.total_failures, 25);
        assert!(breaker.is_closed());
    }

    #[test]
    fn test_state_serializes_like_operator_api() {
        assert_eq!(serde_json::to_string(&CircuitState::HalfOpen).unwrap(), "\"HALF_OPEN\"");
        assert_eq!(CircuitState::Open.to_string(), "OPEN");
    }
}
