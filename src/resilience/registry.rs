//! Named circuit breaker registry.
//!
//! One process-wide registry owns a breaker per guarded dependency. Lookups
//! hand out clones that share the same state, so every caller of
//! `get("email")` observes the same counters.

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde::Serialize;

use crate::config::schema::BreakerConfig;
use crate::resilience::circuit_breaker::{BreakerStats, CircuitBreaker, CircuitState};

/// Counts of breakers per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySummary {
    pub total: usize,
    pub open: usize,
    pub half_open: usize,
    pub closed: usize,
}

/// Name → breaker map.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, CircuitBreaker>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one breaker per configured entry, fallbacks taken from each policy.
    pub fn from_config(configs: &BTreeMap<String, BreakerConfig>) -> Self {
        let registry = Self::new();
        for (name, config) in configs {
            registry.register(
                CircuitBreaker::builder(name.clone(), config.clone())
                    .on_state_change(|name, from, to| {
                        tracing::warn!(
                            breaker = %name,
                            from = %from,
                            to = %to,
                            "Dependency circuit changed state"
                        );
                    })
                    .build(),
            );
        }
        registry
    }

    /// Register under the breaker's own name, replacing any previous entry.
    pub fn register(&self, breaker: CircuitBreaker) {
        let name = breaker.name().to_string();
        if self.breakers.insert(name.clone(), breaker).is_some() {
            tracing::debug!(breaker = %name, "Replaced registered circuit breaker");
        }
    }

    pub fn get(&self, name: &str) -> Option<CircuitBreaker> {
        self.breakers.get(name).map(|entry| entry.value().clone())
    }

    /// Stats for every breaker, ordered by name.
    pub fn all_stats(&self) -> BTreeMap<String, BreakerStats> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().stats()))
            .collect()
    }

    pub fn summary(&self) -> RegistrySummary {
        self.breakers
            .iter()
            .fold(RegistrySummary::default(), |mut summary, entry| {
                summary.total += 1;
                match entry.value().state() {
                    CircuitState::Open => summary.open += 1,
                    CircuitState::HalfOpen => summary.half_open += 1,
                    CircuitState::Closed => summary.closed += 1,
                }
                summary
            })
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn clear(&self) {
        self.breakers.clear();
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
