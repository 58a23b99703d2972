use std::sync::Arc;

use dashmap::DashMap;

use crate::breaker::{CircuitBreaker, CircuitBreakerConfig};

/// One breaker per named external service, created lazily on first use.
///
/// The enrichment DAG keeps a registry per `Document` run (or, more
/// commonly, one process-wide registry shared across runs) so that a
/// flaky tag extractor cannot trip the embedding breaker and vice versa.
/// Service names used by the enrichment DAG: `embedding`,
/// `summarization`, `keyword_extraction`, `tag_extraction`,
/// `proposition_extraction`.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    default_config: CircuitBreakerConfig,
}

impl CircuitBreakerRegistry {
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            default_config,
        }
    }

    /// Get the breaker for `service`, creating it with the registry's
    /// default config on first access.
    pub fn get_or_create(&self, service: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(self.default_config)))
            .clone()
    }

    /// Get or create `service`'s breaker with an explicit config, used when
    /// one service needs different thresholds than the registry default.
    pub fn get_or_create_with(
        &self,
        service: &str,
        config: CircuitBreakerConfig,
    ) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(config)))
            .clone()
    }

    /// Snapshot stats for every breaker created so far.
    pub fn all_stats(&self) -> Vec<(String, crate::breaker::BreakerStats)> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().stats()))
            .collect()
    }

    /// Force every known breaker back to `Closed`.
    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CircuitState;

    #[test]
    fn distinct_services_get_distinct_breakers() {
        let registry = CircuitBreakerRegistry::default();
        let embedding = registry.get_or_create("embedding");
        let tags = registry.get_or_create("tag_extraction");

        for _ in 0..5 {
            embedding.record_failure();
        }
        assert_eq!(embedding.current_state(), CircuitState::Open);
        assert_eq!(tags.current_state(), CircuitState::Closed);
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let registry = CircuitBreakerRegistry::default();
        let a = registry.get_or_create("embedding");
        a.record_failure();
        let b = registry.get_or_create("embedding");
        assert_eq!(b.failure_count(), 1);
    }
}
