pub mod cache;
pub mod chart;
pub mod flight;
pub mod format;
pub mod models;
pub mod tools;

use crate::config::CacheConfig;
use crate::engine::{truncate_chars, BiEngine};
use std::sync::Arc;
use tracing::{debug, error, info};

use self::cache::{CacheStats, Fingerprint, QueryCache};
use self::chart::ChartSuggestion;
use self::flight::SingleFlight;
use self::models::{QueryRequest, QueryResult};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Não foi possível processar query: {intent}")]
    EmptyResult { intent: String },
}

/// Natural-language query gateway: question -> SQL -> rows, with a result
/// cache in front of the remote engine.
pub struct Gateway {
    engine: Arc<dyn BiEngine>,
    cache: QueryCache,
    flights: SingleFlight,
    cache_enabled: bool,
}

impl Gateway {
    pub fn new(engine: Arc<dyn BiEngine>, config: &CacheConfig) -> Self {
        Self {
            engine,
            cache: QueryCache::new(config.max_entries),
            flights: SingleFlight::new(),
            cache_enabled: config.enabled,
        }
    }

    /// Answers a question or fails with an error naming it.
    pub async fn submit(&self, request: &QueryRequest) -> Result<QueryResult, GatewayError> {
        self.run(&request.intent, &request.data_source, self.cache_enabled)
            .await
            .ok_or_else(|| GatewayError::EmptyResult {
                intent: request.intent.clone(),
            })
    }

    /// Runs the two-stage pipeline. Remote failures are logged and come back
    /// as `None`; nothing is retried and partial results are never cached.
    ///
    /// `use_cache = false` skips the lookup (and counts a miss) but still
    /// stores the fresh result. A disabled cache is never read or written.
    pub async fn run(
        &self,
        intent: &str,
        data_source: &str,
        use_cache: bool,
    ) -> Option<QueryResult> {
        let key = Fingerprint::of(intent, data_source);

        if !use_cache || !self.cache_enabled {
            self.cache.record_miss().await;
            let result = self.execute(intent, data_source).await?;
            if self.cache_enabled {
                self.cache.store(key, result.clone()).await;
            }
            return Some(result);
        }

        let _flight = self.flights.acquire(&key).await;

        if let Some(result) = self.cache.lookup(&key).await {
            info!("Cache HIT for: {}", truncate_chars(intent, 50));
            return Some(result);
        }
        debug!("Cache MISS for: {}", truncate_chars(intent, 50));

        let result = self.execute(intent, data_source).await?;
        self.cache.store(key, result.clone()).await;
        Some(result)
    }

    async fn execute(&self, intent: &str, data_source: &str) -> Option<QueryResult> {
        let short_intent = truncate_chars(intent, 50);

        let sql = match self.engine.generate_sql(intent, data_source).await {
            Ok(sql) => sql,
            Err(e) => {
                error!(
                    "Failed to generate SQL for '{}' via {}: {}",
                    short_intent,
                    self.engine.target(),
                    e
                );
                return None;
            }
        };

        let rows = match self.engine.execute_sql(&sql, data_source).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(
                    "Failed to execute SQL for '{}' via {}: {}",
                    short_intent,
                    self.engine.target(),
                    e
                );
                return None;
            }
        };

        Some(QueryResult {
            generated_sql: sql,
            rows,
            chart_suggestion: ChartSuggestion::for_intent(intent).to_string(),
        })
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        info!("Query cache cleared");
    }

    pub async fn health(&self) -> bool {
        self.engine.health().await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeEngine;
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn cache_config() -> CacheConfig {
        CacheConfig {
            enabled: true,
            max_entries: None,
        }
    }

    fn gateway_with(engine: &Arc<FakeEngine>) -> Gateway {
        Gateway::new(Arc::clone(engine) as Arc<dyn BiEngine>, &cache_config())
    }

    #[tokio::test]
    async fn test_second_submit_is_served_from_cache() {
        let engine = Arc::new(FakeEngine::new("SELECT regiao FROM vendas", 3));
        let gateway = gateway_with(&engine);
        let request = QueryRequest::new("Vendas por região", "sales");

        let first = gateway.submit(&request).await.unwrap();
        let second = gateway.submit(&request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.generate_calls(), 1);
        assert_eq!(engine.execute_calls(), 1);

        let stats = gateway.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.cached_entries, 1);
    }

    #[tokio::test]
    async fn test_result_is_assembled_from_both_stages() {
        let engine = Arc::new(FakeEngine::new("SELECT 1", 2));
        let gateway = gateway_with(&engine);

        let result = gateway
            .run("Evolução das vendas no tempo", "sales", true)
            .await
            .unwrap();

        assert_eq!(result.generated_sql, "SELECT 1");
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.chart_suggestion, ChartSuggestion::Trend.to_string());
    }

    #[tokio::test]
    async fn test_clear_cache_forces_fresh_calls() {
        let engine = Arc::new(FakeEngine::new("SELECT 1", 1));
        let gateway = gateway_with(&engine);
        let request = QueryRequest::new("Lista de produtos", "default");

        gateway.submit(&request).await.unwrap();
        gateway.clear_cache().await;

        let stats = gateway.stats().await;
        assert_eq!(stats.total, 0);
        assert_eq!(stats.cached_entries, 0);

        gateway.submit(&request).await.unwrap();
        assert_eq!(engine.generate_calls(), 2);
        assert_eq!(engine.execute_calls(), 2);
    }

    #[tokio::test]
    async fn test_stage_a_failure_is_absent_and_not_cached() {
        let engine = Arc::new(FakeEngine::new("SELECT 1", 1));
        engine.fail_generate.store(true, Ordering::SeqCst);
        let gateway = gateway_with(&engine);

        assert!(gateway.run("Lista de produtos", "default", true).await.is_none());
        assert_eq!(engine.execute_calls(), 0);
        assert_eq!(gateway.stats().await.cached_entries, 0);

        engine.fail_generate.store(false, Ordering::SeqCst);
        assert!(gateway.run("Lista de produtos", "default", true).await.is_some());
        assert_eq!(engine.generate_calls(), 2);
        assert_eq!(engine.execute_calls(), 1);
    }

    #[tokio::test]
    async fn test_stage_b_failure_discards_sql() {
        let engine = Arc::new(FakeEngine::new("SELECT 1", 1));
        engine.fail_execute.store(true, Ordering::SeqCst);
        let gateway = gateway_with(&engine);

        assert!(gateway.run("Lista de produtos", "default", true).await.is_none());
        assert_eq!(gateway.stats().await.cached_entries, 0);

        engine.fail_execute.store(false, Ordering::SeqCst);
        gateway.run("Lista de produtos", "default", true).await.unwrap();
        assert_eq!(engine.generate_calls(), 2);
    }

    #[tokio::test]
    async fn test_submit_error_carries_intent() {
        let engine = Arc::new(FakeEngine::new("SELECT 1", 1));
        engine.fail_generate.store(true, Ordering::SeqCst);
        let gateway = gateway_with(&engine);

        let err = gateway
            .submit(&QueryRequest::new("Top 5 produtos", "default"))
            .await
            .unwrap_err();

        let GatewayError::EmptyResult { intent } = &err;
        assert_eq!(intent, "Top 5 produtos");
        assert!(err.to_string().contains("Top 5 produtos"));
    }

    #[tokio::test]
    async fn test_bypassing_cache_still_stores() {
        let engine = Arc::new(FakeEngine::new("SELECT 1", 1));
        let gateway = gateway_with(&engine);

        gateway.run("Lista de produtos", "default", false).await.unwrap();
        gateway.run("Lista de produtos", "default", false).await.unwrap();
        assert_eq!(engine.generate_calls(), 2);

        let stats = gateway.stats().await;
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.cached_entries, 1);

        gateway.run("Lista de produtos", "default", true).await.unwrap();
        assert_eq!(engine.generate_calls(), 2);
        let stats = gateway.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.total, 3);
    }

    #[tokio::test]
    async fn test_bypass_counts_miss_even_on_failure() {
        let engine = Arc::new(FakeEngine::new("SELECT 1", 1));
        engine.fail_generate.store(true, Ordering::SeqCst);
        let gateway = gateway_with(&engine);

        assert!(gateway.run("Lista de produtos", "default", false).await.is_none());

        let stats = gateway.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.cached_entries, 0);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_calls_engine() {
        let engine = Arc::new(FakeEngine::new("SELECT 1", 1));
        let gateway = Gateway::new(
            Arc::clone(&engine) as Arc<dyn BiEngine>,
            &CacheConfig {
                enabled: false,
                max_entries: None,
            },
        );
        let request = QueryRequest::new("Lista de produtos", "default");

        gateway.submit(&request).await.unwrap();
        gateway.submit(&request).await.unwrap();
        for i in 0..50 {
            gateway
                .submit(&QueryRequest::new(format!("Produto {i}"), "default"))
                .await
                .unwrap();
        }
        assert_eq!(engine.generate_calls(), 52);

        let stats = gateway.stats().await;
        assert_eq!(stats.cached_entries, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 52);

        // An explicit cached run still never reads or writes a disabled cache
        gateway.run("Lista de produtos", "default", true).await.unwrap();
        assert_eq!(engine.generate_calls(), 53);
        assert_eq!(gateway.stats().await.cached_entries, 0);
    }

    #[tokio::test]
    async fn test_distinct_data_sources_are_distinct_entries() {
        let engine = Arc::new(FakeEngine::new("SELECT 1", 1));
        let gateway = gateway_with(&engine);

        gateway.run("Lista de produtos", "sales", true).await.unwrap();
        gateway.run("Lista de produtos", "crm", true).await.unwrap();

        assert_eq!(engine.generate_calls(), 2);
        assert_eq!(gateway.stats().await.cached_entries, 2);
    }

    #[tokio::test]
    async fn test_concurrent_identical_requests_reach_engine_once() {
        let mut fake = FakeEngine::new("SELECT 1", 1);
        fake.delay = Duration::from_millis(50);
        let engine = Arc::new(fake);
        let gateway = Arc::new(gateway_with(&engine));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gateway = Arc::clone(&gateway);
                tokio::spawn(async move { gateway.run("Vendas por região", "sales", true).await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }

        assert_eq!(engine.generate_calls(), 1);
        let stats = gateway.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 7);
    }

    #[tokio::test]
    async fn test_health_delegates_to_engine() {
        let mut fake = FakeEngine::new("SELECT 1", 0);
        fake.healthy = false;
        let engine = Arc::new(fake);
        let gateway = gateway_with(&engine);
        assert!(!gateway.health().await);
    }
}
