//! Text-returning entry points for the conversational agent.
//!
//! The agent only understands strings, so every operation here answers with
//! a message even when the engine or the gateway fails.

use crate::engine::truncate_chars;
use crate::gateway::cache::CacheStats;
use crate::gateway::format::format_result;
use crate::gateway::models::QueryRequest;
use crate::gateway::Gateway;
use tracing::{error, info};

pub async fn query_report(gateway: &Gateway, intent: &str, data_source: &str) -> String {
    info!("Processing BI query: {}", truncate_chars(intent, 60));

    match gateway.submit(&QueryRequest::new(intent, data_source)).await {
        Ok(result) => {
            let report = format_result(&result);
            info!("BI query processed successfully");
            report
        }
        Err(e) => {
            let message = format!("❌ Erro ao processar query BI:\n{}", e);
            error!("{}", message);
            message
        }
    }
}

pub async fn health_report(gateway: &Gateway) -> String {
    describe_health(gateway.health().await).to_string()
}

pub fn describe_health(healthy: bool) -> &'static str {
    if healthy {
        "✅ BI Engine está operacional e pronto para consultas"
    } else {
        "❌ BI Engine indisponível. Tente novamente em alguns momentos."
    }
}

pub async fn stats_report(gateway: &Gateway) -> String {
    format_stats(&gateway.stats().await)
}

pub fn format_stats(stats: &CacheStats) -> String {
    format!(
        "📊 Estatísticas de Cache:\n\
         • Cache Hits: {}\n\
         • Cache Misses: {}\n\
         • Total de Consultas: {}\n\
         • Taxa de Acerto: {:.1}%\n\
         • Queries em Cache: {}",
        stats.hits,
        stats.misses,
        stats.total,
        stats.hit_rate * 100.0,
        stats.cached_entries
    )
}
