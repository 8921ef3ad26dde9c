pub mod client;
pub mod models;

use async_trait::async_trait;

pub use models::Row;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("BI engine timed out: {url}")]
    Timeout { url: String },
    #[error("BI engine responded with status code: {status} - Response body: {body}")]
    Status { status: u16, body: String },
    #[error("BI engine response error: {0}")]
    Malformed(String),
    #[error("BI engine connection error: {0}")]
    Transport(String),
    #[error("BI engine configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        if err.is_timeout() {
            EngineError::Timeout { url }
        } else if err.is_decode() {
            EngineError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            EngineError::Status {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            EngineError::Transport(err.to_string())
        }
    }
}

/// The remote BI engine: one endpoint turns an intent into SQL, another runs it.
#[async_trait]
pub trait BiEngine: Send + Sync {
    async fn generate_sql(&self, intent: &str, data_source: &str) -> Result<String, EngineError>;

    async fn execute_sql(&self, sql: &str, data_source: &str) -> Result<Vec<Row>, EngineError>;

    /// Never fails; any problem reaching the engine reports unhealthy.
    async fn health(&self) -> bool;

    /// Address used in diagnostics.
    fn target(&self) -> &str;
}

/// Shortens user text for log lines without splitting a character.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("Evolução das vendas", 7), "Evoluçã");
        assert_eq!(truncate_chars("curto", 50), "curto");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::Timeout {
            url: "http://localhost:8081/mcp/sql".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "BI engine timed out: http://localhost:8081/mcp/sql"
        );

        let err = EngineError::Status {
            status: 503,
            body: "down".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("down"));

        let err = EngineError::Malformed("missing sql".to_string());
        assert_eq!(err.to_string(), "BI engine response error: missing sql");
    }
}
