use crate::config::EngineConfig;
use crate::engine::models::{
    SqlExecutionRequest, SqlExecutionResponse, SqlGenerationRequest, SqlGenerationResponse,
};
use crate::engine::{truncate_chars, BiEngine, EngineError, Row};
use async_trait::async_trait;
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info};

const MAX_ERROR_BODY_CHARS: usize = 200;

/// HTTP client for the remote BI engine.
///
/// The underlying connection pool is created on first use and can be
/// released explicitly; a released client reconnects on the next call.
pub struct EngineClient {
    base_url: String,
    timeout: Duration,
    model: String,
    client: Mutex<Option<reqwest::Client>>,
}

impl EngineClient {
    pub fn new(base_url: &str, timeout: Duration, model: &str) -> Result<Self, EngineError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(EngineError::Config(
                "Base URL is required for the BI engine".to_string(),
            ));
        }
        if timeout.is_zero() {
            return Err(EngineError::Config(
                "Timeout must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            timeout,
            model: model.to_string(),
            client: Mutex::new(None),
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            &config.model,
        )
    }

    /// Returns the pooled client, building it if this is the first use
    /// since construction or the last `release`.
    pub fn acquire(&self) -> Result<reqwest::Client, EngineError> {
        let mut slot = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        debug!(
            "Opening BI engine connection pool for {} (timeout {:?})",
            self.base_url, self.timeout
        );
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Drops the pooled client. Requests already in flight keep their own
    /// handle and finish normally.
    pub fn release(&self) {
        let mut slot = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.take().is_some() {
            debug!("Released BI engine connection pool for {}", self.base_url);
        }
    }

    #[cfg(test)]
    pub fn is_connected(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, EngineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => truncate_chars(&body, MAX_ERROR_BODY_CHARS).to_string(),
            Err(_) => String::new(),
        };
        Err(EngineError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl BiEngine for EngineClient {
    async fn generate_sql(&self, intent: &str, data_source: &str) -> Result<String, EngineError> {
        let client = self.acquire()?;
        let url = self.endpoint("/mcp/sql");

        let request = SqlGenerationRequest {
            intent,
            db_source: data_source,
            model: &self.model,
        };

        info!("Requesting SQL from BI engine for: {}", truncate_chars(intent, 50));
        let response = client.post(&url).json(&request).send().await?;
        let response = Self::check_status(response).await?;
        let body: SqlGenerationResponse = response.json().await?;

        match body.sql {
            Some(sql) if !sql.trim().is_empty() => {
                info!("SQL generated successfully");
                debug!("Generated SQL: {}", sql);
                Ok(sql)
            }
            _ => Err(EngineError::Malformed(
                "response has no usable sql field".to_string(),
            )),
        }
    }

    async fn execute_sql(&self, sql: &str, data_source: &str) -> Result<Vec<Row>, EngineError> {
        let client = self.acquire()?;
        let url = self.endpoint("/mcp/query");

        let request = SqlExecutionRequest {
            sql,
            db_source: data_source,
        };

        info!("Executing SQL on data source '{}'", data_source);
        let response = client.post(&url).json(&request).send().await?;
        let response = Self::check_status(response).await?;
        let body: SqlExecutionResponse = response.json().await?;

        info!("Query executed, {} rows returned", body.data.len());
        Ok(body.data)
    }

    async fn health(&self) -> bool {
        let client = match self.acquire() {
            Ok(client) => client,
            Err(e) => {
                error!("Health check failed: {}", e);
                return false;
            }
        };

        match client.get(self.endpoint("/health")).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                error!("Health check failed: status {}", response.status());
                false
            }
            Err(e) => {
                error!("Health check failed: {}", EngineError::from(e));
                false
            }
        }
    }

    fn target(&self) -> &str {
        self.base_url()
    }
}

/// Scoped use of a shared [`EngineClient`]: the connection pool is opened
/// when the lease is taken and released when it is dropped, whichever way
/// the holder exits.
pub struct EngineLease {
    client: Arc<EngineClient>,
}

impl EngineLease {
    pub fn new(client: Arc<EngineClient>) -> Result<Self, EngineError> {
        client.acquire()?;
        Ok(Self { client })
    }

    pub fn engine(&self) -> Arc<EngineClient> {
        Arc::clone(&self.client)
    }
}

impl Deref for EngineLease {
    type Target = EngineClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl Drop for EngineLease {
    fn drop(&mut self) {
        self.client.release();
    }
}
