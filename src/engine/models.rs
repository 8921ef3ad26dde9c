use serde::{Deserialize, Serialize};

// One result row: column name -> value, in the column order the engine returned
pub type Row = serde_json::Map<String, serde_json::Value>;

// Body for POST /mcp/sql
#[derive(Debug, Serialize)]
pub struct SqlGenerationRequest<'a> {
    pub intent: &'a str,
    pub db_source: &'a str,
    pub model: &'a str,
}

// Response from POST /mcp/sql
#[derive(Debug, Deserialize)]
pub struct SqlGenerationResponse {
    #[serde(default)]
    pub sql: Option<String>,
}

// Body for POST /mcp/query
#[derive(Debug, Serialize)]
pub struct SqlExecutionRequest<'a> {
    pub sql: &'a str,
    pub db_source: &'a str,
}

// Response from POST /mcp/query; a body without `data` (including `{}`) means zero rows
#[derive(Debug, Deserialize)]
pub struct SqlExecutionResponse {
    #[serde(default)]
    pub data: Vec<Row>,
}
