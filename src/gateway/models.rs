use crate::engine::Row;
use serde::{Deserialize, Serialize};

// A caller's question and the data source it targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub intent: String,
    pub data_source: String,
}

impl QueryRequest {
    pub fn new(intent: impl Into<String>, data_source: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            data_source: data_source.into(),
        }
    }
}

// Outcome of a successful intent -> SQL -> rows run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub generated_sql: String,
    pub rows: Vec<Row>,
    pub chart_suggestion: String,
}
