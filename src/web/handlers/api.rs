use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::engine::Row;
use crate::gateway::cache::CacheStats;
use crate::gateway::models::{QueryRequest, QueryResult};
use crate::gateway::tools;
use crate::web::error::ApiError;
use crate::web::state::AppState;

// Query types

#[derive(Debug, Deserialize, Clone)]
pub struct BiRequest {
    pub message: String,
    #[serde(default)]
    pub db_source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BiResponse {
    pub sql: String,
    pub result: Vec<Row>,
    pub chart_prompt: String,
}

impl From<QueryResult> for BiResponse {
    fn from(result: QueryResult) -> Self {
        Self {
            sql: result.generated_sql,
            result: result.rows,
            chart_prompt: result.chart_suggestion,
        }
    }
}

// Status types

#[derive(Debug, Serialize)]
pub struct EngineHealth {
    pub healthy: bool,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: i64,
}

fn to_query_request(state: &AppState, payload: BiRequest) -> Result<QueryRequest, ApiError> {
    let intent = payload.message.trim();
    if intent.is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let data_source = payload
        .db_source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| state.default_data_source());

    Ok(QueryRequest::new(intent, data_source))
}

// API Implementations

// Natural-language BI query
pub async fn bi_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BiRequest>,
) -> Result<Json<BiResponse>, ApiError> {
    let request = to_query_request(&state, payload)?;
    debug!("BI query on '{}': {}", request.data_source, request.intent);

    let result = state.gateway.submit(&request).await?;
    info!("BI query answered with {} rows", result.rows.len());

    Ok(Json(result.into()))
}

// Same query, rendered as the markdown report the agent shows
pub async fn tool_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BiRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request = to_query_request(&state, payload)?;
    let report = tools::query_report(&state.gateway, &request.intent, &request.data_source).await;

    Ok(markdown(report))
}

pub async fn tool_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    markdown(tools::health_report(&state.gateway).await)
}

pub async fn tool_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    markdown(tools::stats_report(&state.gateway).await)
}

fn markdown(text: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], text)
}

pub async fn engine_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let healthy = state.gateway.health().await;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(EngineHealth { healthy }))
}

pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.gateway.stats().await)
}

pub async fn clear_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    state.gateway.clear_cache().await;
    StatusCode::NO_CONTENT
}

// System status
pub async fn service_status(State(state): State<Arc<AppState>>) -> Json<ServiceStatus> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds();

    Json(ServiceStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
    })
}
