/*!
 * # Health Check Module
 *
 * Unauthenticated probes for the inventory API:
 *
 * - Basic health check (`/health`) - up/down based on a database ping
 * - Liveness check (`/health/live`) - the process is serving requests
 * - Status (`/status`) - version, uptime and database round-trip time
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error};

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

impl HealthStatus {
    fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Up => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Snapshot returned by `/status`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StatusReport {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    /// Database round-trip in milliseconds; absent when the ping failed
    pub database_latency_ms: Option<u128>,
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    pub db_pool: Arc<DatabaseConnection>,
    pub start_time: SystemTime,
}

impl HealthState {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self {
            db_pool,
            start_time: SystemTime::now(),
        }
    }

    /// Calculate system uptime
    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
    }

    async fn database_latency(&self) -> Option<Duration> {
        match crate::db::check_connection(&self.db_pool).await {
            Ok(latency) => Some(latency),
            Err(e) => {
                error!("Database health check failed: {}", e);
                None
            }
        }
    }

    pub async fn report(&self) -> StatusReport {
        let latency = self.database_latency().await;
        StatusReport {
            status: if latency.is_some() {
                HealthStatus::Up
            } else {
                HealthStatus::Down
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            uptime_seconds: self.uptime(),
            database_latency_ms: latency.map(|d| d.as_millis()),
        }
    }
}

/// Basic health check endpoint
pub async fn health_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    debug!("Health check endpoint called");
    let report = state.report().await;

    (
        report.status.status_code(),
        Json(json!({
            "status": report.status,
            "version": report.version,
            "timestamp": report.timestamp,
        })),
    )
}

/// Liveness check endpoint
pub async fn liveness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "alive": true,
            "uptime_seconds": state.uptime(),
            "timestamp": Utc::now(),
        })),
    )
}

/// Detailed status endpoint
pub async fn status(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let report = state.report().await;
    (report.status.status_code(), Json(report))
}

/// Creates router with health check endpoints
pub fn health_routes(db_pool: Arc<DatabaseConnection>) -> Router {
    let health_state = Arc::new(HealthState::new(db_pool));

    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
        .route("/status", get(status))
        .with_state(health_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn status_reports_database_latency() {
        let db = crate::db::establish_connection("sqlite::memory:")
            .await
            .unwrap();
        let app = health_routes(Arc::new(db));

        let response = app
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let report: StatusReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.status, HealthStatus::Up);
        assert!(report.database_latency_ms.is_some());
    }
}
