use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{error::DbErr, SqlErr, TransactionError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Not Found",
    "message": "Not found: Product 9999 not found",
    "request_id": "0b6f1a52-7c1e-4f0e-9a51-3f1d2c9e8a10",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// Canonical reason phrase of the HTTP status
    #[schema(example = "Not Found")]
    pub error: String,
    #[schema(example = "Not found: Product 9999 not found")]
    pub message: String,
    /// Echo of the `x-request-id` header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339
    pub timestamp: String,
}

/// Failure of any ledger, catalog or account operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Uniqueness clash, or a delete blocked by rows that still reference the target
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Password hashing failed: {0}")]
    HashError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

/// Errors raised inside `db.transaction(..)` closures come back out unchanged.
impl From<TransactionError<ServiceError>> for ServiceError {
    fn from(err: TransactionError<ServiceError>) -> Self {
        match err {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(service_err) => service_err,
        }
    }
}

/// Anything that can stand in for a [`DbErr`]; strings become `DbErr::Custom`.
pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_owned())
    }
}

impl ServiceError {
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", entity, id))
    }

    /// Maps unique and foreign key violations to `Conflict`; anything else
    /// stays a database error.
    pub fn from_write(error: DbErr, conflict_message: impl Into<String>) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_))
            | Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                ServiceError::Conflict(conflict_message.into())
            }
            _ => ServiceError::DatabaseError(error),
        }
    }

    /// The only place errors are mapped to HTTP statuses.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_)
            | Self::HashError(_)
            | Self::MigrationError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Server-side failures are reduced to a generic
    /// line; the full error only goes to the log.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::HashError(_) | Self::MigrationError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_owned()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn error_body_carries_the_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-404"), async {
                ServiceError::not_found("Product", 9999).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-404"));
        assert_eq!(payload.error, "Not Found");
        assert_eq!(payload.message, "Not found: Product 9999 not found");
    }

    #[test]
    fn every_kind_maps_to_its_status() {
        let cases = [
            (ServiceError::not_found("Product", 1), StatusCode::NOT_FOUND),
            (
                ServiceError::ValidationError("qty".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Unauthorized("token".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (ServiceError::Forbidden("role".into()), StatusCode::FORBIDDEN),
            (ServiceError::Conflict("sku".into()), StatusCode::CONFLICT),
            (
                ServiceError::db_error("disk full"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceError::HashError("salt".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.status_code(), status, "{}", error);
        }
    }

    #[test]
    fn server_side_details_are_masked() {
        assert_eq!(
            ServiceError::HashError("salt".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::db_error("connection reset by peer").response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::Conflict("SKU 'W-1' already exists".into()).response_message(),
            "Conflict: SKU 'W-1' already exists"
        );
    }

    #[test]
    fn non_constraint_write_errors_stay_database_errors() {
        let err = ServiceError::from_write(DbErr::Custom("timeout".into()), "dup");
        assert!(matches!(err, ServiceError::DatabaseError(_)));
    }

    #[test]
    fn transaction_error_unwraps_inner_service_error() {
        let err: ServiceError =
            TransactionError::Transaction(ServiceError::ValidationError("qty".into())).into();
        assert!(matches!(err, ServiceError::ValidationError(_)));

        let err: ServiceError =
            TransactionError::<ServiceError>::Connection(DbErr::Custom("gone".into())).into();
        assert!(matches!(err, ServiceError::DatabaseError(_)));
    }
}
