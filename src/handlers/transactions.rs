use super::common::{created_response, success_response, validate_input};
use crate::{
    auth::{AuthRouterExt, AuthUser},
    dto::{
        MonthYearParams, TransactionPageResponse, TransactionRequest, TransactionResponse,
        TransactionSearchParams,
    },
    entities::transaction::TransactionStatus,
    errors::ServiceError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};

/// Record a purchase from a supplier
#[utoipa::path(
    post,
    path = "/api/transactions/purchase",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Purchase recorded, stock increased", body = TransactionResponse),
        (status = 400, description = "Invalid request or missing supplier", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product, supplier or user not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub async fn restock_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<TransactionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let recorded = state
        .services
        .transactions
        .restock(user.user_id, payload.into())
        .await?;

    Ok(created_response(TransactionResponse::from(recorded)))
}

/// Record a sale
#[utoipa::path(
    post,
    path = "/api/transactions/sell",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Sale recorded, stock decreased", body = TransactionResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product or user not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub async fn sell(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<TransactionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let recorded = state
        .services
        .transactions
        .sell(user.user_id, payload.into())
        .await?;

    Ok(created_response(TransactionResponse::from(recorded)))
}

/// Record a return to a supplier
#[utoipa::path(
    post,
    path = "/api/transactions/return",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Return recorded as PROCESSING, stock decreased", body = TransactionResponse),
        (status = 400, description = "Invalid request or missing supplier", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product, supplier or user not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub async fn return_to_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<TransactionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let recorded = state
        .services
        .transactions
        .return_to_supplier(user.user_id, payload.into())
        .await?;

    Ok(created_response(TransactionResponse::from(recorded)))
}

/// Page through transactions, newest first
#[utoipa::path(
    get,
    path = "/api/transactions/all",
    params(TransactionSearchParams),
    responses(
        (status = 200, description = "Page of transactions", body = TransactionPageResponse),
        (status = 400, description = "Invalid paging parameters", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<TransactionSearchParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page_size = state.config.clamp_page_size(params.size);
    let page = state
        .services
        .transaction_queries
        .search(params.page.unwrap_or(0), page_size, params.search_text)
        .await?;

    Ok(success_response(page))
}

/// Get a transaction by id
#[utoipa::path(
    get,
    path = "/api/transactions/{id}",
    params(("id" = i32, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction with its product, supplier and user", body = TransactionResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let transaction = state.services.transaction_queries.get_by_id(id).await?;
    Ok(success_response(transaction))
}

/// Transactions created in a calendar month (UTC)
#[utoipa::path(
    get,
    path = "/api/transactions/by-month-year",
    params(MonthYearParams),
    responses(
        (status = 200, description = "Transactions for the month, newest first", body = [TransactionResponse]),
        (status = 400, description = "Month outside 1-12", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub async fn transactions_by_month_year(
    State(state): State<AppState>,
    Query(params): Query<MonthYearParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let transactions = state
        .services
        .transaction_queries
        .by_month_year(params.month, params.year)
        .await?;
    Ok(success_response(transactions))
}

/// Overwrite a transaction's status. Stock is not adjusted.
#[utoipa::path(
    put,
    path = "/api/transactions/update/{id}",
    params(("id" = i32, Path, description = "Transaction id")),
    request_body(content = TransactionStatus, description = "New status as a bare JSON string, e.g. \"CANCELLED\""),
    responses(
        (status = 200, description = "Status updated", body = TransactionResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Unknown status value"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "transactions"
)]
pub async fn update_transaction_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(status): Json<TransactionStatus>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state
        .services
        .transactions
        .update_transaction_status(id, status)
        .await?;
    Ok(success_response(TransactionResponse::from_model(updated)))
}

/// Ledger routes; any authenticated user.
pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions/purchase", post(restock_inventory))
        .route("/transactions/sell", post(sell))
        .route("/transactions/return", post(return_to_supplier))
        .route("/transactions/all", get(list_transactions))
        .route(
            "/transactions/by-month-year",
            get(transactions_by_month_year),
        )
        .route("/transactions/update/:id", put(update_transaction_status))
        .route("/transactions/:id", get(get_transaction))
        .with_auth()
}
