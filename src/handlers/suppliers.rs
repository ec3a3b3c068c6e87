use super::common::{created_response, message_response, success_response, validate_input};
use crate::{
    auth::AuthRouterExt,
    dto::{SupplierRequest, SupplierResponse},
    errors::ServiceError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};

/// Create a new supplier
#[utoipa::path(
    post,
    path = "/api/suppliers/add",
    request_body = SupplierRequest,
    responses(
        (status = 201, description = "Supplier created", body = SupplierResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(payload): Json<SupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let supplier = state.services.suppliers.create(payload).await?;
    Ok(created_response(supplier))
}

#[utoipa::path(
    get,
    path = "/api/suppliers/all",
    responses(
        (status = 200, description = "Suppliers, newest first", body = [SupplierResponse]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let suppliers = state.services.suppliers.list().await?;
    Ok(success_response(suppliers))
}

/// Get a supplier by ID
#[utoipa::path(
    get,
    path = "/api/suppliers/{id}",
    params(("id" = i32, Path, description = "Supplier id")),
    responses(
        (status = 200, description = "Supplier", body = SupplierResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let supplier = state.services.suppliers.get(id).await?;
    Ok(success_response(supplier))
}

/// Update a supplier
#[utoipa::path(
    put,
    path = "/api/suppliers/update/{id}",
    params(("id" = i32, Path, description = "Supplier id")),
    request_body = SupplierRequest,
    responses(
        (status = 200, description = "Supplier updated", body = SupplierResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<SupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let supplier = state.services.suppliers.update(id, payload).await?;
    Ok(success_response(supplier))
}

/// Delete a supplier
#[utoipa::path(
    delete,
    path = "/api/suppliers/delete/{id}",
    params(("id" = i32, Path, description = "Supplier id")),
    responses(
        (status = 200, description = "Supplier deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Supplier has ledger history", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.suppliers.delete(id).await?;
    Ok(message_response("Supplier deleted successfully"))
}

pub fn supplier_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/suppliers/all", get(list_suppliers))
        .route("/suppliers/:id", get(get_supplier))
        .with_auth();

    let admin = Router::new()
        .route("/suppliers/add", post(create_supplier))
        .route("/suppliers/update/:id", put(update_supplier))
        .route("/suppliers/delete/:id", delete(delete_supplier))
        .with_role("ADMIN");

    read.merge(admin)
}
