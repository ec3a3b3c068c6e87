use super::common::{created_response, message_response, success_response, validate_input};
use crate::{
    auth::AuthRouterExt,
    dto::{CreateProductRequest, ProductOrderEntry, ProductResponse, UpdateProductRequest},
    errors::ServiceError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};

/// Create a product
#[utoipa::path(
    post,
    path = "/api/products/add",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let product = state.services.products.create(payload).await?;
    Ok(created_response(product))
}

/// Update catalog fields of a product; stock is not editable here
#[utoipa::path(
    put,
    path = "/api/products/update",
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product or category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let product = state.services.products.update(payload).await?;
    Ok(success_response(product))
}

#[utoipa::path(
    get,
    path = "/api/products/all",
    responses(
        (status = 200, description = "Products ordered by position", body = [ProductResponse]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state.services.products.list().await?;
    Ok(success_response(products))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.products.get(id).await?;
    Ok(success_response(product))
}

#[utoipa::path(
    delete,
    path = "/api/products/delete/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product has ledger history", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.products.delete(id).await?;
    Ok(message_response("Product deleted successfully"))
}

/// Reorder products; the body lists products in display order
#[utoipa::path(
    put,
    path = "/api/products/reorder",
    request_body = Vec<ProductOrderEntry>,
    responses(
        (status = 200, description = "Products in their new order", body = [ProductResponse]),
        (status = 400, description = "Duplicate id", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product id", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn reorder_products(
    State(state): State<AppState>,
    Json(entries): Json<Vec<ProductOrderEntry>>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state.services.products.reorder(entries).await?;
    Ok(success_response(products))
}

pub fn product_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/products/all", get(list_products))
        .route("/products/:id", get(get_product))
        .with_auth();

    let admin = Router::new()
        .route("/products/add", post(create_product))
        .route("/products/update", put(update_product))
        .route("/products/delete/:id", delete(delete_product))
        .route("/products/reorder", put(reorder_products))
        .with_role("ADMIN");

    read.merge(admin)
}
