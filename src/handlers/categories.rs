use super::common::{created_response, message_response, success_response, validate_input};
use crate::{
    auth::AuthRouterExt,
    dto::{CategoryRequest, CategoryResponse},
    errors::ServiceError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};

/// Create a category
#[utoipa::path(
    post,
    path = "/api/categories/add",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let category = state.services.categories.create(payload).await?;
    Ok(created_response(category))
}

/// List categories in display order
#[utoipa::path(
    get,
    path = "/api/categories/all",
    responses(
        (status = 200, description = "Categories ordered by position", body = [CategoryResponse]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let categories = state.services.categories.list().await?;
    Ok(success_response(categories))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category", body = CategoryResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state.services.categories.get(id).await?;
    Ok(success_response(category))
}

/// Rename a category
#[utoipa::path(
    put,
    path = "/api/categories/update/{id}",
    params(("id" = i32, Path, description = "Category id")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let category = state.services.categories.update(id, payload).await?;
    Ok(success_response(category))
}

#[utoipa::path(
    delete,
    path = "/api/categories/delete/{id}",
    params(("id" = i32, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Category still has products", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.categories.delete(id).await?;
    Ok(message_response("Category deleted successfully"))
}

/// Reorder categories; the body lists every id in display order
#[utoipa::path(
    put,
    path = "/api/categories/reorder",
    request_body = Vec<i32>,
    responses(
        (status = 200, description = "Categories in their new order", body = [CategoryResponse]),
        (status = 400, description = "Duplicate id", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown category id", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn reorder_categories(
    State(state): State<AppState>,
    Json(ordered_ids): Json<Vec<i32>>,
) -> Result<impl IntoResponse, ServiceError> {
    let categories = state.services.categories.reorder(ordered_ids).await?;
    Ok(success_response(categories))
}

pub fn category_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/categories/all", get(list_categories))
        .route("/categories/:id", get(get_category))
        .with_auth();

    let admin = Router::new()
        .route("/categories/add", post(create_category))
        .route("/categories/update/:id", put(update_category))
        .route("/categories/delete/:id", delete(delete_category))
        .route("/categories/reorder", put(reorder_categories))
        .with_role("ADMIN");

    read.merge(admin)
}
