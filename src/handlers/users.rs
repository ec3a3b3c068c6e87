use super::common::{message_response, success_response, validate_input};
use crate::{
    auth::{AuthRouterExt, AuthUser},
    dto::{UpdateUserRequest, UserResponse, UserTransactionsResponse},
    errors::ServiceError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, put},
    Router,
};

/// Admins may act on any account; everyone else only on their own.
fn ensure_self_or_admin(caller: &AuthUser, user_id: i32) -> Result<(), ServiceError> {
    if caller.is_admin() || caller.user_id == user_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "Only administrators can access other users".to_string(),
        ))
    }
}

#[utoipa::path(
    get,
    path = "/api/users/all",
    responses(
        (status = 200, description = "All users, newest first", body = [UserResponse]),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let users = state.services.users.list().await?;
    Ok(success_response(users))
}

/// The authenticated caller's own account
#[utoipa::path(
    get,
    path = "/api/users/current",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Account no longer exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn current_user(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.get(caller.user_id).await?;
    Ok(success_response(user))
}

#[utoipa::path(
    put,
    path = "/api/users/update/{id}",
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not allowed to edit this user or change roles", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    ensure_self_or_admin(&caller, id)?;
    if payload.role.is_some() && !caller.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only administrators can change roles".to_string(),
        ));
    }

    let user = state.services.users.update(id, payload).await?;
    Ok(success_response(user))
}

#[utoipa::path(
    delete,
    path = "/api/users/delete/{id}",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "User has recorded transactions", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.users.delete(id).await?;
    Ok(message_response("User deleted successfully"))
}

/// A user together with every transaction they recorded
#[utoipa::path(
    get,
    path = "/api/users/transactions/{id}",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User and their transactions, newest first", body = UserTransactionsResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn user_transactions(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_self_or_admin(&caller, id)?;
    let history = state.services.transaction_queries.for_user(id).await?;
    Ok(success_response(history))
}

pub fn user_routes() -> Router<AppState> {
    let authenticated = Router::new()
        .route("/users/current", get(current_user))
        .route("/users/update/:id", put(update_user))
        .route("/users/transactions/:id", get(user_transactions))
        .with_auth();

    let admin = Router::new()
        .route("/users/all", get(list_users))
        .route("/users/delete/:id", delete(delete_user))
        .with_role("ADMIN");

    authenticated.merge(admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::UserRole;

    fn caller(user_id: i32, role: UserRole) -> AuthUser {
        AuthUser {
            user_id,
            email: "caller@example.com".into(),
            role,
        }
    }

    #[test]
    fn managers_only_reach_their_own_account() {
        let manager = caller(5, UserRole::Manager);
        assert!(ensure_self_or_admin(&manager, 5).is_ok());
        assert!(matches!(
            ensure_self_or_admin(&manager, 6),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(ensure_self_or_admin(&caller(1, UserRole::Admin), 6).is_ok());
    }
}
