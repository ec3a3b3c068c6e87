use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::TransactionResponse;
use crate::entities::{
    transaction,
    user::{self, UserRole},
};

/// Public view of a user. Omits `password_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone_number: model.phone_number,
            role: model.role,
            created_at: model.created_at,
        }
    }
}

/// A user with their ledger history. Each transaction is a bare row so the
/// user is not repeated inside every entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserTransactionsResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub transactions: Vec<TransactionResponse>,
}

impl UserTransactionsResponse {
    pub fn new(user: user::Model, transactions: Vec<transaction::Model>) -> Self {
        Self {
            user: user.into(),
            transactions: transactions
                .into_iter()
                .map(TransactionResponse::from_model)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 32, message = "Phone number is required"))]
    pub phone_number: String,
    /// Defaults to MANAGER
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: usize,
    pub role: UserRole,
}

/// Partial user update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub phone_number: Option<String>,
    pub role: Option<UserRole>,
}
