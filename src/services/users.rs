use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{hash_password, verify_password, AuthError, AuthService},
    dto::{LoginRequest, LoginResponse, RegisterRequest, UpdateUserRequest, UserResponse},
    entities::{transaction, user},
    errors::ServiceError,
};

/// Account management and credential checks.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, auth: Arc<AuthService>) -> Self {
        Self { db, auth }
    }

    /// Creates an account. The role defaults to MANAGER and emails are
    /// unique, compared case-insensitively.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<UserResponse, ServiceError> {
        let email = normalize_email(&request.email);
        self.ensure_email_free(&email, None).await?;

        let created = user::ActiveModel {
            name: Set(request.name),
            email: Set(email.clone()),
            password_hash: Set(hash_password(&request.password)?),
            phone_number: Set(request.phone_number),
            role: Set(request.role.unwrap_or_default()),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .map_err(|e| ServiceError::from_write(e, format!("Email '{}' is already registered", email)))?;

        info!(user_id = created.id, role = created.role.as_str(), "User registered");
        Ok(created.into())
    }

    /// Checks credentials and issues a bearer token. Unknown emails and wrong
    /// passwords are indistinguishable to the caller.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        let email = normalize_email(&request.email);
        let account = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let account = match account {
            Some(account) if verify_password(&request.password, &account.password_hash) => account,
            _ => {
                warn!("Rejected login attempt");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let token = self.auth.generate_token(&account)?;
        info!(user_id = account.id, "User logged in");
        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.auth.expires_in(),
            role: account.role,
        })
    }

    /// Newest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<UserResponse>, ServiceError> {
        let users = user::Entity::find()
            .order_by_desc(user::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<UserResponse, ServiceError> {
        self.find(id).await.map(UserResponse::from)
    }

    /// Applies the present fields of `request`. A new password is rehashed.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, ServiceError> {
        let mut active: user::ActiveModel = self.find(id).await?.into();

        if let Some(email) = request.email {
            let email = normalize_email(&email);
            self.ensure_email_free(&email, Some(id)).await?;
            active.email = Set(email);
        }
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(password) = request.password {
            active.password_hash = Set(hash_password(&password)?);
        }
        if let Some(phone_number) = request.phone_number {
            active.phone_number = Set(phone_number);
        }
        if let Some(role) = request.role {
            active.role = Set(role);
        }

        let updated = active
            .update(self.db.as_ref())
            .await
            .map_err(|e| ServiceError::from_write(e, "Email is already registered"))?;
        info!(user_id = id, "User updated");
        Ok(updated.into())
    }

    /// Users who recorded ledger rows cannot be deleted.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let db = self.db.as_ref();
        self.find(id).await?;

        let history = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if history > 0 {
            return Err(ServiceError::Conflict(format!(
                "User {} has {} recorded transaction(s)",
                id, history
            )));
        }

        user::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(|e| ServiceError::from_write(e, format!("User {} is in use", id)))?;
        info!(user_id = id, "User deleted");
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }

    async fn ensure_email_free(&self, email: &str, except: Option<i32>) -> Result<(), ServiceError> {
        let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
        if let Some(id) = except {
            query = query.filter(user::Column::Id.ne(id));
        }
        let taken = query
            .count(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        if taken > 0 {
            return Err(ServiceError::Conflict(format!(
                "Email '{}' is already registered",
                email
            )));
        }
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
