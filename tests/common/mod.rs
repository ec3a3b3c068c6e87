#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use inventory_api::{
    config::AppConfig,
    db::{self, DbConfig},
    dto::{
        CategoryRequest, CategoryResponse, CreateProductRequest, ProductResponse, RegisterRequest,
        SupplierRequest, SupplierResponse, UserResponse,
    },
    entities::user::UserRole,
    handlers::AppServices,
    services::ledger::LedgerStore,
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str =
    "integration-test-secret-integration-test-secret-integration-test-0";

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub admin: UserResponse,
    pub manager: UserResponse,
    admin_token: String,
    manager_token: String,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::build(DbConfig::in_memory_sqlite(), None).await
    }

    /// Same as [`TestApp::new`] but the ledger goes through `store`.
    pub async fn with_ledger_store(store: Arc<dyn LedgerStore>) -> Self {
        Self::build(DbConfig::in_memory_sqlite(), Some(store)).await
    }

    /// Same as [`TestApp::new`] but on the given database, e.g. a SQLite file
    /// shared by several pooled connections.
    pub async fn with_db_config(db_config: DbConfig) -> Self {
        Self::build(db_config, None).await
    }

    async fn build(db_config: DbConfig, store: Option<Arc<dyn LedgerStore>>) -> Self {
        let pool = db::establish_connection_with_config(&db_config)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let cfg = AppConfig::new(
            db_config.url.clone(),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let db_arc = Arc::new(pool);
        let mut state = AppState::new(db_arc.clone(), cfg);
        if let Some(store) = store {
            state.services = AppServices::with_ledger_store(db_arc, state.auth.clone(), store);
        }

        let admin = register(&state, "Ada Admin", "admin@example.com", UserRole::Admin).await;
        let manager =
            register(&state, "Max Manager", "manager@example.com", UserRole::Manager).await;

        let admin_token = token_for(&state, admin.id).await;
        let manager_token = token_for(&state, manager.id).await;

        Self {
            router: inventory_api::app_router(state.clone()),
            state,
            admin,
            manager,
            admin_token,
            manager_token,
        }
    }

    /// Bearer token for the seeded ADMIN user.
    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Bearer token for the seeded MANAGER user.
    pub fn manager_token(&self) -> &str {
        &self.manager_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for requests made as the seeded admin.
    pub async fn request_as_admin(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.admin_token()))
            .await
    }

    /// Convenience helper for requests made as the seeded manager.
    pub async fn request_as_manager(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.manager_token()))
            .await
    }

    pub async fn seed_category(&self, name: &str) -> CategoryResponse {
        self.state
            .services
            .categories
            .create(CategoryRequest { name: name.into() })
            .await
            .expect("seed category")
    }

    pub async fn seed_supplier(&self, name: &str) -> SupplierResponse {
        self.state
            .services
            .suppliers
            .create(SupplierRequest {
                name: name.into(),
                contact_info: Some("orders@example.com".into()),
                address: None,
            })
            .await
            .expect("seed supplier")
    }

    pub async fn seed_product(
        &self,
        category_id: i32,
        sku: &str,
        price: Decimal,
        stock_quantity: i32,
    ) -> ProductResponse {
        self.state
            .services
            .products
            .create(CreateProductRequest {
                category_id,
                name: format!("Product {}", sku),
                sku: sku.into(),
                price,
                stock_quantity,
                description: None,
                image_url: None,
                expiry_date: None,
            })
            .await
            .expect("seed product")
    }

    /// Current stock straight from the database.
    pub async fn stock_of(&self, product_id: i32) -> i32 {
        inventory_api::entities::product::Entity::find_by_id(product_id)
            .one(self.state.db.as_ref())
            .await
            .expect("load product")
            .expect("product exists")
            .stock_quantity
    }

    /// Number of ledger rows straight from the database.
    pub async fn ledger_len(&self) -> usize {
        inventory_api::entities::transaction::Entity::find()
            .all(self.state.db.as_ref())
            .await
            .expect("load ledger")
            .len()
    }
}

async fn register(state: &AppState, name: &str, email: &str, role: UserRole) -> UserResponse {
    state
        .services
        .users
        .register(RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: "password123".into(),
            phone_number: "555-0100".into(),
            role: Some(role),
        })
        .await
        .expect("seed user")
}

async fn token_for(state: &AppState, user_id: i32) -> String {
    let account = inventory_api::entities::user::Entity::find_by_id(user_id)
        .one(state.db.as_ref())
        .await
        .expect("load user")
        .expect("user exists");
    state
        .auth
        .generate_token(&account)
        .expect("issue token for tests")
}

/// Reads a response body as JSON.
pub async fn response_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&body).expect("response body is json")
}
