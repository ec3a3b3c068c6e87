use crate::{
    auth::AuthService,
    db::DbPool,
    services::{
        categories::CategoryService, ledger::LedgerStore, products::ProductService,
        suppliers::SupplierService, transaction_queries::TransactionQueryService,
        transactions::TransactionService, users::UserService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub categories: Arc<CategoryService>,
    pub products: Arc<ProductService>,
    pub suppliers: Arc<SupplierService>,
    pub users: Arc<UserService>,
    pub transactions: Arc<TransactionService>,
    pub transaction_queries: Arc<TransactionQueryService>,
}

impl AppServices {
    /// Wires every service against the SeaORM-backed ledger store.
    pub fn new(db_pool: Arc<DbPool>, auth_service: Arc<AuthService>) -> Self {
        Self {
            categories: Arc::new(CategoryService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            suppliers: Arc::new(SupplierService::new(db_pool.clone())),
            users: Arc::new(UserService::new(db_pool.clone(), auth_service)),
            transactions: Arc::new(TransactionService::new(db_pool.clone())),
            transaction_queries: Arc::new(TransactionQueryService::new(db_pool)),
        }
    }

    /// Same wiring with a caller-supplied ledger store for both the write and
    /// read side of the ledger.
    pub fn with_ledger_store(
        db_pool: Arc<DbPool>,
        auth_service: Arc<AuthService>,
        store: Arc<dyn LedgerStore>,
    ) -> Self {
        Self {
            transactions: Arc::new(TransactionService::with_store(
                db_pool.clone(),
                store.clone(),
            )),
            transaction_queries: Arc::new(TransactionQueryService::with_store(
                db_pool.clone(),
                store,
            )),
            ..Self::new(db_pool, auth_service)
        }
    }
}

pub mod auth;
pub mod categories;
pub mod common;
pub mod products;
pub mod suppliers;
pub mod transactions;
pub mod users;
