//! Persistence seam for the stock ledger.
//!
//! Write methods take the caller's open [`DatabaseTransaction`] so the
//! workflow engine owns the commit boundary: a stock change and the ledger
//! row describing it are committed together or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbBackend, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Set, TryIntoModel,
};

use crate::{
    entities::{
        product, supplier,
        transaction::{self, TransactionStatus},
        user,
    },
    errors::ServiceError,
};

/// Criteria for listing ledger rows. All present criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Case-insensitive substring over product name, supplier name and description
    pub text: Option<String>,
    /// Inclusive lower bound on `created_at`
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub created_before: Option<DateTime<Utc>>,
    pub user_id: Option<i32>,
}

impl TransactionFilter {
    pub fn search(text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        Self {
            text: (!trimmed.is_empty()).then(|| trimmed.to_string()),
            ..Default::default()
        }
    }

    pub fn created_between(from: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        Self {
            created_from: Some(from),
            created_before: Some(before),
            ..Default::default()
        }
    }

    pub fn for_user(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }
}

/// Zero-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

/// One page of ledger rows, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionPage {
    pub items: Vec<transaction::Model>,
    pub page: u64,
    pub size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_user(
        &self,
        txn: &DatabaseTransaction,
        user_id: i32,
    ) -> Result<Option<user::Model>, ServiceError>;

    async fn get_product(
        &self,
        txn: &DatabaseTransaction,
        product_id: i32,
    ) -> Result<Option<product::Model>, ServiceError>;

    /// Inserts or updates a whole product row.
    async fn save_product(
        &self,
        txn: &DatabaseTransaction,
        product: product::ActiveModel,
    ) -> Result<product::Model, ServiceError>;

    async fn get_supplier(
        &self,
        txn: &DatabaseTransaction,
        supplier_id: i32,
    ) -> Result<Option<supplier::Model>, ServiceError>;

    /// Applies `stock_quantity = stock_quantity + delta` as a single
    /// statement and returns the product as it now stands. A sum outside
    /// `i32` is a `ValidationError` and leaves the row untouched.
    async fn adjust_stock(
        &self,
        txn: &DatabaseTransaction,
        product_id: i32,
        delta: i32,
    ) -> Result<product::Model, ServiceError>;

    async fn append_transaction(
        &self,
        txn: &DatabaseTransaction,
        record: transaction::ActiveModel,
    ) -> Result<transaction::Model, ServiceError>;

    async fn get_transaction(
        &self,
        txn: &DatabaseTransaction,
        transaction_id: i32,
    ) -> Result<Option<transaction::Model>, ServiceError>;

    async fn save_transaction_status(
        &self,
        txn: &DatabaseTransaction,
        current: transaction::Model,
        status: TransactionStatus,
    ) -> Result<transaction::Model, ServiceError>;

    /// Rows matching `filter`, ordered by id descending. `None` returns every
    /// match as a single page.
    async fn query_transactions(
        &self,
        db: &DatabaseConnection,
        filter: &TransactionFilter,
        page: Option<PageRequest>,
    ) -> Result<TransactionPage, ServiceError>;
}

/// [`LedgerStore`] backed by the SeaORM entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeaOrmLedgerStore;

/// `%text%` with LIKE wildcards in `text` taken literally. SQLite's `lower()`
/// only folds ASCII, so the pattern is folded the same way there; non-ASCII
/// letters then match case-sensitively on SQLite.
fn substring_pattern(text: &str, backend: DbBackend) -> String {
    let folded = match backend {
        DbBackend::Sqlite => text.to_ascii_lowercase(),
        _ => text.to_lowercase(),
    };
    let mut pattern = String::with_capacity(folded.len() + 2);
    pattern.push('%');
    for c in folded.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn lower_like(column: SimpleExpr, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(column)).like(LikeExpr::new(pattern).escape('\\'))
}

fn filter_condition(filter: &TransactionFilter, backend: DbBackend) -> Condition {
    let mut condition = Condition::all();

    if let Some(text) = &filter.text {
        let pattern = substring_pattern(text, backend);
        condition = condition.add(
            Condition::any()
                .add(lower_like(
                    Expr::col((product::Entity, product::Column::Name)).into(),
                    &pattern,
                ))
                .add(lower_like(
                    Expr::col((supplier::Entity, supplier::Column::Name)).into(),
                    &pattern,
                ))
                .add(lower_like(
                    Expr::col((transaction::Entity, transaction::Column::Description)).into(),
                    &pattern,
                )),
        );
    }
    if let Some(from) = filter.created_from {
        condition = condition.add(transaction::Column::CreatedAt.gte(from));
    }
    if let Some(before) = filter.created_before {
        condition = condition.add(transaction::Column::CreatedAt.lt(before));
    }
    if let Some(user_id) = filter.user_id {
        condition = condition.add(transaction::Column::UserId.eq(user_id));
    }

    condition
}

#[async_trait]
impl LedgerStore for SeaOrmLedgerStore {
    async fn get_user(
        &self,
        txn: &DatabaseTransaction,
        user_id: i32,
    ) -> Result<Option<user::Model>, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn get_product(
        &self,
        txn: &DatabaseTransaction,
        product_id: i32,
    ) -> Result<Option<product::Model>, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn save_product(
        &self,
        txn: &DatabaseTransaction,
        product: product::ActiveModel,
    ) -> Result<product::Model, ServiceError> {
        product
            .save(txn)
            .await
            .map_err(ServiceError::db_error)?
            .try_into_model()
            .map_err(ServiceError::db_error)
    }

    async fn get_supplier(
        &self,
        txn: &DatabaseTransaction,
        supplier_id: i32,
    ) -> Result<Option<supplier::Model>, ServiceError> {
        supplier::Entity::find_by_id(supplier_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn adjust_stock(
        &self,
        txn: &DatabaseTransaction,
        product_id: i32,
        delta: i32,
    ) -> Result<product::Model, ServiceError> {
        // the bound keeps the sum inside the i32 column
        let in_range = if delta >= 0 {
            product::Column::StockQuantity.lte(i32::MAX - delta)
        } else {
            product::Column::StockQuantity.gte(i32::MIN - delta)
        };
        let result = product::Entity::update_many()
            .col_expr(
                product::Column::StockQuantity,
                Expr::col(product::Column::StockQuantity).add(delta),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .filter(product::Column::Id.eq(product_id))
            .filter(in_range)
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;

        let current = self
            .get_product(txn, product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ValidationError(format!(
                "Stock of product {} ({}) cannot change by {}",
                product_id, current.stock_quantity, delta
            )));
        }
        Ok(current)
    }

    async fn append_transaction(
        &self,
        txn: &DatabaseTransaction,
        record: transaction::ActiveModel,
    ) -> Result<transaction::Model, ServiceError> {
        record.insert(txn).await.map_err(ServiceError::db_error)
    }

    async fn get_transaction(
        &self,
        txn: &DatabaseTransaction,
        transaction_id: i32,
    ) -> Result<Option<transaction::Model>, ServiceError> {
        transaction::Entity::find_by_id(transaction_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn save_transaction_status(
        &self,
        txn: &DatabaseTransaction,
        current: transaction::Model,
        status: TransactionStatus,
    ) -> Result<transaction::Model, ServiceError> {
        let mut active: transaction::ActiveModel = current.into();
        active.status = Set(status);
        active.updated_at = Set(Some(Utc::now()));
        active.update(txn).await.map_err(ServiceError::db_error)
    }

    async fn query_transactions(
        &self,
        db: &DatabaseConnection,
        filter: &TransactionFilter,
        page: Option<PageRequest>,
    ) -> Result<TransactionPage, ServiceError> {
        let mut query = transaction::Entity::find();
        if filter.text.is_some() {
            query = query
                .join(JoinType::LeftJoin, transaction::Relation::Product.def())
                .join(JoinType::LeftJoin, transaction::Relation::Supplier.def());
        }
        let query = query
            .filter(filter_condition(filter, db.get_database_backend()))
            .order_by_desc(transaction::Column::Id);

        match page {
            Some(PageRequest { page, size }) => {
                let paginator = query.paginate(db, size);
                let counts = paginator
                    .num_items_and_pages()
                    .await
                    .map_err(ServiceError::db_error)?;
                // SQL offsets are signed 64-bit
                let offset_fits = size <= i64::MAX as u64
                    && page
                        .checked_mul(size)
                        .is_some_and(|offset| offset <= i64::MAX as u64);
                let items = if offset_fits {
                    paginator
                        .fetch_page(page)
                        .await
                        .map_err(ServiceError::db_error)?
                } else {
                    Vec::new()
                };
                Ok(TransactionPage {
                    items,
                    page,
                    size,
                    total_items: counts.number_of_items,
                    total_pages: counts.number_of_pages,
                })
            }
            None => {
                let items = query.all(db).await.map_err(ServiceError::db_error)?;
                let total = items.len() as u64;
                Ok(TransactionPage {
                    size: total,
                    page: 0,
                    total_items: total,
                    total_pages: u64::from(total > 0),
                    items,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{self, DbConfig},
        entities::category,
    };
    use rust_decimal_macros::dec;
    use sea_orm::TransactionTrait;

    async fn db_with_category() -> (DatabaseConnection, category::Model) {
        let db = db::establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .unwrap();
        db::run_migrations(&db).await.unwrap();
        let category = category::ActiveModel {
            name: Set("Bins".into()),
            position: Set(0),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        (db, category)
    }

    fn sample_product(category_id: i32) -> product::ActiveModel {
        product::ActiveModel {
            name: Set("Crate".into()),
            sku: Set("CR-1".into()),
            price: Set(dec!(12.50)),
            stock_quantity: Set(4),
            category_id: Set(category_id),
            position: Set(0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn saved_product_commits_and_adjusts_in_place() {
        let (db, category) = db_with_category().await;
        let store = SeaOrmLedgerStore;

        let txn = db.begin().await.unwrap();
        let saved = store
            .save_product(&txn, sample_product(category.id))
            .await
            .unwrap();
        let adjusted = store.adjust_stock(&txn, saved.id, -6).await.unwrap();
        txn.commit().await.unwrap();

        assert_eq!(adjusted.stock_quantity, -2);
        let stored = product::Entity::find_by_id(saved.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.stock_quantity, -2);
    }

    #[tokio::test]
    async fn rolled_back_save_leaves_nothing_behind() {
        let (db, category) = db_with_category().await;

        let txn = db.begin().await.unwrap();
        SeaOrmLedgerStore
            .save_product(&txn, sample_product(category.id))
            .await
            .unwrap();
        txn.rollback().await.unwrap();

        assert!(product::Entity::find().all(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stock_that_would_leave_i32_is_refused() {
        let (db, category) = db_with_category().await;
        let store = SeaOrmLedgerStore;

        let txn = db.begin().await.unwrap();
        let mut nearly_full = sample_product(category.id);
        nearly_full.stock_quantity = Set(i32::MAX - 2);
        let saved = store.save_product(&txn, nearly_full).await.unwrap();

        let err = store.adjust_stock(&txn, saved.id, 3).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
        let err = store.adjust_stock(&txn, 9999, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let topped_up = store.adjust_stock(&txn, saved.id, 2).await.unwrap();
        assert_eq!(topped_up.stock_quantity, i32::MAX);
        txn.commit().await.unwrap();
    }

    #[test]
    fn like_wildcards_in_search_text_are_literal() {
        let pattern = substring_pattern("100%_a\\b", DbBackend::Sqlite);
        assert_eq!(pattern, "%100\\%\\_a\\\\b%");
    }

    #[test]
    fn sqlite_patterns_fold_ascii_only() {
        assert_eq!(substring_pattern("ÉCLAIR", DbBackend::Sqlite), "%Éclair%");
        assert_eq!(substring_pattern("ÉCLAIR", DbBackend::Postgres), "%éclair%");
    }

    #[test]
    fn blank_search_text_matches_everything() {
        assert_eq!(TransactionFilter::search("   "), TransactionFilter::default());
        assert_eq!(
            TransactionFilter::search(" Widget ").text.as_deref(),
            Some("Widget")
        );
    }
}
