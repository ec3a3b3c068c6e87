use std::{collections::HashMap, sync::Arc};

use chrono::{TimeZone, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::instrument;

use crate::{
    dto::{TransactionPageResponse, TransactionResponse, UserTransactionsResponse},
    entities::{product, supplier, transaction, user},
    errors::ServiceError,
    services::ledger::{LedgerStore, PageRequest, SeaOrmLedgerStore, TransactionFilter},
};

/// Read side of the ledger. Never mutates stock or ledger rows.
#[derive(Clone)]
pub struct TransactionQueryService {
    db: Arc<DatabaseConnection>,
    store: Arc<dyn LedgerStore>,
}

impl TransactionQueryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self::with_store(db, Arc::new(SeaOrmLedgerStore))
    }

    pub fn with_store(db: Arc<DatabaseConnection>, store: Arc<dyn LedgerStore>) -> Self {
        Self { db, store }
    }

    /// Zero-indexed page of transactions, newest first. A page past the end
    /// is empty rather than an error.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        page: u64,
        page_size: u64,
        free_text: Option<String>,
    ) -> Result<TransactionPageResponse, ServiceError> {
        if page_size == 0 {
            return Err(ServiceError::ValidationError(
                "Page size must be at least 1".to_string(),
            ));
        }

        let filter = TransactionFilter::search(free_text.unwrap_or_default());
        let result = self
            .store
            .query_transactions(
                &self.db,
                &filter,
                Some(PageRequest {
                    page,
                    size: page_size,
                }),
            )
            .await?;

        Ok(TransactionPageResponse {
            items: self.hydrate(result.items).await?,
            page: result.page,
            size: result.size,
            total_elements: result.total_items,
            total_pages: result.total_pages,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> Result<TransactionResponse, ServiceError> {
        let db = self.db.as_ref();
        let row = transaction::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Transaction", id))?;

        self.hydrate(vec![row])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("Transaction", id))
    }

    /// Every transaction created during the given UTC calendar month,
    /// newest first.
    #[instrument(skip(self))]
    pub async fn by_month_year(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Vec<TransactionResponse>, ServiceError> {
        if !(1..=12).contains(&month) {
            return Err(ServiceError::ValidationError(format!(
                "Month must be between 1 and 12 (got {})",
                month
            )));
        }

        let (next_year, next_month) = if month == 12 {
            let next = year
                .checked_add(1)
                .ok_or_else(|| ServiceError::ValidationError(format!("Invalid year {}", year)))?;
            (next, 1)
        } else {
            (year, month + 1)
        };
        let start = Utc
            .with_ymd_and_hms(year, month, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| ServiceError::ValidationError(format!("Invalid year {}", year)))?;
        let end = Utc
            .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| ServiceError::ValidationError(format!("Invalid year {}", year)))?;

        let result = self
            .store
            .query_transactions(
                &self.db,
                &TransactionFilter::created_between(start, end),
                None,
            )
            .await?;

        self.hydrate(result.items).await
    }

    /// A user with every transaction they recorded, newest first.
    #[instrument(skip(self))]
    pub async fn for_user(&self, user_id: i32) -> Result<UserTransactionsResponse, ServiceError> {
        let db = self.db.as_ref();
        let owner = user::Entity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;

        let result = self
            .store
            .query_transactions(&self.db, &TransactionFilter::for_user(user_id), None)
            .await?;

        Ok(UserTransactionsResponse::new(owner, result.items))
    }

    /// Attaches product, supplier and user summaries with one query per
    /// related table.
    async fn hydrate(
        &self,
        rows: Vec<transaction::Model>,
    ) -> Result<Vec<TransactionResponse>, ServiceError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let db = self.db.as_ref();

        let product_ids: Vec<i32> = rows.iter().map(|r| r.product_id).collect();
        let supplier_ids: Vec<i32> = rows.iter().filter_map(|r| r.supplier_id).collect();
        let user_ids: Vec<i32> = rows.iter().map(|r| r.user_id).collect();

        let products: HashMap<i32, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let suppliers: HashMap<i32, supplier::Model> = if supplier_ids.is_empty() {
            HashMap::new()
        } else {
            supplier::Entity::find()
                .filter(supplier::Column::Id.is_in(supplier_ids))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|s| (s.id, s))
                .collect()
        };

        let users: HashMap<i32, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(rows
            .into_iter()
            .map(|row| {
                let product = products.get(&row.product_id).cloned();
                let supplier = row.supplier_id.and_then(|id| suppliers.get(&id).cloned());
                let user = users.get(&row.user_id).cloned();
                TransactionResponse::with_related(row, product, supplier, user)
            })
            .collect())
    }
}
