use std::{collections::HashSet, sync::Arc};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument};

use crate::{
    dto::{CreateProductRequest, ProductOrderEntry, ProductResponse, UpdateProductRequest},
    entities::{category, product, transaction},
    errors::ServiceError,
};

/// Product catalog operations. Stock is set once at creation and afterwards
/// only moves through the transaction workflow.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        let db = self.db.as_ref();
        self.ensure_category(request.category_id).await?;
        self.ensure_sku_free(&request.sku, None).await?;

        let next_position = product::Entity::find()
            .order_by_desc(product::Column::Position)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .map(|p| p.position + 1)
            .unwrap_or(0);

        let sku = request.sku.clone();
        let created = product::ActiveModel {
            name: Set(request.name),
            sku: Set(request.sku),
            price: Set(request.price),
            stock_quantity: Set(request.stock_quantity),
            description: Set(request.description),
            category_id: Set(request.category_id),
            image_url: Set(request.image_url),
            expiry_date: Set(request.expiry_date),
            position: Set(next_position),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| ServiceError::from_write(e, format!("SKU '{}' already exists", sku)))?;

        info!(product_id = created.id, sku = %created.sku, "Product created");
        Ok(created.into())
    }

    /// Applies the present fields of `request` to the product it names.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        request: UpdateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        let existing = self.find(request.product_id).await?;
        let mut active: product::ActiveModel = existing.into();

        if let Some(category_id) = request.category_id {
            self.ensure_category(category_id).await?;
            active.category_id = Set(category_id);
        }
        if let Some(sku) = request.sku {
            self.ensure_sku_free(&sku, Some(request.product_id)).await?;
            active.sku = Set(sku);
        }
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(image_url) = request.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(expiry_date) = request.expiry_date {
            active.expiry_date = Set(Some(expiry_date));
        }

        let updated = active
            .update(self.db.as_ref())
            .await
            .map_err(|e| ServiceError::from_write(e, "SKU already exists"))?;

        info!(product_id = updated.id, "Product updated");
        Ok(updated.into())
    }

    /// All products in display order.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<ProductResponse>, ServiceError> {
        let products = product::Entity::find()
            .order_by_asc(product::Column::Position)
            .order_by_asc(product::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(products.into_iter().map(ProductResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<ProductResponse, ServiceError> {
        self.find(id).await.map(ProductResponse::from)
    }

    /// Deletes a product with no ledger history.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let db = self.db.as_ref();
        self.find(id).await?;

        let history = transaction::Entity::find()
            .filter(transaction::Column::ProductId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if history > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product {} has {} recorded transaction(s)",
                id, history
            )));
        }

        product::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(|e| ServiceError::from_write(e, format!("Product {} is in use", id)))?;
        info!(product_id = id, "Product deleted");
        Ok(())
    }

    /// Assigns positions `0..n` in the order given. Any unknown id aborts the
    /// whole reorder.
    #[instrument(skip(self, entries))]
    pub async fn reorder(
        &self,
        entries: Vec<ProductOrderEntry>,
    ) -> Result<Vec<ProductResponse>, ServiceError> {
        let ordered_ids: Vec<i32> = entries.into_iter().map(|e| e.id).collect();
        let mut seen = HashSet::new();
        if let Some(dup) = ordered_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(ServiceError::ValidationError(format!(
                "Product {} appears more than once",
                dup
            )));
        }

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    for (position, id) in ordered_ids.into_iter().enumerate() {
                        let existing = product::Entity::find_by_id(id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| ServiceError::not_found("Product", id))?;
                        let mut active: product::ActiveModel = existing.into();
                        active.position = Set(position as i32);
                        active.update(txn).await.map_err(ServiceError::db_error)?;
                    }
                    Ok(())
                })
            })
            .await?;

        info!("Products reordered");
        self.list().await
    }

    async fn find(&self, id: i32) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    async fn ensure_category(&self, category_id: i32) -> Result<(), ServiceError> {
        category::Entity::find_by_id(category_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found("Category", category_id))
    }

    async fn ensure_sku_free(&self, sku: &str, except: Option<i32>) -> Result<(), ServiceError> {
        let mut query = product::Entity::find().filter(product::Column::Sku.eq(sku));
        if let Some(id) = except {
            query = query.filter(product::Column::Id.ne(id));
        }
        let taken = query
            .count(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        if taken > 0 {
            return Err(ServiceError::Conflict(format!("SKU '{}' already exists", sku)));
        }
        Ok(())
    }
}
