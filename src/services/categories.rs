use std::{collections::HashSet, sync::Arc};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument};

use crate::{
    dto::{CategoryRequest, CategoryResponse},
    entities::{category, product},
    errors::ServiceError,
};

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a category at the end of the display order.
    #[instrument(skip(self))]
    pub async fn create(&self, request: CategoryRequest) -> Result<CategoryResponse, ServiceError> {
        let db = self.db.as_ref();
        let name = request.name.trim().to_string();
        self.ensure_name_free(&name, None).await?;

        let next_position = category::Entity::find()
            .order_by_desc(category::Column::Position)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .map(|c| c.position + 1)
            .unwrap_or(0);

        let created = category::ActiveModel {
            name: Set(name.clone()),
            position: Set(next_position),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| ServiceError::from_write(e, format!("Category '{}' already exists", name)))?;

        info!("Category created: {}", created.id);
        Ok(created.into())
    }

    /// All categories in display order.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<CategoryResponse>, ServiceError> {
        let categories = category::Entity::find()
            .order_by_asc(category::Column::Position)
            .order_by_asc(category::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(categories.into_iter().map(CategoryResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<CategoryResponse, ServiceError> {
        self.find(id).await.map(CategoryResponse::from)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: i32,
        request: CategoryRequest,
    ) -> Result<CategoryResponse, ServiceError> {
        let existing = self.find(id).await?;
        let name = request.name.trim().to_string();
        self.ensure_name_free(&name, Some(id)).await?;

        let mut active: category::ActiveModel = existing.into();
        active.name = Set(name.clone());
        let updated = active
            .update(self.db.as_ref())
            .await
            .map_err(|e| ServiceError::from_write(e, format!("Category '{}' already exists", name)))?;

        info!("Category updated: {}", id);
        Ok(updated.into())
    }

    /// Deletes a category that no product references.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let db = self.db.as_ref();
        self.find(id).await?;

        let in_use = product::Entity::find()
            .filter(product::Column::CategoryId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category {} still has {} product(s)",
                id, in_use
            )));
        }

        category::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(|e| ServiceError::from_write(e, format!("Category {} is in use", id)))?;
        info!("Category deleted: {}", id);
        Ok(())
    }

    /// Assigns positions `0..n` following `ordered_ids`. Any unknown id aborts
    /// the whole reorder.
    #[instrument(skip(self))]
    pub async fn reorder(&self, ordered_ids: Vec<i32>) -> Result<Vec<CategoryResponse>, ServiceError> {
        let mut seen = HashSet::new();
        if let Some(dup) = ordered_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(ServiceError::ValidationError(format!(
                "Category {} appears more than once",
                dup
            )));
        }

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    for (position, id) in ordered_ids.into_iter().enumerate() {
                        let existing = category::Entity::find_by_id(id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| ServiceError::not_found("Category", id))?;
                        let mut active: category::ActiveModel = existing.into();
                        active.position = Set(position as i32);
                        active.update(txn).await.map_err(ServiceError::db_error)?;
                    }
                    Ok(())
                })
            })
            .await?;

        info!("Categories reordered");
        self.list().await
    }

    async fn find(&self, id: i32) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Category", id))
    }

    async fn ensure_name_free(&self, name: &str, except: Option<i32>) -> Result<(), ServiceError> {
        let mut query = category::Entity::find().filter(category::Column::Name.eq(name));
        if let Some(id) = except {
            query = query.filter(category::Column::Id.ne(id));
        }
        let taken = query
            .count(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        if taken > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category '{}' already exists",
                name
            )));
        }
        Ok(())
    }
}
