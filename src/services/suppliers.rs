use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{info, instrument};

use crate::{
    dto::{SupplierRequest, SupplierResponse},
    entities::{supplier, transaction},
    errors::ServiceError,
};

#[derive(Clone)]
pub struct SupplierService {
    db: Arc<DatabaseConnection>,
}

impl SupplierService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, request: SupplierRequest) -> Result<SupplierResponse, ServiceError> {
        let created = supplier::ActiveModel {
            name: Set(request.name),
            contact_info: Set(request.contact_info),
            address: Set(request.address),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .map_err(ServiceError::db_error)?;

        info!("Supplier created: {}", created.id);
        Ok(created.into())
    }

    /// Newest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<SupplierResponse>, ServiceError> {
        let suppliers = supplier::Entity::find()
            .order_by_desc(supplier::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(suppliers.into_iter().map(SupplierResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<SupplierResponse, ServiceError> {
        self.find(id).await.map(SupplierResponse::from)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: i32,
        request: SupplierRequest,
    ) -> Result<SupplierResponse, ServiceError> {
        let mut active: supplier::ActiveModel = self.find(id).await?.into();
        active.name = Set(request.name);
        active.contact_info = Set(request.contact_info);
        active.address = Set(request.address);

        let updated = active
            .update(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        info!("Supplier updated: {}", id);
        Ok(updated.into())
    }

    /// Suppliers referenced by a ledger row cannot be deleted.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let db = self.db.as_ref();
        self.find(id).await?;

        let history = transaction::Entity::find()
            .filter(transaction::Column::SupplierId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if history > 0 {
            return Err(ServiceError::Conflict(format!(
                "Supplier {} has {} recorded transaction(s)",
                id, history
            )));
        }

        supplier::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(|e| ServiceError::from_write(e, format!("Supplier {} is in use", id)))?;
        info!("Supplier deleted: {}", id);
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Supplier", id))
    }
}
