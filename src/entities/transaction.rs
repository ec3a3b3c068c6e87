use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of stock movement a ledger row records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    #[sea_orm(string_value = "PURCHASE")]
    Purchase,
    #[sea_orm(string_value = "SALE")]
    Sale,
    #[sea_orm(string_value = "RETURN_TO_SUPPLIER")]
    ReturnToSupplier,
}

impl TransactionType {
    /// Signed stock change for moving `quantity` units.
    pub fn stock_delta(&self, quantity: i32) -> i32 {
        match self {
            TransactionType::Purchase => quantity,
            TransactionType::Sale | TransactionType::ReturnToSupplier => -quantity,
        }
    }

    pub fn requires_supplier(&self) -> bool {
        matches!(
            self,
            TransactionType::Purchase | TransactionType::ReturnToSupplier
        )
    }

    /// Status a freshly recorded movement of this kind starts in.
    pub fn initial_status(&self) -> TransactionStatus {
        match self {
            TransactionType::Purchase | TransactionType::Sale => TransactionStatus::Completed,
            TransactionType::ReturnToSupplier => TransactionStatus::Processing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Purchase => "PURCHASE",
            TransactionType::Sale => "SALE",
            TransactionType::ReturnToSupplier => "RETURN_TO_SUPPLIER",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PROCESSING")]
    Processing,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

/// Immutable ledger row. Only `status` and `updated_at` change after insert.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub product_id: i32,
    pub supplier_id: Option<i32>,
    pub user_id: i32,
    pub total_products: i32,
    pub total_price: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
            if let ActiveValue::Set(quantity) = active_model.total_products {
                if quantity <= 0 {
                    return Err(DbErr::Custom(format!(
                        "Validation error: total_products must be positive (got {})",
                        quantity
                    )));
                }
            }
        }
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_delta_sign_follows_direction() {
        assert_eq!(TransactionType::Purchase.stock_delta(3), 3);
        assert_eq!(TransactionType::Sale.stock_delta(4), -4);
        assert_eq!(TransactionType::ReturnToSupplier.stock_delta(2), -2);
    }

    #[test]
    fn returns_start_processing_others_complete() {
        assert_eq!(
            TransactionType::Purchase.initial_status(),
            TransactionStatus::Completed
        );
        assert_eq!(
            TransactionType::Sale.initial_status(),
            TransactionStatus::Completed
        );
        assert_eq!(
            TransactionType::ReturnToSupplier.initial_status(),
            TransactionStatus::Processing
        );
    }

    #[test]
    fn only_sales_skip_the_supplier() {
        assert!(TransactionType::Purchase.requires_supplier());
        assert!(TransactionType::ReturnToSupplier.requires_supplier());
        assert!(!TransactionType::Sale.requires_supplier());
    }

    #[test]
    fn enums_serialize_in_wire_case() {
        assert_eq!(
            serde_json::to_string(&TransactionType::ReturnToSupplier).unwrap(),
            "\"RETURN_TO_SUPPLIER\""
        );
        assert_eq!(
            serde_json::from_str::<TransactionStatus>("\"CANCELLED\"").unwrap(),
            TransactionStatus::Cancelled
        );
    }
}
