use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};

/// Largest amount a `decimal(19,4)` money column holds: 999999999999999.9999.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x89E7_FFFF, 0x8AC7_2304, 0, false, 4);

/// Product entity
///
/// `stock_quantity` is owned by the transaction workflow; catalog updates
/// never write it directly.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// SKU (Stock Keeping Unit)
    #[sea_orm(unique)]
    pub sku: String,

    /// Unit price, never negative
    pub price: Decimal,

    /// Current stock; may go negative after an oversold sale
    pub stock_quantity: i32,

    pub description: Option<String>,

    pub category_id: i32,

    /// Reference to an externally stored image
    pub image_url: Option<String>,

    pub expiry_date: Option<DateTime<Utc>>,

    /// Display ordering key, ascending
    pub position: i32,

    pub created_at: DateTime<Utc>,

    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.stock_quantity {
                active_model.stock_quantity = Set(0);
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
        } else {
            active_model.updated_at = Set(Some(Utc::now()));
        }

        if let ActiveValue::Set(price) | ActiveValue::Unchanged(price) = &active_model.price {
            if price.is_sign_negative() {
                return Err(DbErr::Custom(format!(
                    "Validation error: price must not be negative (got {})",
                    price
                )));
            }
        }

        Ok(active_model)
    }
}
