use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::entities::{category, product, supplier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl From<category::Model> for CategoryResponse {
    /// Copies every column; categories carry no secrets or back-references.
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            position: model.position,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 255, message = "Category name is required"))]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierResponse {
    pub id: i32,
    pub name: String,
    pub contact_info: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<supplier::Model> for SupplierResponse {
    /// Copies every column. The supplier's transaction history is not
    /// embedded.
    fn from(model: supplier::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            contact_info: model.contact_info,
            address: model.address,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct SupplierRequest {
    #[validate(length(min = 1, max = 255, message = "Supplier name is required"))]
    pub name: String,
    #[validate(length(max = 255))]
    pub contact_info: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i32,
    pub category_id: i32,
    pub position: i32,
    pub name: String,
    pub sku: String,
    #[schema(value_type = String, example = "5.00")]
    pub price: Decimal,
    pub stock_quantity: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<product::Model> for ProductResponse {
    /// Copies every column. The owning category is referenced by id only and
    /// the ledger rows referencing the product are not embedded.
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            category_id: model.category_id,
            position: model.position,
            name: model.name,
            sku: model.sku,
            price: model.price,
            stock_quantity: model.stock_quantity,
            description: model.description,
            image_url: model.image_url,
            expiry_date: model.expiry_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        let mut err = ValidationError::new("price");
        err.message = Some("Price must not be negative".into());
        return Err(err);
    }
    if *price > product::MAX_AMOUNT {
        let mut err = ValidationError::new("price");
        err.message = Some(format!("Price must not exceed {}", product::MAX_AMOUNT).into());
        return Err(err);
    }
    Ok(())
}

/// Body of `POST /api/products/add`.
///
/// Stock starts at `stock_quantity` (default zero); afterwards it only moves
/// through recorded transactions.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    pub category_id: i32,
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "SKU is required"))]
    pub sku: String,
    #[validate(custom = "validate_price")]
    #[schema(value_type = String, example = "5.00")]
    pub price: Decimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 1024))]
    pub image_url: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
}

/// Body of `PUT /api/products/update`. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub product_id: i32,
    pub category_id: Option<i32>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub sku: Option<String>,
    #[validate(custom = "validate_price")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 1024))]
    pub image_url: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
}

/// One entry of the product reorder list; only the id is read.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ProductOrderEntry {
    pub id: i32,
}
