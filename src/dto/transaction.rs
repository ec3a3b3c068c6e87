use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{ProductResponse, SupplierResponse, UserResponse};
use crate::entities::{
    product, supplier,
    transaction::{self, TransactionStatus, TransactionType},
    user,
};

/// Body shared by purchase, sale and return requests.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct TransactionRequest {
    pub product_id: i32,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: i32,
    /// Required for purchases and returns; ignored for sales.
    pub supplier_id: Option<i32>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionSearchParams {
    /// Zero-indexed page number
    pub page: Option<u64>,
    /// Page size, capped by server configuration
    pub size: Option<u64>,
    /// Case-insensitive match on product name, supplier name or description
    #[serde(rename = "searchText")]
    pub search_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MonthYearParams {
    /// Calendar month, 1-12
    pub month: u32,
    pub year: i32,
}

/// Ledger row as returned by the API, with the rows it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i32,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub total_products: i32,
    #[schema(value_type = String, example = "15.00")]
    pub total_price: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub product_id: i32,
    pub supplier_id: Option<i32>,
    pub user_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<SupplierResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

impl TransactionResponse {
    /// Bare row: referenced entities are exposed by id only.
    pub fn from_model(model: transaction::Model) -> Self {
        Self {
            id: model.id,
            transaction_type: model.transaction_type,
            status: model.status,
            total_products: model.total_products,
            total_price: model.total_price,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
            product_id: model.product_id,
            supplier_id: model.supplier_id,
            user_id: model.user_id,
            product: None,
            supplier: None,
            user: None,
        }
    }

    /// Row plus summaries of its product, supplier and acting user. The user
    /// summary omits the password hash and the user's own transaction list.
    pub fn with_related(
        model: transaction::Model,
        product: Option<product::Model>,
        supplier: Option<supplier::Model>,
        user: Option<user::Model>,
    ) -> Self {
        Self {
            product: product.map(ProductResponse::from),
            supplier: supplier.map(SupplierResponse::from),
            user: user.map(UserResponse::from),
            ..Self::from_model(model)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionPageResponse {
    pub items: Vec<TransactionResponse>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_row() -> transaction::Model {
        transaction::Model {
            id: 7,
            transaction_type: TransactionType::Sale,
            status: TransactionStatus::Completed,
            product_id: 1,
            supplier_id: None,
            user_id: 2,
            total_products: 4,
            total_price: dec!(20.00),
            description: Some("walk-in".into()),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn user_summary_never_carries_password_hash() {
        let user = user::Model {
            id: 2,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            phone_number: "555-0100".into(),
            role: user::UserRole::Manager,
            created_at: Utc::now(),
        };

        let response = TransactionResponse::with_related(sample_row(), None, None, Some(user));
        let json = serde_json::to_string(&response).unwrap();

        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
        assert_eq!(response.user.map(|u| u.email), Some("ada@example.com".into()));
    }

    #[test]
    fn bare_row_omits_nested_objects() {
        let json = serde_json::to_value(TransactionResponse::from_model(sample_row())).unwrap();
        assert_eq!(json["transaction_type"], "SALE");
        assert!(json.get("product").is_none());
        assert!(json.get("user").is_none());
    }

    #[test]
    fn zero_quantity_request_is_invalid() {
        let request = TransactionRequest {
            product_id: 1,
            quantity: 0,
            supplier_id: None,
            description: None,
        };
        assert!(request.validate().is_err());
    }
}
