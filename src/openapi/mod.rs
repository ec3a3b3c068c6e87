use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// Registers the `bearer_auth` scheme referenced by the handlers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory API",
        version = "1.0.0",
        description = r#"
# Inventory Transaction Ledger API

Tracks product stock through an append-only ledger of purchases, sales and
returns to suppliers.

## Features

- **Transactions**: Record purchases, sales and returns; each one adjusts stock atomically
- **Ledger queries**: Paged free-text search, lookup by id, monthly reports
- **Catalog**: Products, categories and suppliers with explicit display order
- **Users**: ADMIN and MANAGER roles

## Authentication

Every endpoint except `/api/auth/*`, `/health` and `/status` requires a JWT
obtained from `/api/auth/login`:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Errors share one body:

```json
{
  "error": "Not Found",
  "message": "Not found: Product 9999 not found",
  "request_id": "0d6c...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

`GET /api/transactions/all` takes `page` (zero-indexed), `size` and
`searchText`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "transactions", description = "Stock movements and ledger queries"),
        (name = "products", description = "Product catalog"),
        (name = "categories", description = "Product categories"),
        (name = "suppliers", description = "Suppliers"),
        (name = "users", description = "User management")
    ),
    paths(
        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,

        // Transactions
        crate::handlers::transactions::restock_inventory,
        crate::handlers::transactions::sell,
        crate::handlers::transactions::return_to_supplier,
        crate::handlers::transactions::list_transactions,
        crate::handlers::transactions::get_transaction,
        crate::handlers::transactions::transactions_by_month_year,
        crate::handlers::transactions::update_transaction_status,

        // Products
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::reorder_products,

        // Categories
        crate::handlers::categories::create_category,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,
        crate::handlers::categories::reorder_categories,

        // Suppliers
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::delete_supplier,

        // Users
        crate::handlers::users::list_users,
        crate::handlers::users::current_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::users::user_transactions,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::ResponseMeta,

            crate::dto::TransactionRequest,
            crate::dto::TransactionResponse,
            crate::dto::TransactionPageResponse,
            crate::entities::transaction::TransactionType,
            crate::entities::transaction::TransactionStatus,

            crate::dto::ProductResponse,
            crate::dto::CreateProductRequest,
            crate::dto::UpdateProductRequest,
            crate::dto::ProductOrderEntry,
            crate::dto::CategoryResponse,
            crate::dto::CategoryRequest,
            crate::dto::SupplierResponse,
            crate::dto::SupplierRequest,

            crate::dto::UserResponse,
            crate::dto::UserTransactionsResponse,
            crate::dto::RegisterRequest,
            crate::dto::LoginRequest,
            crate::dto::LoginResponse,
            crate::dto::UpdateUserRequest,
            crate::entities::user::UserRole,

            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_ledger_routes_and_bearer_scheme() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Inventory API"));
        assert!(json.contains("/api/transactions/purchase"));
        assert!(json.contains("/api/transactions/by-month-year"));
        assert!(json.contains("bearer_auth"));
    }
}
