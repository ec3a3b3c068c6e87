mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn health_probes_are_public() {
    let app = TestApp::new().await;

    for uri in ["/health", "/health/live", "/status"] {
        let response = app.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }
}

#[tokio::test]
async fn request_id_is_echoed_back() {
    let app = TestApp::new().await;

    let request = axum::http::Request::builder()
        .uri("/health")
        .header("x-request-id", "api-test-42")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(inventory_api::app_router(app.state.clone()), request)
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "api-test-42"
    );
}

#[tokio::test]
async fn ledger_routes_require_a_token() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/transactions/all", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/transactions/all", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_then_login_issues_a_bearer_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "name": "Nina Newcomer",
                "email": "Nina@Example.com",
                "password": "s3cret-pass",
                "phone_number": "555-0199"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["email"], "nina@example.com");
    assert_eq!(body["data"]["role"], "MANAGER");
    assert!(body["data"].get("password").is_none());

    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "nina@example.com", "password": "s3cret-pass" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["role"], "MANAGER");

    let response = app
        .request(Method::GET, "/api/users/current", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["email"], "nina@example.com");
}

#[tokio::test]
async fn bad_credentials_and_duplicate_emails_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "admin@example.com", "password": "wrong-password" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "nobody@example.com", "password": "password123" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "name": "Impostor",
                "email": "ADMIN@example.com",
                "password": "password123",
                "phone_number": "555-0000"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn catalog_writes_are_admin_only() {
    let app = TestApp::new().await;

    let response = app
        .request_as_manager(
            Method::POST,
            "/api/categories/add",
            Some(json!({ "name": "Tools" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_as_admin(
            Method::POST,
            "/api/categories/add",
            Some(json!({ "name": "Tools" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request_as_manager(Method::GET, "/api/categories/all", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"][0]["name"], "Tools");
}

#[tokio::test]
async fn full_ledger_flow_over_http() {
    let app = TestApp::new().await;

    let category = response_json(
        app.request_as_admin(
            Method::POST,
            "/api/categories/add",
            Some(json!({ "name": "Hardware" })),
        )
        .await,
    )
    .await;
    let category_id = category["data"]["id"].as_i64().unwrap();

    let supplier = response_json(
        app.request_as_admin(
            Method::POST,
            "/api/suppliers/add",
            Some(json!({ "name": "Acme", "contact_info": "acme@example.com" })),
        )
        .await,
    )
    .await;
    let supplier_id = supplier["data"]["id"].as_i64().unwrap();

    let response = app
        .request_as_admin(
            Method::POST,
            "/api/products/add",
            Some(json!({
                "category_id": category_id,
                "name": "Widget",
                "sku": "WID-1",
                "price": "5.00",
                "stock_quantity": 10
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let product_id = response_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request_as_manager(
            Method::POST,
            "/api/transactions/purchase",
            Some(json!({ "product_id": product_id, "supplier_id": supplier_id, "quantity": 3 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let purchase = response_json(response).await;
    assert_eq!(purchase["success"], true);
    assert_eq!(purchase["data"]["transaction_type"], "PURCHASE");
    assert_eq!(purchase["data"]["status"], "COMPLETED");
    assert_eq!(purchase["data"]["product"]["stock_quantity"], 13);

    let response = app
        .request_as_manager(
            Method::POST,
            "/api/transactions/sell",
            Some(json!({ "product_id": product_id, "quantity": 4, "description": "counter sale" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let sale_id = response_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request_as_manager(
            Method::POST,
            "/api/transactions/return",
            Some(json!({ "product_id": product_id, "quantity": 1 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_as_manager(
            Method::POST,
            "/api/transactions/sell",
            Some(json!({ "product_id": product_id, "quantity": 0 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_as_manager(
            Method::POST,
            "/api/transactions/sell",
            Some(json!({ "product_id": 9999, "quantity": 1 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error = response_json(response).await;
    assert_eq!(error["error"], "Not Found");

    assert_eq!(app.stock_of(product_id as i32).await, 9);

    let response = app
        .request_as_manager(
            Method::GET,
            "/api/transactions/all?page=0&size=10&searchText=widget",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = response_json(response).await;
    assert_eq!(page["data"]["total_elements"], 2);
    assert_eq!(page["data"]["items"][0]["id"], sale_id);
    assert_eq!(page["data"]["items"][0]["transaction_type"], "SALE");

    let response = app
        .request_as_manager(
            Method::PUT,
            &format!("/api/transactions/update/{}", sale_id),
            Some(json!("CANCELLED")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = response_json(response).await;
    assert_eq!(updated["data"]["status"], "CANCELLED");
    assert_eq!(app.stock_of(product_id as i32).await, 9);

    let response = app
        .request_as_manager(Method::GET, &format!("/api/transactions/{}", sale_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = response_json(response).await;
    assert_eq!(fetched["data"]["status"], "CANCELLED");
    assert_eq!(fetched["data"]["user"]["id"], app.manager.id);

    let response = app
        .request_as_manager(
            Method::GET,
            "/api/transactions/by-month-year?month=13&year=2024",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_as_admin(
            Method::DELETE,
            &format!("/api/products/delete/{}", product_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request_as_admin(
            Method::DELETE,
            &format!("/api/categories/delete/{}", category_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn categories_can_be_reordered() {
    let app = TestApp::new().await;
    let first = app.seed_category("First").await;
    let second = app.seed_category("Second").await;
    let third = app.seed_category("Third").await;

    let response = app
        .request_as_admin(
            Method::PUT,
            "/api/categories/reorder",
            Some(json!([third.id, first.id, second.id])),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Third", "First", "Second"]);

    let response = app
        .request_as_admin(
            Method::PUT,
            "/api/categories/reorder",
            Some(json!([first.id, first.id])),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn managers_only_touch_their_own_account() {
    let app = TestApp::new().await;

    let response = app
        .request_as_manager(
            Method::PUT,
            &format!("/api/users/update/{}", app.admin.id),
            Some(json!({ "name": "Hijacked" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_as_manager(
            Method::PUT,
            &format!("/api/users/update/{}", app.manager.id),
            Some(json!({ "role": "ADMIN" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_as_manager(
            Method::PUT,
            &format!("/api/users/update/{}", app.manager.id),
            Some(json!({ "name": "Max Renamed" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["data"]["name"], "Max Renamed");

    let response = app
        .request_as_manager(Method::GET, "/api/users/all", None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_as_admin(Method::GET, "/api/users/all", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn user_history_is_visible_to_self_and_admins() {
    let app = TestApp::new().await;
    let category = app.seed_category("Hardware").await;
    let product = app.seed_product(category.id, "H-1", dec!(4.00), 5).await;

    let response = app
        .request_as_manager(
            Method::POST,
            "/api/transactions/sell",
            Some(json!({ "product_id": product.id, "quantity": 2 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request_as_admin(
            Method::GET,
            &format!("/api/users/transactions/{}", app.manager.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["transactions"][0]["total_products"], 2);

    let response = app
        .request_as_manager(
            Method::GET,
            &format!("/api/users/transactions/{}", app.admin.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
