//! HTTP route handlers for the marketplace API.
//!
//! Every body is JSON; errors are `{ "message": ... }`.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database)
//!
//! # Auth (strict rate limit)
//! POST /api/auth/register               - Register a buyer
//! POST /api/auth/login                  - Issue a bearer token
//! GET  /api/auth/me                     - Current identity
//!
//! # Catalog
//! GET  /api/products                    - Visible products (?categoryId, ?search)
//! POST /api/products                    - Create (seller/admin)
//! GET  /api/products/{id}               - Detail
//! PUT  /api/products/{id}               - Edit (owner/admin)
//! DELETE /api/products/{id}             - Delete (owner/admin)
//! GET  /api/products/{id}/reviews       - Reviews
//! POST /api/products/{id}/reviews       - Add review (auth)
//! GET  /api/categories                  - Categories
//! POST /api/categories                  - Create (admin)
//!
//! # Cart (auth optional; anonymous callers pass cartId)
//! GET  /api/orders/cart                 - Current cart
//! POST /api/orders/cart                 - Add item
//! DELETE /api/orders/cart               - Remove item
//!
//! # Orders
//! POST /api/orders                      - Checkout (auth optional, guests allowed)
//! GET  /api/orders                      - Caller's orders
//! GET  /api/orders/mine                 - Caller's orders
//! POST /api/orders/create               - Direct order (seller/admin)
//! GET  /api/orders/all                  - Dashboard listing (seller/admin)
//! GET  /api/orders/{id}                 - Detail (seller/admin)
//! PUT  /api/orders/{id}                 - Edit (admin)
//! DELETE /api/orders/{id}               - Delete (admin)
//! PUT  /api/orders/{id}/status          - Paid/delivered flags (seller/admin)
//! PUT  /api/orders/{id}/confirm-payment - Mark paid (seller/admin)
//! GET  /api/orders/{id}/events          - Event history (admin)
//!
//! # Payments
//! POST /api/payments/{order_id}/generate-code  - Issue payment code
//! POST /api/payments/{order_id}/confirm-client - Customer confirms
//! POST /api/payments/{order_id}/confirm-admin  - Admin verifies (admin)
//!
//! # Sellers
//! POST /api/sellers/requests            - Apply (strict rate limit)
//! GET  /api/sellers                     - List (admin, ?status)
//! PUT  /api/sellers/{id}/status         - Change status (admin)
//!
//! # Messaging (auth)
//! GET  /api/notifications               - Inbox
//! POST /api/notifications/{id}/read     - Mark read
//! POST /api/chat/messages               - Send
//! GET  /api/chat/{user_id}              - Conversation
//! ```

pub mod auth;
pub mod cart;
pub mod categories;
pub mod chat;
pub mod extract;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod sellers;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter())
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route(
            "/{id}/reviews",
            get(products::reviews).post(products::add_review),
        )
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new().route("/", get(categories::index).post(categories::create))
}

/// Create the order routes router, cart included.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::mine).post(orders::place))
        .route(
            "/cart",
            get(cart::show).post(cart::add).delete(cart::remove),
        )
        .route("/mine", get(orders::mine))
        .route("/create", post(orders::create))
        .route("/all", get(orders::all))
        .route(
            "/{id}",
            get(orders::show)
                .put(orders::update)
                .delete(orders::delete),
        )
        .route("/{id}/status", put(orders::update_status))
        .route("/{id}/confirm-payment", put(orders::confirm_payment))
        .route("/{id}/events", get(orders::events))
}

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/{order_id}/generate-code", post(payments::generate_code))
        .route("/{order_id}/confirm-client", post(payments::confirm_client))
        .route("/{order_id}/confirm-admin", post(payments::confirm_admin))
}

/// Create the seller routes router.
pub fn seller_routes() -> Router<AppState> {
    Router::new()
        .route("/requests", post(sellers::request))
        .layer(auth_rate_limiter())
        .route("/", get(sellers::index))
        .route("/{id}/status", put(sellers::update_status))
}

/// Create the notification and chat routes router.
pub fn messaging_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(notifications::index))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route("/chat/messages", post(chat::send))
        .route("/chat/{user_id}", get(chat::conversation))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/orders", order_routes())
        .nest("/payments", payment_routes())
        .merge(messaging_routes())
        .layer(api_rate_limiter())
        // Auth-style endpoints carry their own stricter limiter
        .nest("/auth", auth_routes())
        .nest("/sellers", seller_routes());

    Router::new().nest("/api", api)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use marketplace_core::{Role, UserId};

    use super::*;
    use crate::config::{ApiConfig, Environment};
    use crate::models::Identity;

    fn app() -> (Router, AppState) {
        let config = ApiConfig {
            database_url: SecretString::from("postgres://localhost/marketplace_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 4000,
            environment: Environment::Development,
            token_secret: SecretString::from("q8#Vn2!pR5@xL9$wT3^kM7&zB4*cF6(h"),
            token_ttl_hours: 1,
            cors_origin: None,
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/marketplace_test")
            .unwrap();
        let state = AppState::new(config, pool).unwrap();
        (routes().with_state(state.clone()), state)
    }

    fn bearer(state: &AppState, role: Role) -> String {
        let token = state
            .tokens()
            .issue(&Identity {
                user_id: UserId::new(3),
                name: "Ama".to_string(),
                email: "ama@example.com".to_string(),
                role,
            })
            .unwrap();
        format!("Bearer {token}")
    }

    fn request(method: &str, uri: &str, auth: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.7");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_owned()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn message(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["message"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn test_me_requires_token() {
        let (app, _) = app();
        let response = app
            .oneshot(request("GET", "/api/auth/me", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_echoes_identity() {
        let (app, state) = app();
        let auth = bearer(&state, Role::Seller);
        let response = app
            .oneshot(request("GET", "/api/auth/me", Some(&auth), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["role"], "SELLER");
        assert_eq!(body["userId"], 3);
    }

    #[tokio::test]
    async fn test_malformed_cart_body_is_bad_request() {
        let (app, _) = app();
        let response = app
            .oneshot(request(
                "POST",
                "/api/orders/cart",
                None,
                Some(r#"{"quantity":2}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(message(response).await.contains("productId"));
    }

    #[tokio::test]
    async fn test_bad_path_id_is_bad_request() {
        let (app, state) = app();
        let auth = bearer(&state, Role::Admin);
        let response = app
            .oneshot(request("GET", "/api/orders/abc/events", Some(&auth), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_dashboard_routes_reject_buyers() {
        let (app, state) = app();
        let auth = bearer(&state, Role::Buyer);

        let response = app
            .clone()
            .oneshot(request("GET", "/api/orders/all", Some(&auth), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(request(
                "POST",
                "/api/payments/1/confirm-admin",
                Some(&auth),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(message(response).await, "admin access required");
    }

    #[tokio::test]
    async fn test_invalid_token_on_optional_route() {
        let (app, _) = app();
        let response = app
            .oneshot(request(
                "GET",
                "/api/orders/cart",
                Some("Bearer a.b.c"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
