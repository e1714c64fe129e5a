//! Integration tests for the marketplace API.
//!
//! # Running Tests
//!
//! ```bash
//! # Database up, migrated and seeded with at least one visible product
//! mp-cli migrate
//! mp-cli seed catalog data/catalog.yaml
//!
//! # Server running
//! cargo run -p marketplace-api
//!
//! # Admin-only scenarios need a token
//! export MARKETPLACE_ADMIN_TOKEN=$(mp-cli token issue -e admin@example.com)
//!
//! cargo test -p marketplace-integration-tests -- --ignored
//! ```
//!
//! `MARKETPLACE_BASE_URL` overrides the default `http://localhost:4000`.

use reqwest::{Client, Method, Response, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use uuid::Uuid;

/// Password used for every account these tests create.
pub const PASSWORD: &str = "correct horse battery staple";

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("MARKETPLACE_BASE_URL").unwrap_or_else(|_| "http://localhost:4000".to_string())
}

/// Admin bearer token from the environment, if provided.
#[must_use]
pub fn admin_token() -> Option<String> {
    std::env::var("MARKETPLACE_ADMIN_TOKEN").ok()
}

/// A unique address so reruns never collide.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// Thin client over the JSON API.
#[derive(Clone)]
pub struct Api {
    client: Client,
    base_url: String,
}

impl Default for Api {
    fn default() -> Self {
        Self::new()
    }
}

impl Api {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: base_url(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request with an optional bearer token and JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the server is unreachable.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.expect("Failed to reach marketplace API")
    }

    /// Register a fresh buyer and return their token.
    ///
    /// # Panics
    ///
    /// Panics if registration does not return 201 with a token.
    pub async fn register_buyer(&self) -> String {
        let resp = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": "Test Buyer",
                    "email": unique_email("buyer"),
                    "password": PASSWORD,
                })),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = json_body(resp).await;
        body["token"]
            .as_str()
            .expect("token missing from session")
            .to_owned()
    }

    /// ID of the first visible product in the catalog.
    ///
    /// # Panics
    ///
    /// Panics if the catalog is empty.
    pub async fn any_product_id(&self) -> i64 {
        let resp = self
            .send(Method::GET, "/api/products", None, None)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let products = json_body(resp).await;
        products[0]["id"]
            .as_i64()
            .expect("No visible products; seed the catalog first")
    }

    /// Put `quantity` of a product in the caller's cart and check out.
    /// Returns the placed order.
    ///
    /// # Panics
    ///
    /// Panics if either step fails.
    pub async fn order_product(&self, token: &str, product_id: i64, quantity: i64) -> Value {
        let resp = self
            .send(
                Method::POST,
                "/api/orders/cart",
                Some(token),
                Some(json!({ "productId": product_id, "quantity": quantity })),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        self.checkout(token).await
    }

    /// Check out the caller's current cart.
    ///
    /// # Panics
    ///
    /// Panics unless the order is created.
    pub async fn checkout(&self, token: &str) -> Value {
        let resp = self
            .send(
                Method::POST,
                "/api/orders",
                Some(token),
                Some(json!({
                    "shippingAddress": { "street": "1 Market Street", "city": "Lomé" },
                    "paymentMethod": "MOBILE_MONEY",
                })),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        json_body(resp).await
    }

    /// Submit a seller request, activate it as `admin` and log in.
    /// Returns the seller's id and token.
    ///
    /// # Panics
    ///
    /// Panics if any step fails.
    pub async fn active_seller(&self, admin: &str) -> (i64, String) {
        let email = unique_email("seller");
        let resp = self
            .send(
                Method::POST,
                "/api/sellers/requests",
                None,
                Some(json!({
                    "name": "Test Seller",
                    "email": email,
                    "password": PASSWORD,
                    "businessName": "Test Crafts",
                })),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let seller_id = json_body(resp).await["id"].as_i64().expect("seller id");

        self.set_seller_status(admin, seller_id, "ACTIVE").await;

        let resp = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let token = json_body(resp).await["token"]
            .as_str()
            .expect("token missing from session")
            .to_owned();
        (seller_id, token)
    }

    /// Change a seller's status as `admin`.
    ///
    /// # Panics
    ///
    /// Panics unless the update succeeds.
    pub async fn set_seller_status(&self, admin: &str, seller_id: i64, status: &str) -> Value {
        let resp = self
            .send(
                Method::PUT,
                &format!("/api/sellers/{seller_id}/status"),
                Some(admin),
                Some(json!({ "status": status })),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        json_body(resp).await
    }

    /// Create a product as a seller and return its id.
    ///
    /// # Panics
    ///
    /// Panics unless the product is created.
    pub async fn create_product(&self, token: &str, price: &str) -> i64 {
        let resp = self
            .send(
                Method::POST,
                "/api/products",
                Some(token),
                Some(json!({
                    "name": format!("Basket {}", Uuid::new_v4().simple()),
                    "price": price,
                    "stock": 10,
                })),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        json_body(resp).await["id"].as_i64().expect("product id")
    }

    /// Current catalog price of a visible product.
    ///
    /// # Panics
    ///
    /// Panics if the product is missing or the price is not a decimal.
    pub async fn product_price(&self, product_id: i64) -> Decimal {
        let resp = self
            .send(Method::GET, &format!("/api/products/{product_id}"), None, None)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        decimal(&json_body(resp).await["price"])
    }

    /// Event types recorded for an order, oldest first.
    ///
    /// # Panics
    ///
    /// Panics unless the history can be read with `admin`.
    pub async fn event_types(&self, admin: &str, order_id: i64) -> Vec<String> {
        let resp = self
            .send(
                Method::GET,
                &format!("/api/orders/{order_id}/events"),
                Some(admin),
                None,
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        json_body(resp)
            .await
            .as_array()
            .expect("events array")
            .iter()
            .filter_map(|e| e["eventType"].as_str().map(str::to_owned))
            .collect()
    }
}

/// Parse a JSON decimal, sent as a string.
///
/// # Panics
///
/// Panics if the value is not a decimal string.
#[must_use]
pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("decimal string")
}

/// Parse a response body as JSON.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn json_body(resp: Response) -> Value {
    resp.json().await.expect("Response body is not JSON")
}
