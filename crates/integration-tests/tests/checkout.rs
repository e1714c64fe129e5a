//! Cart → order → payment scenarios.
//!
//! Requires a running server and a seeded catalog. Admin confirmation steps
//! run only when `MARKETPLACE_ADMIN_TOKEN` is set. Run with `--ignored`.

use marketplace_integration_tests::{Api, admin_token, decimal, json_body, unique_email};
use reqwest::{Method, Response, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};

fn address() -> Value {
    json!({ "street": "1 Market Street", "city": "Lomé", "country": "TG" })
}

async fn add_to_cart(api: &Api, token: &str, product_id: i64, quantity: i64) -> Response {
    api.send(
        Method::POST,
        "/api/orders/cart",
        Some(token),
        Some(json!({ "productId": product_id, "quantity": quantity })),
    )
    .await
}

#[tokio::test]
#[ignore = "Requires running marketplace server and seeded catalog"]
async fn test_guest_checkout_clears_cart() {
    let api = Api::new();
    let product_id = api.any_product_id().await;
    let price = api.product_price(product_id).await;

    // First add creates an anonymous cart
    let resp = api
        .send(
            Method::POST,
            "/api/orders/cart",
            None,
            Some(json!({ "productId": product_id, "quantity": 2 })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cart = json_body(resp).await;
    let cart_id = cart["cartId"].as_i64().expect("anonymous cart id");
    assert_eq!(cart["items"][0]["quantity"], 2);

    // Adding again increments the same line
    let resp = api
        .send(
            Method::POST,
            "/api/orders/cart",
            None,
            Some(json!({ "productId": product_id, "quantity": 1, "cartId": cart_id })),
        )
        .await;
    let cart = json_body(resp).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["quantity"], 3);

    let resp = api
        .send(
            Method::POST,
            "/api/orders",
            None,
            Some(json!({
                "shippingAddress": address(),
                "paymentMethod": "MOBILE_MONEY",
                "cartId": cart_id,
                "guestInfo": {
                    "firstName": "Ama",
                    "lastName": "Mensah",
                    "email": unique_email("guest"),
                },
            })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order = json_body(resp).await;
    assert!(order["userId"].is_null());
    assert!(order["orderNumber"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(order["isPaid"], false);
    assert_eq!(decimal(&order["totalPrice"]), price * Decimal::from(3));
    assert_eq!(order["items"][0]["quantity"], 3);

    let resp = api
        .send(
            Method::GET,
            &format!("/api/orders/cart?cartId={cart_id}"),
            None,
            None,
        )
        .await;
    let cart = json_body(resp).await;
    assert!(cart["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires running marketplace server"]
async fn test_guest_checkout_without_guest_info_is_rejected() {
    let api = Api::new();

    let resp = api
        .send(
            Method::POST,
            "/api/orders",
            None,
            Some(json!({
                "shippingAddress": address(),
                "paymentMethod": "MOBILE_MONEY",
                "cartId": 1,
            })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running marketplace server"]
async fn test_empty_cart_cannot_be_ordered() {
    let api = Api::new();
    let token = api.register_buyer().await;

    let resp = api
        .send(
            Method::POST,
            "/api/orders",
            Some(&token),
            Some(json!({ "shippingAddress": address(), "paymentMethod": "CASH" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["message"], "cart is empty");
}

#[tokio::test]
#[ignore = "Requires running marketplace server and seeded catalog"]
async fn test_buyer_order_and_payment_flow() {
    let api = Api::new();
    let token = api.register_buyer().await;
    let product_id = api.any_product_id().await;

    let resp = api
        .send(
            Method::POST,
            "/api/orders/cart",
            Some(&token),
            Some(json!({ "productId": product_id, "quantity": 1 })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = api
        .send(
            Method::POST,
            "/api/orders",
            Some(&token),
            Some(json!({ "shippingAddress": address(), "paymentMethod": "MOBILE_MONEY" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order = json_body(resp).await;
    let order_id = order["id"].as_i64().unwrap();

    let resp = api
        .send(Method::GET, "/api/orders/mine", Some(&token), None)
        .await;
    let mine = json_body(resp).await;
    assert!(
        mine.as_array()
            .unwrap()
            .iter()
            .any(|o| o["id"].as_i64() == Some(order_id))
    );

    // Confirming before a code exists is rejected
    let confirm_client = format!("/api/payments/{order_id}/confirm-client");
    let resp = api
        .send(Method::POST, &confirm_client, Some(&token), None)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Another buyer may not touch this order
    let stranger = api.register_buyer().await;
    let generate = format!("/api/payments/{order_id}/generate-code");
    let resp = api.send(Method::POST, &generate, Some(&stranger), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Code generation is stable across calls
    let resp = api.send(Method::POST, &generate, Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let code = json_body(resp).await["paymentCode"].as_str().unwrap().to_owned();
    assert_eq!(code.len(), 6);
    let resp = api.send(Method::POST, &generate, Some(&token), None).await;
    assert_eq!(json_body(resp).await["paymentCode"], code.as_str());

    let resp = api
        .send(Method::POST, &confirm_client, Some(&token), None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let order = json_body(resp).await;
    assert_eq!(order["clientConfirmedPayment"], true);
    assert_eq!(order["isPaid"], false);

    let Some(admin) = admin_token() else {
        return;
    };

    let confirm_admin = format!("/api/payments/{order_id}/confirm-admin");
    let resp = api
        .send(Method::POST, &confirm_admin, Some(&token), None)
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = api
        .send(Method::POST, &confirm_admin, Some(&admin), None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let order = json_body(resp).await;
    assert_eq!(order["isPaid"], true);
    assert_eq!(order["isConfirmedByAdmin"], true);

    // Paid orders cannot get a new code
    let resp = api.send(Method::POST, &generate, Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = api
        .send(
            Method::GET,
            &format!("/api/orders/{order_id}/events"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let kinds: Vec<String> = json_body(resp)
        .await
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["eventType"].as_str().map(str::to_owned))
        .collect();
    assert!(kinds.contains(&"order.placed".to_owned()));
    assert!(kinds.contains(&"payment.admin_confirmed".to_owned()));
}

#[tokio::test]
#[ignore = "Requires running marketplace server and seeded catalog"]
async fn test_removing_absent_product_leaves_cart_unchanged() {
    let api = Api::new();
    let token = api.register_buyer().await;
    let product_id = api.any_product_id().await;

    let resp = api
        .send(
            Method::POST,
            "/api/orders/cart",
            Some(&token),
            Some(json!({ "productId": product_id, "quantity": 2 })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = api
        .send(
            Method::DELETE,
            "/api/orders/cart",
            Some(&token),
            Some(json!({ "productId": i32::MAX })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cart = json_body(resp).await;
    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["productId"], product_id);
    assert_eq!(items[0]["quantity"], 2);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and seeded catalog"]
async fn test_cart_line_quantity_is_capped() {
    let api = Api::new();
    let token = api.register_buyer().await;
    let product_id = api.any_product_id().await;

    let resp = add_to_cart(&api, &token, product_id, i64::from(i32::MAX)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = add_to_cart(&api, &token, product_id, 10_000).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Growing the line past the cap is refused and leaves it as it was
    let resp = add_to_cart(&api, &token, product_id, 1).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(
        json_body(resp)
            .await["message"]
            .as_str()
            .unwrap()
            .contains("at most")
    );

    let resp = api
        .send(Method::GET, "/api/orders/cart", Some(&token), None)
        .await;
    let cart = json_body(resp).await;
    assert_eq!(cart["items"][0]["quantity"], 10_000);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and MARKETPLACE_ADMIN_TOKEN"]
async fn test_oversized_order_total_is_rejected() {
    let Some(admin) = admin_token() else {
        return;
    };
    let api = Api::new();
    let (_, seller) = api.active_seller(&admin).await;
    let product_id = api.create_product(&seller, "9999999999.00").await;
    let buyer = api.register_buyer().await;

    let resp = api
        .send(
            Method::POST,
            "/api/orders/cart",
            Some(&buyer),
            Some(json!({ "productId": product_id, "quantity": 2 })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = api
        .send(
            Method::POST,
            "/api/orders",
            Some(&buyer),
            Some(json!({ "shippingAddress": address(), "paymentMethod": "CASH" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(
        json_body(resp)
            .await["message"]
            .as_str()
            .unwrap()
            .contains("exceeds the maximum")
    );

    // The cart is untouched and can be fixed by the buyer
    let resp = api
        .send(Method::GET, "/api/orders/cart", Some(&buyer), None)
        .await;
    assert_eq!(json_body(resp).await["items"][0]["quantity"], 2);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and MARKETPLACE_ADMIN_TOKEN"]
async fn test_second_admin_confirmation_changes_nothing() {
    let Some(admin) = admin_token() else {
        return;
    };
    let api = Api::new();
    let token = api.register_buyer().await;
    let product_id = api.any_product_id().await;
    let order = api.order_product(&token, product_id, 1).await;
    let order_id = order["id"].as_i64().unwrap();
    let order_number = order["orderNumber"].as_str().unwrap().to_owned();

    let confirm_admin = format!("/api/payments/{order_id}/confirm-admin");
    let resp = api
        .send(Method::POST, &confirm_admin, Some(&admin), None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let first = json_body(resp).await;

    let resp = api
        .send(Method::POST, &confirm_admin, Some(&admin), None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second = json_body(resp).await;
    assert_eq!(second["isPaid"], true);
    assert_eq!(second["isConfirmedByAdmin"], true);
    assert_eq!(second["paidAt"], first["paidAt"]);
    assert_eq!(second["confirmedAt"], first["confirmedAt"]);

    let confirmations = api
        .event_types(&admin, order_id)
        .await
        .into_iter()
        .filter(|kind| kind == "payment.admin_confirmed")
        .count();
    assert_eq!(confirmations, 1);

    let resp = api
        .send(Method::GET, "/api/notifications", Some(&token), None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let expected = format!("Payment for order {order_number} is confirmed");
    let notices = json_body(resp)
        .await
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["message"] == expected.as_str())
        .count();
    assert_eq!(notices, 1);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and MARKETPLACE_ADMIN_TOKEN"]
async fn test_clearing_is_paid_restarts_payment_workflow() {
    let Some(admin) = admin_token() else {
        return;
    };
    let api = Api::new();
    let token = api.register_buyer().await;
    let product_id = api.any_product_id().await;
    let order_id = api.order_product(&token, product_id, 1).await["id"]
        .as_i64()
        .unwrap();

    let generate = format!("/api/payments/{order_id}/generate-code");
    let confirm_admin = format!("/api/payments/{order_id}/confirm-admin");
    let status = format!("/api/orders/{order_id}/status");

    let resp = api.send(Method::POST, &generate, Some(&token), None).await;
    let code = json_body(resp).await["paymentCode"].clone();
    let resp = api
        .send(Method::POST, &confirm_admin, Some(&admin), None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = api
        .send(
            Method::PUT,
            &status,
            Some(&admin),
            Some(json!({ "isPaid": false })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let order = json_body(resp).await;
    assert_eq!(order["isPaid"], false);
    assert!(order["paidAt"].is_null());
    assert_eq!(order["isConfirmedByAdmin"], false);
    assert!(order["confirmedAt"].is_null());
    assert_eq!(order["clientConfirmedPayment"], false);

    // The issued code is still valid and the workflow can finish again
    let resp = api.send(Method::POST, &generate, Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["paymentCode"], code);

    let resp = api
        .send(Method::POST, &confirm_admin, Some(&admin), None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let order = json_body(resp).await;
    assert_eq!(order["isPaid"], true);
    assert_eq!(order["isConfirmedByAdmin"], true);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and MARKETPLACE_ADMIN_TOKEN"]
async fn test_shared_order_is_scoped_per_seller() {
    let Some(admin) = admin_token() else {
        return;
    };
    let api = Api::new();
    let (first_id, first) = api.active_seller(&admin).await;
    let (second_id, second) = api.active_seller(&admin).await;
    let first_product = api.create_product(&first, "12.50").await;
    let second_product = api.create_product(&second, "4.00").await;

    let buyer = api.register_buyer().await;
    let resp = api
        .send(
            Method::POST,
            "/api/orders/cart",
            Some(&buyer),
            Some(json!({ "productId": first_product, "quantity": 2 })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let order = api.order_product(&buyer, second_product, 3).await;
    let order_id = order["id"].as_i64().unwrap();
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(decimal(&order["totalPrice"]), Decimal::new(3700, 2));

    for (seller_id, token, product_id) in [
        (first_id, &first, first_product),
        (second_id, &second, second_product),
    ] {
        let resp = api
            .send(Method::GET, "/api/orders/all", Some(token), None)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let orders = json_body(resp).await;
        let shared = orders
            .as_array()
            .unwrap()
            .iter()
            .find(|o| o["id"].as_i64() == Some(order_id))
            .expect("shared order listed for seller");
        let items = shared["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["productId"], product_id);
        assert_eq!(items[0]["sellerId"], seller_id);
    }

    // Sellers may mark delivery but not payment
    let status = format!("/api/orders/{order_id}/status");
    let resp = api
        .send(Method::PUT, &status, Some(&first), Some(json!({ "isPaid": true })))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = api
        .send(
            Method::PUT,
            &status,
            Some(&first),
            Some(json!({ "isDelivered": true })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let order = json_body(resp).await;
    assert_eq!(order["isDelivered"], true);
    assert_eq!(order["isPaid"], false);
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
}
