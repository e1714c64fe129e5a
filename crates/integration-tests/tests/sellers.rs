//! Seller onboarding.
//!
//! Requires a running server. Admin steps run only when
//! `MARKETPLACE_ADMIN_TOKEN` is set. Run with `--ignored`.

use marketplace_integration_tests::{Api, PASSWORD, admin_token, json_body, unique_email};
use reqwest::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running marketplace server"]
async fn test_seller_request_lifecycle() {
    let api = Api::new();
    let email = unique_email("seller");
    let request = json!({
        "name": "Kofi Seller",
        "email": email,
        "password": "correct horse battery staple",
        "businessName": "Kofi Crafts",
        "phone": "+228 90 00 00 00",
    });

    let resp = api
        .send(Method::POST, "/api/sellers/requests", None, Some(request.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let seller = json_body(resp).await;
    assert_eq!(seller["role"], "SELLER");
    assert_eq!(seller["sellerStatus"], "INACTIVE");
    assert_eq!(seller["isActive"], false);
    let seller_id = seller["id"].as_i64().unwrap();

    let resp = api
        .send(Method::POST, "/api/sellers/requests", None, Some(request))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Inactive sellers cannot log in
    let resp = api
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "correct horse battery staple" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let Some(admin) = admin_token() else {
        return;
    };

    let resp = api
        .send(
            Method::PUT,
            &format!("/api/sellers/{seller_id}/status"),
            Some(&admin),
            Some(json!({ "status": "ACTIVE" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let seller = json_body(resp).await;
    assert_eq!(seller["sellerStatus"], "ACTIVE");
    assert_eq!(seller["isActive"], true);

    let resp = api
        .send(Method::GET, "/api/sellers?status=ACTIVE", Some(&admin), None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let sellers = json_body(resp).await;
    assert!(
        sellers
            .as_array()
            .unwrap()
            .iter()
            .any(|s| s["id"].as_i64() == Some(seller_id))
    );
}

#[tokio::test]
#[ignore = "Requires running marketplace server and MARKETPLACE_ADMIN_TOKEN"]
async fn test_suspending_seller_hides_their_products() {
    let Some(admin) = admin_token() else {
        return;
    };
    let api = Api::new();
    let (seller_id, seller) = api.active_seller(&admin).await;
    let first = api.create_product(&seller, "8.00").await;
    let second = api.create_product(&seller, "3.25").await;

    // A buyer carts one of them before the suspension
    let buyer = api.register_buyer().await;
    let resp = api
        .send(
            Method::POST,
            "/api/orders/cart",
            Some(&buyer),
            Some(json!({ "productId": first, "quantity": 1 })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let updated = api
        .set_seller_status(&admin, seller_id, "SUSPENDED")
        .await;
    assert_eq!(updated["sellerStatus"], "SUSPENDED");
    assert_eq!(updated["isActive"], false);

    for product_id in [first, second] {
        let path = format!("/api/products/{product_id}");
        let resp = api.send(Method::GET, &path, None, None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = api.send(Method::GET, &path, Some(&admin), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["isVisible"], false);
    }

    let resp = api
        .send(Method::GET, "/api/products", None, None)
        .await;
    let listed = json_body(resp).await;
    assert!(
        !listed
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["createdById"].as_i64() == Some(seller_id))
    );

    // Carted lines for hidden products are neither shown nor ordered
    let resp = api
        .send(Method::GET, "/api/orders/cart", Some(&buyer), None)
        .await;
    assert!(json_body(resp).await["items"].as_array().unwrap().is_empty());

    let resp = api
        .send(
            Method::POST,
            "/api/orders/cart",
            Some(&buyer),
            Some(json!({ "productId": second, "quantity": 1 })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = api
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": updated["email"], "password": PASSWORD })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Reactivation makes the products and the carted line visible again
    api.set_seller_status(&admin, seller_id, "ACTIVE").await;
    let resp = api
        .send(Method::GET, &format!("/api/products/{first}"), None, None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = api
        .send(Method::GET, "/api/orders/cart", Some(&buyer), None)
        .await;
    let cart = json_body(resp).await;
    assert_eq!(cart["items"][0]["productId"], first);
}
