//! The storefront JSON API driven through `tower::ServiceExt::oneshot`,
//! session cookie round trips included.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use taraba_checkout::remote::PricingApi;
use taraba_integration_tests::fixtures;
use taraba_integration_tests::mock::ScriptedPricingApi;
use tower::ServiceExt;

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

/// The session cookie pair from a response, ready for a `Cookie` header.
fn session_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response sets the session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_owned()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn app() -> Router {
    fixtures::app(Arc::new(ScriptedPricingApi::new()))
}

#[tokio::test]
async fn counties_are_listed_in_full() {
    let app = app();
    let response = send(&app, get("/api/address/counties", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let counties = body.as_array().unwrap();
    assert_eq!(counties.len(), 42);
    assert!(
        counties
            .iter()
            .any(|c| c["code"] == "B" && c["name"] == "Bucuresti")
    );
}

#[tokio::test]
async fn localities_resolve_by_code_and_by_free_text() {
    let app = app();

    let by_code = body_json(send(&app, get("/api/address/counties/CJ/localities", None)).await).await;
    assert_eq!(by_code, json!(["Cluj-Napoca", "Floresti", "Măguri"]));

    let by_name =
        body_json(send(&app, get("/api/address/counties/cluj/localities", None)).await).await;
    assert_eq!(by_name, by_code);
}

#[tokio::test]
async fn unknown_county_is_not_found() {
    let app = app();
    let response = send(&app, get("/api/address/counties/Atlantis/localities", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn cart_persists_across_requests_through_the_cookie() {
    let app = app();

    let add = json!({
        "id": 1,
        "cart_item_id": "slot-1",
        "unit_price": "120",
        "quantity": 2
    });
    let response = send(&app, post("/api/cart/add", None, &add)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);

    let body = body_json(response).await;
    assert_eq!(body["summary"]["subtotal"], "240");
    assert_eq!(body["summary"]["item_count"], 2);

    // Same cookie, same cart.
    let body = body_json(send(&app, get("/api/cart", Some(&cookie))).await).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["cart_item_id"], "slot-1");

    // No cookie, fresh shopper, empty cart.
    let body = body_json(send(&app, get("/api/cart", None)).await).await;
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn coupon_apply_waits_for_the_verdict() {
    let api = Arc::new(ScriptedPricingApi::new());
    api.script_coupon("VARA10", dec!(25));
    let app = fixtures::app(Arc::clone(&api) as Arc<dyn PricingApi>);

    let response = send(
        &app,
        post("/api/coupon/apply", None, &json!({"code": "VARA10"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);

    let body = body_json(response).await;
    assert_eq!(body["status"], "applied");
    assert_eq!(body["code"], "VARA10");
    assert_eq!(body["discount"], "25");
    assert_eq!(body["manual"], true);

    // The verdict is visible on a later read of the same session.
    let body = body_json(send(&app, get("/api/coupon", Some(&cookie))).await).await;
    assert_eq!(body["status"], "applied");
}

#[tokio::test]
async fn blank_coupon_code_is_a_bad_request() {
    let app = app();
    let response = send(
        &app,
        post("/api/coupon/apply", None, &json!({"code": "   "})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn submitting_an_empty_checkout_reports_every_missing_field() {
    let app = app();
    let response = send(
        &app,
        post("/api/checkout/submit", None, &json!({"shipping_instance": 7})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "missing_fields");
    let fields = body["fields"].as_array().unwrap();
    assert!(fields.contains(&json!("email")));
    assert!(fields.contains(&json!("billing_county")));
    assert!(fields.contains(&json!("delivery_method")));
    assert!(fields.contains(&json!("payment_method")));
}

#[tokio::test]
async fn locker_outside_the_match_set_is_not_found() {
    let app = app();
    let response = send(
        &app,
        post("/api/checkout/locker", None, &json!({"locker_id": "L9"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_checkout_over_http_places_the_order() {
    let api = Arc::new(ScriptedPricingApi::new());
    let app = fixtures::app(Arc::clone(&api) as Arc<dyn PricingApi>);

    let add = json!({
        "id": 1,
        "cart_item_id": "slot-1",
        "unit_price": "150"
    });
    let response = send(&app, post("/api/cart/add", None, &add)).await;
    let cookie = session_cookie(&response);

    let contact = json!({
        "email": "ana@example.com",
        "phone": "0722000000",
        "first_name": "Ana",
        "last_name": "Pop"
    });
    let response = send(&app, post("/api/checkout/contact", Some(&cookie), &contact)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let billing = json!({
        "county": "Cluj",
        "locality": "Cluj-Napoca",
        "commune": null,
        "address1": "Str. Lunga 1",
        "address2": "",
        "postcode": "400001",
        "country": "Romania"
    });
    let response = send(&app, post("/api/checkout/billing", Some(&cookie), &billing)).await;
    let view = body_json(response).await;
    // The mirror invariant shows up in the returned draft.
    assert_eq!(view["draft"]["shipping"]["county"], "Cluj");

    send(
        &app,
        post(
            "/api/checkout/delivery-method",
            Some(&cookie),
            &json!({"method": "courier"}),
        ),
    )
    .await;
    send(
        &app,
        post(
            "/api/checkout/payment-method",
            Some(&cookie),
            &json!({"payment_method": 3}),
        ),
    )
    .await;

    let view = body_json(send(&app, get("/api/checkout", Some(&cookie))).await).await;
    assert!(view["missing_fields"].as_array().unwrap().is_empty());
    assert_eq!(view["summary"]["grand_total"], "167");

    let response = send(
        &app,
        post(
            "/api/checkout/submit",
            Some(&cookie),
            &json!({"shipping_instance": 7}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["number"], "10042");
    assert_eq!(order["key"], "cheie-comanda");

    let submissions = api.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].billing.locality, "Cluj-Napoca");

    // The session survives but the checkout is reset.
    let body = body_json(send(&app, get("/api/cart", Some(&cookie))).await).await;
    assert!(body["items"].as_array().unwrap().is_empty());
}
