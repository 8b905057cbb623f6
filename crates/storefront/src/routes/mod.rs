//! HTTP route handlers for the checkout API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check
//!
//! # Cart
//! GET  /api/cart                        - Cart contents and totals
//! POST /api/cart/add                    - Add a line item
//! POST /api/cart/update                 - Change a slot's quantity
//! POST /api/cart/remove                 - Remove a slot
//!
//! # Coupon
//! GET  /api/coupon                      - Current coupon state
//! POST /api/coupon/apply                - Submit a code, wait for verdict
//! POST /api/coupon/remove               - Drop the coupon
//!
//! # Address reference data
//! GET  /api/address/counties                                    - County list
//! GET  /api/address/counties/{county}/localities                - Localities
//! GET  /api/address/counties/{county}/localities/{loc}/communes - Communes
//!
//! # Checkout
//! GET  /api/checkout                    - Full checkout view
//! POST /api/checkout/contact            - Update the contact block
//! POST /api/checkout/billing            - Update the billing address
//! POST /api/checkout/shipping           - Update the shipping address
//! POST /api/checkout/shipping-mode      - Toggle mirrored shipping
//! POST /api/checkout/delivery-method    - Choose courier/locker/pickup
//! POST /api/checkout/payment-method     - Choose the payment method
//! POST /api/checkout/company            - Set or clear the company block
//! GET  /api/checkout/lockers            - Lockers matching the address
//! POST /api/checkout/locker             - Select a locker
//! POST /api/checkout/customer-check     - Advisory customer lookup
//! POST /api/checkout/submit             - Submit the order
//! ```

pub mod address;
pub mod cart;
pub mod checkout;
pub mod coupon;

use axum::Router;
use axum::routing::{get, post};
use tower_sessions::Session;

use crate::error::Result;
use crate::middleware::checkout_session_id;
use crate::state::{AppState, SharedCheckout};

/// Resolve the shopper's checkout session from the cookie session.
pub(crate) async fn shopper(state: &AppState, session: &Session) -> Result<SharedCheckout> {
    let id = checkout_session_id(session).await?;
    Ok(state.checkout(&id).await)
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the coupon routes router.
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(coupon::show))
        .route("/apply", post(coupon::apply))
        .route("/remove", post(coupon::remove))
}

/// Create the address reference data router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/counties", get(address::counties))
        .route("/counties/{county}/localities", get(address::localities))
        .route(
            "/counties/{county}/localities/{locality}/communes",
            get(address::communes),
        )
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/contact", post(checkout::update_contact))
        .route("/billing", post(checkout::update_billing))
        .route("/shipping", post(checkout::update_shipping))
        .route("/shipping-mode", post(checkout::set_shipping_mode))
        .route("/delivery-method", post(checkout::set_delivery_method))
        .route("/payment-method", post(checkout::set_payment_method))
        .route("/company", post(checkout::set_company))
        .route("/lockers", get(checkout::lockers))
        .route("/locker", post(checkout::select_locker))
        .route("/customer-check", post(checkout::customer_check))
        .route("/submit", post(checkout::submit))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/cart", cart_routes())
        .nest("/api/coupon", coupon_routes())
        .nest("/api/address", address_routes())
        .nest("/api/checkout", checkout_routes())
}
