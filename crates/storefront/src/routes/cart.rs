//! Cart route handlers.
//!
//! All cart endpoints respond with the full cart body (items plus derived
//! totals) so the UI never has to merge partial updates.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use taraba_checkout::cart::{LineItem, Personalization};
use taraba_checkout::draft::MemoryKvStore;
use taraba_checkout::session::{CheckoutSession, OrderSummary};
use taraba_core::{CartItemId, Money, ProductId};
use tower_sessions::Session;
use tracing::instrument;

use super::shopper;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Cart contents plus derived totals.
#[derive(Serialize)]
pub struct CartResponse {
    pub items: Vec<LineItem>,
    pub summary: OrderSummary,
}

pub(crate) fn cart_response(checkout: &CheckoutSession<MemoryKvStore>) -> CartResponse {
    CartResponse {
        items: checkout.ledger().items().to_vec(),
        summary: checkout.summary(),
    }
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemBody {
    pub id: ProductId,
    pub cart_item_id: CartItemId,
    pub unit_price: Money,
    #[serde(default)]
    pub unit_price_reduced: Option<Money>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub personalizations: Vec<Personalization>,
}

const fn default_quantity() -> u32 {
    1
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemBody {
    pub cart_item_id: CartItemId,
    pub quantity: u32,
}

/// Remove item request body.
#[derive(Debug, Deserialize)]
pub struct RemoveItemBody {
    pub cart_item_id: CartItemId,
}

/// GET /api/cart
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartResponse>> {
    let shared = shopper(&state, &session).await?;
    let checkout = shared.lock().await;
    Ok(Json(cart_response(&checkout)))
}

/// POST /api/cart/add
#[instrument(skip_all, fields(product = %body.id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<AddItemBody>,
) -> Result<Json<CartResponse>> {
    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    checkout.add_item(LineItem {
        id: body.id,
        cart_item_id: body.cart_item_id,
        unit_price: body.unit_price,
        unit_price_reduced: body.unit_price_reduced,
        quantity: body.quantity,
        personalizations: body.personalizations,
    });
    Ok(Json(cart_response(&checkout)))
}

/// POST /api/cart/update
#[instrument(skip_all, fields(slot = %body.cart_item_id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<UpdateItemBody>,
) -> Result<Json<CartResponse>> {
    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    if !checkout.update_quantity(&body.cart_item_id, body.quantity) {
        return Err(AppError::NotFound(format!(
            "cart item {}",
            body.cart_item_id
        )));
    }
    Ok(Json(cart_response(&checkout)))
}

/// POST /api/cart/remove
#[instrument(skip_all, fields(slot = %body.cart_item_id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RemoveItemBody>,
) -> Result<Json<CartResponse>> {
    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    if checkout.remove_item(&body.cart_item_id).is_none() {
        return Err(AppError::NotFound(format!(
            "cart item {}",
            body.cart_item_id
        )));
    }
    Ok(Json(cart_response(&checkout)))
}
