//! Coupon route handlers.
//!
//! `apply` waits for the authority's verdict so the UI gets a definitive
//! answer in one round trip; silent revalidation after cart changes happens
//! inside the engine and surfaces through `GET /api/coupon` polling or the
//! checkout view.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use taraba_checkout::coupon::{CouponSnapshot, CouponState};
use taraba_core::Money;
use tower_sessions::Session;
use tracing::instrument;

use super::shopper;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Flattened coupon state for the UI.
#[derive(Debug, Serialize)]
pub struct CouponView {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    pub manual: bool,
}

impl From<CouponSnapshot> for CouponView {
    fn from(snapshot: CouponSnapshot) -> Self {
        let manual = snapshot.manual;
        match snapshot.state {
            CouponState::Idle => Self {
                status: "idle",
                code: None,
                discount: None,
                reason: None,
                conditions: Vec::new(),
                manual,
            },
            CouponState::Validating => Self {
                status: "validating",
                code: snapshot.candidate,
                discount: None,
                reason: None,
                conditions: Vec::new(),
                manual,
            },
            CouponState::Applied {
                code,
                discount,
                conditions,
            } => Self {
                status: "applied",
                code: Some(code),
                discount: Some(discount),
                reason: None,
                conditions,
                manual,
            },
            CouponState::Invalidated {
                code,
                discount,
                conditions,
            } => Self {
                status: "invalidated",
                code: Some(code),
                discount: Some(discount),
                reason: None,
                conditions,
                manual,
            },
            CouponState::Rejected { code, reason } => Self {
                status: "rejected",
                code: Some(code),
                discount: None,
                reason: Some(reason),
                conditions: Vec::new(),
                manual,
            },
        }
    }
}

/// Apply coupon request body.
#[derive(Debug, Deserialize)]
pub struct ApplyBody {
    pub code: String,
}

/// GET /api/coupon
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CouponView>> {
    let shared = shopper(&state, &session).await?;
    let checkout = shared.lock().await;
    Ok(Json(CouponView::from(checkout.coupon())))
}

/// POST /api/coupon/apply
#[instrument(skip_all)]
pub async fn apply(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<ApplyBody>,
) -> Result<Json<CouponView>> {
    let code = body.code.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("coupon code is empty".to_owned()));
    }

    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    let snapshot = checkout.apply_coupon(code).await;
    Ok(Json(CouponView::from(snapshot)))
}

/// POST /api/coupon/remove
#[instrument(skip_all)]
pub async fn remove(State(state): State<AppState>, session: Session) -> Result<Json<CouponView>> {
    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    checkout.remove_coupon();
    Ok(Json(CouponView::from(checkout.coupon())))
}
