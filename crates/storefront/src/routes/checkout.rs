//! Checkout route handlers.
//!
//! Every mutating endpoint responds with the full checkout view so the UI
//! can re-render the form, the totals box, and the locker picker from one
//! payload. `submit` is the only endpoint that returns something else: the
//! order reference for the thank-you page.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use taraba_checkout::address::Address;
use taraba_checkout::customer::LookupState;
use taraba_checkout::draft::{CheckoutDraft, CompanyInfo, ContactInfo, MemoryKvStore};
use taraba_checkout::error::RequiredField;
use taraba_checkout::lockers::Locker;
use taraba_checkout::session::{CheckoutSession, OrderSummary};
use taraba_checkout::shipping::DeliveryMethod;
use taraba_core::{Email, LockerId, OrderRef, PaymentMethodId, ShippingInstanceId};
use tower_sessions::Session;
use tracing::instrument;

use super::coupon::CouponView;
use super::shopper;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Everything the checkout page renders.
#[derive(Serialize)]
pub struct CheckoutView {
    pub draft: CheckoutDraft,
    pub summary: OrderSummary,
    pub missing_fields: Vec<RequiredField>,
    pub coupon: CouponView,
    pub customer: LookupState,
    pub lockers: LockerView,
}

/// The locker picker state.
#[derive(Serialize)]
pub struct LockerView {
    pub matches: Vec<Locker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<Locker>,
}

fn checkout_view(checkout: &CheckoutSession<MemoryKvStore>) -> CheckoutView {
    CheckoutView {
        draft: checkout.draft().clone(),
        summary: checkout.summary(),
        missing_fields: checkout.missing_fields(),
        coupon: CouponView::from(checkout.coupon()),
        customer: checkout.customer_state(),
        lockers: LockerView {
            matches: checkout.locker_matches().to_vec(),
            selected: checkout.selected_locker().cloned(),
        },
    }
}

// =============================================================================
// Request bodies
// =============================================================================

/// Contact block body. The email arrives as raw text and is validated here.
#[derive(Debug, Deserialize)]
pub struct ContactBody {
    #[serde(default)]
    pub email: Option<String>,
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ShippingModeBody {
    pub use_different_shipping: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryMethodBody {
    pub method: DeliveryMethod,
}

#[derive(Debug, Deserialize)]
pub struct PaymentMethodBody {
    pub payment_method: PaymentMethodId,
}

#[derive(Debug, Deserialize)]
pub struct CompanyBody {
    #[serde(default)]
    pub company: Option<CompanyInfo>,
}

#[derive(Debug, Deserialize)]
pub struct LockerSelectBody {
    pub locker_id: LockerId,
}

#[derive(Debug, Deserialize)]
pub struct CustomerCheckBody {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    pub shipping_instance: ShippingInstanceId,
}

fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/checkout
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CheckoutView>> {
    let shared = shopper(&state, &session).await?;
    let checkout = shared.lock().await;
    Ok(Json(checkout_view(&checkout)))
}

/// POST /api/checkout/contact
#[instrument(skip_all)]
pub async fn update_contact(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<ContactBody>,
) -> Result<Json<CheckoutView>> {
    let email = body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(parse_email)
        .transpose()?;

    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    checkout.update_contact(ContactInfo {
        email,
        phone: body.phone,
        first_name: body.first_name,
        last_name: body.last_name,
    });
    Ok(Json(checkout_view(&checkout)))
}

/// POST /api/checkout/billing
#[instrument(skip_all)]
pub async fn update_billing(
    State(state): State<AppState>,
    session: Session,
    Json(billing): Json<Address>,
) -> Result<Json<CheckoutView>> {
    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    checkout.update_billing(billing);
    Ok(Json(checkout_view(&checkout)))
}

/// POST /api/checkout/shipping
///
/// Rejected while the shipping address mirrors billing; the UI must flip
/// the shipping mode first.
#[instrument(skip_all)]
pub async fn update_shipping(
    State(state): State<AppState>,
    session: Session,
    Json(shipping): Json<Address>,
) -> Result<Json<CheckoutView>> {
    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    if !checkout.draft().use_different_shipping {
        return Err(AppError::BadRequest(
            "shipping address mirrors billing; enable use_different_shipping first".to_owned(),
        ));
    }
    checkout.update_shipping(shipping);
    Ok(Json(checkout_view(&checkout)))
}

/// POST /api/checkout/shipping-mode
#[instrument(skip_all)]
pub async fn set_shipping_mode(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<ShippingModeBody>,
) -> Result<Json<CheckoutView>> {
    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    checkout.set_use_different_shipping(body.use_different_shipping);
    Ok(Json(checkout_view(&checkout)))
}

/// POST /api/checkout/delivery-method
#[instrument(skip_all)]
pub async fn set_delivery_method(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<DeliveryMethodBody>,
) -> Result<Json<CheckoutView>> {
    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    checkout.set_delivery_method(body.method);
    Ok(Json(checkout_view(&checkout)))
}

/// POST /api/checkout/payment-method
#[instrument(skip_all)]
pub async fn set_payment_method(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<PaymentMethodBody>,
) -> Result<Json<CheckoutView>> {
    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    checkout.set_payment_method(body.payment_method);
    Ok(Json(checkout_view(&checkout)))
}

/// POST /api/checkout/company
#[instrument(skip_all)]
pub async fn set_company(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CompanyBody>,
) -> Result<Json<CheckoutView>> {
    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    checkout.set_company(body.company);
    Ok(Json(checkout_view(&checkout)))
}

/// GET /api/checkout/lockers
#[instrument(skip_all)]
pub async fn lockers(State(state): State<AppState>, session: Session) -> Result<Json<LockerView>> {
    let shared = shopper(&state, &session).await?;
    let checkout = shared.lock().await;
    Ok(Json(LockerView {
        matches: checkout.locker_matches().to_vec(),
        selected: checkout.selected_locker().cloned(),
    }))
}

/// POST /api/checkout/locker
#[instrument(skip_all, fields(locker = %body.locker_id))]
pub async fn select_locker(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LockerSelectBody>,
) -> Result<Json<CheckoutView>> {
    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    if !checkout.select_locker(&body.locker_id) {
        return Err(AppError::NotFound(format!(
            "locker {} is not among the current matches",
            body.locker_id
        )));
    }
    Ok(Json(checkout_view(&checkout)))
}

/// POST /api/checkout/customer-check
///
/// Fires the debounced advisory lookup; the result lands in the checkout
/// view's `customer` block on a later read.
#[instrument(skip_all)]
pub async fn customer_check(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CustomerCheckBody>,
) -> Result<Json<LookupState>> {
    let email = parse_email(body.email.trim())?;

    let shared = shopper(&state, &session).await?;
    let checkout = shared.lock().await;
    checkout.check_customer(email);
    Ok(Json(checkout.customer_state()))
}

/// POST /api/checkout/submit
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<SubmitBody>,
) -> Result<Json<OrderRef>> {
    let shared = shopper(&state, &session).await?;
    let mut checkout = shared.lock().await;
    let order = checkout.submit(body.shipping_instance).await?;
    tracing::info!(order = %order.number, "order placed");
    Ok(Json(order))
}
