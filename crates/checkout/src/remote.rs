//! Typed client for the remote pricing authority.
//!
//! The pricing authority is the source of truth for coupon validity and the
//! final destination for submitted orders; it also answers the advisory
//! customer-existence check. Field names on the wire are the authority's own
//! (Romanian), mapped here once so the rest of the engine never sees them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use taraba_core::{Email, OrderRef, PaymentMethodId, ProductId, ShippingInstanceId};
use thiserror::Error;

/// Errors from the pricing authority.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The authority answered with a non-2xx status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse the response body.
    #[error("Parse error: {0}")]
    Parse(String),
}

// =============================================================================
// Coupon verification wire types
// =============================================================================

/// One cart line as the authority wants it.
#[derive(Debug, Clone, Serialize)]
pub struct CouponLine {
    pub id: ProductId,
    pub quantity: u32,
}

/// Coupon verification request.
#[derive(Debug, Clone, Serialize)]
pub struct CouponVerifyRequest {
    pub cod_cupon: String,
    pub produse: Vec<CouponLine>,
}

/// Verdict block of the coupon verification response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponVerdict {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub discount_text: Option<String>,
    #[serde(default)]
    pub conditii: Vec<String>,
}

/// Per-product applicability block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponProduct {
    #[serde(default)]
    pub titlu: Option<String>,
    #[serde(default)]
    pub valabil_cupon: Option<bool>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Totals block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponTotals {
    #[serde(default)]
    pub total_discount: rust_decimal::Decimal,
}

/// Coupon verification response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponVerifyResponse {
    #[serde(default)]
    pub cupon: CouponVerdict,
    #[serde(default)]
    pub produse: Vec<CouponProduct>,
    #[serde(default)]
    pub totals: CouponTotals,
}

impl CouponVerifyResponse {
    /// Whether at least one product in the cart is covered by the coupon.
    #[must_use]
    pub fn any_product_applicable(&self) -> bool {
        self.produse
            .iter()
            .any(|p| p.valabil_cupon.unwrap_or(false))
    }
}

// =============================================================================
// Customer existence check wire types
// =============================================================================

/// Customer existence request.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerCheckRequest {
    pub email: Email,
}

/// One lookup verdict (`found` is absent when the channel was not checked).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupVerdict {
    #[serde(default)]
    pub found: Option<bool>,
}

/// The per-channel verdicts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerChecks {
    #[serde(default)]
    pub email: Option<LookupVerdict>,
    #[serde(default)]
    pub telefon: Option<LookupVerdict>,
}

/// Customer existence response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerCheckResponse {
    #[serde(default)]
    pub customer_exists: Option<bool>,
    #[serde(default)]
    pub verificari: CustomerChecks,
}

// =============================================================================
// Order submission wire types
// =============================================================================

/// An address block on the submission request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AddressBlock {
    pub first_name: String,
    pub last_name: String,
    pub county: String,
    pub locality: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commune: Option<String>,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub postcode: String,
    pub country: String,
    pub phone: String,
    pub email: String,
}

/// A submitted line item, with its personalization metadata map.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub id: ProductId,
    pub quantity: u32,
    /// Label -> value, already flattened for the authority.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

/// Optional company block for invoiced orders.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyBlock {
    pub name: String,
    pub vat_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reg_number: Option<String>,
}

/// Optional locker descriptor when the order ships to a parcel locker.
#[derive(Debug, Clone, Serialize)]
pub struct LockerBlock {
    pub locker_id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub county: String,
}

/// Order submission request.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSubmitRequest {
    pub billing: AddressBlock,
    pub shipping: AddressBlock,
    pub produse: Vec<OrderLine>,
    pub payment_method: PaymentMethodId,
    pub shipping_instance: ShippingInstanceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cod_cupon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<CompanyBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locker: Option<LockerBlock>,
}

/// Order submission response.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderSubmitResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub order: Option<OrderRef>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// The three calls the checkout engine makes against the authority.
///
/// A trait so tests (and the session registry) can substitute a scripted
/// implementation without a network.
#[async_trait::async_trait]
pub trait PricingApi: Send + Sync {
    /// Validate a coupon against the current cart contents.
    async fn verify_coupon(
        &self,
        request: CouponVerifyRequest,
    ) -> Result<CouponVerifyResponse, RemoteError>;

    /// Advisory existence check for an email address.
    async fn check_customer(
        &self,
        request: CustomerCheckRequest,
    ) -> Result<CustomerCheckResponse, RemoteError>;

    /// Submit the finished order.
    async fn submit_order(
        &self,
        request: OrderSubmitRequest,
    ) -> Result<OrderSubmitResponse, RemoteError>;
}

/// HTTP implementation of [`PricingApi`].
#[derive(Clone)]
pub struct HttpPricingApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPricingApi {
    /// Create a client against the given base URL (no trailing slash).
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    async fn post_json<B: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, RemoteError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl PricingApi for HttpPricingApi {
    async fn verify_coupon(
        &self,
        request: CouponVerifyRequest,
    ) -> Result<CouponVerifyResponse, RemoteError> {
        self.post_json("/api/verifica-cupon", &request).await
    }

    async fn check_customer(
        &self,
        request: CustomerCheckRequest,
    ) -> Result<CustomerCheckResponse, RemoteError> {
        self.post_json("/api/verifica-client", &request).await
    }

    async fn submit_order(
        &self,
        request: OrderSubmitRequest,
    ) -> Result<OrderSubmitResponse, RemoteError> {
        self.post_json("/api/trimite-comanda", &request).await
    }
}
