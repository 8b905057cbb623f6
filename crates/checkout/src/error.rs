//! Checkout error taxonomy.
//!
//! Nothing in this subsystem is fatal to the host application. Coupon
//! rejections are user-correctable, network failures are retried on the next
//! user action, and a corrupted draft blob is silently dropped. The worst
//! outcome is that checkout cannot proceed until the user supplies valid
//! input, which is always surfaced inline.

use thiserror::Error;

/// A required checkout field that has not been filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    Email,
    Phone,
    FirstName,
    LastName,
    BillingCounty,
    BillingLocality,
    BillingAddress,
    ShippingCounty,
    ShippingLocality,
    ShippingAddress,
    DeliveryMethod,
    PaymentMethod,
    Locker,
}

impl RequiredField {
    /// Stable identifier used to anchor the inline message next to a field.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::BillingCounty => "billing_county",
            Self::BillingLocality => "billing_locality",
            Self::BillingAddress => "billing_address",
            Self::ShippingCounty => "shipping_county",
            Self::ShippingLocality => "shipping_locality",
            Self::ShippingAddress => "shipping_address",
            Self::DeliveryMethod => "delivery_method",
            Self::PaymentMethod => "payment_method",
            Self::Locker => "locker",
        }
    }
}

/// Errors that can cross the checkout engine boundary.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The remote pricing authority could not be reached or answered with an
    /// unexpected status. Recoverable: retry on the next user action.
    #[error("pricing service unavailable: {0}")]
    Upstream(#[from] crate::remote::RemoteError),

    /// The order cannot be submitted until the listed fields are filled in.
    #[error("missing required fields: {0:?}")]
    MissingFields(Vec<RequiredField>),

    /// The pricing authority accepted the request but refused the order.
    #[error("order rejected: {0}")]
    OrderRejected(String),
}

impl CheckoutError {
    /// All required fields this error carries, empty for other variants.
    #[must_use]
    pub fn missing_fields(&self) -> &[RequiredField] {
        match self {
            Self::MissingFields(fields) => fields,
            _ => &[],
        }
    }
}
