//! Delivery methods and shipping fees.
//!
//! Rates and the free-shipping threshold are business configuration, not
//! literals: the storefront loads them from the environment and hands a
//! [`ShippingConfig`] to the engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use taraba_core::Money;

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Home delivery by courier.
    Courier,
    /// Delivery to a parcel locker.
    Locker,
    /// In-person pickup at the workshop.
    Pickup,
}

impl DeliveryMethod {
    /// Whether this method requires a shipping address.
    #[must_use]
    pub const fn needs_address(&self) -> bool {
        matches!(self, Self::Courier)
    }
}

/// Flat per-method rates plus the free-shipping threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingConfig {
    /// Discounted subtotal at or above which shipping is free.
    pub free_shipping_threshold: Money,
    /// Flat courier rate.
    pub courier_rate: Money,
    /// Flat locker rate.
    pub locker_rate: Money,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Money::new(Decimal::from(200)),
            courier_rate: Money::new(Decimal::from(17)),
            locker_rate: Money::new(Decimal::from(13)),
        }
    }
}

/// Maps a delivery method and the discounted subtotal to a shipping fee.
#[derive(Debug, Clone, Default)]
pub struct ShippingResolver {
    config: ShippingConfig,
}

impl ShippingResolver {
    /// Create a resolver over the given rate configuration.
    #[must_use]
    pub const fn new(config: ShippingConfig) -> Self {
        Self { config }
    }

    /// The rate configuration.
    #[must_use]
    pub const fn config(&self) -> &ShippingConfig {
        &self.config
    }

    /// The shipping fee for a method at a discounted subtotal.
    ///
    /// Pickup is always free; every other method is free once the discounted
    /// subtotal reaches the threshold (boundary inclusive), and otherwise
    /// charges its flat rate. The distance surcharge from
    /// [`crate::address::AddressResolver::surcharge_for`] is advisory and
    /// deliberately not part of this amount.
    #[must_use]
    pub fn fee(&self, method: DeliveryMethod, discounted_subtotal: Money) -> Money {
        match method {
            DeliveryMethod::Pickup => Money::ZERO,
            DeliveryMethod::Courier | DeliveryMethod::Locker
                if discounted_subtotal >= self.config.free_shipping_threshold =>
            {
                Money::ZERO
            }
            DeliveryMethod::Courier => self.config.courier_rate,
            DeliveryMethod::Locker => self.config.locker_rate,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_pickup_is_always_free() {
        let resolver = ShippingResolver::default();
        assert_eq!(
            resolver.fee(DeliveryMethod::Pickup, Money::ZERO),
            Money::ZERO
        );
        assert_eq!(
            resolver.fee(DeliveryMethod::Pickup, Money::from(500)),
            Money::ZERO
        );
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let resolver = ShippingResolver::default();
        assert_eq!(
            resolver.fee(DeliveryMethod::Courier, Money::new(dec!(200))),
            Money::ZERO
        );
        assert_eq!(
            resolver.fee(DeliveryMethod::Courier, Money::new(dec!(199.99))),
            Money::new(dec!(17))
        );
    }

    #[test]
    fn test_flat_rates_below_threshold() {
        let resolver = ShippingResolver::default();
        assert_eq!(
            resolver.fee(DeliveryMethod::Courier, Money::from(90)),
            Money::new(dec!(17))
        );
        assert_eq!(
            resolver.fee(DeliveryMethod::Locker, Money::from(90)),
            Money::new(dec!(13))
        );
    }

    #[test]
    fn test_custom_config() {
        let resolver = ShippingResolver::new(ShippingConfig {
            free_shipping_threshold: Money::from(100),
            courier_rate: Money::from(25),
            locker_rate: Money::from(10),
        });
        assert_eq!(
            resolver.fee(DeliveryMethod::Courier, Money::from(99)),
            Money::from(25)
        );
        assert_eq!(
            resolver.fee(DeliveryMethod::Courier, Money::from(100)),
            Money::ZERO
        );
    }
}
