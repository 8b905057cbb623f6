//! The checkout session aggregate.
//!
//! One `CheckoutSession` exists per shopper. It owns the cart ledger, the
//! draft form, the locker matcher, and the coupon/customer actors, and it
//! enforces the cross-component invariants:
//!
//! - while `use_different_shipping` is false, the shipping address is a pure
//!   projection of the billing address, recomputed on every billing change;
//! - every cart mutation forwards the new signature to the coupon actor;
//! - the discount entering the totals is clamped to the subtotal;
//! - a successful submission clears the persisted draft and coupon code so
//!   nothing leaks into the next order.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use taraba_core::{
    CartItemId, Email, LockerId, Money, OrderRef, PaymentMethodId, ShippingInstanceId,
};

use crate::address::{Address, AddressResolver, mirror_billing};
use crate::cart::{CartLedger, LineItem};
use crate::coupon::{CouponSnapshot, CouponValidator};
use crate::customer::{CustomerLookup, LookupState};
use crate::draft::{CheckoutDraft, CheckoutDraftStore, CompanyInfo, ContactInfo, KvStore};
use crate::error::{CheckoutError, RequiredField};
use crate::lockers::{Locker, LockerMatcher};
use crate::remote::{
    AddressBlock, CompanyBlock, CouponLine, LockerBlock, OrderLine, OrderSubmitRequest, PricingApi,
};
use crate::shipping::{DeliveryMethod, ShippingResolver};

/// Everything the UI needs to render the totals box.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OrderSummary {
    pub subtotal: Money,
    pub item_count: u32,
    /// Clamped to the subtotal, whatever the authority answered.
    pub discount: Money,
    pub discounted_subtotal: Money,
    pub shipping_fee: Money,
    /// Advisory extra-distance amount; shown as a warning, never added to
    /// the total.
    pub distance_surcharge: Money,
    pub grand_total: Money,
}

/// A shopper's in-progress checkout.
pub struct CheckoutSession<S: KvStore> {
    ledger: CartLedger,
    draft: CheckoutDraft,
    draft_store: CheckoutDraftStore<S>,
    resolver: Arc<AddressResolver>,
    lockers: LockerMatcher,
    coupons: CouponValidator,
    customer: CustomerLookup,
    shipping: ShippingResolver,
    api: Arc<dyn PricingApi>,
}

impl<S: KvStore> CheckoutSession<S> {
    /// Create a session and hydrate any persisted draft.
    pub fn new(
        api: Arc<dyn PricingApi>,
        resolver: Arc<AddressResolver>,
        lockers: LockerMatcher,
        shipping: ShippingResolver,
        mut draft_store: CheckoutDraftStore<S>,
    ) -> Self {
        let draft = draft_store.hydrate().unwrap_or_default();
        let coupons = CouponValidator::spawn(Arc::clone(&api));
        let customer = CustomerLookup::new(Arc::clone(&api));

        let mut session = Self {
            ledger: CartLedger::new(),
            draft,
            draft_store,
            resolver,
            lockers,
            coupons,
            customer,
            shipping,
            api,
        };
        session.refresh_lockers();
        session
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// The cart ledger, read-only.
    #[must_use]
    pub fn ledger(&self) -> &CartLedger {
        &self.ledger
    }

    /// Add a line item.
    pub fn add_item(&mut self, item: LineItem) {
        self.ledger.add_item(item);
        self.notify_cart_changed();
    }

    /// Change a slot's quantity (clamped to at least 1).
    pub fn update_quantity(&mut self, cart_item_id: &CartItemId, quantity: u32) -> bool {
        let changed = self.ledger.update_quantity(cart_item_id, quantity);
        if changed {
            self.notify_cart_changed();
        }
        changed
    }

    /// Remove a slot.
    pub fn remove_item(&mut self, cart_item_id: &CartItemId) -> Option<LineItem> {
        let removed = self.ledger.remove_item(cart_item_id);
        if removed.is_some() {
            self.notify_cart_changed();
        }
        removed
    }

    fn coupon_lines(&self) -> Vec<CouponLine> {
        self.ledger
            .items()
            .iter()
            .map(|item| CouponLine {
                id: item.id,
                quantity: item.quantity,
            })
            .collect()
    }

    fn notify_cart_changed(&self) {
        self.coupons
            .cart_changed(self.coupon_lines(), self.ledger.signature());
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// Submit a coupon code and wait for its verdict. A successfully applied
    /// code is remembered (plaintext) so a reloaded session can re-offer it.
    pub async fn apply_coupon(&mut self, code: &str) -> CouponSnapshot {
        let snapshot = self
            .coupons
            .apply(code, self.coupon_lines(), self.ledger.signature())
            .await;
        if snapshot.state.applied_code().is_some() {
            self.draft_store.remember_coupon(code);
        } else {
            self.draft_store.forget_coupon();
        }
        snapshot
    }

    /// Drop the coupon.
    pub fn remove_coupon(&mut self) {
        self.coupons.remove();
        self.draft_store.forget_coupon();
    }

    /// The coupon machine's current snapshot.
    #[must_use]
    pub fn coupon(&self) -> CouponSnapshot {
        self.coupons.snapshot()
    }

    /// The code remembered from a previous successful apply, if any.
    #[must_use]
    pub fn remembered_coupon(&self) -> Option<String> {
        self.draft_store.last_coupon()
    }

    // =========================================================================
    // Draft / addresses
    // =========================================================================

    /// The current draft, read-only.
    #[must_use]
    pub fn draft(&self) -> &CheckoutDraft {
        &self.draft
    }

    /// Replace the billing address. While `use_different_shipping` is false
    /// the shipping address is recomputed as a verbatim projection.
    pub fn update_billing(&mut self, billing: Address) {
        self.draft.billing = billing;
        if !self.draft.use_different_shipping {
            self.draft.shipping = mirror_billing(&self.draft.billing);
        }
        self.refresh_lockers();
        self.persist();
    }

    /// Replace the shipping address. Ignored while the shipping address
    /// mirrors billing.
    pub fn update_shipping(&mut self, shipping: Address) {
        if !self.draft.use_different_shipping {
            return;
        }
        self.draft.shipping = shipping;
        self.refresh_lockers();
        self.persist();
    }

    /// Toggle between mirrored and divergent shipping. Turning the mirror
    /// back on recomputes the projection immediately.
    pub fn set_use_different_shipping(&mut self, different: bool) {
        self.draft.use_different_shipping = different;
        if !different {
            self.draft.shipping = mirror_billing(&self.draft.billing);
        }
        self.refresh_lockers();
        self.persist();
    }

    /// Update the contact block.
    pub fn update_contact(&mut self, contact: ContactInfo) {
        self.draft.contact = contact;
        self.persist();
    }

    /// Update or clear the company block.
    pub fn set_company(&mut self, company: Option<CompanyInfo>) {
        self.draft.company = company;
        self.persist();
    }

    /// Choose the payment method.
    pub fn set_payment_method(&mut self, method: PaymentMethodId) {
        self.draft.payment_method = Some(method);
        self.persist();
    }

    /// Choose the delivery method. Switching away from locker delivery
    /// removes the locker marker from the address (if still verbatim) and
    /// drops the selection.
    pub fn set_delivery_method(&mut self, method: DeliveryMethod) {
        let previous = self.draft.delivery_method;
        self.draft.delivery_method = Some(method);

        if previous == Some(DeliveryMethod::Locker) && method != DeliveryMethod::Locker {
            if let Some(locker) = self.lockers.selected() {
                LockerMatcher::remove_marker(locker, &mut self.draft.shipping);
            }
            self.lockers.clear_selection();
            self.draft.selected_locker = None;
        }
        if method == DeliveryMethod::Locker {
            self.refresh_lockers();
        }
        self.persist();
    }

    // =========================================================================
    // Lockers
    // =========================================================================

    /// Lockers matching the current shipping address context.
    #[must_use]
    pub fn locker_matches(&self) -> &[Locker] {
        self.lockers.matches()
    }

    /// The selected locker, if any.
    #[must_use]
    pub fn selected_locker(&self) -> Option<&Locker> {
        self.lockers.selected()
    }

    /// Select a locker from the current match set and back-fill the
    /// shipping address from it.
    pub fn select_locker(&mut self, id: &LockerId) -> bool {
        let Some(locker) = self.lockers.select(id).cloned() else {
            return false;
        };
        LockerMatcher::backfill_address(&locker, &mut self.draft.shipping);
        self.draft.selected_locker = Some(locker.id);
        self.persist();
        true
    }

    fn refresh_lockers(&mut self) {
        let county = &self.draft.shipping.county;
        let Some(code) = AddressResolver::county_code_for(county) else {
            self.lockers.refresh("", None);
            self.draft.selected_locker = None;
            return;
        };
        let locality = &self.draft.shipping.locality;
        let locality = (!locality.trim().is_empty()).then_some(locality.as_str());

        let auto = self.lockers.refresh(code, locality).cloned();
        self.draft.selected_locker = self.lockers.selected().map(|l| l.id.clone());

        // An auto-selected locker back-fills like a manual selection would.
        if self.draft.delivery_method == Some(DeliveryMethod::Locker)
            && let Some(locker) = auto
        {
            LockerMatcher::backfill_address(&locker, &mut self.draft.shipping);
        }
    }

    // =========================================================================
    // Customer lookup
    // =========================================================================

    /// Kick off the advisory existence check for the contact email.
    pub fn check_customer(&self, email: Email) {
        self.customer.check(email);
    }

    /// The advisory lookup state.
    #[must_use]
    pub fn customer_state(&self) -> LookupState {
        self.customer.state()
    }

    // =========================================================================
    // Totals
    // =========================================================================

    /// Compute the totals box.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        let totals = self.ledger.totals();
        let discount = self.coupons.snapshot().state.discount().min(totals.subtotal);
        let discounted_subtotal = totals.subtotal.saturating_sub(discount);

        let method = self.draft.delivery_method.unwrap_or(DeliveryMethod::Courier);
        let shipping_fee = self.shipping.fee(method, discounted_subtotal);

        let distance_surcharge = match method {
            DeliveryMethod::Courier => self.shipping_surcharge(),
            _ => Money::ZERO,
        };

        OrderSummary {
            subtotal: totals.subtotal,
            item_count: totals.item_count,
            discount,
            discounted_subtotal,
            shipping_fee,
            distance_surcharge,
            grand_total: discounted_subtotal + shipping_fee,
        }
    }

    fn shipping_surcharge(&self) -> Money {
        let shipping = &self.draft.shipping;
        AddressResolver::county_code_for(&shipping.county).map_or(Money::ZERO, |code| {
            self.resolver.surcharge_for(
                code,
                &shipping.locality,
                shipping.commune.as_deref(),
            )
        })
    }

    // =========================================================================
    // Validation and submission
    // =========================================================================

    /// Every required field not yet filled in, aggregated so the UI can mark
    /// them all at once.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<RequiredField> {
        let draft = &self.draft;
        let mut missing = Vec::new();

        if draft.contact.email.is_none() {
            missing.push(RequiredField::Email);
        }
        if draft.contact.phone.trim().is_empty() {
            missing.push(RequiredField::Phone);
        }
        if draft.contact.first_name.trim().is_empty() {
            missing.push(RequiredField::FirstName);
        }
        if draft.contact.last_name.trim().is_empty() {
            missing.push(RequiredField::LastName);
        }

        if draft.billing.county.trim().is_empty() {
            missing.push(RequiredField::BillingCounty);
        }
        if draft.billing.locality.trim().is_empty() {
            missing.push(RequiredField::BillingLocality);
        }
        if draft.billing.address1.trim().is_empty() {
            missing.push(RequiredField::BillingAddress);
        }

        match draft.delivery_method {
            None => missing.push(RequiredField::DeliveryMethod),
            Some(DeliveryMethod::Courier) if draft.use_different_shipping => {
                if draft.shipping.county.trim().is_empty() {
                    missing.push(RequiredField::ShippingCounty);
                }
                if draft.shipping.locality.trim().is_empty() {
                    missing.push(RequiredField::ShippingLocality);
                }
                if draft.shipping.address1.trim().is_empty() {
                    missing.push(RequiredField::ShippingAddress);
                }
            }
            Some(DeliveryMethod::Locker) => {
                if self.lockers.selected().is_none() {
                    missing.push(RequiredField::Locker);
                }
            }
            Some(_) => {}
        }

        if draft.payment_method.is_none() {
            missing.push(RequiredField::PaymentMethod);
        }

        missing
    }

    /// Submit the order.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::MissingFields`] while required fields are unmet;
    /// - [`CheckoutError::Upstream`] when the authority is unreachable;
    /// - [`CheckoutError::OrderRejected`] when it answers but refuses.
    pub async fn submit(
        &mut self,
        shipping_instance: ShippingInstanceId,
    ) -> Result<OrderRef, CheckoutError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            tracing::debug!(?missing, "order submission blocked on missing fields");
            return Err(CheckoutError::MissingFields(missing));
        }

        let request = self.build_submission(shipping_instance);
        let response = self.api.submit_order(request).await?;

        if !response.success {
            return Err(CheckoutError::OrderRejected(
                response
                    .message
                    .unwrap_or_else(|| "the order could not be placed".to_owned()),
            ));
        }

        // The draft and coupon must not leak into the next order.
        self.draft_store.clear();
        self.draft = CheckoutDraft::default();
        self.ledger.clear();
        self.coupons.remove();
        self.lockers.clear_selection();

        response.order.ok_or_else(|| {
            CheckoutError::OrderRejected("the order reference is missing".to_owned())
        })
    }

    fn build_submission(&self, shipping_instance: ShippingInstanceId) -> OrderSubmitRequest {
        let draft = &self.draft;
        let contact = &draft.contact;

        let block = |address: &Address| AddressBlock {
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            county: address.county.clone(),
            locality: address.locality.clone(),
            commune: address.commune.clone(),
            address1: address.address1.clone(),
            address2: (!address.address2.is_empty()).then(|| address.address2.clone()),
            postcode: address.postcode.clone(),
            country: address.country.clone(),
            phone: contact.phone.clone(),
            email: contact
                .email
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        };

        let produse = self
            .ledger
            .items()
            .iter()
            .map(|item| OrderLine {
                id: item.id,
                quantity: item.quantity,
                meta: item
                    .personalizations
                    .iter()
                    .map(|p| (p.label.clone(), p.value.clone()))
                    .collect::<BTreeMap<_, _>>(),
            })
            .collect();

        let cod_cupon = self.coupons.snapshot().state.applied_code().map(String::from);

        let company = draft.company.as_ref().map(|c| CompanyBlock {
            name: c.name.clone(),
            vat_code: c.vat_code.clone(),
            reg_number: c.reg_number.clone(),
        });

        let locker = (draft.delivery_method == Some(DeliveryMethod::Locker))
            .then(|| self.lockers.selected())
            .flatten()
            .map(|l| LockerBlock {
                locker_id: l.id.to_string(),
                name: l.name.clone(),
                address: l.address.clone(),
                city: l.city.clone(),
                county: l.county.clone(),
            });

        OrderSubmitRequest {
            billing: block(&draft.billing),
            shipping: block(&draft.shipping),
            produse,
            payment_method: draft.payment_method.unwrap_or(PaymentMethodId::new(0)),
            shipping_instance,
            cod_cupon,
            company,
            locker,
        }
    }

    fn persist(&mut self) {
        self.draft_store.persist(&self.draft);
    }
}
