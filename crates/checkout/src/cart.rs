//! Line-item ledger with derived totals.
//!
//! The ledger owns the cart's line items and derives everything else:
//! subtotal, item count, per-line subtotals, and the cart signature used to
//! detect when an applied coupon needs revalidation. It performs no I/O and
//! cannot fail; invalid quantities from the caller are clamped rather than
//! rejected.

use serde::{Deserialize, Serialize};
use taraba_core::{CartItemId, Money, ProductId};

/// A personalization entry attached to a line item (engraving text, an
/// uploaded image, a chosen colour).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personalization {
    /// Display label shown next to the value.
    pub label: String,
    /// Kind of input this came from (text, select, upload).
    pub kind: String,
    /// The customer's value.
    pub value: String,
    /// Uploaded file reference, when the entry is an upload.
    pub file: Option<String>,
}

/// One cart slot.
///
/// Two slots may share the same catalog [`ProductId`] with different
/// personalizations, so every slot carries its own [`CartItemId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Catalog id.
    pub id: ProductId,
    /// Unique per cart slot.
    pub cart_item_id: CartItemId,
    /// Regular unit price.
    pub unit_price: Money,
    /// Discounted unit price, when the catalog has one.
    pub unit_price_reduced: Option<Money>,
    /// Always at least 1.
    pub quantity: u32,
    /// Personalization entries for this slot.
    #[serde(default)]
    pub personalizations: Vec<Personalization>,
}

impl LineItem {
    /// The price a single unit actually sells for.
    #[must_use]
    pub fn effective_unit_price(&self) -> Money {
        self.unit_price_reduced.unwrap_or(self.unit_price)
    }

    /// Subtotal for this slot.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.effective_unit_price() * self.quantity
    }
}

/// Derived cart totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    /// Sum of `quantity x (reduced ?? unit)` over all slots.
    pub subtotal: Money,
    /// Sum of quantities.
    pub item_count: u32,
}

/// Owns the line items and derives totals and the cart signature.
#[derive(Debug, Clone, Default)]
pub struct CartLedger {
    items: Vec<LineItem>,
}

impl CartLedger {
    /// Create an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// All line items, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a slot to the ledger. A quantity below 1 is clamped to 1.
    pub fn add_item(&mut self, mut item: LineItem) {
        item.quantity = item.quantity.max(1);
        self.items.push(item);
    }

    /// Set the quantity of a slot, clamping values below 1 to 1.
    ///
    /// Returns `true` when the slot exists.
    pub fn update_quantity(&mut self, cart_item_id: &CartItemId, quantity: u32) -> bool {
        match self.items.iter_mut().find(|i| &i.cart_item_id == cart_item_id) {
            Some(item) => {
                item.quantity = quantity.max(1);
                true
            }
            None => false,
        }
    }

    /// Remove a slot. Returns the removed item when the slot existed.
    pub fn remove_item(&mut self, cart_item_id: &CartItemId) -> Option<LineItem> {
        let pos = self
            .items
            .iter()
            .position(|i| &i.cart_item_id == cart_item_id)?;
        Some(self.items.remove(pos))
    }

    /// Derived totals over all slots.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        CartTotals {
            subtotal: self.items.iter().map(LineItem::subtotal).sum(),
            item_count: self.items.iter().map(|i| i.quantity).sum(),
        }
    }

    /// The cart signature: the ordered join of `id:cart_item_id:quantity`
    /// over all slots. Any change that matters to coupon validity (contents
    /// or quantities) changes this string.
    #[must_use]
    pub fn signature(&self) -> String {
        self.items
            .iter()
            .map(|i| format!("{}:{}:{}", i.id, i.cart_item_id, i.quantity))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Drop all slots. Called after a successful order submission.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
