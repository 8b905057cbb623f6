//! Taraba Checkout - the checkout engine.
//!
//! This crate owns the only part of the storefront with real state-machine
//! and consistency concerns: order totals, coupon reconciliation against the
//! remote pricing authority, and shipping/pickup resolution for a destination
//! address. Product listing, rendering, and routing live elsewhere; the UI
//! collaborator hands us a cart and an address draft and reads back a
//! computed total plus a fulfillment selection.
//!
//! # Components
//!
//! - [`cart`] - line-item ledger with derived totals and the cart signature
//! - [`coupon`] - coupon state machine driven by an event loop, with
//!   debounced automatic revalidation
//! - [`address`] - county/locality/commune resolution and the
//!   billing-to-shipping mirror projection
//! - [`lockers`] - parcel-locker directory filtering and selection
//! - [`shipping`] - per-method flat fees with the free-shipping override
//! - [`draft`] - encrypted persistence of the in-progress checkout form
//! - [`customer`] - debounced, cancellable customer existence check
//! - [`remote`] - typed client for the pricing authority
//! - [`session`] - the aggregate wiring everything together
//!
//! All network work is async (tokio); all mutable state has a single logical
//! owner, so no locks are needed inside the engine itself.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod cart;
pub mod coupon;
pub mod customer;
pub mod draft;
pub mod error;
pub mod lockers;
pub mod remote;
pub mod session;
pub mod shipping;

pub use error::CheckoutError;
