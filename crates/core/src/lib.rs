//! Taraba Core - Shared types library.
//!
//! This crate provides the common types used across the Taraba checkout
//! components:
//! - `checkout` - The checkout engine (cart, coupon, shipping, drafts)
//! - `storefront` - The JSON API binary the UI talks to
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no timers.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money amounts, and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
