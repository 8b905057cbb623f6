//! Integration tests for Taraba.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p taraba-integration-tests
//! ```
//!
//! No network or database is required: the pricing authority is replaced by
//! [`mock::ScriptedPricingApi`] and the reference datasets come from small
//! in-crate fixtures. The tests cover two layers:
//!
//! - `checkout_flow` - the checkout engine driven directly
//! - `storefront_api` - the axum router driven through `tower::ServiceExt`,
//!   cookie round trips included

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

pub mod fixtures;
pub mod mock;
