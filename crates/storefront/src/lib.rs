//! Taraba Storefront library.
//!
//! This crate provides the checkout API server as a library, allowing it to
//! be tested and reused. The binary in `main.rs` wires it to the network.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
