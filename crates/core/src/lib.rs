//! Vendor Portal Core - Shared types library.
//!
//! This crate provides common types used across all vendor portal components:
//! - `client` - Request gateway, resource caches and session lifecycle
//! - `cli` - Command-line view layer over the client
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no caches.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
