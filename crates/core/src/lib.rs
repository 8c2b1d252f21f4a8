//! Marigold Core - Shared types library.
//!
//! This crate provides common types used across all Marigold components:
//! - `checkout` - Cart, availability, and payment orchestration core
//! - `storefront` - Public-facing JSON shell over the checkout core
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, and
//!   bookable slots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
