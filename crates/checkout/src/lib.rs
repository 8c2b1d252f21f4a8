//! Marigold checkout core.
//!
//! This crate is the engineering core of the Marigold storefront: the
//! sequence that turns a cart or a single bookable service into a
//! confirmed, paid order against the remote commerce API and its external
//! payment processor.
//!
//! # Architecture
//!
//! - The remote API is the source of truth for pricing and charging; the
//!   client-held [`cart::CartLedger`] exists for immediate feedback and is
//!   replaced wholesale at checkout entry.
//! - One checkout session is one spawned [`session::CheckoutSession`]
//!   driver task: commands in, state snapshots out. Payment-intent retry
//!   backoff is a cancellable timer inside that task, so abandoning the
//!   session cancels any pending retry.
//! - All remote calls flow through the [`api::CommerceApi`] seam so the
//!   state machine can be driven by a scripted implementation in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod availability;
pub mod cart;
pub mod context;
pub mod draft;
pub mod error;
pub mod gateway;
pub mod intent;
pub mod session;
pub mod summary;

pub use api::{CommerceApi, CommerceApiConfig, CommerceClient};
pub use availability::Schedule;
pub use cart::{CartLedger, CartLine};
pub use context::{CheckoutContext, CheckoutTarget, ContactFields, ShippingFields};
pub use draft::{CheckoutDraft, DraftStore};
pub use error::CheckoutError;
pub use gateway::{IntentGateway, PaymentIntent};
pub use intent::{PaymentIntentState, RetryPolicy};
pub use session::{CheckoutCommand, CheckoutPhase, CheckoutSession, CheckoutSnapshot};
pub use summary::OrderSummary;
