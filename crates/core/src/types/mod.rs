//! Core types for Marigold.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod slot;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::Money;
pub use slot::{Slot, TimeOfDay, TimeOfDayError};
