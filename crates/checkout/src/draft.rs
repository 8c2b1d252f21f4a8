//! Persisted checkout drafts.
//!
//! An in-progress checkout's contact/shipping fields are kept per session
//! so a failed confirmation does not lose the shopper's input. Drafts are
//! cleared exactly on a successful confirmation - never on a confirmation
//! error - and expire on their own after a period of inactivity.

use std::time::Duration;

use moka::sync::Cache;
use serde::{Deserialize, Serialize};

use crate::context::{ContactFields, ShippingFields};

/// Idle lifetime of a draft.
const DRAFT_TTL: Duration = Duration::from_secs(30 * 60);

/// The fields a checkout session persists between attempts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutDraft {
    /// Contact fields as last entered.
    pub contact: ContactFields,
    /// Whether the home-service toggle was on.
    pub home_service: bool,
    /// Address fields, when home service was on.
    pub shipping: Option<ShippingFields>,
}

/// Session-keyed store for in-progress checkout drafts.
#[derive(Clone)]
pub struct DraftStore {
    drafts: Cache<String, CheckoutDraft>,
}

impl DraftStore {
    /// Create a new draft store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            drafts: Cache::builder()
                .max_capacity(10_000)
                .time_to_idle(DRAFT_TTL)
                .build(),
        }
    }

    /// Load the draft for a session, if one is retained.
    #[must_use]
    pub fn load(&self, key: &str) -> Option<CheckoutDraft> {
        self.drafts.get(key)
    }

    /// Persist the draft for a session.
    pub fn save(&self, key: &str, draft: CheckoutDraft) {
        self.drafts.insert(key.to_owned(), draft);
    }

    /// Discard the draft for a session.
    pub fn clear(&self, key: &str) {
        self.drafts.invalidate(key);
    }
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_clear() {
        let store = DraftStore::new();
        assert!(store.load("session_1").is_none());

        let draft = CheckoutDraft {
            contact: ContactFields {
                email: "user@example.com".into(),
                name: "Ada".into(),
                phone: None,
            },
            home_service: false,
            shipping: None,
        };
        store.save("session_1", draft.clone());

        assert_eq!(store.load("session_1"), Some(draft));
        assert!(store.load("session_2").is_none());

        store.clear("session_1");
        assert!(store.load("session_1").is_none());
    }
}
