//! Session-scoped models for the storefront.

use marigold_checkout::api::types::{CartMetadata, ServerCart};
use marigold_checkout::cart::CartLedger;
use marigold_checkout::summary::{self, OrderSummary};

/// Keys under which per-session values are stored.
pub mod session_keys {
    /// Stable per-session shopper key: addresses the shopper's cart
    /// ledger, checkout session, and persisted checkout draft.
    pub const SHOPPER: &str = "marigold.shopper";
}

/// The shopper's cart as this process holds it between requests: the
/// client-held ledger plus the last server-computed figures.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    /// Client-held ledger; authoritative for immediate feedback.
    pub ledger: CartLedger,
    /// Last server-computed figures; authoritative for charging.
    pub metadata: Option<CartMetadata>,
}

impl CartState {
    /// Absorb a server cart response: reconcile the ledger wholesale and
    /// refresh the metadata.
    pub fn absorb(&mut self, server_cart: &ServerCart) {
        self.ledger.reconcile(server_cart);
        self.metadata = Some(server_cart.metadata);
    }

    /// Project the display summary from the current state.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        summary::project_cart(&self.ledger, self.metadata.as_ref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use marigold_core::Money;

    #[test]
    fn test_absorb_refreshes_ledger_and_metadata() {
        let server_cart: ServerCart = serde_json::from_str(
            r#"{
                "lines": [
                    {"productId": "42", "title": "Lavender Soap", "unitPrice": 25.00, "quantity": 2}
                ],
                "shippingCost": 5,
                "taxRate": 2.50,
                "totalAmount": 57.50
            }"#,
        )
        .unwrap();

        let mut state = CartState::default();
        state.absorb(&server_cart);

        let summary = state.summary();
        assert_eq!(summary.subtotal, Money::from_major(50));
        assert_eq!(summary.total, Some(Money::from_minor(5750)));
        assert!(!summary.stale);
    }

    #[test]
    fn test_summary_without_metadata_uses_fallbacks() {
        let state = CartState::default();
        let summary = state.summary();
        assert_eq!(summary.subtotal, Money::ZERO);
        assert_eq!(summary.shipping_display(), "Free");
        assert_eq!(summary.total_display(), "");
    }
}
