//! Client-held cart ledger.
//!
//! The ledger gives the shopper immediate feedback on cart mutations. The
//! server-held cart stays authoritative for pricing: the ledger is
//! replaced wholesale by [`CartLedger::reconcile`] on cart-page entry and
//! at checkout entry, and [`CartLedger::total_price`] is display-only.

use marigold_core::{LineId, Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::api::types::{ServerCart, ServerCartLine};

/// A single line in the shopper's cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    /// Product the line refers to.
    pub product_id: ProductId,
    /// Server-assigned line identity, once synced.
    pub line_id: Option<LineId>,
    /// Display title.
    pub title: String,
    /// Unit price as last reported by the server.
    pub unit_price: Money,
    /// Quantity, always >= 1.
    pub quantity: u32,
    /// Optional product image reference.
    pub image_url: Option<String>,
}

impl CartLine {
    /// Line total: unit price × quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    /// The identity used to address this line: the server-assigned id
    /// once synced, the product id otherwise.
    fn matches(&self, id: &str) -> bool {
        match &self.line_id {
            Some(line_id) => line_id.as_str() == id,
            None => self.product_id.as_str() == id,
        }
    }
}

impl From<&ServerCartLine> for CartLine {
    fn from(line: &ServerCartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            line_id: line.line_id.clone(),
            title: line.title.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            image_url: line.image_url.clone(),
        }
    }
}

/// The shopper's client-held cart.
///
/// An empty ledger is a valid, distinct state - it renders the empty-cart
/// affordance, it is not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CartLedger {
    lines: Vec<CartLine>,
}

impl CartLedger {
    /// Create an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// The current lines.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of items across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Insert a line, or increment an existing line for the same product.
    ///
    /// A requested quantity below 1 is clamped to 1 rather than dropped.
    pub fn add(&mut self, line: CartLine) {
        let quantity = line.quantity.max(1);
        match self
            .lines
            .iter_mut()
            .find(|existing| existing.product_id == line.product_id)
        {
            Some(existing) => existing.quantity += quantity,
            None => self.lines.push(CartLine { quantity, ..line }),
        }
    }

    /// Set a line's quantity exactly; `0` removes the line.
    ///
    /// Returns `false` when no line matched the id.
    pub fn update_quantity(&mut self, id: &str, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(id);
        }
        match self.lines.iter_mut().find(|line| line.matches(id)) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Delete a line by identity (server line id once synced, product id
    /// otherwise). Returns `false` when no line matched.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| !line.matches(id));
        before != self.lines.len()
    }

    /// Display-only Σ(unit price × quantity) over surviving lines.
    ///
    /// The total actually charged comes from the server's cart metadata.
    #[must_use]
    pub fn total_price(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Replace the ledger wholesale with the server's cart.
    ///
    /// The server is the source of truth at checkout entry; any purely
    /// local pre-sync state is discarded.
    pub fn reconcile(&mut self, server_cart: &ServerCart) {
        self.lines = server_cart.lines.iter().map(CartLine::from).collect();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::types::CartMetadata;

    fn line(product: &str, unit_minor: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            line_id: None,
            title: format!("Product {product}"),
            unit_price: Money::from_minor(unit_minor),
            quantity,
            image_url: None,
        }
    }

    fn synced_line(product: &str, line_id: &str, unit_minor: i64, quantity: u32) -> CartLine {
        CartLine {
            line_id: Some(LineId::new(line_id)),
            ..line(product, unit_minor, quantity)
        }
    }

    #[test]
    fn test_add_merges_by_product() {
        let mut ledger = CartLedger::new();
        ledger.add(line("42", 2500, 2));
        ledger.add(line("42", 2500, 3));
        ledger.add(line("7", 1000, 1));

        assert_eq!(ledger.lines().len(), 2);
        assert_eq!(ledger.lines()[0].quantity, 5);
        assert_eq!(ledger.item_count(), 6);
    }

    #[test]
    fn test_add_clamps_zero_quantity_to_one() {
        let mut ledger = CartLedger::new();
        ledger.add(line("42", 2500, 0));
        assert_eq!(ledger.lines()[0].quantity, 1);
    }

    #[test]
    fn test_total_price_tracks_mutations() {
        let mut ledger = CartLedger::new();
        ledger.add(line("42", 2500, 2));
        ledger.add(line("7", 1000, 1));
        assert_eq!(ledger.total_price(), Money::from_minor(6000));

        ledger.update_quantity("7", 3);
        assert_eq!(ledger.total_price(), Money::from_minor(8000));

        ledger.remove("42");
        assert_eq!(ledger.total_price(), Money::from_minor(3000));

        ledger.remove("7");
        assert_eq!(ledger.total_price(), Money::ZERO);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_quantity_floor() {
        let mut ledger = CartLedger::new();
        ledger.add(line("42", 2500, 2));

        assert!(ledger.update_quantity("42", 5));
        assert_eq!(ledger.lines()[0].quantity, 5);

        assert!(ledger.update_quantity("42", 0));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_update_unknown_line_is_reported() {
        let mut ledger = CartLedger::new();
        assert!(!ledger.update_quantity("missing", 2));
        assert!(!ledger.remove("missing"));
    }

    #[test]
    fn test_server_line_id_preferred_once_synced() {
        let mut ledger = CartLedger::new();
        ledger.add(synced_line("42", "line_1", 2500, 2));

        // Once synced the product id no longer addresses the line.
        assert!(!ledger.remove("42"));
        assert!(ledger.remove("line_1"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_reconcile_replaces_wholesale() {
        let mut ledger = CartLedger::new();
        ledger.add(line("local-only", 999, 4));

        let server_cart = ServerCart {
            lines: vec![ServerCartLine {
                product_id: ProductId::new("42"),
                line_id: Some(LineId::new("line_9")),
                title: "Lavender Soap".into(),
                unit_price: Money::from_minor(2500),
                quantity: 2,
                image_url: None,
            }],
            metadata: CartMetadata {
                shipping_cost: Money::from_major(5),
                tax_amount: Money::from_minor(250),
                total_amount: Money::from_minor(5750),
            },
        };

        ledger.reconcile(&server_cart);

        assert_eq!(ledger.lines().len(), 1);
        assert_eq!(ledger.lines()[0].product_id, ProductId::new("42"));
        assert_eq!(ledger.lines()[0].line_id, Some(LineId::new("line_9")));
        assert_eq!(ledger.total_price(), Money::from_major(50));
    }

    #[test]
    fn test_reconcile_to_empty_is_valid() {
        let mut ledger = CartLedger::new();
        ledger.add(line("42", 2500, 2));

        let server_cart = ServerCart {
            lines: vec![],
            metadata: CartMetadata {
                shipping_cost: Money::ZERO,
                tax_amount: Money::ZERO,
                total_amount: Money::ZERO,
            },
        };

        ledger.reconcile(&server_cart);
        assert!(ledger.is_empty());
        assert_eq!(ledger.total_price(), Money::ZERO);
    }
}
