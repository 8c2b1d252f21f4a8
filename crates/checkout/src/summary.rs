//! Order summary projection.
//!
//! A pure projection from cart/booking state plus server-supplied cart
//! metadata into the displayed subtotal/shipping/tax/total. The subtotal
//! is always client-computed for display responsiveness; shipping, tax,
//! and total come only from the server figures the gateway will actually
//! charge. While metadata has not loaded those render as "Free"/blank -
//! never a silent zero once loaded.

use marigold_core::Money;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::api::types::CartMetadata;
use crate::cart::CartLedger;

/// Projected checkout figures for display.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    /// Client-computed Σ(unit price × quantity), always present.
    pub subtotal: Money,
    /// Server-computed shipping cost, once metadata is loaded.
    pub shipping: Option<Money>,
    /// Server-computed tax figure, once metadata is loaded.
    pub tax: Option<Money>,
    /// Server-computed grand total, once metadata is loaded.
    pub total: Option<Money>,
    /// Set when the client subtotal disagrees with the server-implied
    /// subtotal by more than one cent; the shell should refresh metadata
    /// before presenting the figures as final.
    pub stale: bool,
}

impl OrderSummary {
    /// Shipping display with the "Free" fallback while metadata loads.
    #[must_use]
    pub fn shipping_display(&self) -> String {
        self.shipping
            .map_or_else(|| "Free".to_owned(), |amount| amount.display())
    }

    /// Tax display, blank while metadata loads.
    #[must_use]
    pub fn tax_display(&self) -> String {
        self.tax.map_or_else(String::new, |amount| amount.display())
    }

    /// Total display, blank while metadata loads.
    #[must_use]
    pub fn total_display(&self) -> String {
        self.total.map_or_else(String::new, |amount| amount.display())
    }
}

/// Project a cart checkout summary.
///
/// Recomputed on every ledger mutation, even when metadata has not
/// refreshed yet - the displayed total is provisionally stale until the
/// next metadata fetch.
#[must_use]
pub fn project_cart(ledger: &CartLedger, metadata: Option<&CartMetadata>) -> OrderSummary {
    project(ledger.total_price(), metadata)
}

/// Project a single-service booking summary.
#[must_use]
pub fn project_booking(price: Money, metadata: Option<&CartMetadata>) -> OrderSummary {
    project(price, metadata)
}

fn project(subtotal: Money, metadata: Option<&CartMetadata>) -> OrderSummary {
    match metadata {
        None => OrderSummary {
            subtotal,
            shipping: None,
            tax: None,
            total: None,
            stale: false,
        },
        Some(meta) => {
            let implied_subtotal = meta.total_amount.amount()
                - meta.shipping_cost.amount()
                - meta.tax_amount.amount();
            let drift = (implied_subtotal - subtotal.amount()).abs();

            OrderSummary {
                subtotal,
                shipping: Some(meta.shipping_cost),
                tax: Some(meta.tax_amount),
                total: Some(meta.total_amount),
                stale: drift > Decimal::new(1, 2),
            }
        }
    }
}
