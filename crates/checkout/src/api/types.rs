//! Wire types for the remote commerce API.
//!
//! These mirror the JSON shapes the backend serves, camelCase field names
//! included. Conversions into richer domain types live next to the code
//! that consumes them.

use marigold_core::{LineId, Money, OrderId, ProductId, RegionId, ServiceId, Slot};
use serde::{Deserialize, Serialize};

use crate::availability::Schedule;
use crate::context::{CheckoutTarget, ContactFields, ShippingFields};

/// A cart line as the commerce API reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerCartLine {
    /// Product the line refers to.
    pub product_id: ProductId,
    /// Server-assigned line identity, present once the line is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_id: Option<LineId>,
    /// Display title.
    pub title: String,
    /// Unit price at the time the server computed the cart.
    pub unit_price: Money,
    /// Quantity, always >= 1.
    pub quantity: u32,
    /// Optional product image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Server-computed cart figures.
///
/// Always authoritative for charging; client arithmetic is display-only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartMetadata {
    /// Shipping cost for the cart as composed.
    pub shipping_cost: Money,
    /// The charged tax figure. The wire calls this `taxRate`.
    #[serde(rename = "taxRate")]
    pub tax_amount: Money,
    /// Grand total the processor will charge.
    pub total_amount: Money,
}

/// `GET /cart` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerCart {
    /// Current cart lines.
    #[serde(default)]
    pub lines: Vec<ServerCartLine>,
    /// Server-computed figures for the cart as a whole.
    #[serde(flatten)]
    pub metadata: CartMetadata,
}

/// Request body for `POST /cart/lines`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLineBody {
    /// Product to add.
    pub product_id: ProductId,
    /// Requested quantity, >= 1.
    pub quantity: u32,
}

/// Request body for `PATCH /cart/lines`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLineBody {
    /// Line identity: server line id once synced, product id otherwise.
    pub id: String,
    /// New quantity, >= 1.
    pub quantity: u32,
}

/// One entry of the `GET /regions` reference list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Region {
    /// Region identity.
    pub id: RegionId,
    /// Display name.
    pub name: String,
}

/// `GET /services/{id}` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetail {
    /// Service identity.
    pub id: ServiceId,
    /// Display title.
    pub title: String,
    /// Price of one booking.
    pub price: Money,
    /// Whether the provider offers this service at the shopper's address.
    #[serde(default)]
    pub home_service: bool,
    /// Published availability, calendar date to times of day.
    #[serde(default)]
    pub availability: Schedule,
}

/// Request body for `POST /payments/intent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRequest {
    /// Cart reference, for cart checkouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_ref: Option<marigold_core::CartId>,
    /// Service reference, for single-booking checkouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_ref: Option<ServiceId>,
}

impl From<&CheckoutTarget> for IntentRequest {
    fn from(target: &CheckoutTarget) -> Self {
        match target {
            CheckoutTarget::Cart { cart_id } => Self {
                cart_ref: Some(cart_id.clone()),
                service_ref: None,
            },
            CheckoutTarget::Service { service_id } => Self {
                cart_ref: None,
                service_ref: Some(service_id.clone()),
            },
        }
    }
}

/// `POST /payments/intent` response.
///
/// Everything beyond the client secret is an opaque payload of
/// order-identifying fields the confirmation step must echo back.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    /// Processor-issued secret; absence is a `MissingSecret` failure.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Remaining response fields, echoed verbatim at confirmation.
    #[serde(flatten)]
    pub checkout_payload: serde_json::Map<String, serde_json::Value>,
}

/// Request body for `POST /payments/confirm`.
///
/// Built field-by-field from the typed checkout context; nothing is
/// spread from untyped form state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    /// Opaque payload from the intent response, echoed verbatim.
    #[serde(flatten)]
    pub checkout_payload: serde_json::Map<String, serde_json::Value>,
    /// Shopper contact fields.
    pub contact: ContactFields,
    /// Address fields; present only for home-service orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ShippingFields>,
    /// Selected slot, for service bookings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<Slot>,
    /// Whether the home-service toggle was on.
    pub home_service: bool,
    /// Processor-side confirmation token.
    pub confirmation_token: String,
}

/// 2xx confirmation response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmReceipt {
    /// Order created by the confirmation, when the backend reports one.
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

/// Structured error body the backend returns on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable reason, surfaced verbatim for confirmation failures.
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use marigold_core::CartId;

    #[test]
    fn test_server_cart_deserializes_flat_metadata() {
        let cart: ServerCart = serde_json::from_str(
            r#"{
                "lines": [
                    {"productId": "42", "lineId": "line_1", "title": "Lavender Soap",
                     "unitPrice": 25.00, "quantity": 2}
                ],
                "shippingCost": 5,
                "taxRate": 2.50,
                "totalAmount": 57.50
            }"#,
        )
        .unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 2);
        assert_eq!(cart.metadata.shipping_cost, Money::from_major(5));
        assert_eq!(cart.metadata.tax_amount, Money::from_minor(250));
        assert_eq!(cart.metadata.total_amount, Money::from_minor(5750));
    }

    #[test]
    fn test_intent_response_splits_secret_from_payload() {
        let response: IntentResponse = serde_json::from_str(
            r#"{"clientSecret": "pi_secret_123", "orderId": "ord_9", "amount": 5750}"#,
        )
        .unwrap();

        assert_eq!(response.client_secret.as_deref(), Some("pi_secret_123"));
        assert_eq!(
            response.checkout_payload.get("orderId"),
            Some(&serde_json::Value::String("ord_9".into()))
        );
        assert!(response.checkout_payload.get("amount").is_some());
    }

    #[test]
    fn test_intent_response_tolerates_missing_secret() {
        let response: IntentResponse = serde_json::from_str(r#"{"orderId": "ord_9"}"#).unwrap();
        assert!(response.client_secret.is_none());
    }

    #[test]
    fn test_intent_request_from_target() {
        let cart = IntentRequest::from(&CheckoutTarget::Cart {
            cart_id: CartId::new("cart_1"),
        });
        assert!(cart.cart_ref.is_some());
        assert!(cart.service_ref.is_none());

        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["cartRef"], "cart_1");
        assert!(json.get("serviceRef").is_none());
    }

    #[test]
    fn test_confirm_request_flattens_payload() {
        let mut payload = serde_json::Map::new();
        payload.insert("orderId".into(), serde_json::Value::String("ord_9".into()));

        let request = ConfirmRequest {
            checkout_payload: payload,
            contact: ContactFields {
                email: "user@example.com".into(),
                name: "Ada".into(),
                phone: None,
            },
            shipping: None,
            slot: None,
            home_service: false,
            confirmation_token: "tok_1".into(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["orderId"], "ord_9");
        assert_eq!(json["confirmationToken"], "tok_1");
        assert_eq!(json["contact"]["email"], "user@example.com");
        assert!(json.get("shipping").is_none());
    }
}
