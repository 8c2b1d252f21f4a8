//! Per-session checkout context.
//!
//! A [`CheckoutContext`] is created fresh for each checkout session and
//! accumulates, field by field, everything the confirmation step needs:
//! contact fields, conditionally required shipping fields, the selected
//! slot or cart reference, and the processor-issued client secret plus
//! opaque checkout payload.

use marigold_core::{CartId, Email, ServiceId, Slot};
use serde::{Deserialize, Serialize};

use crate::api::types::ConfirmRequest;
use crate::error::CheckoutError;

/// What a checkout session is paying for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CheckoutTarget {
    /// The shopper's server-held cart.
    Cart {
        /// Cart reference echoed to the payment-intent endpoint.
        cart_id: CartId,
    },
    /// A single time-boxed service booking.
    Service {
        /// Service reference echoed to the payment-intent endpoint.
        service_id: ServiceId,
    },
}

/// Contact fields collected before confirmation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContactFields {
    /// Shopper email; validated structurally before confirmation.
    #[serde(default)]
    pub email: String,
    /// Shopper display name.
    #[serde(default)]
    pub name: String,
    /// Optional phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

/// Address fields, mandatory only while the home-service toggle is on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingFields {
    /// Selected shipping region.
    #[serde(default)]
    pub region_id: Option<marigold_core::RegionId>,
    /// Street address.
    #[serde(default)]
    pub address: String,
    /// City.
    #[serde(default)]
    pub city: String,
    /// Optional postal code.
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Everything one checkout session accumulates before confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutContext {
    /// What this session pays for.
    pub target: CheckoutTarget,
    /// Contact fields as entered so far.
    pub contact: ContactFields,
    /// Whether the shopper asked for home service.
    pub home_service: bool,
    /// Address fields; only kept while `home_service` is on.
    pub shipping: Option<ShippingFields>,
    /// Selected slot, for service bookings.
    pub slot: Option<Slot>,
    /// Processor-issued client secret, once the intent is ready.
    pub client_secret: Option<String>,
    /// Opaque payload from the intent response, echoed at confirmation.
    pub checkout_payload: serde_json::Map<String, serde_json::Value>,
}

impl CheckoutContext {
    /// Create a fresh context for one checkout session.
    #[must_use]
    pub fn new(target: CheckoutTarget) -> Self {
        Self {
            target,
            contact: ContactFields::default(),
            home_service: false,
            shipping: None,
            slot: None,
            client_secret: None,
            checkout_payload: serde_json::Map::new(),
        }
    }

    /// Toggle home service.
    ///
    /// Toggling it off clears, rather than hides, any filled shipping
    /// fields so a non-shipped order never submits a stale address.
    pub fn set_home_service(&mut self, enabled: bool) {
        self.home_service = enabled;
        if !enabled {
            self.shipping = None;
        }
    }

    /// Store the chosen slot. No local double-booking check; conflicts
    /// surface server-side at confirmation.
    pub const fn select_slot(&mut self, slot: Slot) {
        self.slot = Some(slot);
    }

    /// Install a ready payment intent's secret and payload.
    pub fn install_intent(
        &mut self,
        client_secret: String,
        checkout_payload: serde_json::Map<String, serde_json::Value>,
    ) {
        self.client_secret = Some(client_secret);
        self.checkout_payload = checkout_payload;
    }

    /// Field-level validation gate for the confirmation step.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] naming each missing or
    /// malformed required field. Nothing reaches the network on failure.
    pub fn validate_for_confirm(&self) -> Result<(), CheckoutError> {
        let mut fields = Vec::new();

        if self.contact.name.trim().is_empty() {
            fields.push("name".to_owned());
        }
        if Email::parse(self.contact.email.trim()).is_err() {
            fields.push("email".to_owned());
        }

        if self.home_service {
            match &self.shipping {
                None => {
                    fields.extend(["region".to_owned(), "address".to_owned(), "city".to_owned()]);
                }
                Some(shipping) => {
                    if shipping.region_id.is_none() {
                        fields.push("region".to_owned());
                    }
                    if shipping.address.trim().is_empty() {
                        fields.push("address".to_owned());
                    }
                    if shipping.city.trim().is_empty() {
                        fields.push("city".to_owned());
                    }
                }
            }
        }

        if matches!(self.target, CheckoutTarget::Service { .. }) && self.slot.is_none() {
            fields.push("slot".to_owned());
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::Validation { fields })
        }
    }

    /// Build the confirmation request field-by-field from typed state.
    #[must_use]
    pub fn confirm_request(&self, confirmation_token: String) -> ConfirmRequest {
        ConfirmRequest {
            checkout_payload: self.checkout_payload.clone(),
            contact: self.contact.clone(),
            shipping: self.shipping.clone(),
            slot: self.slot,
            home_service: self.home_service,
            confirmation_token,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use marigold_core::{RegionId, TimeOfDay};

    fn cart_context() -> CheckoutContext {
        CheckoutContext::new(CheckoutTarget::Cart {
            cart_id: CartId::new("cart_1"),
        })
    }

    fn valid_contact() -> ContactFields {
        ContactFields {
            email: "user@example.com".into(),
            name: "Ada".into(),
            phone: None,
        }
    }

    fn filled_shipping() -> ShippingFields {
        ShippingFields {
            region_id: Some(RegionId::new("reg_1")),
            address: "1 Main St".into(),
            city: "Springfield".into(),
            postal_code: None,
        }
    }

    #[test]
    fn test_validation_requires_contact() {
        let mut context = cart_context();
        let err = context.validate_for_confirm().unwrap_err();
        assert_eq!(
            err,
            CheckoutError::Validation {
                fields: vec!["name".into(), "email".into()]
            }
        );

        context.contact = valid_contact();
        assert!(context.validate_for_confirm().is_ok());
    }

    #[test]
    fn test_validation_rejects_malformed_email() {
        let mut context = cart_context();
        context.contact = ContactFields {
            email: "not-an-email".into(),
            name: "Ada".into(),
            phone: None,
        };

        let err = context.validate_for_confirm().unwrap_err();
        assert_eq!(
            err,
            CheckoutError::Validation {
                fields: vec!["email".into()]
            }
        );
    }

    #[test]
    fn test_home_service_requires_address_fields() {
        let mut context = cart_context();
        context.contact = valid_contact();
        context.set_home_service(true);

        let err = context.validate_for_confirm().unwrap_err();
        assert_eq!(
            err,
            CheckoutError::Validation {
                fields: vec!["region".into(), "address".into(), "city".into()]
            }
        );

        context.shipping = Some(ShippingFields {
            address: "  ".into(),
            ..filled_shipping()
        });
        let err = context.validate_for_confirm().unwrap_err();
        assert_eq!(
            err,
            CheckoutError::Validation {
                fields: vec!["address".into()]
            }
        );

        context.shipping = Some(filled_shipping());
        assert!(context.validate_for_confirm().is_ok());
    }

    #[test]
    fn test_toggle_off_clears_shipping() {
        let mut context = cart_context();
        context.set_home_service(true);
        context.shipping = Some(filled_shipping());

        context.set_home_service(false);
        assert!(context.shipping.is_none());

        // Toggling back on does not resurrect the cleared fields.
        context.set_home_service(true);
        assert!(context.shipping.is_none());
    }

    #[test]
    fn test_service_target_requires_slot() {
        let mut context = CheckoutContext::new(CheckoutTarget::Service {
            service_id: ServiceId::new("svc_1"),
        });
        context.contact = valid_contact();

        let err = context.validate_for_confirm().unwrap_err();
        assert_eq!(
            err,
            CheckoutError::Validation {
                fields: vec!["slot".into()]
            }
        );

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        context.select_slot(Slot::new(date, TimeOfDay::parse("09:00").unwrap()));
        assert!(context.validate_for_confirm().is_ok());
    }

    #[test]
    fn test_confirm_request_carries_typed_fields() {
        let mut context = cart_context();
        context.contact = valid_contact();
        let mut payload = serde_json::Map::new();
        payload.insert("orderId".into(), serde_json::Value::String("ord_9".into()));
        context.install_intent("pi_secret".into(), payload);

        let request = context.confirm_request("tok_1".into());
        assert_eq!(request.confirmation_token, "tok_1");
        assert_eq!(request.contact.email, "user@example.com");
        assert!(!request.home_service);
        assert_eq!(
            request.checkout_payload.get("orderId"),
            Some(&serde_json::Value::String("ord_9".into()))
        );
    }
}
