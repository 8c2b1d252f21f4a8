//! Payment intent gateway.
//!
//! One attempt at a time: the gateway performs a single intent-creation
//! call and classifies the outcome. Retry timing lives in the checkout
//! session driver, which owns the cancellable backoff timer and
//! guarantees at most one in-flight call per session.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::api::CommerceApi;
use crate::context::CheckoutTarget;
use crate::error::CheckoutError;
use crate::intent::RetryPolicy;

/// A ready payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Processor-issued client secret.
    pub client_secret: String,
    /// Opaque order-identifying payload to echo at confirmation.
    pub checkout_payload: Map<String, Value>,
}

/// Requests processor-side payment intents and classifies failures.
pub struct IntentGateway {
    api: Arc<dyn CommerceApi>,
    policy: RetryPolicy,
}

impl IntentGateway {
    /// Create a gateway with the default retry policy.
    pub fn new(api: Arc<dyn CommerceApi>) -> Self {
        Self {
            api,
            policy: RetryPolicy::default(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The retry policy governing this gateway's failures.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// One intent-creation attempt.
    ///
    /// Callers must not overlap calls for the same target; the session
    /// driver serializes them.
    ///
    /// # Errors
    ///
    /// Returns a classified [`CheckoutError`]; a 2xx response without a
    /// client secret classifies as [`CheckoutError::MissingSecret`].
    #[instrument(skip(self))]
    pub async fn create_intent(
        &self,
        target: &CheckoutTarget,
    ) -> Result<PaymentIntent, CheckoutError> {
        let response = self.api.create_intent(target).await?;

        let Some(client_secret) = response.client_secret.filter(|secret| !secret.is_empty())
        else {
            return Err(CheckoutError::MissingSecret);
        };

        debug!("payment intent ready");
        Ok(PaymentIntent {
            client_secret,
            checkout_payload: response.checkout_payload,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use marigold_core::{CartId, ProductId, ServiceId};

    use crate::api::types::{
        ConfirmReceipt, ConfirmRequest, IntentResponse, Region, ServerCart, ServiceDetail,
    };

    struct FixedIntentApi {
        response: std::sync::Mutex<Option<IntentResponse>>,
    }

    impl FixedIntentApi {
        fn returning(json: &str) -> Self {
            Self {
                response: std::sync::Mutex::new(Some(serde_json::from_str(json).unwrap())),
            }
        }
    }

    #[async_trait]
    impl CommerceApi for FixedIntentApi {
        async fn fetch_cart(&self) -> Result<ServerCart, CheckoutError> {
            unreachable!("not used by the gateway")
        }
        async fn add_cart_line(
            &self,
            _: &ProductId,
            _: u32,
        ) -> Result<ServerCart, CheckoutError> {
            unreachable!("not used by the gateway")
        }
        async fn update_cart_line(&self, _: &str, _: u32) -> Result<ServerCart, CheckoutError> {
            unreachable!("not used by the gateway")
        }
        async fn remove_cart_line(&self, _: &str) -> Result<ServerCart, CheckoutError> {
            unreachable!("not used by the gateway")
        }
        async fn fetch_regions(&self) -> Result<Vec<Region>, CheckoutError> {
            unreachable!("not used by the gateway")
        }
        async fn fetch_service(&self, _: &ServiceId) -> Result<ServiceDetail, CheckoutError> {
            unreachable!("not used by the gateway")
        }
        async fn create_intent(
            &self,
            _: &CheckoutTarget,
        ) -> Result<IntentResponse, CheckoutError> {
            Ok(self
                .response
                .lock()
                .unwrap()
                .take()
                .expect("one call expected"))
        }
        async fn confirm_payment(
            &self,
            _: &ConfirmRequest,
        ) -> Result<ConfirmReceipt, CheckoutError> {
            unreachable!("not used by the gateway")
        }
    }

    fn cart_target() -> CheckoutTarget {
        CheckoutTarget::Cart {
            cart_id: CartId::new("cart_1"),
        }
    }

    #[tokio::test]
    async fn test_create_intent_extracts_secret_and_payload() {
        let api = Arc::new(FixedIntentApi::returning(
            r#"{"clientSecret": "pi_secret", "orderId": "ord_9"}"#,
        ));
        let gateway = IntentGateway::new(api);

        let intent = gateway.create_intent(&cart_target()).await.unwrap();
        assert_eq!(intent.client_secret, "pi_secret");
        assert_eq!(
            intent.checkout_payload.get("orderId"),
            Some(&serde_json::Value::String("ord_9".into()))
        );
    }

    #[tokio::test]
    async fn test_missing_secret_is_classified() {
        let api = Arc::new(FixedIntentApi::returning(r#"{"orderId": "ord_9"}"#));
        let gateway = IntentGateway::new(api);

        let err = gateway.create_intent(&cart_target()).await.unwrap_err();
        assert_eq!(err, CheckoutError::MissingSecret);
    }

    #[tokio::test]
    async fn test_empty_secret_is_classified() {
        let api = Arc::new(FixedIntentApi::returning(r#"{"clientSecret": ""}"#));
        let gateway = IntentGateway::new(api);

        let err = gateway.create_intent(&cart_target()).await.unwrap_err();
        assert_eq!(err, CheckoutError::MissingSecret);
    }
}
