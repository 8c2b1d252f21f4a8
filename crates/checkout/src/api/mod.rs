//! Remote commerce API client.
//!
//! # Architecture
//!
//! - The backend is the source of truth - no local sync, direct API calls
//! - Plain REST/JSON over `reqwest` with a bearer credential per request
//! - In-memory caching via `moka` for reference data (5 minute TTL);
//!   cart and payment endpoints are never cached
//! - Every call carries a request timeout; expiry classifies as the
//!   `network` error class and feeds the retry policy
//!
//! The [`CommerceApi`] trait is the seam the checkout state machine is
//! driven through, so tests can substitute a scripted implementation.

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::header::{self, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use marigold_core::{ProductId, ServiceId};

use crate::context::CheckoutTarget;
use crate::error::{CheckoutError, classify_status};
use types::{
    AddLineBody, ApiErrorBody, ConfirmReceipt, ConfirmRequest, IntentRequest, IntentResponse,
    Region, ServerCart, ServiceDetail, UpdateLineBody,
};

/// Default per-request timeout. Expiry surfaces as the `network` class.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Reference-data cache TTL (regions, service detail).
const REFERENCE_TTL: Duration = Duration::from_secs(300);

/// Cache key for the region list.
const REGIONS_KEY: &str = "regions";

/// Everything the checkout core needs from the remote commerce API.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    /// Fetch the shopper's server-held cart.
    async fn fetch_cart(&self) -> Result<ServerCart, CheckoutError>;

    /// Add a line to the server-held cart; returns the updated cart.
    async fn add_cart_line(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<ServerCart, CheckoutError>;

    /// Set a line's quantity; returns the updated cart.
    async fn update_cart_line(&self, id: &str, quantity: u32)
    -> Result<ServerCart, CheckoutError>;

    /// Remove a line; returns the updated cart.
    async fn remove_cart_line(&self, id: &str) -> Result<ServerCart, CheckoutError>;

    /// Fetch the shipping-region reference list.
    async fn fetch_regions(&self) -> Result<Vec<Region>, CheckoutError>;

    /// Fetch a bookable service's detail, including availability.
    async fn fetch_service(&self, id: &ServiceId) -> Result<ServiceDetail, CheckoutError>;

    /// Request a processor-side payment intent for the given target.
    async fn create_intent(&self, target: &CheckoutTarget)
    -> Result<IntentResponse, CheckoutError>;

    /// Submit the confirmation for a ready payment intent.
    async fn confirm_payment(
        &self,
        request: &ConfirmRequest,
    ) -> Result<ConfirmReceipt, CheckoutError>;
}

/// Configuration for [`CommerceClient`].
///
/// Implements `Debug` manually to redact the bearer credential.
#[derive(Clone)]
pub struct CommerceApiConfig {
    /// Base URL of the commerce API (e.g., `https://api.example.com/v1`).
    pub base_url: String,
    /// Bearer credential attached to every request.
    pub bearer_token: SecretString,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl CommerceApiConfig {
    /// Create a config with the default request timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>, bearer_token: SecretString) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for CommerceApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceApiConfig")
            .field("base_url", &self.base_url)
            .field("bearer_token", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Client for the remote commerce API.
///
/// Cheaply cloneable; reference data is cached for 5 minutes, cart and
/// payment endpoints always hit the network.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    base_url: String,
    regions: Cache<&'static str, Vec<Region>>,
    services: Cache<String, ServiceDetail>,
}

impl CommerceClient {
    /// Create a new commerce API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be encoded as a header or
    /// the HTTP client fails to build.
    pub fn new(config: &CommerceApiConfig) -> Result<Self, CheckoutError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.bearer_token.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| CheckoutError::Unknown(format!("invalid bearer credential: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_owned(),
                regions: Cache::builder()
                    .max_capacity(8)
                    .time_to_live(REFERENCE_TTL)
                    .build(),
                services: Cache::builder()
                    .max_capacity(1000)
                    .time_to_live(REFERENCE_TTL)
                    .build(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Parse a response, classifying non-success statuses.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CheckoutError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %body.chars().take(200).collect::<String>(),
                "commerce API returned non-success status"
            );
            let message = Self::body_message(&body).unwrap_or_default();
            return Err(classify_status(status.as_u16(), message));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(200).collect::<String>(),
                "commerce API response did not match the expected shape"
            );
            CheckoutError::Unknown(format!("unexpected response shape: {e}"))
        })
    }

    fn body_message(body: &str) -> Option<String> {
        serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CheckoutError> {
        let response = self.inner.client.get(self.url(path)).send().await?;
        Self::handle_response(response).await
    }

    async fn post_json<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CheckoutError> {
        let response = self
            .inner
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn patch_json<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CheckoutError> {
        let response = self
            .inner
            .client
            .patch(self.url(path))
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CheckoutError> {
        let response = self.inner.client.delete(self.url(path)).send().await?;
        Self::handle_response(response).await
    }

    #[instrument(skip(self))]
    async fn fetch_regions_inner(&self) -> Result<Vec<Region>, CheckoutError> {
        if let Some(regions) = self.inner.regions.get(REGIONS_KEY).await {
            debug!("cache hit for regions");
            return Ok(regions);
        }

        let regions: Vec<Region> = self.get_json("/regions").await?;
        self.inner.regions.insert(REGIONS_KEY, regions.clone()).await;
        Ok(regions)
    }

    #[instrument(skip(self), fields(service_id = %id))]
    async fn fetch_service_inner(&self, id: &ServiceId) -> Result<ServiceDetail, CheckoutError> {
        let cache_key = format!("service:{id}");

        if let Some(detail) = self.inner.services.get(&cache_key).await {
            debug!("cache hit for service");
            return Ok(detail);
        }

        let detail: ServiceDetail = self.get_json(&format!("/services/{id}")).await?;
        self.inner.services.insert(cache_key, detail.clone()).await;
        Ok(detail)
    }

    /// Confirmation failures are terminal for the attempt: any non-2xx
    /// other than an auth failure maps to `ConfirmFailed` with the
    /// server's reason carried verbatim.
    #[instrument(skip(self, request))]
    async fn confirm_payment_inner(
        &self,
        request: &ConfirmRequest,
    ) -> Result<ConfirmReceipt, CheckoutError> {
        let response = self
            .inner
            .client
            .post(self.url("/payments/confirm"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(CheckoutError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let message = Self::body_message(&body).unwrap_or_else(|| {
                "Your payment could not be confirmed. You have not been charged twice; \
                 please return to your cart and try again."
                    .to_owned()
            });
            return Err(CheckoutError::ConfirmFailed(message));
        }

        serde_json::from_str(&body)
            .map_err(|e| CheckoutError::Unknown(format!("unexpected confirmation response: {e}")))
    }
}

#[async_trait]
impl CommerceApi for CommerceClient {
    async fn fetch_cart(&self) -> Result<ServerCart, CheckoutError> {
        self.get_json("/cart").await
    }

    async fn add_cart_line(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<ServerCart, CheckoutError> {
        let body = AddLineBody {
            product_id: product_id.clone(),
            quantity,
        };
        self.post_json("/cart/lines", &body).await
    }

    async fn update_cart_line(
        &self,
        id: &str,
        quantity: u32,
    ) -> Result<ServerCart, CheckoutError> {
        let body = UpdateLineBody {
            id: id.to_owned(),
            quantity,
        };
        self.patch_json("/cart/lines", &body).await
    }

    async fn remove_cart_line(&self, id: &str) -> Result<ServerCart, CheckoutError> {
        self.delete_json(&format!("/cart/lines/{id}")).await
    }

    async fn fetch_regions(&self) -> Result<Vec<Region>, CheckoutError> {
        self.fetch_regions_inner().await
    }

    async fn fetch_service(&self, id: &ServiceId) -> Result<ServiceDetail, CheckoutError> {
        self.fetch_service_inner(id).await
    }

    async fn create_intent(
        &self,
        target: &CheckoutTarget,
    ) -> Result<IntentResponse, CheckoutError> {
        self.post_json("/payments/intent", &IntentRequest::from(target))
            .await
    }

    async fn confirm_payment(
        &self,
        request: &ConfirmRequest,
    ) -> Result<ConfirmReceipt, CheckoutError> {
        self.confirm_payment_inner(request).await
    }
}

impl std::fmt::Debug for CommerceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}
