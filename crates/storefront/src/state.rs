//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use marigold_checkout::api::{CommerceApi, CommerceClient};
use marigold_checkout::context::CheckoutTarget;
use marigold_checkout::draft::DraftStore;
use marigold_checkout::error::CheckoutError;
use marigold_checkout::session::CheckoutSession;

use crate::config::StorefrontConfig;
use crate::models::CartState;

/// Idle lifetime of per-session state. Evicting a checkout session drops
/// its handle, which abandons the driver and any pending retry timer.
const SESSION_STATE_TTL: Duration = Duration::from_secs(30 * 60);

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; provides access to the commerce API
/// client and the per-session cart, draft, and checkout stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: CommerceClient,
    drafts: DraftStore,
    carts: Cache<String, CartState>,
    checkouts: Cache<String, Arc<CheckoutSession>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the commerce API client cannot be built from
    /// the configured credential.
    pub fn new(config: StorefrontConfig) -> Result<Self, CheckoutError> {
        let api = CommerceClient::new(&config.commerce.api_config())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                drafts: DraftStore::new(),
                carts: Cache::builder()
                    .max_capacity(10_000)
                    .time_to_idle(SESSION_STATE_TTL)
                    .build(),
                checkouts: Cache::builder()
                    .max_capacity(10_000)
                    .time_to_idle(SESSION_STATE_TTL)
                    .build(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the commerce API client.
    #[must_use]
    pub fn api(&self) -> &CommerceClient {
        &self.inner.api
    }

    /// Get a reference to the checkout draft store.
    #[must_use]
    pub fn drafts(&self) -> &DraftStore {
        &self.inner.drafts
    }

    /// The shopper's cart state, or a fresh empty one.
    #[must_use]
    pub fn cart_state(&self, shopper_key: &str) -> CartState {
        self.inner.carts.get(shopper_key).unwrap_or_default()
    }

    /// Store the shopper's cart state.
    pub fn store_cart_state(&self, shopper_key: &str, state: CartState) {
        self.inner.carts.insert(shopper_key.to_owned(), state);
    }

    /// The shopper's active checkout session, if any.
    #[must_use]
    pub fn checkout_session(&self, shopper_key: &str) -> Option<Arc<CheckoutSession>> {
        self.inner.checkouts.get(shopper_key)
    }

    /// Start a checkout session for the shopper, replacing (and thereby
    /// abandoning) any previous one.
    pub fn begin_checkout(&self, shopper_key: &str, target: CheckoutTarget) -> Arc<CheckoutSession> {
        let session = Arc::new(CheckoutSession::begin(
            Arc::new(self.inner.api.clone()) as Arc<dyn CommerceApi>,
            target,
            self.inner.drafts.clone(),
            shopper_key,
        ));
        self.inner
            .checkouts
            .insert(shopper_key.to_owned(), Arc::clone(&session));
        session
    }

    /// Abandon the shopper's checkout session, cancelling any pending
    /// retry timer.
    pub fn end_checkout(&self, shopper_key: &str) {
        self.inner.checkouts.invalidate(shopper_key);
    }
}
