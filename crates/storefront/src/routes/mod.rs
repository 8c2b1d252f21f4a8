//! HTTP route handlers for the storefront JSON shell.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Health check
//!
//! # Cart
//! GET    /api/cart                   - Cart (reconciled against the server)
//! GET    /api/cart/count             - Cart count badge
//! POST   /api/cart/lines             - Add item
//! PATCH  /api/cart/lines             - Update quantity (0 removes)
//! DELETE /api/cart/lines/{id}        - Remove item
//!
//! # Reference data
//! GET    /api/regions                - Shipping regions
//! GET    /api/services/{id}          - Service detail with bookable slots
//!
//! # Checkout
//! POST   /api/checkout               - Start a checkout session
//! GET    /api/checkout               - Current checkout snapshot
//! DELETE /api/checkout               - Abandon the checkout session
//! PUT    /api/checkout/contact       - Update contact fields
//! PUT    /api/checkout/home-service  - Toggle home service
//! PUT    /api/checkout/shipping      - Update shipping fields
//! PUT    /api/checkout/slot          - Select a bookable slot
//! POST   /api/checkout/retry         - Manual payment retry
//! POST   /api/checkout/confirm       - Submit the confirmation
//! ```

pub mod cart;
pub mod checkout;
pub mod services;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::session_keys;
use crate::state::AppState;

/// Create the storefront router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(cart::show))
        .route("/api/cart/count", get(cart::count))
        .route("/api/cart/lines", post(cart::add).patch(cart::update))
        .route("/api/cart/lines/{id}", delete(cart::remove))
        .route("/api/regions", get(services::regions))
        .route("/api/services/{id}", get(services::show))
        .route(
            "/api/checkout",
            post(checkout::begin)
                .get(checkout::snapshot)
                .delete(checkout::abandon),
        )
        .route("/api/checkout/contact", put(checkout::contact))
        .route("/api/checkout/home-service", put(checkout::home_service))
        .route("/api/checkout/shipping", put(checkout::shipping))
        .route("/api/checkout/slot", put(checkout::slot))
        .route("/api/checkout/retry", post(checkout::retry))
        .route("/api/checkout/confirm", post(checkout::confirm))
}

/// Get or mint the stable per-session shopper key.
pub(crate) async fn shopper_key(session: &Session) -> Result<String, AppError> {
    if let Some(key) = session
        .get::<String>(session_keys::SHOPPER)
        .await
        .map_err(|e| AppError::Session(e.to_string()))?
    {
        return Ok(key);
    }

    let key = Uuid::new_v4().to_string();
    session
        .insert(session_keys::SHOPPER, key.clone())
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;
    Ok(key)
}
