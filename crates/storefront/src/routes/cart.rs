//! Cart route handlers.
//!
//! The client-held ledger is mutated first so the response reflects the
//! shopper's action immediately; the server-held cart is pushed in the
//! same request and absorbed back when it answers. On cart-page entry the
//! ledger is reconciled wholesale against the server, which stays
//! authoritative for pricing.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use marigold_checkout::api::CommerceApi;
use marigold_checkout::cart::CartLine;
use marigold_checkout::error::CheckoutError;
use marigold_checkout::summary::OrderSummary;
use marigold_core::{Money, ProductId};

use crate::error::{AppError, Result};
use crate::models::CartState;
use crate::routes::shopper_key;
use crate::state::AppState;

/// Cart line display data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    /// Identity used for update/remove calls.
    pub id: String,
    /// Product the line refers to.
    pub product_id: ProductId,
    /// Display title.
    pub title: String,
    /// Quantity.
    pub quantity: u32,
    /// Unit price display string.
    pub price: String,
    /// Line total display string.
    pub line_price: String,
    /// Optional product image reference.
    pub image: Option<String>,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line
                .line_id
                .as_ref()
                .map_or_else(|| line.product_id.as_str().to_owned(), |id| {
                    id.as_str().to_owned()
                }),
            product_id: line.product_id.clone(),
            title: line.title.clone(),
            quantity: line.quantity,
            price: line.unit_price.display(),
            line_price: line.line_total().display(),
            image: line.image_url.clone(),
        }
    }
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    /// Current lines.
    pub items: Vec<CartLineView>,
    /// Total item count across lines.
    pub item_count: u32,
    /// Projected figures (server figures once loaded).
    pub summary: OrderSummary,
    /// Recoverable sync-failure banner, when the server could not be
    /// reached; the local cart still reflects the shopper's action.
    pub banner: Option<String>,
}

fn cart_view(state: &CartState, banner: Option<String>) -> CartView {
    CartView {
        items: state.ledger.lines().iter().map(CartLineView::from).collect(),
        item_count: state.ledger.item_count(),
        summary: state.summary(),
        banner,
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: Money,
    pub quantity: Option<u32>,
    pub image_url: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartForm {
    pub id: String,
    pub quantity: u32,
}

/// Cart count badge data.
#[derive(Debug, Serialize)]
pub struct CartCountView {
    pub count: u32,
}

/// Absorb a server response into the cart state, or surface a recoverable
/// banner. Auth failures bubble up so the shell can redirect to login.
fn apply_sync(
    state: &mut CartState,
    result: std::result::Result<marigold_checkout::api::types::ServerCart, CheckoutError>,
    action: &str,
) -> Result<Option<String>> {
    match result {
        Ok(server_cart) => {
            state.absorb(&server_cart);
            Ok(None)
        }
        Err(error) if error.requires_login() => Err(AppError::Checkout(error)),
        Err(error) => {
            tracing::warn!(error = %error, action, "cart sync failed; serving local ledger");
            Ok(Some(error.user_message()))
        }
    }
}

/// Display the cart, reconciled against the server.
#[instrument(skip(app, session))]
pub async fn show(State(app): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let key = shopper_key(&session).await?;
    let mut cart = app.cart_state(&key);

    let banner = apply_sync(&mut cart, app.api().fetch_cart().await, "fetch")?;

    app.store_cart_state(&key, cart.clone());
    Ok(Json(cart_view(&cart, banner)))
}

/// Add an item to the cart.
#[instrument(skip(app, session, form))]
pub async fn add(
    State(app): State<AppState>,
    session: Session,
    Json(form): Json<AddToCartForm>,
) -> Result<Json<CartView>> {
    let key = shopper_key(&session).await?;
    let mut cart = app.cart_state(&key);

    let quantity = form.quantity.unwrap_or(1).max(1);
    cart.ledger.add(CartLine {
        product_id: form.product_id.clone(),
        line_id: None,
        title: form.title,
        unit_price: form.unit_price,
        quantity,
        image_url: form.image_url,
    });

    let banner = apply_sync(
        &mut cart,
        app.api().add_cart_line(&form.product_id, quantity).await,
        "add",
    )?;

    app.store_cart_state(&key, cart.clone());
    Ok(Json(cart_view(&cart, banner)))
}

/// Update an item's quantity; `0` removes the line.
#[instrument(skip(app, session, form))]
pub async fn update(
    State(app): State<AppState>,
    session: Session,
    Json(form): Json<UpdateCartForm>,
) -> Result<Json<CartView>> {
    let key = shopper_key(&session).await?;
    let mut cart = app.cart_state(&key);

    if !cart.ledger.update_quantity(&form.id, form.quantity) {
        return Err(AppError::NotFound(format!("cart line {}", form.id)));
    }

    let sync = if form.quantity == 0 {
        app.api().remove_cart_line(&form.id).await
    } else {
        app.api().update_cart_line(&form.id, form.quantity).await
    };
    let banner = apply_sync(&mut cart, sync, "update")?;

    app.store_cart_state(&key, cart.clone());
    Ok(Json(cart_view(&cart, banner)))
}

/// Remove an item from the cart.
#[instrument(skip(app, session))]
pub async fn remove(
    State(app): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<CartView>> {
    let key = shopper_key(&session).await?;
    let mut cart = app.cart_state(&key);

    if !cart.ledger.remove(&id) {
        return Err(AppError::NotFound(format!("cart line {id}")));
    }

    let banner = apply_sync(&mut cart, app.api().remove_cart_line(&id).await, "remove")?;

    app.store_cart_state(&key, cart.clone());
    Ok(Json(cart_view(&cart, banner)))
}

/// Get the cart count badge.
#[instrument(skip(app, session))]
pub async fn count(
    State(app): State<AppState>,
    session: Session,
) -> Result<Json<CartCountView>> {
    let key = shopper_key(&session).await?;
    let cart = app.cart_state(&key);
    Ok(Json(CartCountView {
        count: cart.ledger.item_count(),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use marigold_core::LineId;

    fn line(product: &str, line_id: Option<&str>) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            line_id: line_id.map(LineId::new),
            title: "Lavender Soap".into(),
            unit_price: Money::from_minor(2500),
            quantity: 2,
            image_url: None,
        }
    }

    #[test]
    fn test_line_view_prefers_server_line_id() {
        let synced = CartLineView::from(&line("42", Some("line_1")));
        assert_eq!(synced.id, "line_1");

        let unsynced = CartLineView::from(&line("42", None));
        assert_eq!(unsynced.id, "42");
    }

    #[test]
    fn test_line_view_formats_prices() {
        let view = CartLineView::from(&line("42", None));
        assert_eq!(view.price, "$25.00");
        assert_eq!(view.line_price, "$50.00");
    }

    #[test]
    fn test_cart_view_of_empty_state() {
        let view = cart_view(&CartState::default(), None);
        assert!(view.items.is_empty());
        assert_eq!(view.item_count, 0);
        assert!(view.banner.is_none());
    }
}
