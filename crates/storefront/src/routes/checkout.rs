//! Checkout session routes.
//!
//! Each handler translates one HTTP call into a command against the
//! shopper's checkout session and answers with the resulting snapshot.
//! The session itself lives in process state; abandoning it (explicitly
//! or by idle eviction) stops the driver and any pending retry timer.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use marigold_checkout::context::{CheckoutTarget, ContactFields, ShippingFields};
use marigold_checkout::session::{CheckoutCommand, CheckoutPhase, CheckoutSession, CheckoutSnapshot};
use marigold_core::Slot;

use crate::error::{AppError, Result};
use crate::routes::shopper_key;
use crate::state::AppState;

/// Start checkout form data.
#[derive(Debug, Deserialize)]
pub struct BeginCheckoutForm {
    /// What to check out: the cart or a single service booking.
    pub target: CheckoutTarget,
}

/// Home-service toggle form data.
#[derive(Debug, Deserialize)]
pub struct HomeServiceForm {
    pub enabled: bool,
}

/// Confirmation form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmForm {
    /// Token minted by the processor-hosted confirmation UI.
    pub confirmation_token: String,
}

/// Start a checkout session, replacing any previous one.
#[instrument(skip(app, session, form))]
pub async fn begin(
    State(app): State<AppState>,
    session: Session,
    Json(form): Json<BeginCheckoutForm>,
) -> Result<Json<CheckoutSnapshot>> {
    let key = shopper_key(&session).await?;
    let checkout = app.begin_checkout(&key, form.target);
    Ok(Json(checkout.snapshot()))
}

/// The current checkout snapshot.
#[instrument(skip(app, session))]
pub async fn snapshot(
    State(app): State<AppState>,
    session: Session,
) -> Result<Json<CheckoutSnapshot>> {
    let key = shopper_key(&session).await?;
    let checkout = active_checkout(&app, &key)?;
    Ok(Json(checkout.snapshot()))
}

/// Abandon the checkout session.
#[instrument(skip(app, session))]
pub async fn abandon(State(app): State<AppState>, session: Session) -> Result<StatusCode> {
    let key = shopper_key(&session).await?;
    app.end_checkout(&key);
    Ok(StatusCode::NO_CONTENT)
}

/// Update contact fields.
#[instrument(skip(app, session, fields))]
pub async fn contact(
    State(app): State<AppState>,
    session: Session,
    Json(fields): Json<ContactFields>,
) -> Result<Json<CheckoutSnapshot>> {
    command(&app, &session, CheckoutCommand::UpdateContact(fields)).await
}

/// Toggle home service; toggling off clears shipping fields.
#[instrument(skip(app, session))]
pub async fn home_service(
    State(app): State<AppState>,
    session: Session,
    Json(form): Json<HomeServiceForm>,
) -> Result<Json<CheckoutSnapshot>> {
    command(&app, &session, CheckoutCommand::SetHomeService(form.enabled)).await
}

/// Update shipping fields.
#[instrument(skip(app, session, fields))]
pub async fn shipping(
    State(app): State<AppState>,
    session: Session,
    Json(fields): Json<ShippingFields>,
) -> Result<Json<CheckoutSnapshot>> {
    command(&app, &session, CheckoutCommand::UpdateShipping(fields)).await
}

/// Select a bookable slot.
#[instrument(skip(app, session))]
pub async fn slot(
    State(app): State<AppState>,
    session: Session,
    Json(slot): Json<Slot>,
) -> Result<Json<CheckoutSnapshot>> {
    command(&app, &session, CheckoutCommand::SelectSlot(slot)).await
}

/// Manual payment retry ("try again").
#[instrument(skip(app, session))]
pub async fn retry(
    State(app): State<AppState>,
    session: Session,
) -> Result<Json<CheckoutSnapshot>> {
    command(&app, &session, CheckoutCommand::RetryPayment).await
}

/// Submit the confirmation and wait for its terminal outcome.
#[instrument(skip(app, session, form))]
pub async fn confirm(
    State(app): State<AppState>,
    session: Session,
    Json(form): Json<ConfirmForm>,
) -> Result<Json<CheckoutSnapshot>> {
    let key = shopper_key(&session).await?;
    let checkout = active_checkout(&app, &key)?;

    let mut watch = checkout.watch();
    let _ = watch.borrow_and_update();

    if !checkout
        .command(CheckoutCommand::Confirm {
            confirmation_token: form.confirmation_token,
        })
        .await
    {
        return Err(ended());
    }

    // First publish: either a validation rejection or the Confirming
    // transition. In the latter case, wait for the terminal outcome.
    let _ = watch.changed().await;
    let confirming = matches!(watch.borrow().phase, CheckoutPhase::Confirming);
    if confirming {
        let _ = watch
            .wait_for(|snapshot| !matches!(snapshot.phase, CheckoutPhase::Confirming))
            .await;
    }

    Ok(Json(checkout.snapshot()))
}

fn active_checkout(
    app: &AppState,
    key: &str,
) -> Result<std::sync::Arc<CheckoutSession>> {
    app.checkout_session(key)
        .ok_or_else(|| AppError::NotFound("no active checkout session".into()))
}

fn ended() -> AppError {
    AppError::NotFound("checkout session has ended".into())
}

/// Send a command and answer with the snapshot it produced.
async fn command(
    app: &AppState,
    session: &Session,
    command: CheckoutCommand,
) -> Result<Json<CheckoutSnapshot>> {
    let key = shopper_key(session).await?;
    let checkout = active_checkout(app, &key)?;

    let mut watch = checkout.watch();
    let _ = watch.borrow_and_update();

    if !checkout.command(command).await {
        return Err(ended());
    }

    let _ = watch.changed().await;
    Ok(Json(watch.borrow().clone()))
}
