//! Service detail and reference-data routes.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use marigold_checkout::api::CommerceApi;
use marigold_checkout::api::types::Region;
use marigold_checkout::error::CheckoutError;
use marigold_core::{Money, ServiceId, Slot};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Service detail display data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceView {
    /// Service identity.
    pub id: ServiceId,
    /// Display title.
    pub title: String,
    /// Booking price.
    pub price: Money,
    /// Whether the provider offers home service.
    pub home_service: bool,
    /// Flattened, ordered bookable slots.
    pub slots: Vec<Slot>,
}

/// Display a bookable service with its selectable slots.
#[instrument(skip(app))]
pub async fn show(
    State(app): State<AppState>,
    Path(id): Path<ServiceId>,
) -> Result<Json<ServiceView>> {
    let detail = app.api().fetch_service(&id).await.map_err(|error| {
        if matches!(error, CheckoutError::Server { status: 404, .. }) {
            AppError::NotFound(format!("service {id}"))
        } else {
            AppError::Checkout(error)
        }
    })?;

    Ok(Json(ServiceView {
        id: detail.id,
        title: detail.title,
        price: detail.price,
        home_service: detail.home_service,
        slots: detail.availability.flatten(),
    }))
}

/// The shipping-region reference list.
#[instrument(skip(app))]
pub async fn regions(State(app): State<AppState>) -> Result<Json<Vec<Region>>> {
    let regions = app.api().fetch_regions().await?;
    Ok(Json(regions))
}
