use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::services::booking::{BookingService, ReservationEdit, ReservationView};
use crate::services::tenancy::Tenant;
use crate::AppState;

/// Attendee self-service by reservation number and email.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reservations/lookup", post(lookup))
        .route("/reservations/:number", put(edit))
        .route("/reservations/:number/cancel", post(cancel))
}

#[derive(Debug, Deserialize)]
pub struct ReservationPath {
    pub number: String,
}

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub reservation_number: String,
    pub email: String,
    #[serde(default)]
    pub lang: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub email: String,
    #[serde(default)]
    pub lang: Option<String>,
}

async fn lookup(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Json(request): Json<LookupRequest>,
) -> Result<Json<ReservationView>, AppError> {
    let view = BookingService::lookup(
        &state,
        &tenant,
        &request.reservation_number,
        &request.email,
        request.lang.as_deref(),
    )
    .await?;
    Ok(Json(view))
}

async fn edit(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Path(path): Path<ReservationPath>,
    Json(request): Json<ReservationEdit>,
) -> Result<Json<ReservationView>, AppError> {
    Ok(Json(BookingService::edit(&state, &tenant, &path.number, request).await?))
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Path(path): Path<ReservationPath>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<ReservationView>, AppError> {
    let view = BookingService::cancel_by_number(
        &state,
        &tenant,
        &path.number,
        &request.email,
        request.lang.as_deref(),
    )
    .await?;
    Ok(Json(view))
}
