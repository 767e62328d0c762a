use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::PublicSeminar;
use crate::error::AppError;
use crate::services::booking::{BookingRequest, BookingService};
use crate::services::seminars::SeminarService;
use crate::services::tenancy::Tenant;
use crate::AppState;

/// Read-only seminar catalogue.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seminars", get(list_seminars))
        .route("/seminars/:id", get(get_seminar))
}

/// Booking endpoint; mounted behind the public rate limiter.
pub fn booking_router() -> Router<Arc<AppState>> {
    Router::new().route("/seminars/:id/bookings", post(book))
}

#[derive(Debug, Deserialize)]
pub struct SeminarPath {
    pub id: String,
}

async fn list_seminars(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
) -> Result<Json<Vec<PublicSeminar>>, AppError> {
    Ok(Json(SeminarService::list_public(&state, &tenant).await?))
}

async fn get_seminar(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Path(path): Path<SeminarPath>,
) -> Result<Json<PublicSeminar>, AppError> {
    let seminar = SeminarService::get_public(&state, &tenant, &path.id).await?;
    Ok(Json(PublicSeminar::from(&seminar)))
}

async fn book(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Path(path): Path<SeminarPath>,
    Json(request): Json<BookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = BookingService::book(&state, &tenant, &path.id, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}
