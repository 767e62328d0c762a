use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::{Reservation, Seminar, SurveyResponse};
use crate::error::AppError;
use crate::routes::auth::AdminSession;
use crate::routes::member_domains;
use crate::routes::surveys::parse_kind;
use crate::services::booking::BookingService;
use crate::services::seminars::{NewSeminar, SeminarPatch, SeminarService, SeminarStats};
use crate::services::surveys::{QuestionInput, QuestionSet, SurveyService};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seminars", get(list_seminars).post(create_seminar))
        .route("/seminars/:id", get(get_seminar).put(update_seminar))
        .route("/seminars/:id/publish", post(publish_seminar))
        .route("/seminars/:id/cancel", post(cancel_seminar))
        .route("/seminars/:id/complete", post(complete_seminar))
        .route("/seminars/:id/stats", get(seminar_stats))
        .route("/seminars/:id/reservations", get(list_reservations))
        .route(
            "/seminars/:id/reservations/:rid/cancel",
            post(cancel_reservation),
        )
        .route("/seminars/:id/surveys/:kind", get(survey_responses))
        .route(
            "/seminars/:id/surveys/:kind/questions",
            get(survey_questions).put(replace_survey_questions),
        )
        .merge(member_domains::router())
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SeminarPath {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReservationPath {
    pub id: String,
    pub rid: String,
}

#[derive(Debug, Deserialize)]
pub struct SurveyPath {
    pub id: String,
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct CancelSeminarResponse {
    pub seminar: Seminar,
    /// Confirmed attendees a cancellation notice was attempted for.
    pub notified: usize,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceQuestionsRequest {
    pub questions: Vec<QuestionInput>,
}

// ============================================================================
// Seminars
// ============================================================================

async fn list_seminars(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
) -> Result<Json<Vec<Seminar>>, AppError> {
    Ok(Json(SeminarService::list_all(&state, &session.tenant).await?))
}

async fn create_seminar(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Json(input): Json<NewSeminar>,
) -> Result<impl IntoResponse, AppError> {
    let seminar = SeminarService::create(&state, &session.tenant, input).await?;
    Ok((StatusCode::CREATED, Json(seminar)))
}

async fn get_seminar(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(path): Path<SeminarPath>,
) -> Result<Json<Seminar>, AppError> {
    let (_, seminar) = SeminarService::get(&state, &session.tenant, &path.id).await?;
    Ok(Json(seminar))
}

async fn update_seminar(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(path): Path<SeminarPath>,
    Json(patch): Json<SeminarPatch>,
) -> Result<Json<Seminar>, AppError> {
    Ok(Json(
        SeminarService::update(&state, &session.tenant, &path.id, patch).await?,
    ))
}

async fn publish_seminar(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(path): Path<SeminarPath>,
) -> Result<Json<Seminar>, AppError> {
    Ok(Json(
        SeminarService::publish(&state, &session.tenant, &path.id).await?,
    ))
}

async fn cancel_seminar(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(path): Path<SeminarPath>,
) -> Result<Json<CancelSeminarResponse>, AppError> {
    let (seminar, notified) = SeminarService::cancel(&state, &session.tenant, &path.id).await?;
    Ok(Json(CancelSeminarResponse { seminar, notified }))
}

async fn complete_seminar(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(path): Path<SeminarPath>,
) -> Result<Json<Seminar>, AppError> {
    Ok(Json(
        SeminarService::complete(&state, &session.tenant, &path.id).await?,
    ))
}

async fn seminar_stats(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(path): Path<SeminarPath>,
) -> Result<Json<SeminarStats>, AppError> {
    Ok(Json(
        SeminarService::stats(&state, &session.tenant, &path.id).await?,
    ))
}

// ============================================================================
// Reservations
// ============================================================================

async fn list_reservations(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(path): Path<SeminarPath>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    Ok(Json(
        BookingService::list_reservations(&state, &session.tenant, &path.id).await?,
    ))
}

async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(path): Path<ReservationPath>,
) -> Result<Json<Reservation>, AppError> {
    let reservation =
        BookingService::admin_cancel(&state, &session.tenant, &path.id, &path.rid).await?;
    tracing::info!(
        "Admin cancelled reservation {} of seminar {}",
        reservation.reservation_number,
        path.id
    );
    Ok(Json(reservation))
}

// ============================================================================
// Surveys
// ============================================================================

async fn survey_responses(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(path): Path<SurveyPath>,
) -> Result<Json<Vec<SurveyResponse>>, AppError> {
    let kind = parse_kind(&path.kind)?;
    Ok(Json(
        SurveyService::responses(&state, &session.tenant, &path.id, kind).await?,
    ))
}

async fn survey_questions(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(path): Path<SurveyPath>,
) -> Result<Json<QuestionSet>, AppError> {
    let kind = parse_kind(&path.kind)?;
    Ok(Json(
        SurveyService::admin_questions(&state, &session.tenant, &path.id, kind).await?,
    ))
}

async fn replace_survey_questions(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(path): Path<SurveyPath>,
    Json(request): Json<ReplaceQuestionsRequest>,
) -> Result<Json<QuestionSet>, AppError> {
    let kind = parse_kind(&path.kind)?;
    let set = SurveyService::replace_questions(
        &state,
        &session.tenant,
        &path.id,
        kind,
        request.questions,
    )
    .await?;
    Ok(Json(set))
}
