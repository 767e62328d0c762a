use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::SurveyKind;
use crate::error::{AppError, AppResult};
use crate::services::surveys::{QuestionSet, SurveyService, SurveySubmission};
use crate::services::tenancy::Tenant;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seminars/:id/surveys/:kind/questions", get(questions))
        .route("/surveys/:kind", post(submit))
}

#[derive(Debug, Deserialize)]
pub struct SeminarSurveyPath {
    pub id: String,
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct SurveyPath {
    pub kind: String,
}

/// `pre` or `post`; anything else is a 404 rather than axum's plain-text rejection.
pub fn parse_kind(raw: &str) -> AppResult<SurveyKind> {
    SurveyKind::from_str(raw)
        .ok_or_else(|| AppError::NotFound(format!("Unknown survey type '{}'", raw)))
}

async fn questions(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Path(path): Path<SeminarSurveyPath>,
) -> Result<Json<QuestionSet>, AppError> {
    let kind = parse_kind(&path.kind)?;
    Ok(Json(
        SurveyService::public_questions(&state, &tenant, &path.id, kind).await?,
    ))
}

async fn submit(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Path(path): Path<SurveyPath>,
    Json(submission): Json<SurveySubmission>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&path.kind)?;
    let response = SurveyService::submit(&state, &tenant, kind, submission).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
