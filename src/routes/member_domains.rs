use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::db::models::member_domain::normalize_domain;
use crate::db::models::MemberDomain;
use crate::db::MemberDomainRepository;
use crate::error::AppError;
use crate::i18n::t;
use crate::routes::auth::AdminSession;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/member-domains", get(list_domains).post(add_domain))
        .route("/member-domains/:domain", delete(remove_domain))
}

#[derive(Debug, Deserialize)]
pub struct AddDomainRequest {
    pub domain: String,
}

#[derive(Debug, Deserialize)]
pub struct DomainPath {
    pub domain: String,
}

async fn list_domains(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
) -> Result<Json<Vec<MemberDomain>>, AppError> {
    let domains =
        MemberDomainRepository::list(state.sheets.as_ref(), &session.tenant.master_spreadsheet_id)
            .await?;
    Ok(Json(domains))
}

async fn add_domain(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Json(request): Json<AddDomainRequest>,
) -> Result<impl IntoResponse, AppError> {
    let domain = normalize_domain(&request.domain)
        .ok_or_else(|| AppError::Validation(t("member_domain.invalid")))?;
    let master = &session.tenant.master_spreadsheet_id;

    if MemberDomainRepository::find(state.sheets.as_ref(), master, &domain)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(t("member_domain.duplicate")));
    }

    let record = MemberDomain {
        domain,
        created_at: Utc::now().to_rfc3339(),
    };
    MemberDomainRepository::insert(state.sheets.as_ref(), master, &record).await?;
    tracing::info!(
        "Added member domain {} for tenant {}",
        record.domain,
        session.tenant.key
    );

    Ok((StatusCode::CREATED, Json(record)))
}

async fn remove_domain(
    State(state): State<Arc<AppState>>,
    session: AdminSession,
    Path(path): Path<DomainPath>,
) -> Result<StatusCode, AppError> {
    let not_found = || AppError::NotFound(t("member_domain.not_found"));
    let domain = normalize_domain(&path.domain).ok_or_else(not_found)?;
    let master = &session.tenant.master_spreadsheet_id;

    let (row, _) = MemberDomainRepository::find(state.sheets.as_ref(), master, &domain)
        .await?
        .ok_or_else(not_found)?;
    MemberDomainRepository::remove(state.sheets.as_ref(), master, row).await?;
    tracing::info!(
        "Removed member domain {} for tenant {}",
        domain,
        session.tenant.key
    );

    Ok(StatusCode::NO_CONTENT)
}
