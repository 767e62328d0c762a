use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Config, TenantConfig};
use crate::error::AppError;
use crate::i18n::t;
use crate::services::auth::{AuthService, SessionClaims, SESSION_COOKIE};
use crate::services::tenancy::Tenant;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
    /// Overrides the tenant named by the path or query.
    #[serde(default)]
    pub tenant: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl SessionResponse {
    fn anonymous() -> Self {
        Self {
            authenticated: false,
            tenant: None,
            expires_at: None,
        }
    }

    fn from_claims(claims: &SessionClaims) -> Self {
        Self {
            authenticated: true,
            tenant: claims.tenant.clone(),
            expires_at: Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .map(|exp| exp.to_rfc3339()),
        }
    }
}

// ============================================================================
// Cookies
// ============================================================================

fn same_site(config: &Config) -> SameSite {
    match config.server.cookie_same_site.as_deref().map(str::to_lowercase).as_deref() {
        Some("strict") => SameSite::Strict,
        Some("none") => SameSite::None,
        _ => SameSite::Lax,
    }
}

fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(config.cookie_secure())
        .same_site(same_site(config))
        .path("/")
        .max_age(time::Duration::hours(config.auth.session_hours))
        .build()
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    // Non-browser clients may send the token as a bearer header.
    let header = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;
    if !header.to_ascii_lowercase().starts_with("bearer ") {
        return None;
    }
    let token = header[7..].trim();
    (!token.is_empty()).then(|| token.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

async fn login(
    State(state): State<Arc<AppState>>,
    Tenant(request_tenant): Tenant,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tenant = match request.tenant.as_deref() {
        Some(key) => Tenant::resolve(&state.config, Some(key))?,
        None => request_tenant,
    };

    if !AuthService::verify_password(
        &state.config.auth.secret,
        &request.password,
        &tenant.admin_password,
    ) {
        tracing::debug!("Rejected admin login for tenant {}", tenant.key);
        return Err(AppError::Unauthorized);
    }

    let (token, claims) = AuthService::create_session(&state.config.auth, Some(&tenant.key))?;
    tracing::info!("Admin signed in for tenant {}", tenant.key);

    Ok((
        jar.add(session_cookie(&state.config, token)),
        Json(SessionResponse::from_claims(&claims)),
    ))
}

async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(serde_json::json!({ "message": t("auth.logged_out") })),
    )
}

async fn session(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<SessionResponse> {
    let claims = session_token(&headers).and_then(|token| {
        AuthService::verify_token(&state.config.auth.secret, &token, Utc::now()).ok()
    });

    Json(match claims {
        Some(claims) => SessionResponse::from_claims(&claims),
        None => SessionResponse::anonymous(),
    })
}

// ============================================================================
// Auth Extractor
// ============================================================================

/// Extractor for an authenticated organizer, scoped to the request tenant.
pub struct AdminSession {
    pub claims: SessionClaims,
    pub tenant: TenantConfig,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or_else(|| {
            tracing::debug!("No admin session cookie or bearer token");
            AppError::Unauthorized
        })?;
        let claims = AuthService::verify_token(&state.config.auth.secret, &token, Utc::now())?;

        let Tenant(tenant) = Tenant::from_request_parts(parts, state).await?;
        if !claims.allows_tenant(&tenant.key) {
            tracing::debug!(
                "Session for tenant {:?} used against tenant {}",
                claims.tenant,
                tenant.key
            );
            return Err(AppError::Forbidden(t("auth.tenant_mismatch")));
        }

        Ok(AdminSession { claims, tenant })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_follows_config() {
        let mut config = Config::default();
        config.server.frontend_url = "https://seminars.example.com".to_string();
        config.server.cookie_same_site = Some("Strict".to_string());

        let cookie = session_cookie(&config, "tok".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));

        config.server.cookie_secure = Some(false);
        config.server.cookie_same_site = None;
        let cookie = session_cookie(&config, "tok".to_string());
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn bearer_header_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(session_token(&headers).as_deref(), Some("abc.def"));

        let mut headers = HeaderMap::new();
        headers.insert(http::header::COOKIE, "admin_session=xyz.123; other=1".parse().unwrap());
        assert_eq!(session_token(&headers).as_deref(), Some("xyz.123"));

        assert!(session_token(&HeaderMap::new()).is_none());
    }
}
