use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, RawPathParams},
    http::request::Parts,
};
use serde::Deserialize;

use crate::config::{Config, TenantConfig, DEFAULT_TENANT};
use crate::error::{AppError, AppResult};
use crate::i18n::t;
use crate::AppState;

/// Tenant a request operates on.
///
/// Resolved from the `/api/t/:tenant` path segment, then a `?tenant=` query
/// parameter, then the default tenant.
#[derive(Debug, Clone)]
pub struct Tenant(pub TenantConfig);

#[derive(Debug, Deserialize)]
struct TenantQuery {
    tenant: Option<String>,
}

impl Tenant {
    pub fn resolve(config: &Config, key: Option<&str>) -> AppResult<TenantConfig> {
        let key = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(DEFAULT_TENANT);

        config.tenants.get(key).cloned().ok_or_else(|| {
            tracing::debug!("Unknown tenant '{}'", key);
            AppError::NotFound(t("tenant.unknown"))
        })
    }

    /// Tenant key named by the request, if any.
    pub async fn requested_key(parts: &mut Parts, state: &Arc<AppState>) -> Option<String> {
        if let Ok(params) = RawPathParams::from_request_parts(parts, state).await {
            if let Some((_, value)) = params.iter().find(|(key, _)| *key == "tenant") {
                return Some(value.to_string());
            }
        }

        Query::<TenantQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.tenant)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Tenant {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let key = Self::requested_key(parts, state).await;
        Ok(Tenant(Self::resolve(&state.config, key.as_deref())?))
    }
}
