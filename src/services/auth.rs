use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "admin_session";
const ADMIN_SUBJECT: &str = "admin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Tenant the session was issued for; `None` sessions are valid for every tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

impl SessionClaims {
    pub fn allows_tenant(&self, tenant: &str) -> bool {
        self.tenant
            .as_deref()
            .map_or(true, |t| t.eq_ignore_ascii_case(tenant))
    }
}

/// Admin session tokens: `base64url(json claims).hex(hmac-sha256(secret, payload))`.
pub struct AuthService;

impl AuthService {
    fn mac(secret: &str) -> AppResult<HmacSha256> {
        HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| AppError::Config(format!("Invalid auth secret: {}", e)))
    }

    /// Issue a signed session token valid for `hours` from `now`.
    pub fn issue_token(
        secret: &str,
        tenant: Option<&str>,
        hours: i64,
        now: DateTime<Utc>,
    ) -> AppResult<(String, SessionClaims)> {
        let claims = SessionClaims {
            sub: ADMIN_SUBJECT.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(hours)).timestamp(),
            tenant: tenant.map(str::to_lowercase),
        };

        let json = serde_json::to_vec(&claims).map_err(|e| AppError::Internal(e.into()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = Self::mac(secret)?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok((format!("{}.{}", payload, signature), claims))
    }

    pub fn create_session(
        config: &AuthConfig,
        tenant: Option<&str>,
    ) -> AppResult<(String, SessionClaims)> {
        Self::issue_token(&config.secret, tenant, config.session_hours, Utc::now())
    }

    /// Check signature, subject and expiry. Every failure is `Unauthorized`.
    pub fn verify_token(secret: &str, token: &str, now: DateTime<Utc>) -> AppResult<SessionClaims> {
        let (payload, signature) = token.trim().split_once('.').ok_or_else(|| {
            tracing::debug!("Malformed session token");
            AppError::Unauthorized
        })?;

        let signature = hex::decode(signature).map_err(|_| {
            tracing::debug!("Session token signature is not hex");
            AppError::Unauthorized
        })?;

        let mut mac = Self::mac(secret)?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| {
            tracing::debug!("Session token signature mismatch");
            AppError::Unauthorized
        })?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AppError::Unauthorized)?;
        let claims: SessionClaims =
            serde_json::from_slice(&json).map_err(|_| AppError::Unauthorized)?;

        if claims.sub != ADMIN_SUBJECT {
            tracing::debug!("Session token has unexpected subject '{}'", claims.sub);
            return Err(AppError::Unauthorized);
        }
        if claims.exp <= now.timestamp() {
            tracing::debug!("Session token expired at {}", claims.exp);
            return Err(AppError::Unauthorized);
        }

        Ok(claims)
    }

    /// Constant-time password comparison: both sides are MACed and the digests
    /// compared with `verify_slice`. An unset password never matches.
    pub fn verify_password(secret: &str, candidate: &str, expected: &str) -> bool {
        if expected.is_empty() {
            return false;
        }
        let (Ok(mut candidate_mac), Ok(mut expected_mac)) =
            (Self::mac(secret), Self::mac(secret))
        else {
            return false;
        };
        candidate_mac.update(candidate.as_bytes());
        expected_mac.update(expected.as_bytes());
        let digest = candidate_mac.finalize().into_bytes();
        expected_mac.verify_slice(&digest).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn issued_token_verifies() {
        let now = Utc::now();
        let (token, claims) = AuthService::issue_token(SECRET, Some("Acme"), 24, now).unwrap();
        let verified = AuthService::verify_token(SECRET, &token, now).unwrap();
        assert_eq!(verified, claims);
        assert_eq!(verified.tenant.as_deref(), Some("acme"));
        assert_eq!(verified.exp - verified.iat, 24 * 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = Utc::now() - Duration::hours(25);
        let (token, _) = AuthService::issue_token(SECRET, None, 24, issued).unwrap();
        assert!(matches!(
            AuthService::verify_token(SECRET, &token, Utc::now()),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn tampered_payload_or_wrong_secret_is_rejected() {
        let now = Utc::now();
        let (token, _) = AuthService::issue_token(SECRET, Some("acme"), 24, now).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let (other, _) = AuthService::issue_token(SECRET, None, 24, now).unwrap();
        let (other_payload, _) = other.split_once('.').unwrap();
        let forged = format!("{}.{}", other_payload, signature);

        assert!(AuthService::verify_token(SECRET, &forged, now).is_err());
        assert!(AuthService::verify_token("other-secret", &token, now).is_err());
        assert!(AuthService::verify_token(SECRET, "garbage", now).is_err());
        assert!(AuthService::verify_token(SECRET, "abc.zz", now).is_err());
    }

    #[test]
    fn tenant_claim_scopes_session() {
        let scoped = SessionClaims {
            sub: "admin".to_string(),
            iat: 0,
            exp: 1,
            tenant: Some("acme".to_string()),
        };
        assert!(scoped.allows_tenant("ACME"));
        assert!(!scoped.allows_tenant("default"));

        let global = SessionClaims { tenant: None, ..scoped };
        assert!(global.allows_tenant("anything"));
    }

    #[test]
    fn password_check() {
        assert!(AuthService::verify_password(SECRET, "hunter2", "hunter2"));
        assert!(!AuthService::verify_password(SECRET, "hunter3", "hunter2"));
        assert!(!AuthService::verify_password(SECRET, "", ""));
    }
}
