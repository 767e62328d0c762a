use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::GoogleConfig;
use crate::error::{AppError, AppResult};

const SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets \
https://www.googleapis.com/auth/drive \
https://www.googleapis.com/auth/calendar";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Refresh this long before the cached token expires.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Service-account credentials shared by the Sheets, Drive and Calendar clients.
///
/// Access tokens are minted with a signed JWT assertion and cached process-wide
/// until shortly before expiry.
#[derive(Debug, Clone)]
pub struct GoogleAuth {
    client: Client,
    service_account_email: String,
    private_key: String,
    token_url: String,
    token: Arc<RwLock<Option<CachedToken>>>,
}

impl GoogleAuth {
    pub fn new(client: Client, config: &GoogleConfig) -> Self {
        Self {
            client,
            service_account_email: config.service_account_email.clone(),
            private_key: config.private_key.clone(),
            token_url: config.token_url.clone(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Get a valid access token, minting a new one if the cached token is missing
    /// or would expire within `REFRESH_MARGIN_SECS`.
    pub async fn access_token(&self) -> AppResult<String> {
        {
            let guard = self.token.read().await;
            if let Some(ref t) = *guard {
                if t.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > Utc::now() {
                    return Ok(t.token.clone());
                }
            }
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();

        let mut guard = self.token.write().await;
        *guard = Some(fresh);

        Ok(token)
    }

    fn signed_assertion(&self, now: DateTime<Utc>) -> AppResult<String> {
        let claims = AssertionClaims {
            iss: &self.service_account_email,
            scope: SCOPES,
            aud: &self.token_url,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }

    async fn fetch_token(&self) -> AppResult<CachedToken> {
        let now = Utc::now();
        let assertion = self.signed_assertion(now)?;

        let response = self
            .client
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Sheets(format!(
                "Failed to obtain service account token ({}): {}",
                status, error_text
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to parse token response: {}", e)))?;

        let expires_at = now + Duration::seconds(token_response.expires_in);
        tracing::info!("Obtained service account access token; expires at {}", expires_at);

        Ok(CachedToken {
            token: token_response.access_token,
            expires_at,
        })
    }

    #[cfg(test)]
    pub(crate) async fn seed_token(&self, token: CachedToken) {
        *self.token.write().await = Some(token);
    }
}
