use std::collections::HashMap;
use std::env;

use serde::Deserialize;

pub const DEFAULT_TENANT: &str = "default";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub google: GoogleConfig,
    pub email: EmailConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub tenants: TenantsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    /// Base URL used in emails for the attendee self-service pages.
    /// Falls back to `frontend_url` when `PUBLIC_BASE_URL` is unset.
    pub public_base_url: String,
    /// Whether to set the `Secure` flag on cookies.
    /// If `None`, inferred from `frontend_url` (`https` -> true).
    /// Read from env var `COOKIE_SECURE` (accepted values: "true"/"false", "1"/"0", "yes"/"no").
    pub cookie_secure: Option<bool>,
    /// Preferred SameSite value for cookies. Read from env var `COOKIE_SAMESITE`
    /// (accepted values: "Lax", "Strict", "None").
    pub cookie_same_site: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub service_account_email: String,
    /// PEM encoded RSA key. Literal `\n` sequences from env files are unescaped.
    pub private_key: String,
    pub token_url: String,
    pub sheets_api_url: String,
    pub drive_api_url: String,
    pub calendar_api_url: String,
    pub calendar_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret: String,
    pub session_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for auth endpoints (e.g. /api/auth/login)
    pub auth_per_second: u32,
    /// Burst size for auth endpoints
    pub auth_burst: u32,
    /// Allowed requests per second (per IP) for public booking and lookup endpoints
    pub booking_per_second: u32,
    /// Burst size for public booking and lookup endpoints
    pub booking_burst: u32,
}

/// One isolated seminar-hosting organization.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantConfig {
    pub key: String,
    pub name: String,
    pub master_spreadsheet_id: String,
    pub drive_folder_id: Option<String>,
    pub admin_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantsConfig {
    pub tenants: HashMap<String, TenantConfig>,
}

impl TenantsConfig {
    pub fn get(&self, key: &str) -> Option<&TenantConfig> {
        self.tenants.get(&key.to_lowercase())
    }

    pub fn insert(&mut self, tenant: TenantConfig) {
        self.tenants.insert(tenant.key.to_lowercase(), tenant);
    }
}

fn env_flag(name: &str) -> Option<bool> {
    match env::var(name) {
        Ok(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        },
        Err(_) => None,
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Shortest accepted session signing key, in bytes.
const MIN_SECRET_LEN: usize = 32;

fn auth_secret(value: String) -> Result<String, ConfigError> {
    if value.trim().len() < MIN_SECRET_LEN {
        return Err(ConfigError::InvalidValue(format!(
            "AUTH_SECRET (at least {} bytes)",
            MIN_SECRET_LEN
        )));
    }
    Ok(value)
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let frontend_url = env_or("FRONTEND_URL", "http://localhost:3000");

        Ok(Config {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: env_or("PORT", "8080")
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                public_base_url: env_opt("PUBLIC_BASE_URL").unwrap_or_else(|| frontend_url.clone()),
                frontend_url,
                cookie_secure: env_flag("COOKIE_SECURE"),
                cookie_same_site: env::var("COOKIE_SAMESITE").ok(),
            },
            google: GoogleConfig {
                service_account_email: env::var("GOOGLE_SERVICE_ACCOUNT_EMAIL").map_err(|_| {
                    ConfigError::MissingEnv("GOOGLE_SERVICE_ACCOUNT_EMAIL".to_string())
                })?,
                private_key: env::var("GOOGLE_PRIVATE_KEY")
                    .map_err(|_| ConfigError::MissingEnv("GOOGLE_PRIVATE_KEY".to_string()))?
                    .replace("\\n", "\n"),
                token_url: env_or("GOOGLE_TOKEN_URL", "https://oauth2.googleapis.com/token"),
                sheets_api_url: env_or(
                    "GOOGLE_SHEETS_API_URL",
                    "https://sheets.googleapis.com/v4/spreadsheets",
                ),
                drive_api_url: env_or(
                    "GOOGLE_DRIVE_API_URL",
                    "https://www.googleapis.com/drive/v3",
                ),
                calendar_api_url: env_or(
                    "GOOGLE_CALENDAR_API_URL",
                    "https://www.googleapis.com/calendar/v3",
                ),
                calendar_id: env_or("GOOGLE_CALENDAR_ID", "primary"),
            },
            email: EmailConfig {
                api_url: env_or("EMAIL_API_URL", "https://api.resend.com/emails"),
                api_key: env_opt("EMAIL_API_KEY"),
                from: env_or("EMAIL_FROM", "Seminars <no-reply@example.com>"),
                reply_to: env_opt("EMAIL_REPLY_TO"),
            },
            auth: AuthConfig {
                secret: auth_secret(
                    env::var("AUTH_SECRET")
                        .map_err(|_| ConfigError::MissingEnv("AUTH_SECRET".to_string()))?,
                )?,
                session_hours: env_or("SESSION_HOURS", "24").parse().unwrap_or(24),
            },
            rate_limit: RateLimitConfig {
                auth_per_second: env_or("RATE_LIMIT_AUTH_PER_SECOND", "3").parse().unwrap_or(3),
                auth_burst: env_or("RATE_LIMIT_AUTH_BURST", "10").parse().unwrap_or(10),
                booking_per_second: env_or("RATE_LIMIT_BOOKING_PER_SECOND", "5")
                    .parse()
                    .unwrap_or(5),
                booking_burst: env_or("RATE_LIMIT_BOOKING_BURST", "20").parse().unwrap_or(20),
            },
            tenants: Self::tenants_from_env()?,
        })
    }

    /// Build the static tenant table.
    ///
    /// The default tenant comes from `MASTER_SPREADSHEET_ID` / `DRIVE_FOLDER_ID` /
    /// `ADMIN_PASSWORD`. Additional tenants are listed in `TENANTS` (comma separated keys)
    /// and configured through `TENANT_<KEY>_SPREADSHEET_ID`, `TENANT_<KEY>_FOLDER_ID`,
    /// `TENANT_<KEY>_ADMIN_PASSWORD` and `TENANT_<KEY>_NAME`.
    fn tenants_from_env() -> Result<TenantsConfig, ConfigError> {
        let mut tenants = TenantsConfig::default();

        if let Some(master) = env_opt("MASTER_SPREADSHEET_ID") {
            tenants.insert(TenantConfig {
                key: DEFAULT_TENANT.to_string(),
                name: env_or("TENANT_NAME", "Seminars"),
                master_spreadsheet_id: master,
                drive_folder_id: env_opt("DRIVE_FOLDER_ID"),
                admin_password: env::var("ADMIN_PASSWORD")
                    .map_err(|_| ConfigError::MissingEnv("ADMIN_PASSWORD".to_string()))?,
            });
        }

        let keys = env::var("TENANTS").unwrap_or_default();
        for key in keys.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            let prefix = format!("TENANT_{}", key.to_uppercase().replace('-', "_"));
            let var = |suffix: &str| format!("{}_{}", prefix, suffix);

            tenants.insert(TenantConfig {
                key: key.to_lowercase(),
                name: env_opt(&var("NAME")).unwrap_or_else(|| key.to_string()),
                master_spreadsheet_id: env::var(var("SPREADSHEET_ID"))
                    .map_err(|_| ConfigError::MissingEnv(var("SPREADSHEET_ID")))?,
                drive_folder_id: env_opt(&var("FOLDER_ID")),
                admin_password: env::var(var("ADMIN_PASSWORD"))
                    .map_err(|_| ConfigError::MissingEnv(var("ADMIN_PASSWORD")))?,
            });
        }

        if tenants.tenants.is_empty() {
            return Err(ConfigError::MissingEnv(
                "MASTER_SPREADSHEET_ID or TENANTS".to_string(),
            ));
        }

        Ok(tenants)
    }

    /// Whether cookies should carry the `Secure` flag.
    pub fn cookie_secure(&self) -> bool {
        self.server
            .cookie_secure
            .unwrap_or_else(|| self.server.frontend_url.starts_with("https://"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        let mut tenants = TenantsConfig::default();
        tenants.insert(TenantConfig {
            key: DEFAULT_TENANT.to_string(),
            name: "Seminars".to_string(),
            master_spreadsheet_id: "master".to_string(),
            drive_folder_id: None,
            admin_password: String::new(),
        });

        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
                public_base_url: "http://localhost:3000".to_string(),
                cookie_secure: None,
                cookie_same_site: None,
            },
            google: GoogleConfig {
                service_account_email: String::new(),
                private_key: String::new(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                sheets_api_url: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
                drive_api_url: "https://www.googleapis.com/drive/v3".to_string(),
                calendar_api_url: "https://www.googleapis.com/calendar/v3".to_string(),
                calendar_id: "primary".to_string(),
            },
            email: EmailConfig {
                api_url: "https://api.resend.com/emails".to_string(),
                api_key: None,
                from: "Seminars <no-reply@example.com>".to_string(),
                reply_to: None,
            },
            auth: AuthConfig {
                secret: String::new(),
                session_hours: 24,
            },
            rate_limit: RateLimitConfig {
                auth_per_second: 3,
                auth_burst: 10,
                booking_per_second: 5,
                booking_burst: 20,
            },
            tenants,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_lookup_is_case_insensitive() {
        let config = Config::default();
        assert!(config.tenants.get("DEFAULT").is_some());
        assert!(config.tenants.get("other").is_none());
    }

    #[test]
    fn short_auth_secret_is_rejected() {
        assert!(matches!(auth_secret(String::new()), Err(ConfigError::InvalidValue(_))));
        assert!(matches!(
            auth_secret("  short-secret  ".to_string()),
            Err(ConfigError::InvalidValue(_))
        ));
        let key = "k".repeat(MIN_SECRET_LEN);
        assert_eq!(auth_secret(key.clone()).unwrap(), key);
    }

    #[test]
    fn cookie_secure_inferred_from_frontend_scheme() {
        let mut config = Config::default();
        assert!(!config.cookie_secure());

        config.server.frontend_url = "https://seminars.example.com".to_string();
        assert!(config.cookie_secure());

        config.server.cookie_secure = Some(false);
        assert!(!config.cookie_secure());
    }
}
