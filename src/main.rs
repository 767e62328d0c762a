use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod i18n;
mod middleware;
mod routes;
mod services;

use config::Config;
use services::calendar::{CalendarProvider, GoogleCalendarClient};
use services::email::{HttpMailer, Mailer};
use services::google::GoogleAuth;
use services::sheets::{GoogleSheetsClient, SheetStore};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AppState {
    pub config: Config,
    pub sheets: Arc<dyn SheetStore>,
    pub calendar: Arc<dyn CalendarProvider>,
    pub mailer: Arc<dyn Mailer>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seminar_registration=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        "Starting seminar registration service ({} tenants)",
        config.tenants.tenants.len()
    );

    // Collaborators share one HTTP client and one service-account token cache
    let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
    let google_auth = GoogleAuth::new(client.clone(), &config.google);

    let app_state = Arc::new(AppState {
        sheets: Arc::new(GoogleSheetsClient::new(
            client.clone(),
            google_auth.clone(),
            &config.google,
        )),
        calendar: Arc::new(GoogleCalendarClient::new(
            client.clone(),
            google_auth,
            &config.google,
        )),
        mailer: Arc::new(HttpMailer::new(client, &config.email)),
        config: config.clone(),
    });

    if config.email.api_key.is_none() {
        tracing::warn!("EMAIL_API_KEY is not set; attendee emails will not be sent");
    }

    let app = routes::app(app_state)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to bind SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
