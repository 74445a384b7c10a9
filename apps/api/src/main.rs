mod auth;
mod config;
mod db;
mod errors;
mod job_requests;
mod mailer;
mod models;
mod routes;
mod schools;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::sessions::PgSessionRepository;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::job_requests::notifier::Notifier;
use crate::job_requests::repository::PgJobRequestRepository;
use crate::mailer::{LogMailer, Mailer, ResendMailer};
use crate::routes::build_router;
use crate::schools::repository::PgSchoolRepository;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting StudyLink API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, config.database_max_connections).await?;
    run_migrations(&db).await?;

    // Initialize mail delivery
    let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
        Some(key) => {
            info!("Resend mailer initialized (from: {})", config.mail_from);
            Arc::new(ResendMailer::new(key.clone(), config.mail_from.clone())?)
        }
        None => {
            warn!("RESEND_API_KEY not set, outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    };
    let notifier = Notifier::new(mailer, config.mail_timeout, config.app_base_url.clone());
    info!(
        "Notifications link to {} (timeout {:?}, status policy {:?})",
        config.app_base_url, config.mail_timeout, config.status_policy
    );

    // Build app state
    let state = AppState {
        sessions: Arc::new(PgSessionRepository::new(db.clone())),
        job_requests: Arc::new(PgJobRequestRepository::new(db.clone())),
        schools: Arc::new(PgSchoolRepository::new(db)),
        notifier,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
