use std::sync::Arc;

use crate::auth::sessions::SessionRepository;
use crate::config::Config;
use crate::job_requests::notifier::Notifier;
use crate::job_requests::repository::JobRequestRepository;
use crate::schools::repository::SchoolRepository;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is process-wide and immutable; per-request state never lives here.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionRepository>,
    pub job_requests: Arc<dyn JobRequestRepository>,
    pub schools: Arc<dyn SchoolRepository>,
    /// Owns the shared mail client used for application notifications.
    pub notifier: Notifier,
    pub config: Config,
}
