use std::sync::Arc;
use std::time::Duration;

use askama::Template;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::job_requests::email::ApplicationEmail;
use crate::mailer::{MailError, Mailer, OutgoingEmail};
use crate::models::user::User;

/// Outcome of a notification fan-out, returned to the applicant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotificationReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Fans application notifications out to company owners.
///
/// Each recipient is dispatched on its own task under its own timeout; a
/// failed or slow send is logged and counted, never propagated.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    timeout: Duration,
    base_url: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, timeout: Duration, base_url: impl Into<String>) -> Self {
        Self {
            mailer,
            timeout,
            base_url: base_url.into(),
        }
    }

    /// Deep link to the application detail view.
    pub fn application_url(&self, application_id: Uuid) -> String {
        format!("{}/company/applications/{application_id}", self.base_url)
    }

    /// Sends one message per owner and waits for the outcome.
    ///
    /// The fan-out runs on its own task: if the caller is dropped mid-way,
    /// every send still completes and is logged.
    pub async fn notify_owners(
        &self,
        application_id: Uuid,
        owners: &[User],
        email: &ApplicationEmail<'_>,
    ) -> NotificationReport {
        let attempted = owners.len();
        let html = match email.render() {
            Ok(html) => html,
            Err(e) => {
                warn!(%application_id, "failed to render application notification: {e}");
                return NotificationReport {
                    attempted,
                    delivered: 0,
                    failed: attempted,
                };
            }
        };
        let messages: Vec<OutgoingEmail> = owners
            .iter()
            .map(|owner| OutgoingEmail {
                to: owner.email.clone(),
                subject: email.subject_line(),
                html: html.clone(),
            })
            .collect();

        let fan_out = tokio::spawn(dispatch(
            Arc::clone(&self.mailer),
            self.timeout,
            application_id,
            messages,
        ));
        match fan_out.await {
            Ok(report) => report,
            Err(e) => {
                warn!(%application_id, "application notification fan-out failed: {e}");
                NotificationReport {
                    attempted,
                    delivered: 0,
                    failed: attempted,
                }
            }
        }
    }
}

async fn dispatch(
    mailer: Arc<dyn Mailer>,
    timeout: Duration,
    application_id: Uuid,
    messages: Vec<OutgoingEmail>,
) -> NotificationReport {
    let mut report = NotificationReport {
        attempted: messages.len(),
        ..NotificationReport::default()
    };

    let mut tasks = JoinSet::new();
    for message in messages {
        let mailer = Arc::clone(&mailer);
        tasks.spawn(async move {
            let result = match tokio::time::timeout(timeout, mailer.send(&message)).await {
                Ok(result) => result,
                Err(_) => Err(MailError::Timeout(timeout)),
            };
            (message.to, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(()))) => report.delivered += 1,
            Ok((recipient, Err(e))) => {
                warn!(%application_id, %recipient, "application notification failed: {e}");
                report.failed += 1;
            }
            Err(e) => {
                warn!(%application_id, "application notification task failed: {e}");
                report.failed += 1;
            }
        }
    }

    info!(
        %application_id,
        attempted = report.attempted,
        delivered = report.delivered,
        failed = report.failed,
        "application notifications dispatched"
    );
    report
}
