use askama::Template;

/// Notification sent to company owners when a student applies to one of
/// their jobs. User-supplied text is HTML-escaped by the template; the deep
/// link is built server-side and rendered as-is.
#[derive(Debug, Clone, Template)]
#[template(path = "application_notification.html")]
pub struct ApplicationEmail<'a> {
    pub company_name: &'a str,
    pub job_title: &'a str,
    pub student_name: &'a str,
    pub student_email: &'a str,
    pub subject: Option<&'a str>,
    pub message: Option<&'a str>,
    pub application_url: &'a str,
}

impl ApplicationEmail<'_> {
    pub fn subject_line(&self) -> String {
        format!("Nouvelle candidature pour: {}", self.job_title)
    }
}
