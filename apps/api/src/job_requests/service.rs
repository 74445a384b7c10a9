use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::Identity;
use crate::errors::{AppError, FieldErrors};
use crate::job_requests::email::ApplicationEmail;
use crate::job_requests::notifier::{NotificationReport, Notifier};
use crate::job_requests::repository::JobRequestRepository;
use crate::job_requests::status::StatusPolicy;
use crate::models::job_request::{JobRequest, JobRequestDetail, JobRequestStatus, NewJobRequest};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub job_id: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

/// A created application plus the outcome of the owner notifications.
#[derive(Debug, Serialize)]
pub struct Submission {
    #[serde(flatten)]
    pub job_request: JobRequest,
    pub notifications: NotificationReport,
}

/// Validates, persists and announces a student's application to a job.
///
/// The application is committed before any mail goes out; notification
/// failures only show up in the returned report.
pub async fn submit_application(
    repo: &dyn JobRequestRepository,
    notifier: &Notifier,
    caller: &Identity,
    request: SubmitRequest,
) -> Result<Submission, AppError> {
    let raw_job_id = request
        .job_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("Job ID is required"))?;
    let job_id = Uuid::parse_str(raw_job_id).map_err(|_| {
        let mut details = FieldErrors::new();
        details.insert("jobId".to_string(), "Must be a valid identifier".to_string());
        AppError::invalid("Invalid job ID", details)
    })?;

    let applicant = repo
        .find_student_by_user(caller.user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Only students can apply for jobs".to_string()))?;

    let job = repo
        .find_job(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let subject = non_blank(request.subject);
    let message = non_blank(request.message);

    let job_request = repo
        .insert_if_absent(NewJobRequest {
            student_id: applicant.student.id,
            job_id: job.job.id,
            subject: subject.clone(),
            message: message.clone(),
        })
        .await?
        .ok_or_else(|| AppError::Conflict("You have already applied for this job".to_string()))?;

    info!(
        job_request_id = %job_request.id,
        student_id = %applicant.student.id,
        %job_id,
        "job application created"
    );

    let owners = repo.company_owners(job.company.id).await?;
    let application_url = notifier.application_url(job_request.id);
    let student_name = applicant.user.full_name();
    let email = ApplicationEmail {
        company_name: &job.company.name,
        job_title: &job.job.name,
        student_name: &student_name,
        student_email: &applicant.user.email,
        subject: subject.as_deref(),
        message: message.as_deref(),
        application_url: &application_url,
    };
    let notifications = notifier.notify_owners(job_request.id, &owners, &email).await;

    Ok(Submission {
        job_request,
        notifications,
    })
}

/// The caller's own applications, newest first.
pub async fn list_student_applications(
    repo: &dyn JobRequestRepository,
    caller: &Identity,
) -> Result<Vec<JobRequestDetail>, AppError> {
    let student = repo
        .find_student_by_user(caller.user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Only students can view job requests".to_string()))?;
    repo.list_for_student(student.student.id).await
}

/// Applications received by every company the caller owns.
pub async fn list_company_applications(
    repo: &dyn JobRequestRepository,
    caller: &Identity,
) -> Result<Vec<JobRequestDetail>, AppError> {
    if !caller.roles.company_owner {
        return Err(AppError::Forbidden(
            "Only company owners can view received applications".to_string(),
        ));
    }
    repo.list_for_owner(caller.user_id).await
}

/// A single application, visible to its applicant and the owning company.
pub async fn get_application(
    repo: &dyn JobRequestRepository,
    caller: &Identity,
    id: Uuid,
) -> Result<JobRequestDetail, AppError> {
    let detail = repo
        .find_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job request not found".to_string()))?;

    let is_applicant = detail.student.user.id == caller.user_id;
    if !is_applicant && !repo.is_company_owner(caller.user_id, detail.job.company.id).await? {
        return Err(AppError::Forbidden(
            "You are not allowed to view this job request".to_string(),
        ));
    }
    Ok(detail)
}

/// Parses the raw status from a request body into the closed set.
pub fn parse_status(raw: Option<&str>) -> Result<JobRequestStatus, AppError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let mut details = FieldErrors::new();
    match raw {
        None => {
            details.insert("status".to_string(), "Status is required".to_string());
        }
        Some(raw) => match raw.parse::<JobRequestStatus>() {
            Ok(status) => return Ok(status),
            Err(e) => {
                details.insert("status".to_string(), e.to_string());
            }
        },
    }
    Err(AppError::invalid("Invalid status", details))
}

/// Moves an application to `status` on behalf of an owner of the job's company.
pub async fn set_status(
    repo: &dyn JobRequestRepository,
    policy: StatusPolicy,
    caller: &Identity,
    id: Uuid,
    status: JobRequestStatus,
) -> Result<JobRequest, AppError> {
    let detail = repo
        .find_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job request not found".to_string()))?;

    if !repo.is_company_owner(caller.user_id, detail.job.company.id).await? {
        return Err(AppError::Forbidden(
            "Only the company offering this job can update the request".to_string(),
        ));
    }

    let current = detail.request.status;
    policy.check(current, status)?;

    let updated = repo.update_status(id, current, status).await?.ok_or_else(|| {
        AppError::Conflict("The job request was modified concurrently, please retry".to_string())
    })?;

    info!(job_request_id = %id, from = %current, to = %status, "job request status updated");
    Ok(updated)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
