use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::job_requests::service::{self, Submission, SubmitRequest};
use crate::models::job_request::{JobRequest, JobRequestDetail};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: Option<String>,
}

/// POST /students/job-requests
pub async fn handle_submit(
    State(state): State<AppState>,
    caller: Identity,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Submission>), AppError> {
    let Json(request) = body?;
    let submission = service::submit_application(
        state.job_requests.as_ref(),
        &state.notifier,
        &caller,
        request,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// GET /students/job-requests
pub async fn handle_list_for_student(
    State(state): State<AppState>,
    caller: Identity,
) -> Result<Json<Vec<JobRequestDetail>>, AppError> {
    let list = service::list_student_applications(state.job_requests.as_ref(), &caller).await?;
    Ok(Json(list))
}

/// PUT /students/job-requests/:id
pub async fn handle_set_status(
    State(state): State<AppState>,
    caller: Identity,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<SetStatusRequest>, JsonRejection>,
) -> Result<Json<JobRequest>, AppError> {
    let Path(id) = id?;
    let Json(request) = body?;
    let status = service::parse_status(request.status.as_deref())?;
    let updated = service::set_status(
        state.job_requests.as_ref(),
        state.config.status_policy,
        &caller,
        id,
        status,
    )
    .await?;
    Ok(Json(updated))
}

/// GET /companies/job-requests
pub async fn handle_list_for_company(
    State(state): State<AppState>,
    caller: Identity,
) -> Result<Json<Vec<JobRequestDetail>>, AppError> {
    let list = service::list_company_applications(state.job_requests.as_ref(), &caller).await?;
    Ok(Json(list))
}

/// GET /companies/job-requests/:id
pub async fn handle_get(
    State(state): State<AppState>,
    caller: Identity,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<JobRequestDetail>, AppError> {
    let Path(id) = id?;
    let detail = service::get_application(state.job_requests.as_ref(), &caller, id).await?;
    Ok(Json(detail))
}
