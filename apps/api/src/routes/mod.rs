pub mod health;

use axum::{
    routing::{get, patch, put},
    Router,
};

use crate::job_requests::handlers as job_requests;
use crate::schools::handlers as schools;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Student applications
        .route(
            "/students/job-requests",
            get(job_requests::handle_list_for_student).post(job_requests::handle_submit),
        )
        .route(
            "/students/job-requests/:id",
            put(job_requests::handle_set_status),
        )
        // Legacy alias kept for older front-end builds
        .route(
            "/student/job-applications",
            get(job_requests::handle_list_for_student).post(job_requests::handle_submit),
        )
        // Company side
        .route(
            "/companies/job-requests",
            get(job_requests::handle_list_for_company),
        )
        .route(
            "/companies/job-requests/:id",
            get(job_requests::handle_get),
        )
        // Schools
        .route(
            "/schools",
            get(schools::handle_list_schools).post(schools::handle_create_school),
        )
        .route(
            "/schools/:id",
            get(schools::handle_get_school)
                .put(schools::handle_update_school)
                .delete(schools::handle_delete_school),
        )
        .route(
            "/schools/:id/toggle-status",
            patch(schools::handle_toggle_school_status),
        )
        .with_state(state)
}
