use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::school::School;
use crate::schools::repository::SchoolFilter;
use crate::schools::service;
use crate::schools::validation::{CreateSchoolRequest, UpdateSchoolRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolListQuery {
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

/// GET /schools
pub async fn handle_list_schools(
    State(state): State<AppState>,
    query: Result<Query<SchoolListQuery>, QueryRejection>,
) -> Result<Json<Vec<School>>, AppError> {
    let Query(query) = query?;
    let filter = SchoolFilter {
        is_active: query.is_active,
        search: query.search,
    };
    Ok(Json(service::list_schools(state.schools.as_ref(), filter).await?))
}

/// POST /schools
pub async fn handle_create_school(
    State(state): State<AppState>,
    body: Result<Json<CreateSchoolRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<School>), AppError> {
    let Json(request) = body?;
    let school = service::create_school(state.schools.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(school)))
}

/// GET /schools/:id
pub async fn handle_get_school(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<School>, AppError> {
    let Path(id) = id?;
    Ok(Json(service::get_school(state.schools.as_ref(), id).await?))
}

/// PUT /schools/:id
pub async fn handle_update_school(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateSchoolRequest>, JsonRejection>,
) -> Result<Json<School>, AppError> {
    let Path(id) = id?;
    let Json(request) = body?;
    Ok(Json(service::update_school(state.schools.as_ref(), id, request).await?))
}

/// DELETE /schools/:id
pub async fn handle_delete_school(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = id?;
    service::delete_school(state.schools.as_ref(), id).await?;
    Ok(Json(json!({ "success": true })))
}

/// PATCH /schools/:id/toggle-status
pub async fn handle_toggle_school_status(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<School>, AppError> {
    let Path(id) = id?;
    Ok(Json(service::toggle_school_status(state.schools.as_ref(), id).await?))
}
