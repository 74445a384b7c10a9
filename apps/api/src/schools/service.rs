use tracing::info;
use uuid::Uuid;

use crate::errors::{AppError, FieldErrors};
use crate::models::school::School;
use crate::schools::repository::{SchoolFilter, SchoolRepository};
use crate::schools::validation::{
    validate_create, validate_update, CreateSchoolRequest, UpdateSchoolRequest,
};

const INVALID_SCHOOL: &str = "Invalid school data";

fn not_found() -> AppError {
    AppError::NotFound("School not found".to_string())
}

pub async fn list_schools(
    repo: &dyn SchoolRepository,
    filter: SchoolFilter,
) -> Result<Vec<School>, AppError> {
    let filter = SchoolFilter {
        search: filter
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        ..filter
    };
    repo.list(&filter).await
}

pub async fn get_school(repo: &dyn SchoolRepository, id: Uuid) -> Result<School, AppError> {
    repo.find(id).await?.ok_or_else(not_found)
}

pub async fn create_school(
    repo: &dyn SchoolRepository,
    request: CreateSchoolRequest,
) -> Result<School, AppError> {
    let school = validate_create(request).map_err(|e| AppError::invalid(INVALID_SCHOOL, e))?;
    ensure_domain(repo, school.domain_id).await?;

    let created = repo.create(school).await?;
    info!(school_id = %created.id, "school created");
    Ok(created)
}

pub async fn update_school(
    repo: &dyn SchoolRepository,
    id: Uuid,
    request: UpdateSchoolRequest,
) -> Result<School, AppError> {
    let changes = validate_update(request).map_err(|e| AppError::invalid(INVALID_SCHOOL, e))?;
    if let Some(domain_id) = changes.domain_id {
        ensure_domain(repo, domain_id).await?;
    }

    let updated = repo.update(id, changes).await?.ok_or_else(not_found)?;
    info!(school_id = %id, "school updated");
    Ok(updated)
}

pub async fn toggle_school_status(repo: &dyn SchoolRepository, id: Uuid) -> Result<School, AppError> {
    let school = repo.toggle_active(id).await?.ok_or_else(not_found)?;
    info!(school_id = %id, is_active = school.is_active, "school status toggled");
    Ok(school)
}

pub async fn delete_school(repo: &dyn SchoolRepository, id: Uuid) -> Result<(), AppError> {
    if !repo.soft_delete(id).await? {
        return Err(not_found());
    }
    info!(school_id = %id, "school soft-deleted");
    Ok(())
}

async fn ensure_domain(repo: &dyn SchoolRepository, domain_id: Uuid) -> Result<(), AppError> {
    if repo.domain_exists(domain_id).await? {
        return Ok(());
    }
    let mut details = FieldErrors::new();
    details.insert("domainId".to_string(), "Unknown domain".to_string());
    Err(AppError::invalid(INVALID_SCHOOL, details))
}
