use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::live;
use crate::errors::AppError;
use crate::models::school::{School, SchoolRow};
use crate::schools::validation::{NewSchool, SchoolChanges};

/// Optional list filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchoolFilter {
    pub is_active: Option<bool>,
    /// Case-insensitive substring of the school name or its domain.
    pub search: Option<String>,
}

#[async_trait]
pub trait SchoolRepository: Send + Sync {
    async fn list(&self, filter: &SchoolFilter) -> Result<Vec<School>, AppError>;
    async fn find(&self, id: Uuid) -> Result<Option<School>, AppError>;
    async fn domain_exists(&self, domain_id: Uuid) -> Result<bool, AppError>;
    async fn create(&self, school: NewSchool) -> Result<School, AppError>;
    /// `None` when the school does not exist or is deleted.
    async fn update(&self, id: Uuid, changes: SchoolChanges) -> Result<Option<School>, AppError>;
    async fn toggle_active(&self, id: Uuid) -> Result<Option<School>, AppError>;
    /// Stamps `deleted_at`. Returns `false` if nothing live matched.
    async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgSchoolRepository {
    pool: PgPool,
}

impl PgSchoolRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn select_schools(filter: &str) -> String {
    format!(
        r#"
        SELECT s.id, s.name, s.domain_id, s.logo, s.is_active, s.created_at, s.updated_at,
               d.domain
        FROM schools s
        JOIN authorized_school_domains d ON d.id = s.domain_id
        WHERE {live} AND {filter}
        ORDER BY s.name
        "#,
        live = live(&["s", "d"]),
    )
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl SchoolRepository for PgSchoolRepository {
    async fn list(&self, filter: &SchoolFilter) -> Result<Vec<School>, AppError> {
        let sql = select_schools(
            "($1::BOOLEAN IS NULL OR s.is_active = $1) \
             AND ($2::TEXT IS NULL OR s.name ILIKE $2 OR d.domain ILIKE $2)",
        );
        let rows: Vec<SchoolRow> = sqlx::query_as(&sql)
            .bind(filter.is_active)
            .bind(filter.search.as_deref().map(like_pattern))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(School::from).collect())
    }

    async fn find(&self, id: Uuid) -> Result<Option<School>, AppError> {
        let row: Option<SchoolRow> = sqlx::query_as(&select_schools("s.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(School::from))
    }

    async fn domain_exists(&self, domain_id: Uuid) -> Result<bool, AppError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM authorized_school_domains d WHERE d.id = $1 AND {})",
            live(&["d"]),
        );
        Ok(sqlx::query_scalar(&sql)
            .bind(domain_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create(&self, school: NewSchool) -> Result<School, AppError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO schools (name, domain_id, logo) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&school.name)
        .bind(school.domain_id)
        .bind(&school.logo)
        .fetch_one(&self.pool)
        .await?;

        self.find(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("school {id} vanished after insert")))
    }

    async fn update(&self, id: Uuid, changes: SchoolChanges) -> Result<Option<School>, AppError> {
        let sql = format!(
            r#"
            UPDATE schools s
            SET name = COALESCE($2, s.name),
                domain_id = COALESCE($3, s.domain_id),
                logo = CASE WHEN $4 THEN $5 ELSE s.logo END,
                updated_at = now()
            WHERE s.id = $1 AND {}
            RETURNING s.id
            "#,
            live(&["s"]),
        );
        let (replace_logo, logo) = match changes.logo {
            Some(logo) => (true, logo),
            None => (false, None),
        };
        let updated: Option<Uuid> = sqlx::query_scalar(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.domain_id)
            .bind(replace_logo)
            .bind(logo)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(id) => self.find(id).await,
            None => Ok(None),
        }
    }

    async fn toggle_active(&self, id: Uuid) -> Result<Option<School>, AppError> {
        let sql = format!(
            "UPDATE schools s SET is_active = NOT s.is_active, updated_at = now() \
             WHERE s.id = $1 AND {} RETURNING s.id",
            live(&["s"]),
        );
        let updated: Option<Uuid> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(id) => self.find(id).await,
            None => Ok(None),
        }
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let sql = format!(
            "UPDATE schools s SET deleted_at = now(), updated_at = now() WHERE s.id = $1 AND {}",
            live(&["s"]),
        );
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
