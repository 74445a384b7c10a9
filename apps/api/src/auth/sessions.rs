use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::{Identity, Roles};
use crate::db::live;
use crate::errors::AppError;

/// Session/identity provider.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Resolves a session token to the caller, or `None` when the session is
    /// unknown, expired, or belongs to a deleted user.
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, AppError>;
}

#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SessionIdentityRow {
    user_id: Uuid,
    email: String,
    is_student: bool,
    is_company_owner: bool,
    is_school_owner: bool,
    is_admin: bool,
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, AppError> {
        let sql = format!(
            r#"
            SELECT u.id AS user_id, u.email,
                   EXISTS (SELECT 1 FROM students s WHERE s.user_id = u.id AND {students}) AS is_student,
                   EXISTS (SELECT 1 FROM company_owners co WHERE co.user_id = u.id) AS is_company_owner,
                   EXISTS (SELECT 1 FROM school_owners so WHERE so.user_id = u.id) AS is_school_owner,
                   EXISTS (SELECT 1 FROM admins a WHERE a.user_id = u.id) AS is_admin
            FROM sessions se
            JOIN users u ON u.id = se.user_id
            WHERE se.session_token = $1 AND se.expires > now() AND {users}
            "#,
            students = live(&["s"]),
            users = live(&["u"]),
        );

        let row: Option<SessionIdentityRow> = sqlx::query_as(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Identity {
            user_id: row.user_id,
            email: row.email,
            roles: Roles {
                student: row.is_student,
                company_owner: row.is_company_owner,
                school_owner: row.is_school_owner,
                admin: row.is_admin,
            },
        }))
    }
}
