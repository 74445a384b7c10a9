use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::live;
use crate::errors::AppError;
use crate::models::company::{Company, Job, JobWithCompany};
use crate::models::job_request::{
    JobRequest, JobRequestDetail, JobRequestDetailRow, JobRequestStatus, NewJobRequest,
};
use crate::models::student::{Student, StudentWithUser};
use crate::models::user::User;

/// Datastore operations behind the job application flows.
#[async_trait]
pub trait JobRequestRepository: Send + Sync {
    /// The live student profile owned by `user_id`, if any.
    async fn find_student_by_user(&self, user_id: Uuid) -> Result<Option<StudentWithUser>, AppError>;

    /// A live job whose company is also live.
    async fn find_job(&self, job_id: Uuid) -> Result<Option<JobWithCompany>, AppError>;

    /// Live user accounts owning the company.
    async fn company_owners(&self, company_id: Uuid) -> Result<Vec<User>, AppError>;

    async fn is_company_owner(&self, user_id: Uuid, company_id: Uuid) -> Result<bool, AppError>;

    /// Inserts a `PENDING` application unless a live one already exists for
    /// the same (student, job) pair, in which case `None` is returned. The
    /// check and the write are a single atomic operation.
    async fn insert_if_absent(&self, new: NewJobRequest) -> Result<Option<JobRequest>, AppError>;

    async fn find_detail(&self, id: Uuid) -> Result<Option<JobRequestDetail>, AppError>;

    /// Applications of one student, newest first.
    async fn list_for_student(&self, student_id: Uuid) -> Result<Vec<JobRequestDetail>, AppError>;

    /// Applications to jobs of every company the user owns, newest first.
    async fn list_for_owner(&self, user_id: Uuid) -> Result<Vec<JobRequestDetail>, AppError>;

    /// Sets the status if it is still `expected`. Returns `None` when the
    /// application is gone or its status changed in the meantime.
    async fn update_status(
        &self,
        id: Uuid,
        expected: JobRequestStatus,
        status: JobRequestStatus,
    ) -> Result<Option<JobRequest>, AppError>;
}

#[derive(Clone)]
pub struct PgJobRequestRepository {
    pool: PgPool,
}

impl PgJobRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const JOB_REQUEST_COLUMNS: &str =
    "id, student_id, job_id, status, subject, message, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct StudentUserRow {
    id: Uuid,
    user_id: Uuid,
    school_id: Uuid,
    skills: String,
    availability: bool,
    email: String,
    first_name: String,
    last_name: String,
}

#[derive(sqlx::FromRow)]
struct JobCompanyRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    description: String,
    skills: String,
    company_name: String,
}

/// Joined detail query; `filter` is appended to the soft-delete predicate.
fn detail_query(filter: &str) -> String {
    format!(
        r#"
        SELECT jr.id, jr.student_id, jr.job_id, jr.status, jr.subject, jr.message,
               jr.created_at, jr.updated_at,
               j.name AS job_name, j.description AS job_description, j.skills AS job_skills,
               c.id AS company_id, c.name AS company_name,
               s.user_id, s.school_id, s.skills AS student_skills, s.availability,
               u.email, u.first_name, u.last_name
        FROM job_requests jr
        JOIN jobs j ON j.id = jr.job_id
        JOIN companies c ON c.id = j.company_id
        JOIN students s ON s.id = jr.student_id
        JOIN users u ON u.id = s.user_id
        WHERE {live} AND {filter}
        ORDER BY jr.created_at DESC
        "#,
        live = live(&["jr", "j", "c", "s", "u"]),
    )
}

#[async_trait]
impl JobRequestRepository for PgJobRequestRepository {
    async fn find_student_by_user(&self, user_id: Uuid) -> Result<Option<StudentWithUser>, AppError> {
        let sql = format!(
            r#"
            SELECT s.id, s.user_id, s.school_id, s.skills, s.availability,
                   u.email, u.first_name, u.last_name
            FROM students s
            JOIN users u ON u.id = s.user_id
            WHERE s.user_id = $1 AND {}
            "#,
            live(&["s", "u"]),
        );
        let row: Option<StudentUserRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| StudentWithUser {
            student: Student {
                id: row.id,
                user_id: row.user_id,
                school_id: row.school_id,
                skills: row.skills,
                availability: row.availability,
            },
            user: User {
                id: row.user_id,
                email: row.email,
                first_name: row.first_name,
                last_name: row.last_name,
            },
        }))
    }

    async fn find_job(&self, job_id: Uuid) -> Result<Option<JobWithCompany>, AppError> {
        let sql = format!(
            r#"
            SELECT j.id, j.company_id, j.name, j.description, j.skills, c.name AS company_name
            FROM jobs j
            JOIN companies c ON c.id = j.company_id
            WHERE j.id = $1 AND {}
            "#,
            live(&["j", "c"]),
        );
        let row: Option<JobCompanyRow> = sqlx::query_as(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| JobWithCompany {
            job: Job {
                id: row.id,
                company_id: row.company_id,
                name: row.name,
                description: row.description,
                skills: row.skills,
            },
            company: Company {
                id: row.company_id,
                name: row.company_name,
            },
        }))
    }

    async fn company_owners(&self, company_id: Uuid) -> Result<Vec<User>, AppError> {
        let sql = format!(
            r#"
            SELECT u.id, u.email, u.first_name, u.last_name
            FROM company_owners co
            JOIN users u ON u.id = co.user_id
            WHERE co.company_id = $1 AND {}
            ORDER BY u.email
            "#,
            live(&["u"]),
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn is_company_owner(&self, user_id: Uuid, company_id: Uuid) -> Result<bool, AppError> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM company_owners WHERE user_id = $1 AND company_id = $2)",
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn insert_if_absent(&self, new: NewJobRequest) -> Result<Option<JobRequest>, AppError> {
        // Backed by the partial unique index job_requests_student_job_live_idx.
        let sql = format!(
            r#"
            INSERT INTO job_requests (student_id, job_id, status, subject, message)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (student_id, job_id) WHERE deleted_at IS NULL DO NOTHING
            RETURNING {JOB_REQUEST_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, JobRequest>(&sql)
            .bind(new.student_id)
            .bind(new.job_id)
            .bind(JobRequestStatus::Pending)
            .bind(new.subject)
            .bind(new.message)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<JobRequestDetail>, AppError> {
        let row: Option<JobRequestDetailRow> = sqlx::query_as(&detail_query("jr.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(JobRequestDetail::from))
    }

    async fn list_for_student(&self, student_id: Uuid) -> Result<Vec<JobRequestDetail>, AppError> {
        let rows: Vec<JobRequestDetailRow> = sqlx::query_as(&detail_query("jr.student_id = $1"))
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(JobRequestDetail::from).collect())
    }

    async fn list_for_owner(&self, user_id: Uuid) -> Result<Vec<JobRequestDetail>, AppError> {
        let rows: Vec<JobRequestDetailRow> = sqlx::query_as(&detail_query(
            "c.id IN (SELECT co.company_id FROM company_owners co WHERE co.user_id = $1)",
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(JobRequestDetail::from).collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: JobRequestStatus,
        status: JobRequestStatus,
    ) -> Result<Option<JobRequest>, AppError> {
        let sql = format!(
            r#"
            UPDATE job_requests jr
            SET status = $3, updated_at = now()
            WHERE jr.id = $1 AND jr.status = $2 AND {}
            RETURNING {JOB_REQUEST_COLUMNS}
            "#,
            live(&["jr"]),
        );
        Ok(sqlx::query_as::<_, JobRequest>(&sql)
            .bind(id)
            .bind(expected)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?)
    }
}
