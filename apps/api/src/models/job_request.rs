use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::company::{Company, Job, JobWithCompany};
use crate::models::student::{Student, StudentWithUser};
use crate::models::user::User;

/// Lifecycle status of an application. Closed set, stored as the
/// `job_request_status` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_request_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl JobRequestStatus {
    pub const ALL: [JobRequestStatus; 3] = [
        JobRequestStatus::Pending,
        JobRequestStatus::Accepted,
        JobRequestStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobRequestStatus::Pending => "PENDING",
            JobRequestStatus::Accepted => "ACCEPTED",
            JobRequestStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobRequestStatus::Pending)
    }
}

impl fmt::Display for JobRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}', expected one of PENDING, ACCEPTED, REJECTED")]
pub struct UnknownStatus(pub String);

impl FromStr for JobRequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobRequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub id: Uuid,
    pub student_id: Uuid,
    pub job_id: Uuid,
    pub status: JobRequestStatus,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written by the application writer.
#[derive(Debug, Clone)]
pub struct NewJobRequest {
    pub student_id: Uuid,
    pub job_id: Uuid,
    pub subject: Option<String>,
    pub message: Option<String>,
}

/// An application with its job, company, student and user joined in.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobRequestDetail {
    #[serde(flatten)]
    pub request: JobRequest,
    pub job: JobWithCompany,
    pub student: StudentWithUser,
}

/// Flat projection of the joined detail query.
#[derive(Debug, Clone, FromRow)]
pub struct JobRequestDetailRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub job_id: Uuid,
    pub status: JobRequestStatus,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub job_name: String,
    pub job_description: String,
    pub job_skills: String,
    pub company_id: Uuid,
    pub company_name: String,
    pub user_id: Uuid,
    pub school_id: Uuid,
    pub student_skills: String,
    pub availability: bool,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<JobRequestDetailRow> for JobRequestDetail {
    fn from(row: JobRequestDetailRow) -> Self {
        JobRequestDetail {
            request: JobRequest {
                id: row.id,
                student_id: row.student_id,
                job_id: row.job_id,
                status: row.status,
                subject: row.subject,
                message: row.message,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            job: JobWithCompany {
                job: Job {
                    id: row.job_id,
                    company_id: row.company_id,
                    name: row.job_name,
                    description: row.job_description,
                    skills: row.job_skills,
                },
                company: Company {
                    id: row.company_id,
                    name: row.company_name,
                },
            },
            student: StudentWithUser {
                student: Student {
                    id: row.student_id,
                    user_id: row.user_id,
                    school_id: row.school_id,
                    skills: row.student_skills,
                    availability: row.availability,
                },
                user: User {
                    id: row.user_id,
                    email: row.email,
                    first_name: row.first_name,
                    last_name: row.last_name,
                },
            },
        }
    }
}
