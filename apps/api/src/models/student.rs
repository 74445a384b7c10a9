use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::User;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub user_id: Uuid,
    pub school_id: Uuid,
    pub skills: String,
    pub availability: bool,
}

/// A student profile together with its owning user account.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentWithUser {
    #[serde(flatten)]
    pub student: Student,
    pub user: User,
}
