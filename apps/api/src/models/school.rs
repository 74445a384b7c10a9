use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchoolDomain {
    pub id: Uuid,
    pub domain: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub domain_id: Uuid,
    pub logo: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub domain: SchoolDomain,
}

/// Flat projection of `schools` joined with `authorized_school_domains`.
#[derive(Debug, Clone, FromRow)]
pub struct SchoolRow {
    pub id: Uuid,
    pub name: String,
    pub domain_id: Uuid,
    pub logo: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub domain: String,
}

impl From<SchoolRow> for School {
    fn from(row: SchoolRow) -> Self {
        School {
            id: row.id,
            name: row.name,
            domain_id: row.domain_id,
            logo: row.logo,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            domain: SchoolDomain {
                id: row.domain_id,
                domain: row.domain,
            },
        }
    }
}
