use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::errors::FieldErrors;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchoolRequest {
    pub name: Option<String>,
    pub domain_id: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchoolRequest {
    pub name: Option<String>,
    pub domain_id: Option<String>,
    /// Absent: keep the logo. `null`: remove it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub logo: Option<Option<String>>,
}

/// Distinguishes an explicit `null` from a missing field.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Validated values for a new school.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSchool {
    pub name: String,
    pub domain_id: Uuid,
    pub logo: Option<String>,
}

/// Validated partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchoolChanges {
    pub name: Option<String>,
    pub domain_id: Option<Uuid>,
    pub logo: Option<Option<String>>,
}

pub fn validate_create(request: CreateSchoolRequest) -> Result<NewSchool, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = match request.name {
        Some(name) => check_name(&name, &mut errors),
        None => {
            errors.insert("name".to_string(), "Name is required".to_string());
            None
        }
    };
    let domain_id = match request.domain_id {
        Some(raw) => check_domain_id(&raw, &mut errors),
        None => {
            errors.insert("domainId".to_string(), "Domain is required".to_string());
            None
        }
    };
    let logo = request.logo.and_then(|logo| check_logo(&logo, &mut errors));

    match (name, domain_id) {
        (Some(name), Some(domain_id)) if errors.is_empty() => Ok(NewSchool {
            name,
            domain_id,
            logo,
        }),
        _ => Err(errors),
    }
}

pub fn validate_update(request: UpdateSchoolRequest) -> Result<SchoolChanges, FieldErrors> {
    let mut errors = FieldErrors::new();

    let changes = SchoolChanges {
        name: request.name.and_then(|name| check_name(&name, &mut errors)),
        domain_id: request
            .domain_id
            .and_then(|raw| check_domain_id(&raw, &mut errors)),
        logo: request
            .logo
            .map(|logo| logo.and_then(|url| check_logo(&url, &mut errors))),
    };

    if errors.is_empty() {
        Ok(changes)
    } else {
        Err(errors)
    }
}

fn check_name(raw: &str, errors: &mut FieldErrors) -> Option<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if len < NAME_MIN_CHARS {
        errors.insert(
            "name".to_string(),
            format!("Name must be at least {NAME_MIN_CHARS} characters"),
        );
        None
    } else if len > NAME_MAX_CHARS {
        errors.insert(
            "name".to_string(),
            format!("Name must be at most {NAME_MAX_CHARS} characters"),
        );
        None
    } else {
        Some(name.to_string())
    }
}

fn check_domain_id(raw: &str, errors: &mut FieldErrors) -> Option<Uuid> {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.insert("domainId".to_string(), "Domain must be a valid identifier".to_string());
            None
        }
    }
}

fn check_logo(raw: &str, errors: &mut FieldErrors) -> Option<String> {
    let logo = raw.trim();
    if logo.starts_with("https://") || logo.starts_with("http://") {
        Some(logo.to_string())
    } else {
        errors.insert("logo".to_string(), "Logo must be an http(s) URL".to_string());
        None
    }
}
