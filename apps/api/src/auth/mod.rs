//! Session-backed caller identity.
//!
//! Handlers receive an [`Identity`] as an extractor argument and pass it on
//! explicitly; nothing below the handler layer looks up the current user.

pub mod sessions;

use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

const SESSION_COOKIES: [&str; 2] = ["__Secure-authjs.session-token", "authjs.session-token"];

/// Profile flags of the authenticated user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Roles {
    pub student: bool,
    pub company_owner: bool,
    pub school_owner: bool,
    pub admin: bool,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Roles,
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(parts).ok_or(AppError::Unauthenticated)?;
        state
            .sessions
            .resolve(&token)
            .await?
            .ok_or(AppError::Unauthenticated)
    }
}

/// Bearer token first, then the session cookie.
fn session_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    let jar = CookieJar::from_headers(&parts.headers);
    SESSION_COOKIES.iter().find_map(|name| {
        jar.get(name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    })
}
