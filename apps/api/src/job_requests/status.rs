use std::str::FromStr;

use crate::errors::AppError;
use crate::models::job_request::JobRequestStatus;

/// Which status changes an owner may make.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Any status may be set from any status.
    #[default]
    Permissive,
    /// `PENDING` may move anywhere; `ACCEPTED` and `REJECTED` are final and
    /// only accept being re-set to themselves.
    Strict,
}

impl StatusPolicy {
    pub fn allows(&self, from: JobRequestStatus, to: JobRequestStatus) -> bool {
        match self {
            StatusPolicy::Permissive => true,
            StatusPolicy::Strict => !from.is_terminal() || from == to,
        }
    }

    pub fn check(&self, from: JobRequestStatus, to: JobRequestStatus) -> Result<(), AppError> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "invalid status transition from {from} to {to}"
            )))
        }
    }
}

impl FromStr for StatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(StatusPolicy::Permissive),
            "strict" => Ok(StatusPolicy::Strict),
            other => Err(format!("unknown status policy '{other}' (expected permissive or strict)")),
        }
    }
}
