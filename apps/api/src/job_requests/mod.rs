// Job applications ("job requests"): submission, owner notification,
// listings and status transitions.

pub mod email;
pub mod handlers;
pub mod notifier;
pub mod repository;
pub mod service;
pub mod status;
