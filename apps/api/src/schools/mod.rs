// School administration: listing, detail, create/update, activation toggle
// and soft deletion.

pub mod handlers;
pub mod repository;
pub mod service;
pub mod validation;
