pub mod company;
pub mod job_request;
pub mod school;
pub mod student;
pub mod user;
