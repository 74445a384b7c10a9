//! In-memory repositories and a recording mailer for unit and router tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::sessions::SessionRepository;
use crate::auth::{Identity, Roles};
use crate::config::Config;
use crate::errors::AppError;
use crate::job_requests::notifier::Notifier;
use crate::job_requests::repository::JobRequestRepository;
use crate::job_requests::status::StatusPolicy;
use crate::mailer::{MailError, Mailer, OutgoingEmail};
use crate::models::company::{Company, Job, JobWithCompany};
use crate::models::job_request::{JobRequest, JobRequestDetail, JobRequestStatus, NewJobRequest};
use crate::models::school::{School, SchoolDomain};
use crate::models::student::{Student, StudentWithUser};
use crate::models::user::User;
use crate::schools::repository::{SchoolFilter, SchoolRepository};
use crate::schools::validation::{NewSchool, SchoolChanges};
use crate::state::AppState;

pub fn user(email: &str, first_name: &str, last_name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    }
}

pub fn owner(email: &str) -> User {
    user(email, "Manager", "Entreprise")
}

/// Strictly increasing clock so consecutive writes get distinct timestamps.
fn tick(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + chrono::Duration::microseconds(1),
        _ => now,
    }
}

// ─── Mail ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    attempts: AtomicUsize,
    failing: HashSet<String>,
    delay: Option<Duration>,
}

impl RecordingMailer {
    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            failing: recipients.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(&email.to) {
            return Err(MailError::Api {
                status: 503,
                message: "provider unavailable".to_string(),
            });
        }
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push(email.clone());
        Ok(())
    }
}

// ─── Sessions ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemorySessions {
    tokens: Mutex<HashMap<String, Identity>>,
}

impl InMemorySessions {
    pub fn insert(&self, token: &str, identity: Identity) {
        self.tokens
            .lock()
            .expect("sessions mutex poisoned")
            .insert(token.to_string(), identity);
    }
}

#[async_trait]
impl SessionRepository for InMemorySessions {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, AppError> {
        Ok(self
            .tokens
            .lock()
            .expect("sessions mutex poisoned")
            .get(token)
            .cloned())
    }
}

// ─── Job requests ───────────────────────────────────────────────────────────

#[derive(Default)]
struct JobData {
    users: HashMap<Uuid, User>,
    students: Vec<Student>,
    companies: Vec<Company>,
    jobs: Vec<(Job, bool)>,
    owners: Vec<(Uuid, Uuid)>,
    requests: Vec<JobRequest>,
}

impl JobData {
    fn detail(&self, request: &JobRequest) -> Option<JobRequestDetail> {
        let job = self
            .jobs
            .iter()
            .find(|(job, deleted)| job.id == request.job_id && !deleted)
            .map(|(job, _)| job.clone())?;
        let company = self.companies.iter().find(|c| c.id == job.company_id)?.clone();
        let student = self.students.iter().find(|s| s.id == request.student_id)?.clone();
        let user = self.users.get(&student.user_id)?.clone();
        Some(JobRequestDetail {
            request: request.clone(),
            job: JobWithCompany { job, company },
            student: StudentWithUser { student, user },
        })
    }

    fn details_where(&self, keep: impl Fn(&JobRequestDetail) -> bool) -> Vec<JobRequestDetail> {
        let mut list: Vec<_> = self
            .requests
            .iter()
            .filter_map(|r| self.detail(r))
            .filter(|d| keep(d))
            .collect();
        list.sort_by(|a, b| b.request.created_at.cmp(&a.request.created_at));
        list
    }
}

#[derive(Default)]
pub struct InMemoryJobRequests {
    data: Mutex<JobData>,
}

impl InMemoryJobRequests {
    fn with<T>(&self, f: impl FnOnce(&mut JobData) -> T) -> T {
        f(&mut self.data.lock().expect("job request mutex poisoned"))
    }

    pub fn count(&self) -> usize {
        self.with(|d| d.requests.len())
    }

    pub fn soft_delete_job(&self, job_id: Uuid) {
        self.with(|d| {
            for (job, deleted) in d.jobs.iter_mut() {
                if job.id == job_id {
                    *deleted = true;
                }
            }
        })
    }
}

#[async_trait]
impl JobRequestRepository for InMemoryJobRequests {
    async fn find_student_by_user(&self, user_id: Uuid) -> Result<Option<StudentWithUser>, AppError> {
        Ok(self.with(|d| {
            let student = d.students.iter().find(|s| s.user_id == user_id)?.clone();
            let user = d.users.get(&user_id)?.clone();
            Some(StudentWithUser { student, user })
        }))
    }

    async fn find_job(&self, job_id: Uuid) -> Result<Option<JobWithCompany>, AppError> {
        Ok(self.with(|d| {
            let (job, _) = d.jobs.iter().find(|(j, deleted)| j.id == job_id && !deleted)?;
            let company = d.companies.iter().find(|c| c.id == job.company_id)?.clone();
            Some(JobWithCompany {
                job: job.clone(),
                company,
            })
        }))
    }

    async fn company_owners(&self, company_id: Uuid) -> Result<Vec<User>, AppError> {
        Ok(self.with(|d| {
            d.owners
                .iter()
                .filter(|(_, c)| *c == company_id)
                .filter_map(|(u, _)| d.users.get(u).cloned())
                .collect()
        }))
    }

    async fn is_company_owner(&self, user_id: Uuid, company_id: Uuid) -> Result<bool, AppError> {
        Ok(self.with(|d| d.owners.contains(&(user_id, company_id))))
    }

    async fn insert_if_absent(&self, new: NewJobRequest) -> Result<Option<JobRequest>, AppError> {
        Ok(self.with(|d| {
            let exists = d
                .requests
                .iter()
                .any(|r| r.student_id == new.student_id && r.job_id == new.job_id);
            if exists {
                return None;
            }
            let now = tick(d.requests.iter().map(|r| r.updated_at).max());
            let request = JobRequest {
                id: Uuid::new_v4(),
                student_id: new.student_id,
                job_id: new.job_id,
                status: JobRequestStatus::Pending,
                subject: new.subject,
                message: new.message,
                created_at: now,
                updated_at: now,
            };
            d.requests.push(request.clone());
            Some(request)
        }))
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<JobRequestDetail>, AppError> {
        Ok(self.with(|d| {
            let request = d.requests.iter().find(|r| r.id == id)?;
            d.detail(request)
        }))
    }

    async fn list_for_student(&self, student_id: Uuid) -> Result<Vec<JobRequestDetail>, AppError> {
        Ok(self.with(|d| d.details_where(|detail| detail.student.student.id == student_id)))
    }

    async fn list_for_owner(&self, user_id: Uuid) -> Result<Vec<JobRequestDetail>, AppError> {
        Ok(self.with(|d| {
            let companies: Vec<Uuid> = d
                .owners
                .iter()
                .filter(|(u, _)| *u == user_id)
                .map(|(_, c)| *c)
                .collect();
            d.details_where(|detail| companies.contains(&detail.job.company.id))
        }))
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: JobRequestStatus,
        status: JobRequestStatus,
    ) -> Result<Option<JobRequest>, AppError> {
        Ok(self.with(|d| {
            let request = d
                .requests
                .iter_mut()
                .find(|r| r.id == id && r.status == expected)?;
            request.status = status;
            request.updated_at = tick(Some(request.updated_at));
            Some(request.clone())
        }))
    }
}

/// A student, a company with two owners, one job, and an unrelated user.
pub struct Fixture {
    pub repo: InMemoryJobRequests,
    pub job_id: Uuid,
    pub student_identity: Identity,
    pub owner_identity: Identity,
    pub outsider_identity: Identity,
}

impl Fixture {
    pub fn new() -> Self {
        let student_user = user("ada@ecole-test.fr", "Ada", "Lovelace");
        let owner1 = owner("o1@company.test");
        let owner2 = owner("o2@company.test");
        let outsider = user("someone@else.test", "Some", "One");

        let student = Student {
            id: Uuid::new_v4(),
            user_id: student_user.id,
            school_id: Uuid::new_v4(),
            skills: "Rust, SQL".to_string(),
            availability: true,
        };
        let company = Company {
            id: Uuid::new_v4(),
            name: "Entreprise Test".to_string(),
        };
        let job = Job {
            id: Uuid::new_v4(),
            company_id: company.id,
            name: "Développeur Full Stack".to_string(),
            description: "Alternance de 12 mois".to_string(),
            skills: "Rust, PostgreSQL".to_string(),
        };

        let identity = |user: &User, roles: Roles| Identity {
            user_id: user.id,
            email: user.email.clone(),
            roles,
        };
        let student_identity = identity(
            &student_user,
            Roles {
                student: true,
                ..Roles::default()
            },
        );
        let owner_identity = identity(
            &owner1,
            Roles {
                company_owner: true,
                ..Roles::default()
            },
        );
        let outsider_identity = identity(&outsider, Roles::default());

        let repo = InMemoryJobRequests::default();
        let job_id = job.id;
        repo.with(|d| {
            d.owners.push((owner1.id, company.id));
            d.owners.push((owner2.id, company.id));
            for u in [student_user, owner1, owner2, outsider] {
                d.users.insert(u.id, u);
            }
            d.students.push(student);
            d.companies.push(company);
            d.jobs.push((job, false));
        });

        Self {
            repo,
            job_id,
            student_identity,
            owner_identity,
            outsider_identity,
        }
    }
}

// ─── Schools ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct SchoolData {
    domains: HashMap<Uuid, String>,
    schools: Vec<(School, bool)>,
}

#[derive(Default)]
pub struct InMemorySchools {
    data: Mutex<SchoolData>,
}

impl InMemorySchools {
    fn with<T>(&self, f: impl FnOnce(&mut SchoolData) -> T) -> T {
        f(&mut self.data.lock().expect("school mutex poisoned"))
    }

    pub fn add_domain(&self, domain: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.with(|d| d.domains.insert(id, domain.to_string()));
        id
    }

    pub fn add_school(&self, name: &str, domain_id: Uuid, is_active: bool) -> Uuid {
        self.with(|d| {
            let school = build_school(d, name.to_string(), domain_id, None, is_active);
            let id = school.id;
            d.schools.push((school, false));
            id
        })
    }
}

fn build_school(
    d: &SchoolData,
    name: String,
    domain_id: Uuid,
    logo: Option<String>,
    is_active: bool,
) -> School {
    let now = Utc::now();
    School {
        id: Uuid::new_v4(),
        name,
        domain_id,
        logo,
        is_active,
        created_at: now,
        updated_at: now,
        domain: SchoolDomain {
            id: domain_id,
            domain: d.domains.get(&domain_id).cloned().unwrap_or_default(),
        },
    }
}

fn live_school(d: &mut SchoolData, id: Uuid) -> Option<&mut School> {
    d.schools
        .iter_mut()
        .find(|(s, deleted)| s.id == id && !deleted)
        .map(|(s, _)| s)
}

#[async_trait]
impl SchoolRepository for InMemorySchools {
    async fn list(&self, filter: &SchoolFilter) -> Result<Vec<School>, AppError> {
        Ok(self.with(|d| {
            let search = filter.search.as_ref().map(|s| s.to_lowercase());
            let mut list: Vec<School> = d
                .schools
                .iter()
                .filter(|(_, deleted)| !deleted)
                .map(|(s, _)| s)
                .filter(|s| filter.is_active.map_or(true, |active| s.is_active == active))
                .filter(|s| {
                    search.as_ref().map_or(true, |q| {
                        s.name.to_lowercase().contains(q) || s.domain.domain.to_lowercase().contains(q)
                    })
                })
                .cloned()
                .collect();
            list.sort_by(|a, b| a.name.cmp(&b.name));
            list
        }))
    }

    async fn find(&self, id: Uuid) -> Result<Option<School>, AppError> {
        Ok(self.with(|d| live_school(d, id).map(|s| s.clone())))
    }

    async fn domain_exists(&self, domain_id: Uuid) -> Result<bool, AppError> {
        Ok(self.with(|d| d.domains.contains_key(&domain_id)))
    }

    async fn create(&self, school: NewSchool) -> Result<School, AppError> {
        Ok(self.with(|d| {
            let created = build_school(d, school.name, school.domain_id, school.logo, true);
            d.schools.push((created.clone(), false));
            created
        }))
    }

    async fn update(&self, id: Uuid, changes: SchoolChanges) -> Result<Option<School>, AppError> {
        Ok(self.with(|d| {
            let domain = changes
                .domain_id
                .map(|id| (id, d.domains.get(&id).cloned().unwrap_or_default()));
            let school = live_school(d, id)?;
            if let Some(name) = changes.name {
                school.name = name;
            }
            if let Some((domain_id, domain)) = domain {
                school.domain_id = domain_id;
                school.domain = SchoolDomain {
                    id: domain_id,
                    domain,
                };
            }
            if let Some(logo) = changes.logo {
                school.logo = logo;
            }
            school.updated_at = tick(Some(school.updated_at));
            Some(school.clone())
        }))
    }

    async fn toggle_active(&self, id: Uuid) -> Result<Option<School>, AppError> {
        Ok(self.with(|d| {
            let school = live_school(d, id)?;
            school.is_active = !school.is_active;
            school.updated_at = tick(Some(school.updated_at));
            Some(school.clone())
        }))
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.with(|d| {
            match d.schools.iter_mut().find(|(s, deleted)| s.id == id && !deleted) {
                Some((_, deleted)) => {
                    *deleted = true;
                    true
                }
                None => false,
            }
        }))
    }
}

// ─── App state ──────────────────────────────────────────────────────────────

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        resend_api_key: None,
        mail_from: "StudyLink <noreply@studylink.space>".to_string(),
        app_base_url: "https://studylink.space".to_string(),
        mail_timeout: Duration::from_secs(1),
        status_policy: StatusPolicy::Permissive,
        port: 0,
        rust_log: "debug".to_string(),
    }
}

/// Router-ready state over in-memory backends, with the fixture's identities
/// reachable through the bearer tokens `student`, `owner` and `outsider`.
pub struct TestApp {
    pub state: AppState,
    pub fixture_job_id: Uuid,
    pub mailer: Arc<RecordingMailer>,
    pub schools: Arc<InMemorySchools>,
}

impl TestApp {
    pub fn new() -> Self {
        let fixture = Fixture::new();
        let sessions = InMemorySessions::default();
        sessions.insert("student", fixture.student_identity.clone());
        sessions.insert("owner", fixture.owner_identity.clone());
        sessions.insert("outsider", fixture.outsider_identity.clone());

        let mailer = Arc::new(RecordingMailer::default());
        let schools = Arc::new(InMemorySchools::default());
        let config = test_config();
        let notifier = Notifier::new(mailer.clone(), config.mail_timeout, config.app_base_url.clone());

        Self {
            fixture_job_id: fixture.job_id,
            state: AppState {
                sessions: Arc::new(sessions),
                job_requests: Arc::new(fixture.repo),
                schools: schools.clone(),
                notifier,
                config,
            },
            mailer,
            schools,
        }
    }
}
