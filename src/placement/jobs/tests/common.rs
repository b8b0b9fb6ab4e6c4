use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::infra::InMemoryPlacementStore;
use crate::placement::jobs::domain::{
    Job, JobDraft, JobId, JobStatus, Recruiter, RecruiterId, Student, StudentId,
};
use crate::placement::jobs::identity::{AuthError, Identity, IdentityResolver, Role};
use crate::placement::jobs::notify::{EmailMessage, Notifier, NotifyError};
use crate::placement::jobs::repository::{
    ExpiryWrite, JobQuery, PlacementStore, RepositoryError,
};
use crate::placement::jobs::{job_router, JobBoard};

pub(super) type Board = JobBoard<InMemoryPlacementStore, MemoryNotifier>;

pub(super) fn student(id: &str, branch: &str, course: &str) -> Student {
    Student {
        id: StudentId(id.to_string()),
        name: format!("Student {id}"),
        email: format!("{id}@campus.example.edu"),
        branch: branch.to_string(),
        course: course.to_string(),
        applied_jobs: Vec::new(),
    }
}

pub(super) fn recruiter(id: &str, category: &str, participation_type: &str) -> Recruiter {
    Recruiter {
        id: RecruiterId(id.to_string()),
        org_name: format!("Org {id}"),
        sector: Some("Technology".to_string()),
        category: Some(category.to_string()),
        participation_type: Some(participation_type.to_string()),
        contact_person: Some("Hiring Manager".to_string()),
        designation: Some("HR".to_string()),
        contact_email: Some(format!("hr@{id}.example.com")),
        phone: None,
        website: None,
    }
}

pub(super) fn draft(branches: &[&str], courses: &[&str], deadline: DateTime<Utc>) -> JobDraft {
    JobDraft {
        title: Some("Graduate Engineer".to_string()),
        description: Some("Join the platform team".to_string()),
        job_type: Some("Full-Time".to_string()),
        job_category: Some("Engineering".to_string()),
        location: Some("Bengaluru".to_string()),
        ctc: Some("12 LPA".to_string()),
        branches_eligible: branches.iter().map(|b| b.to_string()).collect(),
        courses_eligible: courses.iter().map(|c| c.to_string()).collect(),
        job_deadline: Some(deadline),
    }
}

pub(super) fn tomorrow() -> DateTime<Utc> {
    Utc::now() + Duration::days(1)
}

pub(super) fn yesterday() -> DateTime<Utc> {
    Utc::now() - Duration::days(1)
}

/// Store seeded with students `stu-cse` (CSE/BTech), `stu-ece` (ECE/MTech) and
/// recruiters `rec-1` (MNC, Virtual), `rec-2` (Startup, On-Campus).
pub(super) fn seeded_store() -> Arc<InMemoryPlacementStore> {
    let store = InMemoryPlacementStore::default();
    store.put_student(student("stu-cse", "CSE", "BTech"));
    store.put_student(student("stu-ece", "ECE", "MTech"));
    store.put_recruiter(recruiter("rec-1", "MNC", "Virtual"));
    store.put_recruiter(recruiter("rec-2", "Startup", "On-Campus"));
    Arc::new(store)
}

pub(super) fn build_board() -> (Board, Arc<InMemoryPlacementStore>, Arc<MemoryNotifier>) {
    let store = seeded_store();
    let notifier = Arc::new(MemoryNotifier::default());
    let board = JobBoard::new(store.clone(), notifier.clone());
    (board, store, notifier)
}

/// Inserts a job straight into the store, bypassing the lifecycle service.
pub(super) async fn post_job(
    store: &InMemoryPlacementStore,
    owner: &str,
    branches: &[&str],
    courses: &[&str],
    deadline: DateTime<Utc>,
) -> Job {
    let job = draft(branches, courses, deadline)
        .into_job(RecruiterId(owner.to_string()), Utc::now())
        .expect("valid draft");
    store.insert_job(job).await.expect("insert succeeds")
}

pub(super) async fn stored_status(store: &InMemoryPlacementStore, id: &JobId) -> JobStatus {
    store
        .fetch_job(id)
        .await
        .expect("fetch succeeds")
        .expect("job exists")
        .job_status
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MemoryNotifier {
    pub(super) fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    /// Dispatch is fire-and-forget, so give the blocking pool a moment.
    pub(super) async fn wait_for(&self, count: usize) -> Vec<EmailMessage> {
        for _ in 0..50 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        self.sent()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(message.clone());
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn send(&self, _message: &EmailMessage) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("relay refused connection".to_string()))
    }
}

/// Every call fails as if the document store were offline.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

#[async_trait]
impl PlacementStore for UnavailableStore {
    async fn fetch_student(&self, _id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        offline()
    }
    async fn fetch_students(&self, _ids: &[StudentId]) -> Result<Vec<Student>, RepositoryError> {
        offline()
    }
    async fn update_student(&self, _student: Student) -> Result<(), RepositoryError> {
        offline()
    }
    async fn fetch_recruiter(
        &self,
        _id: &RecruiterId,
    ) -> Result<Option<Recruiter>, RepositoryError> {
        offline()
    }
    async fn fetch_recruiters(
        &self,
        _ids: &[RecruiterId],
    ) -> Result<Vec<Recruiter>, RepositoryError> {
        offline()
    }
    async fn find_jobs(&self, _query: &JobQuery) -> Result<Vec<Job>, RepositoryError> {
        offline()
    }
    async fn fetch_job(&self, _id: &JobId) -> Result<Option<Job>, RepositoryError> {
        offline()
    }
    async fn insert_job(&self, _job: Job) -> Result<Job, RepositoryError> {
        offline()
    }
    async fn update_job(&self, _job: Job) -> Result<Job, RepositoryError> {
        offline()
    }
    async fn expire_job(
        &self,
        _id: &JobId,
        _expected_version: u64,
    ) -> Result<ExpiryWrite, RepositoryError> {
        offline()
    }
    async fn delete_job(&self, _id: &JobId) -> Result<bool, RepositoryError> {
        offline()
    }
}

/// Delegates to an in-memory store but refuses expiry writes for one job and counts them.
/// Job and student writes can also be made to fail a set number of times.
pub(super) struct FlakyStore {
    pub(super) inner: Arc<InMemoryPlacementStore>,
    pub(super) refuse: JobId,
    pub(super) expiry_writes: Mutex<usize>,
    job_write_failures: Mutex<usize>,
    student_write_failures: Mutex<usize>,
}

impl FlakyStore {
    pub(super) fn new(inner: Arc<InMemoryPlacementStore>, refuse: JobId) -> Self {
        Self {
            inner,
            refuse,
            expiry_writes: Mutex::new(0),
            job_write_failures: Mutex::new(0),
            student_write_failures: Mutex::new(0),
        }
    }

    pub(super) fn expiry_writes(&self) -> usize {
        *self.expiry_writes.lock().expect("counter mutex poisoned")
    }

    pub(super) fn fail_job_writes(&self, times: usize) {
        *self.job_write_failures.lock().expect("counter mutex poisoned") = times;
    }

    pub(super) fn fail_student_writes(&self, times: usize) {
        *self.student_write_failures.lock().expect("counter mutex poisoned") = times;
    }
}

fn take_failure(remaining: &Mutex<usize>) -> Result<(), RepositoryError> {
    let mut remaining = remaining.lock().expect("counter mutex poisoned");
    if *remaining == 0 {
        return Ok(());
    }
    *remaining -= 1;
    Err(RepositoryError::Unavailable("write timed out".to_string()))
}

#[async_trait]
impl PlacementStore for FlakyStore {
    async fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        self.inner.fetch_student(id).await
    }
    async fn fetch_students(&self, ids: &[StudentId]) -> Result<Vec<Student>, RepositoryError> {
        self.inner.fetch_students(ids).await
    }
    async fn update_student(&self, student: Student) -> Result<(), RepositoryError> {
        take_failure(&self.student_write_failures)?;
        self.inner.update_student(student).await
    }
    async fn fetch_recruiter(
        &self,
        id: &RecruiterId,
    ) -> Result<Option<Recruiter>, RepositoryError> {
        self.inner.fetch_recruiter(id).await
    }
    async fn fetch_recruiters(
        &self,
        ids: &[RecruiterId],
    ) -> Result<Vec<Recruiter>, RepositoryError> {
        self.inner.fetch_recruiters(ids).await
    }
    async fn find_jobs(&self, query: &JobQuery) -> Result<Vec<Job>, RepositoryError> {
        self.inner.find_jobs(query).await
    }
    async fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        self.inner.fetch_job(id).await
    }
    async fn insert_job(&self, job: Job) -> Result<Job, RepositoryError> {
        self.inner.insert_job(job).await
    }
    async fn update_job(&self, job: Job) -> Result<Job, RepositoryError> {
        take_failure(&self.job_write_failures)?;
        self.inner.update_job(job).await
    }
    async fn expire_job(
        &self,
        id: &JobId,
        expected_version: u64,
    ) -> Result<ExpiryWrite, RepositoryError> {
        *self.expiry_writes.lock().expect("counter mutex poisoned") += 1;
        if id == &self.refuse {
            return Err(RepositoryError::Unavailable("write timed out".to_string()));
        }
        self.inner.expire_job(id, expected_version).await
    }
    async fn delete_job(&self, id: &JobId) -> Result<bool, RepositoryError> {
        self.inner.delete_job(id).await
    }
}

/// Accepts tokens of the form `<role>:<id>`, e.g. `student:stu-cse`.
pub(super) struct StaticResolver;

#[async_trait]
impl IdentityResolver for StaticResolver {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        let (role, id) = token.split_once(':').ok_or(AuthError::MissingToken)?;
        let role = Role::parse(role).ok_or_else(|| AuthError::UnknownRole(role.to_string()))?;
        Ok(Identity {
            id: id.to_string(),
            role,
            name: None,
        })
    }
}

pub(super) fn router_with_board(board: Board) -> axum::Router {
    job_router(Arc::new(board), Arc::new(StaticResolver))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
