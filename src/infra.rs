//! Concrete collaborators used by the binary: an in-memory document store, the SMTP
//! notifier, and shared HTTP state.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;

use crate::config::SmtpConfig;
use crate::placement::jobs::{
    EmailMessage, ExpiryWrite, Job, JobId, JobQuery, JobStatus, LogNotifier, Notifier,
    NotifyError, PlacementStore, Recruiter, RecruiterId, RepositoryError, Student, StudentId,
};

#[derive(Clone)]
pub struct AppState {
    pub readiness: Arc<AtomicBool>,
    pub metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoreState {
    students: HashMap<StudentId, Student>,
    recruiters: HashMap<RecruiterId, Recruiter>,
    jobs: BTreeMap<JobId, Job>,
    sequence: u64,
}

impl StoreState {
    fn next_job_id(&mut self) -> JobId {
        loop {
            self.sequence += 1;
            let id = JobId(format!("job-{:06}", self.sequence));
            if !self.jobs.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Mutex-guarded document store. Jobs are returned in creation order.
#[derive(Default, Clone)]
pub struct InMemoryPlacementStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryPlacementStore {
    pub fn from_seed(seed: SeedData) -> Self {
        let store = Self::default();
        for student in seed.students {
            store.put_student(student);
        }
        for recruiter in seed.recruiters {
            store.put_recruiter(recruiter);
        }
        if let Ok(mut state) = store.state.lock() {
            for job in seed.jobs {
                state.jobs.insert(job.id.clone(), job);
            }
        }
        store
    }

    pub fn put_student(&self, student: Student) {
        if let Ok(mut state) = self.state.lock() {
            state.students.insert(student.id.clone(), student);
        }
    }

    pub fn put_recruiter(&self, recruiter: Recruiter) {
        if let Ok(mut state) = self.state.lock() {
            state.recruiters.insert(recruiter.id.clone(), recruiter);
        }
    }

    pub fn job_count(&self) -> usize {
        self.state.lock().map(|state| state.jobs.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl PlacementStore for InMemoryPlacementStore {
    async fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        Ok(self.lock()?.students.get(id).cloned())
    }

    async fn fetch_students(&self, ids: &[StudentId]) -> Result<Vec<Student>, RepositoryError> {
        let state = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.students.get(id).cloned())
            .collect())
    }

    async fn update_student(&self, student: Student) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        match state.students.get_mut(&student.id) {
            Some(existing) => {
                *existing = student;
                Ok(())
            }
            None => Err(RepositoryError::NotFound("Student")),
        }
    }

    async fn fetch_recruiter(
        &self,
        id: &RecruiterId,
    ) -> Result<Option<Recruiter>, RepositoryError> {
        Ok(self.lock()?.recruiters.get(id).cloned())
    }

    async fn fetch_recruiters(
        &self,
        ids: &[RecruiterId],
    ) -> Result<Vec<Recruiter>, RepositoryError> {
        let state = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.recruiters.get(id).cloned())
            .collect())
    }

    async fn find_jobs(&self, query: &JobQuery) -> Result<Vec<Job>, RepositoryError> {
        let state = self.lock()?;
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|job| query.matches(job))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.lock()?.jobs.get(id).cloned())
    }

    async fn insert_job(&self, mut job: Job) -> Result<Job, RepositoryError> {
        job.validate()?;
        let mut state = self.lock()?;
        if !state.recruiters.contains_key(&job.company_id) {
            return Err(RepositoryError::NotFound("Recruiter"));
        }
        job.id = state.next_job_id();
        job.version = 1;
        state.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn update_job(&self, mut job: Job) -> Result<Job, RepositoryError> {
        job.validate()?;
        let mut state = self.lock()?;
        let stored = state.jobs.get_mut(&job.id).ok_or(RepositoryError::NotFound("Job"))?;
        if stored.version != job.version {
            return Err(RepositoryError::Conflict);
        }
        if !stored.job_status.can_become(job.job_status) {
            return Err(RepositoryError::Conflict);
        }
        job.version += 1;
        *stored = job.clone();
        Ok(job)
    }

    async fn expire_job(
        &self,
        id: &JobId,
        expected_version: u64,
    ) -> Result<ExpiryWrite, RepositoryError> {
        let mut state = self.lock()?;
        match state.jobs.get_mut(id) {
            Some(stored) if stored.version == expected_version => {
                stored.job_status = JobStatus::Expired;
                stored.version += 1;
                stored.updated_at = Utc::now();
                Ok(ExpiryWrite::Applied(stored.clone()))
            }
            _ => Ok(ExpiryWrite::Superseded),
        }
    }

    async fn delete_job(&self, id: &JobId) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.jobs.remove(id).is_some())
    }
}

/// Initial documents for the in-memory store.
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub recruiters: Vec<Recruiter>,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("unable to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("seed file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_seed(path: &Path) -> Result<SeedData, SeedError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Blocking SMTP relay; `dispatch` runs it on the blocking pool.
pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|_| NotifyError::Address(config.from.clone()))?;
        let transport = SmtpTransport::relay(&config.server)
            .map_err(|err| NotifyError::Transport(err.to_string()))?
            .credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self { transport, from })
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let to: Mailbox = message
            .recipient
            .parse()
            .map_err(|_| NotifyError::Address(message.recipient.clone()))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        self.transport
            .send(&email)
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        Ok(())
    }
}

/// Notifier selected at startup from configuration.
pub enum MailNotifier {
    Smtp(SmtpNotifier),
    Log(LogNotifier),
}

impl MailNotifier {
    pub fn from_config(config: Option<&SmtpConfig>) -> Self {
        match config.map(SmtpNotifier::new) {
            Some(Ok(smtp)) => Self::Smtp(smtp),
            Some(Err(err)) => {
                tracing::warn!(error = %err, "smtp relay unusable; falling back to log-only notifications");
                Self::Log(LogNotifier)
            }
            None => Self::Log(LogNotifier),
        }
    }
}

impl Notifier for MailNotifier {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        match self {
            MailNotifier::Smtp(smtp) => smtp.send(message),
            MailNotifier::Log(log) => log.send(message),
        }
    }
}
