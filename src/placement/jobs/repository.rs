use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{
    Job, JobId, JobStatus, JobValidationError, Recruiter, RecruiterId, Student, StudentId,
};

/// Filter pushed down into the document store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQuery {
    /// Matches jobs whose `branches_eligible` contains this branch.
    pub eligible_branch: Option<String>,
    /// Matches jobs whose `courses_eligible` contains this course.
    pub eligible_course: Option<String>,
    pub job_type: Option<String>,
    pub job_category: Option<String>,
    pub company_id: Option<RecruiterId>,
    /// Matches non-expired jobs whose deadline is strictly before this instant.
    pub overdue_at: Option<DateTime<Utc>>,
}

impl JobQuery {
    pub fn eligible_for(student: &Student) -> Self {
        Self {
            eligible_branch: Some(student.branch.clone()),
            eligible_course: Some(student.course.clone()),
            ..Self::default()
        }
    }

    pub fn posted_by(company_id: RecruiterId) -> Self {
        Self {
            company_id: Some(company_id),
            ..Self::default()
        }
    }

    pub fn overdue(now: DateTime<Utc>) -> Self {
        Self {
            overdue_at: Some(now),
            ..Self::default()
        }
    }

    pub fn with_job_type(mut self, job_type: Option<&str>) -> Self {
        self.job_type = job_type.map(str::to_string);
        self
    }

    pub fn with_job_category(mut self, job_category: Option<&str>) -> Self {
        self.job_category = job_category.map(str::to_string);
        self
    }

    /// Reference evaluation of the query, used by in-memory stores.
    pub fn matches(&self, job: &Job) -> bool {
        if let Some(branch) = &self.eligible_branch {
            if !job.branches_eligible.contains(branch) {
                return false;
            }
        }
        if let Some(course) = &self.eligible_course {
            if !job.courses_eligible.contains(course) {
                return false;
            }
        }
        if let Some(job_type) = &self.job_type {
            if &job.job_type != job_type {
                return false;
            }
        }
        if let Some(job_category) = &self.job_category {
            if &job.job_category != job_category {
                return false;
            }
        }
        if let Some(company_id) = &self.company_id {
            if &job.company_id != company_id {
                return false;
            }
        }
        if let Some(now) = self.overdue_at {
            if job.job_status == JobStatus::Expired || job.job_deadline >= now {
                return false;
            }
        }
        true
    }
}

/// Outcome of a status-only expiry write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryWrite {
    /// The record was flipped to `Expired`; carries the stored record.
    Applied(Job),
    /// The record changed (or disappeared) since it was read; nothing was written.
    Superseded,
}

/// Document store abstraction so the services can be exercised in isolation.
#[async_trait]
pub trait PlacementStore: Send + Sync {
    async fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError>;
    async fn fetch_students(&self, ids: &[StudentId]) -> Result<Vec<Student>, RepositoryError>;
    async fn update_student(&self, student: Student) -> Result<(), RepositoryError>;

    async fn fetch_recruiter(&self, id: &RecruiterId)
        -> Result<Option<Recruiter>, RepositoryError>;
    async fn fetch_recruiters(
        &self,
        ids: &[RecruiterId],
    ) -> Result<Vec<Recruiter>, RepositoryError>;

    async fn find_jobs(&self, query: &JobQuery) -> Result<Vec<Job>, RepositoryError>;
    async fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;
    /// Validates and stores a new job, assigning its identifier.
    async fn insert_job(&self, job: Job) -> Result<Job, RepositoryError>;
    /// Validates and replaces a job if `job.version` still matches the stored record.
    async fn update_job(&self, job: Job) -> Result<Job, RepositoryError>;
    /// Sets `job_status = Expired` without validation if `expected_version` still matches.
    async fn expire_job(
        &self,
        id: &JobId,
        expected_version: u64,
    ) -> Result<ExpiryWrite, RepositoryError>;
    async fn delete_job(&self, id: &JobId) -> Result<bool, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Validation(#[from] JobValidationError),
    /// Carries the kind of record that was missing, e.g. `"Student"`.
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("record was modified concurrently")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
