use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for job postings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

/// Identifier wrapper for recruiter (company) accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecruiterId(pub String);

/// Identifier wrapper for student accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

macro_rules! display_id {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })*
    };
}

display_id!(JobId, RecruiterId, StudentId);

/// Posting state. `Expired` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Open,
    Closed,
    Expired,
}

impl JobStatus {
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Open => "Open",
            JobStatus::Closed => "Closed",
            JobStatus::Expired => "Expired",
        }
    }

    /// Expired postings never go back to any other state.
    pub fn can_become(&self, next: JobStatus) -> bool {
        !matches!(self, JobStatus::Expired) || next == JobStatus::Expired
    }

    pub fn accepts_applications(&self) -> bool {
        matches!(self, JobStatus::Open)
    }
}

/// Persisted job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub company_id: RecruiterId,
    pub title: String,
    pub description: String,
    pub job_type: String,
    pub job_category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctc: Option<String>,
    pub branches_eligible: Vec<String>,
    pub courses_eligible: Vec<String>,
    pub job_deadline: DateTime<Utc>,
    pub job_status: JobStatus,
    #[serde(default)]
    pub applicants: Vec<StudentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by the store on every write.
    #[serde(default)]
    pub version: u64,
}

impl Job {
    /// Set membership, not equality: the student's branch must be among the eligible branches.
    pub fn is_eligible(&self, branch: &str, course: &str) -> bool {
        self.branches_eligible.iter().any(|b| b == branch)
            && self.courses_eligible.iter().any(|c| c == course)
    }

    pub fn is_owned_by(&self, recruiter: &str) -> bool {
        self.company_id.0 == recruiter
    }

    pub fn has_applicant(&self, student: &StudentId) -> bool {
        self.applicants.contains(student)
    }

    /// Full model validation run by the store before inserts and updates.
    pub fn validate(&self) -> Result<(), JobValidationError> {
        let mut missing = Vec::new();
        if self.company_id.0.trim().is_empty() {
            missing.push("company_id");
        }
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.job_type.trim().is_empty() {
            missing.push("job_type");
        }
        if self.job_category.trim().is_empty() {
            missing.push("job_category");
        }
        if self.branches_eligible.iter().all(|b| b.trim().is_empty()) {
            missing.push("branches_eligible");
        }
        if self.courses_eligible.iter().all(|c| c.trim().is_empty()) {
            missing.push("courses_eligible");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(JobValidationError::MissingFields(missing))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobValidationError {
    #[error("Job validation failed: missing required field(s): {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Job validation failed: {0}")]
    Invalid(String),
}

/// Create payload. Every field is optional on the wire so that missing fields are
/// reported through validation rather than a deserializer rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub job_category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub ctc: Option<String>,
    #[serde(default)]
    pub branches_eligible: Vec<String>,
    #[serde(default)]
    pub courses_eligible: Vec<String>,
    #[serde(default)]
    pub job_deadline: Option<DateTime<Utc>>,
}

impl JobDraft {
    /// Builds an unsaved Open job owned by `company_id`. The store assigns the id.
    pub fn into_job(
        self,
        company_id: RecruiterId,
        now: DateTime<Utc>,
    ) -> Result<Job, JobValidationError> {
        let deadline_missing = self.job_deadline.is_none();

        let job = Job {
            id: JobId(String::new()),
            company_id,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            job_type: self.job_type.unwrap_or_default(),
            job_category: self.job_category.unwrap_or_default(),
            location: self.location,
            ctc: self.ctc,
            branches_eligible: self.branches_eligible,
            courses_eligible: self.courses_eligible,
            job_deadline: self.job_deadline.unwrap_or(now),
            job_status: JobStatus::Open,
            applicants: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        };

        match (job.validate(), deadline_missing) {
            (Ok(()), false) => Ok(job),
            (Ok(()), true) => Err(JobValidationError::MissingFields(vec!["job_deadline"])),
            (Err(JobValidationError::MissingFields(mut fields)), true) => {
                fields.push("job_deadline");
                Err(JobValidationError::MissingFields(fields))
            }
            (Err(err), _) => Err(err),
        }
    }
}

/// Partial update payload. Only these fields may change; ownership, identity,
/// and the applicant list are not writable through it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub job_category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub ctc: Option<String>,
    #[serde(default)]
    pub branches_eligible: Option<Vec<String>>,
    #[serde(default)]
    pub courses_eligible: Option<Vec<String>>,
    #[serde(default)]
    pub job_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub job_status: Option<JobStatus>,
}

impl JobPatch {
    /// Shallow merge onto `job`. Deadline edits never touch the status.
    pub fn apply(self, job: &mut Job) -> Result<(), JobValidationError> {
        if let Some(next) = self.job_status {
            if !job.job_status.can_become(next) {
                return Err(JobValidationError::Invalid(format!(
                    "job_status cannot change from {} to {}",
                    job.job_status.label(),
                    next.label()
                )));
            }
            job.job_status = next;
        }
        if let Some(title) = self.title {
            job.title = title;
        }
        if let Some(description) = self.description {
            job.description = description;
        }
        if let Some(job_type) = self.job_type {
            job.job_type = job_type;
        }
        if let Some(job_category) = self.job_category {
            job.job_category = job_category;
        }
        if let Some(location) = self.location {
            job.location = Some(location);
        }
        if let Some(ctc) = self.ctc {
            job.ctc = Some(ctc);
        }
        if let Some(branches) = self.branches_eligible {
            job.branches_eligible = branches;
        }
        if let Some(courses) = self.courses_eligible {
            job.courses_eligible = courses;
        }
        if let Some(deadline) = self.job_deadline {
            job.job_deadline = deadline;
        }
        Ok(())
    }
}

/// Student account as seen by the job board. Read-only apart from `applied_jobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub email: String,
    pub branch: String,
    pub course: String,
    #[serde(default)]
    pub applied_jobs: Vec<JobId>,
}

/// Recruiter (company) account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recruiter {
    pub id: RecruiterId,
    pub org_name: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub participation_type: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

/// Joined view of the owning recruiter. Which fields are filled depends on the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecruiterProjection {
    pub id: RecruiterId,
    pub org_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participation_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

impl RecruiterProjection {
    pub fn listing(recruiter: &Recruiter) -> Self {
        Self {
            category: recruiter.category.clone(),
            participation_type: recruiter.participation_type.clone(),
            ..Self::name_only(recruiter)
        }
    }

    pub fn name_only(recruiter: &Recruiter) -> Self {
        Self {
            id: recruiter.id.clone(),
            org_name: recruiter.org_name.clone(),
            category: None,
            participation_type: None,
            contact_email: None,
        }
    }

    pub fn contact(recruiter: &Recruiter) -> Self {
        Self {
            contact_email: recruiter.contact_email.clone(),
            ..Self::name_only(recruiter)
        }
    }
}

/// Applicant name and email exposed to the owning recruiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicantContact {
    pub id: StudentId,
    pub name: String,
    pub email: String,
}

impl From<&Student> for ApplicantContact {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id.clone(),
            name: student.name.clone(),
            email: student.email.clone(),
        }
    }
}

/// Job joined with its owning recruiter (and, for recruiters, applicant contacts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobView {
    #[serde(flatten)]
    pub job: Job,
    pub company: Option<RecruiterProjection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_contacts: Option<Vec<ApplicantContact>>,
}

/// Optional query filters on the student listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListingFilters {
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub job_category: Option<String>,
    /// Recruiter category, matched after the joined fetch.
    #[serde(default)]
    pub category: Option<String>,
    /// Recruiter participation mode, matched after the joined fetch.
    #[serde(default)]
    pub participation_type: Option<String>,
}

impl ListingFilters {
    fn non_empty(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|v| !v.is_empty())
    }

    pub fn job_type(&self) -> Option<&str> {
        Self::non_empty(&self.job_type)
    }

    pub fn job_category(&self) -> Option<&str> {
        Self::non_empty(&self.job_category)
    }

    /// Post-fetch filter on the joined recruiter projection. Jobs whose recruiter
    /// could not be joined never match an active filter.
    pub fn matches_company(&self, company: Option<&RecruiterProjection>) -> bool {
        let category_ok = match Self::non_empty(&self.category) {
            Some(wanted) => company
                .and_then(|c| c.category.as_deref())
                .is_some_and(|c| c == wanted),
            None => true,
        };
        let participation_ok = match Self::non_empty(&self.participation_type) {
            Some(wanted) => company
                .and_then(|c| c.participation_type.as_deref())
                .is_some_and(|p| p == wanted),
            None => true,
        };
        category_ok && participation_ok
    }
}
