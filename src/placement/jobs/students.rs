use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::domain::{Job, JobId, Student};
use super::error::JobBoardError;
use super::expiry::reconcile;
use super::identity::Identity;
use super::notify::{dispatch, EmailMessage, Notifier};
use super::repository::PlacementStore;

/// Student-facing operations: the applied-jobs view and applying to a posting.
pub struct StudentJobsService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
}

impl<S, N> StudentJobsService<S, N>
where
    S: PlacementStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self { store, notifier }
    }

    /// The caller's `applied_jobs`, verbatim.
    pub async fn applied_jobs(&self, caller: &Identity) -> Result<Vec<JobId>, JobBoardError> {
        let student = self.resolve_student(caller).await?.ok_or_else(|| {
            JobBoardError::forbidden("Access denied. Only students can view applied jobs.")
        })?;
        Ok(student.applied_jobs)
    }

    /// Record the caller as an applicant of `job_id`.
    pub async fn apply(
        &self,
        caller: &Identity,
        job_id: &JobId,
        now: DateTime<Utc>,
    ) -> Result<Job, JobBoardError> {
        let mut student = self
            .resolve_student(caller)
            .await?
            .ok_or_else(|| JobBoardError::forbidden("Access denied. Only students can apply."))?;

        let job = self
            .store
            .fetch_job(job_id)
            .await
            .map_err(|err| JobBoardError::internal(err.to_string()))?
            .ok_or_else(|| JobBoardError::not_found("Job not found"))?;

        let mut jobs = vec![job];
        reconcile(self.store.as_ref(), &mut jobs, now).await;
        let mut job = jobs.remove(0);

        if !job.is_eligible(&student.branch, &student.course) {
            return Err(JobBoardError::forbidden(
                "You are not eligible for this job",
            ));
        }
        if !job.job_status.accepts_applications() {
            return Err(JobBoardError::bad_request(format!(
                "Applications are closed: job is {}",
                job.job_status.label()
            )));
        }
        if job.has_applicant(&student.id) {
            return Err(JobBoardError::bad_request(
                "You have already applied to this job",
            ));
        }

        // Student first: the duplicate check only reads `job.applicants`.
        if !student.applied_jobs.contains(&job.id) {
            student.applied_jobs.push(job.id.clone());
        }
        let email = student.email.clone();
        let name = student.name.clone();
        let applicant = student.id.clone();
        self.store.update_student(student).await?;

        job.applicants.push(applicant);
        job.updated_at = now;
        let stored = self.store.update_job(job).await?;
        tracing::info!(job_id = %stored.id, student = %caller.id, "application recorded");

        dispatch(
            self.notifier.clone(),
            EmailMessage::new(
                email,
                format!("Application received: {}", stored.title),
                format!(
                    "Hi {name}, your application for \"{}\" has been received.",
                    stored.title
                ),
            ),
        );

        Ok(stored)
    }

    /// Only callers with the student role and an existing record resolve.
    async fn resolve_student(&self, caller: &Identity) -> Result<Option<Student>, JobBoardError> {
        if !caller.is_student() {
            return Ok(None);
        }
        self.store
            .fetch_student(&caller.student_id())
            .await
            .map_err(|err| JobBoardError::internal(err.to_string()))
    }
}
