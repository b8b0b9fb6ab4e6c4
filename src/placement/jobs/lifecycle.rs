use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::domain::{Job, JobDraft, JobId, JobPatch};
use super::error::JobBoardError;
use super::identity::{authorize_recruiter, Identity};
use super::notify::{dispatch, EmailMessage, Notifier};
use super::repository::PlacementStore;

/// Write side of the job board, scoped to the owning recruiter.
pub struct JobLifecycleService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
}

impl<S, N> JobLifecycleService<S, N>
where
    S: PlacementStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self { store, notifier }
    }

    /// Post a new job owned by the calling recruiter.
    pub async fn create(
        &self,
        caller: &Identity,
        draft: JobDraft,
        now: DateTime<Utc>,
    ) -> Result<Job, JobBoardError> {
        if !caller.is_recruiter() {
            tracing::warn!(caller = %caller.id, "job creation refused: caller is not a recruiter");
            return Err(JobBoardError::forbidden(
                "Access denied. Only recruiters can post jobs.",
            ));
        }

        let recruiter = self
            .store
            .fetch_recruiter(&caller.recruiter_id())
            .await?
            .ok_or_else(|| JobBoardError::not_found("Recruiter not found"))?;

        let job = draft.into_job(recruiter.id.clone(), now)?;
        let stored = self.store.insert_job(job).await?;
        tracing::info!(job_id = %stored.id, company = %stored.company_id, "job posted");

        if let Some(contact) = recruiter.contact_email.as_deref() {
            dispatch(
                self.notifier.clone(),
                EmailMessage::new(
                    contact,
                    format!("Job posted: {}", stored.title),
                    format!(
                        "Your posting \"{}\" is live. Applications close on {}.",
                        stored.title,
                        stored.job_deadline.format("%Y-%m-%d %H:%M UTC")
                    ),
                ),
            );
        }

        Ok(stored)
    }

    /// Apply an allow-listed partial update to a job owned by the caller.
    pub async fn update(
        &self,
        caller: &Identity,
        job_id: &JobId,
        patch: JobPatch,
        now: DateTime<Utc>,
    ) -> Result<Job, JobBoardError> {
        let job = self.editable(caller, job_id).await?;
        self.apply_patch(job, patch, now).await
    }

    /// Load a job the caller may edit. Role and ownership are checked before
    /// any patch is looked at.
    pub async fn editable(&self, caller: &Identity, job_id: &JobId) -> Result<Job, JobBoardError> {
        authorize_recruiter(caller)?;
        self.owned_job(caller, job_id, "Unauthorized to edit this job").await
    }

    /// Apply a patch to a job returned by [`Self::editable`] and persist it.
    pub async fn apply_patch(
        &self,
        mut job: Job,
        patch: JobPatch,
        now: DateTime<Utc>,
    ) -> Result<Job, JobBoardError> {
        patch.apply(&mut job)?;
        job.updated_at = now;
        let stored = self.store.update_job(job).await?;

        tracing::info!(job_id = %stored.id, version = stored.version, "job updated");
        Ok(stored)
    }

    /// Remove a job owned by the caller and tell its applicants.
    pub async fn delete(&self, caller: &Identity, job_id: &JobId) -> Result<(), JobBoardError> {
        authorize_recruiter(caller)?;
        let job = self
            .owned_job(caller, job_id, "Unauthorized to delete this job")
            .await?;

        let removed = self.store.delete_job(job_id).await.map_err(|err| {
            tracing::error!(%job_id, error = %err, "error deleting job");
            JobBoardError::internal(format!("Internal Server Error: {err}"))
        })?;
        if !removed {
            return Err(JobBoardError::not_found("Job not found"));
        }
        tracing::info!(%job_id, "job deleted");

        self.notify_withdrawn(&job).await;
        Ok(())
    }

    async fn owned_job(
        &self,
        caller: &Identity,
        job_id: &JobId,
        refusal: &'static str,
    ) -> Result<Job, JobBoardError> {
        let job = self
            .store
            .fetch_job(job_id)
            .await
            .map_err(|err| JobBoardError::internal(format!("Internal Server Error: {err}")))?
            .ok_or_else(|| JobBoardError::not_found("Job not found"))?;

        if !job.is_owned_by(&caller.id) {
            tracing::warn!(%job_id, caller = %caller.id, "refused mutation of another recruiter's job");
            return Err(JobBoardError::forbidden(refusal));
        }
        Ok(job)
    }

    async fn notify_withdrawn(&self, job: &Job) {
        if job.applicants.is_empty() {
            return;
        }
        let students = match self.store.fetch_students(&job.applicants).await {
            Ok(students) => students,
            Err(err) => {
                tracing::warn!(job_id = %job.id, error = %err, "skipping withdrawal notices");
                return;
            }
        };
        for student in students {
            dispatch(
                self.notifier.clone(),
                EmailMessage::new(
                    student.email,
                    format!("Job withdrawn: {}", job.title),
                    format!(
                        "Hi {}, the posting \"{}\" you applied to has been withdrawn by the recruiter.",
                        student.name, job.title
                    ),
                ),
            );
        }
    }
}
