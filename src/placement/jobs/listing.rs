use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::domain::{
    ApplicantContact, Job, JobId, JobView, ListingFilters, Recruiter, RecruiterId,
    RecruiterProjection, Student, StudentId,
};
use super::error::JobBoardError;
use super::expiry::reconcile;
use super::identity::Identity;
use super::repository::{JobQuery, PlacementStore, RepositoryError};

/// Read side of the job board: eligibility-filtered listings with expiry reconciliation.
pub struct JobListingService<S> {
    store: Arc<S>,
}

fn store_failure(err: RepositoryError) -> JobBoardError {
    JobBoardError::internal(err.to_string())
}

impl<S> JobListingService<S>
where
    S: PlacementStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Jobs the calling student is eligible for, narrowed by the optional filters.
    pub async fn list_eligible(
        &self,
        caller: &Identity,
        filters: &ListingFilters,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobView>, JobBoardError> {
        let student = self
            .store
            .fetch_student(&caller.student_id())
            .await
            .map_err(store_failure)?
            .ok_or_else(|| JobBoardError::not_found("Student not found"))?;

        let query = JobQuery::eligible_for(&student)
            .with_job_type(filters.job_type())
            .with_job_category(filters.job_category());
        let jobs = self.store.find_jobs(&query).await.map_err(store_failure)?;

        let recruiters = self.recruiters_for(&jobs).await?;
        let mut jobs: Vec<Job> = jobs
            .into_iter()
            .filter(|job| {
                let company = recruiters
                    .get(&job.company_id)
                    .map(RecruiterProjection::listing);
                filters.matches_company(company.as_ref())
            })
            .collect();

        reconcile(self.store.as_ref(), &mut jobs, now).await;

        tracing::debug!(student = %student.id, count = jobs.len(), "listed eligible jobs");
        Ok(jobs
            .into_iter()
            .map(|job| JobView {
                company: recruiters
                    .get(&job.company_id)
                    .map(RecruiterProjection::listing),
                job,
                applicant_contacts: None,
            })
            .collect())
    }

    /// Single job joined with the owning recruiter's name.
    pub async fn get(&self, job_id: &JobId, now: DateTime<Utc>) -> Result<JobView, JobBoardError> {
        let job = self
            .store
            .fetch_job(job_id)
            .await
            .map_err(store_failure)?
            .ok_or_else(|| JobBoardError::not_found("Job not found"))?;

        let mut jobs = vec![job];
        reconcile(self.store.as_ref(), &mut jobs, now).await;
        let job = jobs.remove(0);

        let company = self
            .store
            .fetch_recruiter(&job.company_id)
            .await
            .map_err(store_failure)?
            .as_ref()
            .map(RecruiterProjection::name_only);

        Ok(JobView {
            job,
            company,
            applicant_contacts: None,
        })
    }

    /// Postings owned by the calling recruiter, with applicant contacts.
    pub async fn list_posted(
        &self,
        caller: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobView>, JobBoardError> {
        if !caller.is_recruiter() {
            return Err(JobBoardError::forbidden(
                "Access denied. Only recruiters can view their jobs.",
            ));
        }

        let company_id = caller.recruiter_id();
        let mut jobs = self
            .store
            .find_jobs(&JobQuery::posted_by(company_id.clone()))
            .await
            .map_err(store_failure)?;

        reconcile(self.store.as_ref(), &mut jobs, now).await;

        let company = self
            .store
            .fetch_recruiter(&company_id)
            .await
            .map_err(store_failure)?
            .as_ref()
            .map(RecruiterProjection::contact);
        let applicants = self.applicants_for(&jobs).await?;

        Ok(jobs
            .into_iter()
            .map(|job| {
                let contacts = job
                    .applicants
                    .iter()
                    .filter_map(|id| applicants.get(id))
                    .map(ApplicantContact::from)
                    .collect();
                JobView {
                    job,
                    company: company.clone(),
                    applicant_contacts: Some(contacts),
                }
            })
            .collect())
    }

    async fn recruiters_for(
        &self,
        jobs: &[Job],
    ) -> Result<HashMap<RecruiterId, Recruiter>, JobBoardError> {
        let ids: Vec<RecruiterId> = jobs
            .iter()
            .map(|job| job.company_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let recruiters = self
            .store
            .fetch_recruiters(&ids)
            .await
            .map_err(store_failure)?;
        Ok(recruiters
            .into_iter()
            .map(|recruiter| (recruiter.id.clone(), recruiter))
            .collect())
    }

    async fn applicants_for(
        &self,
        jobs: &[Job],
    ) -> Result<HashMap<StudentId, Student>, JobBoardError> {
        let ids: Vec<StudentId> = jobs
            .iter()
            .flat_map(|job| job.applicants.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let students = self
            .store
            .fetch_students(&ids)
            .await
            .map_err(store_failure)?;
        Ok(students
            .into_iter()
            .map(|student| (student.id.clone(), student))
            .collect())
    }
}
