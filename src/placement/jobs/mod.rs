//! Job postings: eligibility-filtered listings, recruiter-owned lifecycle, and the
//! lazy expiry reconciliation applied on every read path.

pub mod domain;
pub mod error;
pub mod expiry;
pub mod identity;
pub mod lifecycle;
pub mod listing;
pub mod notify;
pub mod repository;
pub mod router;
pub mod service;
pub mod students;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicantContact, Job, JobDraft, JobId, JobPatch, JobStatus, JobValidationError, JobView,
    ListingFilters, Recruiter, RecruiterId, RecruiterProjection, Student, StudentId,
};
pub use error::JobBoardError;
pub use expiry::{is_past_deadline, reconcile, ExpirySweeper, ReconcileReport};
pub use identity::{
    authenticate, authorize_recruiter, issue_token, AuthError, Identity, IdentityResolver,
    JwtIdentityResolver, Role,
};
pub use lifecycle::JobLifecycleService;
pub use listing::JobListingService;
pub use notify::{dispatch, EmailMessage, LogNotifier, Notifier, NotifyError};
pub use repository::{ExpiryWrite, JobQuery, PlacementStore, RepositoryError};
pub use router::job_router;
pub use service::JobBoard;
pub use students::StudentJobsService;
