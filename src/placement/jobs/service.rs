use std::sync::Arc;

use super::lifecycle::JobLifecycleService;
use super::listing::JobListingService;
use super::notify::Notifier;
use super::repository::PlacementStore;
use super::students::StudentJobsService;

/// Facade composing the listing, lifecycle, and student services over one store.
pub struct JobBoard<S, N> {
    pub listing: JobListingService<S>,
    pub lifecycle: JobLifecycleService<S, N>,
    pub students: StudentJobsService<S, N>,
}

impl<S, N> JobBoard<S, N>
where
    S: PlacementStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self {
            listing: JobListingService::new(store.clone()),
            lifecycle: JobLifecycleService::new(store.clone(), notifier.clone()),
            students: StudentJobsService::new(store, notifier),
        }
    }
}
