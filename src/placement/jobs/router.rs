use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};

use super::domain::{Job, JobDraft, JobId, JobPatch, JobView, ListingFilters};
use super::error::JobBoardError;
use super::identity::{authenticate, Identity, IdentityResolver};
use super::notify::Notifier;
use super::repository::PlacementStore;
use super::service::JobBoard;

type BoardState<S, N> = State<Arc<JobBoard<S, N>>>;

/// Router builder for the job resource. Paths are relative to the mount point.
pub fn job_router<S, N>(board: Arc<JobBoard<S, N>>, resolver: Arc<dyn IdentityResolver>) -> Router
where
    S: PlacementStore + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/create", post(create_handler::<S, N>))
        .route("/", get(list_handler::<S, N>))
        .route("/recruiter", get(recruiter_jobs_handler::<S, N>))
        .route("/students/applied-jobs", get(applied_jobs_handler::<S, N>))
        .route(
            "/{job_id}",
            get(get_handler::<S, N>)
                .put(update_handler::<S, N>)
                .delete(delete_handler::<S, N>),
        )
        .route("/{job_id}/apply", post(apply_handler::<S, N>))
        .route_layer(from_fn_with_state(resolver, authenticate))
        .with_state(board)
}

fn bad_body(rejection: JsonRejection) -> JobBoardError {
    JobBoardError::bad_request(rejection.body_text())
}

fn bad_query(rejection: QueryRejection) -> JobBoardError {
    JobBoardError::bad_request(rejection.body_text())
}

pub(crate) async fn create_handler<S, N>(
    State(board): BoardState<S, N>,
    Extension(caller): Extension<Identity>,
    payload: Result<Json<JobDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Job>), JobBoardError>
where
    S: PlacementStore + 'static,
    N: Notifier + 'static,
{
    if !caller.is_recruiter() {
        return Err(JobBoardError::forbidden(
            "Access denied. Only recruiters can post jobs.",
        ));
    }
    let Json(draft) = payload.map_err(bad_body)?;
    let job = board.lifecycle.create(&caller, draft, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub(crate) async fn list_handler<S, N>(
    State(board): BoardState<S, N>,
    Extension(caller): Extension<Identity>,
    filters: Result<Query<ListingFilters>, QueryRejection>,
) -> Result<Json<Vec<JobView>>, JobBoardError>
where
    S: PlacementStore + 'static,
    N: Notifier + 'static,
{
    let Query(filters) = filters.map_err(bad_query)?;
    let jobs = board
        .listing
        .list_eligible(&caller, &filters, Utc::now())
        .await?;
    Ok(Json(jobs))
}

pub(crate) async fn recruiter_jobs_handler<S, N>(
    State(board): BoardState<S, N>,
    Extension(caller): Extension<Identity>,
) -> Result<Json<Vec<JobView>>, JobBoardError>
where
    S: PlacementStore + 'static,
    N: Notifier + 'static,
{
    let jobs = board.listing.list_posted(&caller, Utc::now()).await?;
    Ok(Json(jobs))
}

pub(crate) async fn applied_jobs_handler<S, N>(
    State(board): BoardState<S, N>,
    Extension(caller): Extension<Identity>,
) -> Result<Json<Vec<JobId>>, JobBoardError>
where
    S: PlacementStore + 'static,
    N: Notifier + 'static,
{
    let applied = board.students.applied_jobs(&caller).await?;
    Ok(Json(applied))
}

pub(crate) async fn get_handler<S, N>(
    State(board): BoardState<S, N>,
    Path(job_id): Path<String>,
) -> Result<Json<JobView>, JobBoardError>
where
    S: PlacementStore + 'static,
    N: Notifier + 'static,
{
    let view = board.listing.get(&JobId(job_id), Utc::now()).await?;
    Ok(Json(view))
}

pub(crate) async fn update_handler<S, N>(
    State(board): BoardState<S, N>,
    Extension(caller): Extension<Identity>,
    Path(job_id): Path<String>,
    payload: Result<Json<JobPatch>, JsonRejection>,
) -> Result<Json<Value>, JobBoardError>
where
    S: PlacementStore + 'static,
    N: Notifier + 'static,
{
    let job = board.lifecycle.editable(&caller, &JobId(job_id)).await?;
    let Json(patch) = payload.map_err(bad_body)?;
    let job = board.lifecycle.apply_patch(job, patch, Utc::now()).await?;
    Ok(Json(json!({ "message": "Job updated successfully", "job": job })))
}

pub(crate) async fn delete_handler<S, N>(
    State(board): BoardState<S, N>,
    Extension(caller): Extension<Identity>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, JobBoardError>
where
    S: PlacementStore + 'static,
    N: Notifier + 'static,
{
    board.lifecycle.delete(&caller, &JobId(job_id)).await?;
    Ok(Json(json!({ "message": "Job deleted successfully" })))
}

pub(crate) async fn apply_handler<S, N>(
    State(board): BoardState<S, N>,
    Extension(caller): Extension<Identity>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, JobBoardError>
where
    S: PlacementStore + 'static,
    N: Notifier + 'static,
{
    let job = board
        .students
        .apply(&caller, &JobId(job_id), Utc::now())
        .await?;
    Ok(Json(json!({ "message": "Applied successfully", "job": job })))
}
