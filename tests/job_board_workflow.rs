use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::{Extension, Router};
use campus_placement::infra::{AppState, InMemoryPlacementStore, SeedData};
use campus_placement::placement::jobs::{
    issue_token, Identity, IdentityResolver, JobBoard, JwtIdentityResolver, LogNotifier,
    Recruiter, RecruiterId, Student, StudentId,
};
use campus_placement::routes::with_job_routes;
use chrono::{Duration, Utc};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "workflow-secret";

fn seed() -> SeedData {
    SeedData {
        students: vec![Student {
            id: StudentId("stu-1".to_string()),
            name: "Asha Rao".to_string(),
            email: "asha@campus.example.edu".to_string(),
            branch: "CSE".to_string(),
            course: "BTech".to_string(),
            applied_jobs: Vec::new(),
        }],
        recruiters: vec![Recruiter {
            id: RecruiterId("rec-1".to_string()),
            org_name: "Acme Systems".to_string(),
            sector: Some("Software".to_string()),
            category: Some("MNC".to_string()),
            participation_type: Some("Virtual".to_string()),
            contact_person: Some("Dev Mehta".to_string()),
            designation: Some("Talent Lead".to_string()),
            contact_email: Some("talent@acme.example.com".to_string()),
            phone: None,
            website: Some("https://acme.example.com".to_string()),
        }],
        jobs: Vec::new(),
    }
}

fn app(store: Arc<InMemoryPlacementStore>, ready: bool) -> Router {
    let board = Arc::new(JobBoard::new(store, Arc::new(LogNotifier)));
    let resolver: Arc<dyn IdentityResolver> = Arc::new(JwtIdentityResolver::new(SECRET));
    let state = AppState {
        readiness: Arc::new(AtomicBool::new(ready)),
        metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
    };
    with_job_routes(board, resolver).layer(Extension(state))
}

fn token(identity: Identity) -> String {
    issue_token(SECRET, &identity, Duration::hours(1)).expect("token issues")
}

fn call(method: Method, uri: &str, bearer: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json payload")
}

#[tokio::test]
async fn recruiter_posts_student_applies_recruiter_sees_the_applicant() {
    let store = Arc::new(InMemoryPlacementStore::from_seed(seed()));
    let app = app(store.clone(), true);
    let recruiter = token(Identity::recruiter("rec-1"));
    let student = token(Identity::student("stu-1"));

    let response = app
        .clone()
        .oneshot(call(
            Method::POST,
            "/api/jobs/create",
            &recruiter,
            Some(json!({
                "title": "Platform Engineer",
                "description": "Own the deployment pipeline",
                "job_type": "Full-Time",
                "job_category": "Engineering",
                "ctc": "14 LPA",
                "branches_eligible": ["CSE", "IT"],
                "courses_eligible": ["BTech"],
                "job_deadline": Utc::now() + Duration::days(7),
            })),
        ))
        .await
        .expect("create responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    let job_id = created["id"].as_str().expect("id assigned").to_string();

    let response = app
        .clone()
        .oneshot(call(Method::GET, "/api/jobs?job_type=Full-Time", &student, None))
        .await
        .expect("listing responds");
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json_body(response).await;
    assert_eq!(listed[0]["id"], job_id.as_str());
    assert_eq!(listed[0]["company"]["org_name"], "Acme Systems");

    let response = app
        .clone()
        .oneshot(call(
            Method::POST,
            &format!("/api/jobs/{job_id}/apply"),
            &student,
            None,
        ))
        .await
        .expect("apply responds");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(call(Method::GET, "/api/jobs/recruiter", &recruiter, None))
        .await
        .expect("recruiter listing responds");
    assert_eq!(response.status(), StatusCode::OK);
    let posted = json_body(response).await;
    assert_eq!(posted[0]["applicant_contacts"][0]["name"], "Asha Rao");

    let response = app
        .oneshot(call(
            Method::GET,
            "/api/jobs/students/applied-jobs",
            &student,
            None,
        ))
        .await
        .expect("applied jobs responds");
    assert_eq!(json_body(response).await, json!([job_id]));
}

#[tokio::test]
async fn tampered_tokens_are_unauthorized() {
    let store = Arc::new(InMemoryPlacementStore::from_seed(seed()));
    let app = app(store, true);
    let forged = issue_token("not-the-secret", &Identity::recruiter("rec-1"), Duration::hours(1))
        .expect("token issues");

    let response = app
        .oneshot(call(Method::GET, "/api/jobs/recruiter", &forged, None))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_and_readiness_endpoints_report_status() {
    let store = Arc::new(InMemoryPlacementStore::default());

    let health = app(store.clone(), false)
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("health responds");
    assert_eq!(health.status(), StatusCode::OK);

    let starting = app(store.clone(), false)
        .oneshot(
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("ready responds");
    assert_eq!(starting.status(), StatusCode::SERVICE_UNAVAILABLE);

    let ready = app(store, true)
        .oneshot(
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("ready responds");
    assert_eq!(ready.status(), StatusCode::OK);
    assert_eq!(json_body(ready).await, json!({ "status": "ready" }));
}
