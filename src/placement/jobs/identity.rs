//! Caller identity and the bearer-token authentication collaborator.
//!
//! Handlers never inspect tokens themselves: the [`authenticate`] middleware resolves an
//! [`Identity`] through an [`IdentityResolver`] and stores it as a request extension.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{RecruiterId, StudentId};
use super::error::JobBoardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Recruiter,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "recruiter" => Some(Self::Recruiter),
            _ => None,
        }
    }
}

/// Authenticated caller with an explicit role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub role: Role,
    pub name: Option<String>,
}

impl Identity {
    pub fn student(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Student,
            name: None,
        }
    }

    pub fn recruiter(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Recruiter,
            name: None,
        }
    }

    pub fn is_recruiter(&self) -> bool {
        self.role == Role::Recruiter
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    pub fn student_id(&self) -> StudentId {
        StudentId(self.id.clone())
    }

    pub fn recruiter_id(&self) -> RecruiterId {
        RecruiterId(self.id.clone())
    }
}

/// Authorization gate used by the mutating job endpoints.
pub fn authorize_recruiter(identity: &Identity) -> Result<(), JobBoardError> {
    if identity.is_recruiter() {
        Ok(())
    } else {
        Err(JobBoardError::forbidden(
            "Access denied. Recruiter role required.",
        ))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("unknown role '{0}'")]
    UnknownRole(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": format!("Not authorized: {self}") }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Resolves a bearer token into the caller's identity.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: i64,
}

/// HS256 JWT verification.
#[derive(Clone)]
pub struct JwtIdentityResolver {
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtIdentityResolver {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)?.claims;
        let role = Role::parse(&claims.role).ok_or(AuthError::UnknownRole(claims.role))?;
        Ok(Identity {
            id: claims.sub,
            role,
            name: claims.name,
        })
    }
}

/// Mints a token for `identity` that the [`JwtIdentityResolver`] with the same secret accepts.
pub fn issue_token(
    secret: &str,
    identity: &Identity,
    ttl: Duration,
) -> Result<String, AuthError> {
    let claims = Claims {
        sub: identity.id.clone(),
        role: match identity.role {
            Role::Student => "student".to_string(),
            Role::Recruiter => "recruiter".to_string(),
        },
        name: identity.name.clone(),
        exp: (Utc::now() + ttl).timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn authenticate(
    State(resolver): State<Arc<dyn IdentityResolver>>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolved = match bearer_token(&request) {
        Some(token) => resolver.resolve(token).await,
        None => Err(AuthError::MissingToken),
    };

    match resolved {
        Ok(identity) => {
            tracing::debug!(caller = %identity.id, role = ?identity.role, "caller authenticated");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(error = %err, "authentication denied");
            err.into_response()
        }
    }
}
