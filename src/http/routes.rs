use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::auth::Credentials;
use crate::error::ReviewError;
use crate::http::session::{expire_cookie, set_cookie, AuthenticatedSession, CurrentSession};
use crate::http::state::HttpState;
use crate::service::Upload;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ReviewError> for ApiError {
    fn from(e: ReviewError) -> Self {
        let status = match &e {
            ReviewError::UnsupportedFormat(_) | ReviewError::Decode { .. } | ReviewError::NoImages => {
                StatusCode::BAD_REQUEST
            }
            ReviewError::InvalidCredentials | ReviewError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ReviewError::Detector(_)
            | ReviewError::Encode { .. }
            | ReviewError::Io(_)
            | ReviewError::Csv(_)
            | ReviewError::Credentials(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("{}", e);
        }
        Self { status, message: e.to_string() }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: e.body_text() }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        error!("worker task failed: {}", e);
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: "internal error".into() }
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(State(st): State<HttpState>, Json(req): Json<LoginRequest>) -> Result<Response, ApiError> {
    let credentials = Credentials::load(&st.credentials_path)?;
    match st.sessions.login(&req.username, &req.password, &credentials) {
        Ok(ctx) => {
            info!("login ok for {}", req.username);
            Ok((
                [(header::SET_COOKIE, set_cookie(ctx.id))],
                Json(json!({ "ok": true, "username": req.username })),
            )
                .into_response())
        }
        Err(e) => {
            warn!("login failed for {}", req.username);
            Err(e.into())
        }
    }
}

pub async fn logout(State(st): State<HttpState>, CurrentSession(ctx): CurrentSession) -> Response {
    if st.sessions.logout(ctx.id) {
        info!("logout {}", ctx.username().unwrap_or_default());
    }
    ([(header::SET_COOKIE, expire_cookie())], Json(json!({ "ok": true }))).into_response()
}

pub async fn session(CurrentSession(ctx): CurrentSession) -> impl IntoResponse {
    Json(json!({ "authenticated": ctx.is_authenticated(), "username": ctx.username() }))
}

pub async fn predict(
    AuthenticatedSession(_): AuthenticatedSession,
    State(st): State<HttpState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field
            .file_name()
            .or_else(|| field.name())
            .unwrap_or("upload")
            .to_string();
        let bytes = field.bytes().await?;
        uploads.push(Upload { name, bytes: bytes.to_vec() });
    }

    let review = st.review.clone();
    let report = tokio::task::spawn_blocking(move || review.predict(&uploads)).await??;
    Ok(Json(report).into_response())
}

pub async fn list_predictions(
    AuthenticatedSession(_): AuthenticatedSession,
    State(st): State<HttpState>,
) -> Result<Response, ApiError> {
    let review = st.review.clone();
    let rows = tokio::task::spawn_blocking(move || review.history()).await??;
    Ok(Json(json!({ "rows": rows })).into_response())
}

pub async fn clear_predictions(
    AuthenticatedSession(ctx): AuthenticatedSession,
    State(st): State<HttpState>,
) -> Result<Response, ApiError> {
    let review = st.review.clone();
    tokio::task::spawn_blocking(move || review.clear()).await??;
    info!("prediction log cleared by {}", ctx.username().unwrap_or_default());
    Ok(Json(json!({ "ok": true })).into_response())
}

pub async fn summary(
    AuthenticatedSession(_): AuthenticatedSession,
    State(st): State<HttpState>,
) -> Result<Response, ApiError> {
    let review = st.review.clone();
    let counts = tokio::task::spawn_blocking(move || review.summary()).await??;
    Ok(Json(json!({ "classes": counts })).into_response())
}

pub async fn summary_chart(
    AuthenticatedSession(_): AuthenticatedSession,
    State(st): State<HttpState>,
) -> Result<Response, ApiError> {
    let review = st.review.clone();
    let svg = tokio::task::spawn_blocking(move || review.chart()).await??;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}
