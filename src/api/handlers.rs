//! HTTP request handlers

use super::auth::require_callback_secret;
use super::types::{ErrorResponse, LinkStatusResponse, TokenRequest};
use super::AppState;
use crate::linking::{fingerprint, SubjectId};
use crate::telegram::ChatId;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

const RESTART_LINKING: &str =
    "This link is invalid or has expired. Send /link_account to the bot to get a new one.";
const LINK_CONFIRMATION: &str = "Your account is now linked. Helpful answers will earn points.";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let link_routes = Router::new()
        .route("/verify", post(verify_link))
        .route("/invalidate", post(invalidate_link))
        .route("/status/:subject_id", get(link_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_callback_secret,
        ));

    Router::new()
        .nest("/api/link", link_routes)
        .route("/health", get(health))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Link callbacks
// ============================================================

async fn verify_link(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<LinkStatusResponse>, AppError> {
    let token_fingerprint = fingerprint(&req.token);

    let subject = state.links.consume(&req.token).map_err(|e| {
        tracing::info!(%token_fingerprint, error = %e, "Link verification rejected");
        AppError::NotFound(RESTART_LINKING.to_string())
    })?;
    state.links.mark_linked(subject);
    tracing::info!(subject_id = %subject, %token_fingerprint, "Account linked");

    // The link stands even if the confirmation can't be delivered
    if let Err(e) = state
        .messenger
        .send_text(ChatId::from(subject), LINK_CONFIRMATION)
        .await
    {
        tracing::warn!(subject_id = %subject, error = %e, "Link confirmation not delivered");
    }

    Ok(Json(LinkStatusResponse {
        subject_id: subject,
        linked: true,
    }))
}

async fn invalidate_link(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> StatusCode {
    if state.links.invalidate(&req.token) {
        tracing::info!(token_fingerprint = %fingerprint(&req.token), "Link token invalidated");
    }
    StatusCode::NO_CONTENT
}

async fn link_status(
    State(state): State<AppState>,
    Path(subject_id): Path<i64>,
) -> Json<LinkStatusResponse> {
    let subject_id = SubjectId(subject_id);
    Json(LinkStatusResponse {
        subject_id,
        linked: state.links.is_linked(subject_id),
    })
}

// ============================================================
// Service
// ============================================================

async fn health() -> &'static str {
    "ok"
}

async fn get_version() -> &'static str {
    concat!("kudos-bot ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
pub(super) enum AppError {
    NotFound(String),
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Missing or invalid bearer token".to_string(),
            ),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
