//! Bearer authentication for the callback routes

use super::handlers::AppError;
use super::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use sha2::{Digest, Sha256};

/// Reject requests without the configured bearer secret. A no-op when no
/// secret is configured.
pub async fn require_callback_secret(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(secret) = state.callback_secret.as_deref() {
        let presented = auth.as_ref().map(|TypedHeader(a)| a.token());
        if !presented.is_some_and(|token| secrets_match(token, secret)) {
            tracing::warn!(
                path = %request.uri().path(),
                header_present = presented.is_some(),
                "Rejected callback without valid bearer secret"
            );
            return Err(AppError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}

/// Compare digests so the comparison time doesn't depend on how much of
/// the secret was guessed.
fn secrets_match(presented: &str, expected: &str) -> bool {
    Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}
