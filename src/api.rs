//! Callback API for the linking website
//!
//! The website redeems the token from the link URL here once the user has
//! authenticated, which completes the link.

mod auth;
mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::linking::LinkSessionManager;
use crate::telegram::Messenger;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub links: Arc<LinkSessionManager>,
    /// Used for the "you're linked" confirmation
    pub messenger: Arc<dyn Messenger>,
    /// Bearer secret required on `/api/link/*`; `None` leaves them open
    pub callback_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        links: Arc<LinkSessionManager>,
        messenger: Arc<dyn Messenger>,
        callback_secret: Option<String>,
    ) -> Self {
        if callback_secret.is_none() {
            tracing::warn!("LINK_CALLBACK_SECRET is not set; the link callback API is unauthenticated");
        }
        Self {
            links,
            messenger,
            callback_secret: callback_secret.map(Arc::from),
        }
    }
}
