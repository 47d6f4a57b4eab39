//! API request and response types

use crate::linking::SubjectId;
use serde::{Deserialize, Serialize};

/// Body of `verify` and `invalidate`
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// Linked status of one subject
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkStatusResponse {
    pub subject_id: SubjectId,
    pub linked: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
