//! Link token and subject identity types

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Bytes of OS randomness behind every token value
const TOKEN_ENTROPY_BYTES: usize = 32;

/// Hex characters of the SHA-256 digest kept in a fingerprint
const FINGERPRINT_LEN: usize = 12;

/// A user in the messaging platform's namespace.
///
/// Telegram user ids double as private chat ids, so the same value is used
/// to address direct messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub i64);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SubjectId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A capability that lets whoever holds it link `subject_id` to an
/// external account. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkToken {
    pub value: String,
    pub subject_id: SubjectId,
    pub issued_at: DateTime<Utc>,
}

impl LinkToken {
    /// Create a token with a fresh random value
    pub fn generate(subject_id: SubjectId, issued_at: DateTime<Utc>) -> Self {
        Self {
            value: generate_token_value(),
            subject_id,
            issued_at,
        }
    }

    /// Log-safe identifier for this token
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.value)
    }
}

/// URL-safe, unpadded base64 of 32 bytes from the OS CSPRNG
pub fn generate_token_value() -> String {
    let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Short SHA-256 prefix of a token value.
///
/// Raw token values are capabilities and must never reach the logs; this is
/// what gets logged instead.
pub fn fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>()
        .chars()
        .take(FINGERPRINT_LEN)
        .collect()
}
