//! Durable credential storage.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::types::Credential;

/// Errors from the credential store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt credential record for `{0}`: {1}")]
    Corrupt(String, String),
}

/// Keyed-by-username store of cached session cookies.
///
/// One record per username; replaced wholesale on re-authentication.
pub trait CredentialStore: Send + Sync {
    /// Look up a non-expired credential. An expired record is deleted on
    /// the spot and reported as absent.
    fn find_valid(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Credential>, StoreError>;

    /// Insert or replace the record for the credential's username.
    fn save(&self, credential: &Credential) -> Result<(), StoreError>;

    /// Remove the record for a username. Returns whether one existed.
    fn delete(&self, username: &str) -> Result<bool, StoreError>;

    /// Remove all records.
    fn clear(&self) -> Result<(), StoreError>;
}
