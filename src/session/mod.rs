//! Session state for the DocPortal client
//!
//! A session is nothing more than the (access, refresh) token pair issued by
//! the backend. It lives in a [`TokenStore`]; no other component keeps a copy
//! beyond the duration of one call.

use thiserror::Error;

mod store;

pub use store::{FileTokenStore, MemoryTokenStore};

/// Token store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt token file: {0}")]
    Corrupt(String),
}

/// An issued token pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

/// Persistent storage for the current session's token pair.
///
/// Pure storage: implementations do not inspect token contents. `set`
/// replaces both tokens atomically so that at most one valid pair is
/// persisted at a time.
pub trait TokenStore: Send + Sync {
    /// Currently stored access token, if any
    fn access_token(&self) -> Result<Option<String>, StoreError>;

    /// Currently stored refresh token, if any
    fn refresh_token(&self) -> Result<Option<String>, StoreError>;

    /// Replace the stored pair with a new one
    fn set(&self, access_token: &str, refresh_token: &str) -> Result<(), StoreError>;

    /// Destroy the stored pair
    fn clear(&self) -> Result<(), StoreError>;

    /// Convenience: whether a session is currently stored
    fn has_session(&self) -> bool {
        matches!(self.access_token(), Ok(Some(_)))
    }
}
