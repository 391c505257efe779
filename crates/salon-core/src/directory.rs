//! Boundary collaborators for identity: credential checking and directory
//! lookups.
//!
//! Token issuance, session management, and profile editing all live outside
//! the messaging core. The core only needs two capabilities from the host
//! application: turning a previously-issued credential into a user identity
//! when a live channel connects, and resolving a user id to an email
//! address when a notification falls back to email.

use std::fmt::Debug;

use salon_storage_traits::UserId;
use thiserror::Error;

/// The identity attached to an authenticated live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// The authenticated user
    pub user_id: UserId,
    /// Display name, carried on typing indicators
    pub name: String,
}

/// Validates previously-issued credentials for live-channel connections.
pub trait Authenticator: Send + Sync + Debug {
    /// Returns the identity behind the credential, or `None` when the
    /// credential is missing standing (expired, revoked, malformed). A
    /// `None` closes the channel before any subscription happens.
    fn authenticate(&self, credential: &str) -> Option<SessionIdentity>;
}

/// A directory row for the email fallback path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Email address to deliver to
    pub email: String,
    /// Display name used in the email greeting
    pub name: String,
}

/// Error returned by [`UserDirectory`] lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("directory error: {0}")]
pub struct DirectoryError(pub String);

/// Resolves user ids to email targets.
pub trait UserDirectory: Send + Sync + Debug {
    /// Look up the directory entry for a user, `None` when the user has no
    /// directory row.
    fn entry(&self, user_id: &UserId) -> Result<Option<DirectoryEntry>, DirectoryError>;
}
