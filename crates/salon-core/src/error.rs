//! Error types for the Salon core.

use salon_storage_traits::conversations::error::ConversationError;
use salon_storage_traits::messages::error::MessageError;
use salon_storage_traits::notifications::error::NotificationError;
use salon_storage_traits::users::error::UserError;
use thiserror::Error;

/// Error type for Salon core operations.
///
/// Authorization, existence, and validation failures are detected by the
/// core itself and surfaced synchronously. Anything a storage backend
/// reports collapses into [`Error::Storage`], which callers should treat
/// as retryable. Delivery failures (dropped live channels, failed emails)
/// are never errors; they are logged and swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The caller lacks standing for the target entity
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input
    #[error("validation error: {0}")]
    Validation(String),

    /// The persistence layer failed; the operation was aborted
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<UserError> for Error {
    fn from(e: UserError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<ConversationError> for Error {
    fn from(e: ConversationError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<MessageError> for Error {
    fn from(e: MessageError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<NotificationError> for Error {
    fn from(e: NotificationError) -> Self {
        Self::Storage(e.to_string())
    }
}
