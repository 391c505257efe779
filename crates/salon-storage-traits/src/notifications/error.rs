//! Error types for the notifications module

use std::fmt;

/// Error types for the notifications module
#[derive(Debug)]
pub enum NotificationError {
    /// Invalid parameters
    InvalidParameters(String),
    /// Database error
    DatabaseError(String),
    /// Notification not found
    NotFound,
}

impl std::error::Error for NotificationError {}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameters(message) => write!(f, "Invalid parameters: {}", message),
            Self::DatabaseError(message) => write!(f, "Database error: {}", message),
            Self::NotFound => write!(f, "Notification not found"),
        }
    }
}
