//! Salon storage - storage provider traits and entity types for the Salon
//! messaging and notification core.
//!
//! The core (`salon-core`) is generic over [`SalonStorageProvider`], so any
//! backend that implements the entity traits below can be plugged in. Two
//! implementations ship with the workspace: an in-memory backend for tests
//! and ephemeral deployments, and a SQLite backend for durable storage.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod conversations;
pub mod id;
pub mod messages;
pub mod notifications;
pub mod users;

pub use id::{ConversationId, MessageId, NotificationId, UserId};

use self::conversations::ConversationStorage;
use self::messages::MessageStorage;
use self::notifications::NotificationStorage;
use self::users::UserStorage;

/// Backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Memory
    Memory,
    /// SQLite
    SQLite,
}

impl Backend {
    /// Check if it's a persistent backend
    ///
    /// All values different from [`Backend::Memory`] are considered persistent
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::Memory)
    }
}

/// A page of results, applied after the query's own ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of rows returned
    pub limit: usize,
    /// Number of rows skipped before the page starts
    pub offset: usize,
}

impl Page {
    /// Creates a page with the given limit, starting at the given offset.
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// The first page of the given size.
    pub fn first(limit: usize) -> Self {
        Self { limit, offset: 0 }
    }
}

/// Storage provider for the Salon core.
///
/// This trait combines all entity storage requirements, enabling unified
/// storage implementations that can atomically manage conversations and
/// their dependent rows.
///
/// Implementors must provide:
/// - User storage for directory rows
/// - Conversation storage, including the atomic direct-pair
///   find-or-create and the atomic bulk mark-read operation
/// - Message storage for conversation history
/// - Notification storage for the per-user notification inbox
pub trait SalonStorageProvider:
    UserStorage + ConversationStorage + MessageStorage + NotificationStorage + Send + Sync
{
    /// Returns the backend type.
    fn backend(&self) -> Backend;
}
