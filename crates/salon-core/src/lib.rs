//! Realtime messaging and notification core for a speaker-community
//! portal.
//!
//! This crate keeps conversation state, unread counts, and live
//! notifications consistent across a durable store and any number of
//! concurrently connected clients: at-most-once delivery per connected
//! session, eventual consistency for offline users via the stored inbox
//! and the email fallback.
//!
//! The entry point is [`Salon`], generic over a
//! [`SalonStorageProvider`](salon_storage_traits::SalonStorageProvider)
//! backend. Routing, request validation, UI, and the meeting-provider
//! integration live outside this crate; the host supplies them along with
//! the three boundary collaborators ([`directory::Authenticator`],
//! [`directory::UserDirectory`], [`mailer::Mailer`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::sync::Arc;

use salon_storage_traits::SalonStorageProvider;

pub mod conversations;
pub mod directory;
pub mod error;
pub mod live;
pub mod mailer;
pub mod messages;
pub mod notifications;
pub mod presence;
#[cfg(test)]
pub mod test_util;

pub use self::error::Error;
use self::directory::{Authenticator, UserDirectory};
use self::mailer::Mailer;
use self::presence::PresenceRegistry;

// Re-export the id newtypes for convenience
pub use salon_storage_traits::{ConversationId, MessageId, NotificationId, UserId};

/// Configuration for Salon behavior
///
/// All fields have defaults matching the portal's stock limits.
#[derive(Debug, Clone)]
pub struct SalonConfig {
    /// Maximum accepted message content length in bytes.
    ///
    /// Default: 10000
    pub max_message_length: usize,

    /// Page size used by the conversation read path when the caller does
    /// not pass one.
    ///
    /// Default: 50
    pub message_page_size: usize,

    /// Page size used by notification listings when the caller does not
    /// pass one.
    ///
    /// Default: 20
    pub notification_page_size: usize,
}

impl Default for SalonConfig {
    fn default() -> Self {
        Self {
            max_message_length: 10000,
            message_page_size: 50,
            notification_page_size: 20,
        }
    }
}

/// The realtime messaging and notification core.
///
/// One instance is created at process start and shared (behind an `Arc` or
/// by reference) between the request layer and the live-channel transport.
/// All methods take `&self`; interior state is limited to the presence
/// registry, so the instance is freely shareable across tasks.
pub struct Salon<Storage>
where
    Storage: SalonStorageProvider,
{
    storage: Storage,
    presence: PresenceRegistry,
    authenticator: Arc<dyn Authenticator>,
    directory: Arc<dyn UserDirectory>,
    mailer: Arc<dyn Mailer>,
    config: SalonConfig,
}

impl<Storage> Salon<Storage>
where
    Storage: SalonStorageProvider,
{
    /// Creates a core with default configuration.
    pub fn new(
        storage: Storage,
        authenticator: Arc<dyn Authenticator>,
        directory: Arc<dyn UserDirectory>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self::with_config(
            storage,
            authenticator,
            directory,
            mailer,
            SalonConfig::default(),
        )
    }

    /// Creates a core with the given configuration.
    pub fn with_config(
        storage: Storage,
        authenticator: Arc<dyn Authenticator>,
        directory: Arc<dyn UserDirectory>,
        mailer: Arc<dyn Mailer>,
        config: SalonConfig,
    ) -> Self {
        Self {
            storage,
            presence: PresenceRegistry::new(),
            authenticator,
            directory,
            mailer,
            config,
        }
    }

    /// The storage backend.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// The presence registry.
    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// The active configuration.
    pub fn config(&self) -> &SalonConfig {
        &self.config
    }
}
