//! Memory-based storage implementation for Salon.
//!
//! This crate provides an in-memory implementation of the
//! `SalonStorageProvider` trait. It is non-persistent and will be cleared
//! when the process terminates, which makes it the backend of choice for
//! tests and for ephemeral deployments that rebuild state on startup.
//!
//! # Concurrency
//!
//! All state lives behind a single `parking_lot::RwLock`, allowing many
//! concurrent readers and exclusive writers. The two compound operations of
//! the storage contract — direct-pair find-or-create and bulk mark-read —
//! each run entirely under one write guard, so they are atomic with respect
//! to every other operation on this provider.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use salon_storage_traits::conversations::types::{Conversation, Participant};
use salon_storage_traits::messages::types::Message;
use salon_storage_traits::notifications::types::Notification;
use salon_storage_traits::users::types::User;
use salon_storage_traits::{
    Backend, ConversationId, NotificationId, SalonStorageProvider, UserId,
};

mod conversations;
mod messages;
mod notifications;
mod users;

/// A memory-based storage implementation for Salon.
///
/// Implements all Salon storage traits over plain maps protected by a
/// single `RwLock`. Rows are never evicted; this provider is the system of
/// record for whatever lifetime the process has.
#[derive(Default)]
pub struct SalonMemoryStorage {
    /// Thread-safe inner storage
    inner: RwLock<SalonMemoryStorageInner>,
}

#[derive(Default)]
struct SalonMemoryStorageInner {
    users: HashMap<UserId, User>,
    conversations: HashMap<ConversationId, Conversation>,
    /// Direct-pair uniqueness guard: deterministic pair key -> conversation
    direct_pairs: HashMap<String, ConversationId>,
    /// Participant links per conversation, in join order
    participants: HashMap<ConversationId, Vec<Participant>>,
    /// Messages per conversation, in insertion order (oldest first)
    messages: HashMap<ConversationId, Vec<Message>>,
    notifications: HashMap<NotificationId, Notification>,
    /// Notification ids per user, in insertion order
    notifications_by_user: HashMap<UserId, Vec<NotificationId>>,
}

impl fmt::Debug for SalonMemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SalonMemoryStorage")
            .field("inner", &"RwLock<SalonMemoryStorageInner>")
            .finish()
    }
}

impl SalonMemoryStorage {
    /// Creates a new empty `SalonMemoryStorage`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SalonStorageProvider for SalonMemoryStorage {
    fn backend(&self) -> Backend {
        Backend::Memory
    }
}
