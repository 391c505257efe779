//! Messages module
//!
//! This module is responsible for storing and retrieving conversation
//! messages.
//!
//! Messages are immutable once written except for the read flag, which only
//! ever transitions from unread to read and only through the bulk
//! mark-read operation on the conversations module. Unread counts are
//! always derived from the stored rows; no backend keeps a separate
//! counter.

use crate::{ConversationId, Page, UserId};

pub mod error;
pub mod types;

use self::error::MessageError;
use self::types::Message;

/// Storage trait for the messages module
pub trait MessageStorage {
    /// Save a message.
    ///
    /// The owning conversation must exist; saving also bumps the
    /// conversation's last-activity timestamp to the message's creation
    /// time, in the same transaction or lock scope as the insert. There are
    /// no partial writes: on error the conversation is untouched.
    fn save_message(&self, message: Message) -> Result<(), MessageError>;

    /// A page of the conversation's messages.
    ///
    /// Pages are taken newest-first (page 0 holds the most recent
    /// messages); within a page, rows keep the storage insertion order
    /// (oldest first).
    fn messages_for_conversation(
        &self,
        conversation_id: &ConversationId,
        page: Page,
    ) -> Result<Vec<Message>, MessageError>;

    /// The most recent message of a conversation, if any
    fn last_message(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Message>, MessageError>;

    /// Number of unread messages in the conversation that were authored by
    /// someone other than `user_id`. Derived by counting rows.
    fn unread_message_count(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<u64, MessageError>;
}
