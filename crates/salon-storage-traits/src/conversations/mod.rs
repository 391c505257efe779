//! Conversations module
//!
//! This module is responsible for storing and retrieving conversations and
//! their participant links.
//!
//! Two operations here are compound and must be atomic in every backend:
//! the direct-pair find-or-create (so no two direct conversations can ever
//! exist for the same pair of users, even under concurrent first sends) and
//! the bulk mark-read transition (so a reader's unread count can never race
//! below zero or double-count).

use chrono::{DateTime, Utc};

use crate::{ConversationId, UserId};

pub mod error;
pub mod types;

use self::error::ConversationError;
use self::types::{Conversation, Participant};

/// Storage trait for the conversations module
pub trait ConversationStorage {
    /// Save a conversation together with its participant links.
    ///
    /// Participant ids must be distinct. A non-group conversation must have
    /// exactly two participants; implementations reject anything else with
    /// [`ConversationError::InvalidParameters`]. The participant set is
    /// fixed at creation and never mutated afterwards.
    fn create_conversation(
        &self,
        conversation: Conversation,
        participant_ids: &[UserId],
    ) -> Result<(), ConversationError>;

    /// Find a conversation by id
    fn find_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Conversation>, ConversationError>;

    /// Atomically find the direct conversation for the unordered pair
    /// `{a, b}`, or create it from `candidate` if none exists yet.
    ///
    /// Returns the stored conversation either way. The check and the insert
    /// happen under one guard (a uniqueness constraint on the pair key, or
    /// a single lock scope), so concurrent callers for the same pair always
    /// converge on one conversation. `candidate` must be non-group and the
    /// two users must be distinct.
    fn find_or_create_direct_conversation(
        &self,
        candidate: Conversation,
        a: &UserId,
        b: &UserId,
    ) -> Result<Conversation, ConversationError>;

    /// All conversations the user participates in, most recent activity
    /// first.
    fn conversations_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Conversation>, ConversationError>;

    /// Participant links of a conversation, in join order
    fn participants(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Participant>, ConversationError>;

    /// Whether the user is a participant of the conversation
    fn is_participant(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<bool, ConversationError>;

    /// Atomically mark every unread message in the conversation that was
    /// authored by someone other than `reader` as read, and advance the
    /// reader's last-read timestamp to `at` (never backwards).
    ///
    /// Returns the number of messages that transitioned. Returns
    /// [`ConversationError::NotFound`] if the reader is not a participant.
    fn mark_conversation_read(
        &self,
        conversation_id: &ConversationId,
        reader: &UserId,
        at: DateTime<Utc>,
    ) -> Result<usize, ConversationError>;
}
