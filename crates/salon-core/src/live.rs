//! The live-channel wire contract.
//!
//! A live channel is a persistent, authenticated, bidirectional connection
//! used for push delivery, distinct from request/response calls. The core
//! is transport-agnostic: it pushes [`LiveEvent`]s into a per-connection
//! [`LiveSender`] and accepts [`ClientCommand`]s from whatever socket layer
//! the host runs. Both enums are plain tagged JSON, so any transport that
//! can move text frames can carry them.

use salon_storage_traits::messages::types::Message;
use salon_storage_traits::notifications::types::Notification;
use salon_storage_traits::{ConversationId, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// The sending half of one live connection.
///
/// Unbounded so publishing never suspends; a disconnected receiver makes
/// `send` fail, which the registry treats as a dead channel to prune.
pub type LiveSender = mpsc::UnboundedSender<LiveEvent>;

/// Author summary embedded in message events so clients can render without
/// a directory round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderProfile {
    /// The author's user id
    pub id: UserId,
    /// The author's display name
    pub name: String,
}

/// Events pushed from the core to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LiveEvent {
    /// A message was written to a conversation the connection has joined
    NewMessage {
        /// The persisted message
        message: Message,
        /// The author
        sender: SenderProfile,
    },
    /// A direct message addressed to this user arrived, delivered on the
    /// personal channel regardless of room membership
    MessageNotification {
        /// The conversation the message landed in
        conversation_id: ConversationId,
        /// The author
        sender: SenderProfile,
        /// The message body
        content: String,
    },
    /// A stored notification was created for this user
    Notification {
        /// The persisted notification
        notification: Notification,
    },
    /// Somebody started typing in a joined conversation. Transient, never
    /// persisted.
    UserTyping {
        /// The conversation being typed in
        conversation_id: ConversationId,
        /// Who is typing
        user_id: UserId,
        /// Their display name
        user_name: String,
    },
    /// Somebody stopped typing in a joined conversation. Transient, never
    /// persisted.
    UserStoppedTyping {
        /// The conversation
        conversation_id: ConversationId,
        /// Who stopped
        user_id: UserId,
    },
}

/// Commands a connected client may send over its live channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Subscribe this connection to a conversation room
    JoinConversation {
        /// The room to join
        conversation_id: ConversationId,
    },
    /// Unsubscribe this connection from a conversation room
    LeaveConversation {
        /// The room to leave
        conversation_id: ConversationId,
    },
    /// Subscribe this connection to every conversation the user is a
    /// participant of. Explicitly client-triggered, never automatic on
    /// connect.
    JoinAllConversations,
    /// Announce typing in a conversation
    TypingStart {
        /// The conversation being typed in
        conversation_id: ConversationId,
    },
    /// Withdraw a typing announcement
    TypingStop {
        /// The conversation
        conversation_id: ConversationId,
    },
}
