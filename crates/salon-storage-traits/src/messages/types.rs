//! Types for the messages module

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::MessageError;
use crate::{ConversationId, MessageId, UserId};

/// A message inside a conversation.
///
/// Immutable once created, except for `is_read` which transitions
/// false→true exactly once via the conversation-level bulk mark-read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The id of the message
    pub id: MessageId,
    /// The conversation this message belongs to
    pub conversation_id: ConversationId,
    /// The author
    pub sender_id: UserId,
    /// Set only for direct messages; used to route the personal-channel
    /// ping, never for room fan-out
    pub receiver_id: Option<UserId>,
    /// The message body
    pub content: String,
    /// The kind of content carried
    pub kind: MessageKind,
    /// Whether the non-sender side has read this message
    pub is_read: bool,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates an unread message with a fresh id.
    pub fn new(
        conversation_id: ConversationId,
        sender_id: UserId,
        receiver_id: Option<UserId>,
        content: String,
        kind: MessageKind,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            sender_id,
            receiver_id,
            content,
            kind,
            is_read: false,
            created_at: now,
        }
    }
}

/// The kind of content a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageKind {
    /// Plain text
    Text,
    /// An image reference
    Image,
    /// A file reference
    File,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MessageKind {
    /// Get as `&str`
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
        }
    }
}

impl FromStr for MessageKind {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "file" => Ok(Self::File),
            _ => Err(MessageError::InvalidParameters(format!(
                "Invalid message kind: {}",
                s
            ))),
        }
    }
}

impl Serialize for MessageKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
