//! Types for the conversations module

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ConversationId, UserId};

/// An addressable thread of messages, either direct (exactly two
/// participants) or group (any number).
///
/// The participant set is fixed at creation; a direct conversation is never
/// converted to a group conversation or vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// The id of the conversation
    pub id: ConversationId,
    /// Optional display title; direct conversations usually have none
    pub title: Option<String>,
    /// Whether this is a group conversation
    pub is_group: bool,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent message, or of creation when empty.
    /// Bumped by message persistence, used for recency ordering.
    pub last_activity_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates a direct (two-participant) conversation shell.
    pub fn direct(now: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId::new(),
            title: None,
            is_group: false,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Creates a group conversation shell with an optional title.
    pub fn group(title: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId::new(),
            title,
            is_group: true,
            created_at: now,
            last_activity_at: now,
        }
    }
}

/// A user's membership record in a conversation, carrying per-user read
/// progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// The conversation this link belongs to
    pub conversation_id: ConversationId,
    /// The member
    pub user_id: UserId,
    /// Last time the member read the conversation; monotonically
    /// non-decreasing, `None` until the first read
    pub last_read_at: Option<DateTime<Utc>>,
}

/// Deterministic composite key for the unordered user pair of a direct
/// conversation.
///
/// Both backends key direct-pair uniqueness on this value, so the same two
/// users always map to the same key regardless of who sends first.
pub fn direct_pair_key(a: &UserId, b: &UserId) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}:{hi}")
}
