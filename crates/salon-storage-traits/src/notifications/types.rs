//! Types for the notifications module

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::NotificationError;
use crate::{ConversationId, NotificationId, UserId};

/// A stored notification for one user.
///
/// `kind` is always the tag of `payload`; construct through
/// [`Notification::new`] so the two cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// The id of the notification
    pub id: NotificationId,
    /// The owning user
    pub user_id: UserId,
    /// Short headline, also used as the email subject
    pub title: String,
    /// Human-readable body
    pub body: String,
    /// The kind of notification
    pub kind: NotificationKind,
    /// Structured kind-specific data
    pub payload: NotificationPayload,
    /// Whether the user has read this notification; one-way transition
    pub is_read: bool,
    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Creates an unread notification with a fresh id; the kind is derived
    /// from the payload variant.
    pub fn new(
        user_id: UserId,
        title: String,
        body: String,
        payload: NotificationPayload,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            title,
            body,
            kind: payload.kind(),
            payload,
            is_read: false,
            created_at: now,
        }
    }
}

/// The kind of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NotificationKind {
    /// An upcoming event the user confirmed attendance for
    EventReminder,
    /// An invitation to speak at or attend an event
    EventInvitation,
    /// A direct or group message arrived while the user was away
    MessageReceived,
    /// Somebody changed their RSVP on an event the user organizes
    RsvpUpdate,
    /// An event the user was attending was cancelled
    EventCancelled,
    /// Anything originated by the portal itself
    System,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl NotificationKind {
    /// Get as `&str`
    pub fn as_str(&self) -> &str {
        match self {
            Self::EventReminder => "event_reminder",
            Self::EventInvitation => "event_invitation",
            Self::MessageReceived => "message_received",
            Self::RsvpUpdate => "rsvp_update",
            Self::EventCancelled => "event_cancelled",
            Self::System => "system",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event_reminder" => Ok(Self::EventReminder),
            "event_invitation" => Ok(Self::EventInvitation),
            "message_received" => Ok(Self::MessageReceived),
            "rsvp_update" => Ok(Self::RsvpUpdate),
            "event_cancelled" => Ok(Self::EventCancelled),
            "system" => Ok(Self::System),
            _ => Err(NotificationError::InvalidParameters(format!(
                "Invalid notification kind: {}",
                s
            ))),
        }
    }
}

impl Serialize for NotificationKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NotificationKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Kind-specific notification data.
///
/// One variant per [`NotificationKind`], each with an explicit field set.
/// Event and meeting data originate outside the messaging core, so they
/// arrive here as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// Payload of an [`NotificationKind::EventReminder`]
    EventReminder {
        /// Id of the event in the event store
        event_id: String,
        /// Event title
        event_title: String,
        /// Scheduled start
        starts_at: DateTime<Utc>,
        /// Join link, when the meeting provider issued one
        meeting_link: Option<String>,
        /// Whole hours between the reminder and the start
        hours_until_start: i64,
    },
    /// Payload of an [`NotificationKind::EventInvitation`]
    EventInvitation {
        /// Id of the event in the event store
        event_id: String,
        /// Event title
        event_title: String,
        /// Scheduled start
        starts_at: DateTime<Utc>,
    },
    /// Payload of a [`NotificationKind::MessageReceived`]
    MessageReceived {
        /// Conversation the message landed in
        conversation_id: ConversationId,
        /// Author of the message
        sender_id: UserId,
    },
    /// Payload of an [`NotificationKind::RsvpUpdate`]
    RsvpUpdate {
        /// Id of the event in the event store
        event_id: String,
        /// Event title
        event_title: String,
        /// The attendee whose RSVP changed
        attendee_id: UserId,
        /// The new RSVP status, as the event store reports it
        status: String,
    },
    /// Payload of an [`NotificationKind::EventCancelled`]
    EventCancelled {
        /// Id of the event in the event store
        event_id: String,
        /// Event title
        event_title: String,
        /// The start the event would have had
        starts_at: DateTime<Utc>,
    },
    /// Payload of a [`NotificationKind::System`] notification
    System,
}

impl NotificationPayload {
    /// The kind this payload belongs to.
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::EventReminder { .. } => NotificationKind::EventReminder,
            Self::EventInvitation { .. } => NotificationKind::EventInvitation,
            Self::MessageReceived { .. } => NotificationKind::MessageReceived,
            Self::RsvpUpdate { .. } => NotificationKind::RsvpUpdate,
            Self::EventCancelled { .. } => NotificationKind::EventCancelled,
            Self::System => NotificationKind::System,
        }
    }
}
