//! Boundary collaborator for the email fallback path.
//!
//! The notification center treats email as fire-and-forget: sends are
//! spawned onto the runtime, failures are logged, and nothing about a
//! failed email reaches the caller or rolls back the stored notification.

use std::fmt::Debug;

use async_trait::async_trait;
use salon_storage_traits::notifications::types::{NotificationKind, NotificationPayload};
use thiserror::Error;

/// The email template selected for a notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTemplate {
    /// Reminder for an upcoming event
    EventReminder,
    /// Invitation to an event
    EventInvitation,
    /// Cancellation notice
    EventCancelled,
    /// Fallback layout for everything else
    General,
}

impl EmailTemplate {
    /// The template for kinds that carry an email fallback, `None` for
    /// kinds delivered through the live channel and stored inbox only.
    pub fn required_for(kind: NotificationKind) -> Option<Self> {
        match kind {
            NotificationKind::EventReminder => Some(Self::EventReminder),
            NotificationKind::EventInvitation => Some(Self::EventInvitation),
            NotificationKind::EventCancelled => Some(Self::EventCancelled),
            NotificationKind::MessageReceived
            | NotificationKind::RsvpUpdate
            | NotificationKind::System => None,
        }
    }

    /// Get as `&str`
    pub fn as_str(&self) -> &str {
        match self {
            Self::EventReminder => "event-reminder",
            Self::EventInvitation => "event-invitation",
            Self::EventCancelled => "event-cancelled",
            Self::General => "general-notification",
        }
    }
}

/// Data handed to the mailer for template rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailContext {
    /// Recipient display name for the greeting
    pub recipient_name: String,
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
    /// The structured payload, for templates that render event details
    pub payload: NotificationPayload,
}

/// Error returned by [`Mailer::send`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mail error: {0}")]
pub struct MailError(pub String);

/// Sends notification emails through whatever provider the host wires up.
#[async_trait]
pub trait Mailer: Send + Sync + Debug {
    /// Deliver one email. Errors are logged by the caller and never
    /// propagate further.
    async fn send(
        &self,
        to: &str,
        subject: &str,
        template: EmailTemplate,
        context: &MailContext,
    ) -> Result<(), MailError>;
}
