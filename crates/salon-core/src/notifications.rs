//! The notification center.
//!
//! Every notification is persisted and pushed to the owner's personal
//! channel. A fixed subset of kinds additionally falls back to email:
//! the send is spawned onto the runtime and forgotten, so a provider
//! outage can never roll back or delay the stored notification. Read and
//! delete operations are ownership-checked here, one layer above storage.

use std::sync::Arc;

use chrono::Utc;
use salon_storage_traits::notifications::NotificationStorage;
use salon_storage_traits::notifications::types::{Notification, NotificationPayload};
use salon_storage_traits::{NotificationId, Page, SalonStorageProvider, UserId};
use tracing::{debug, warn};

use crate::Salon;
use crate::error::Error;
use crate::live::LiveEvent;
use crate::mailer::{EmailTemplate, MailContext};

impl<Storage> Salon<Storage>
where
    Storage: SalonStorageProvider,
{
    /// Creates a notification for a user.
    ///
    /// The kind is the payload's tag. The notification is persisted first,
    /// then pushed to the user's personal live channel, and — for the
    /// reminder, invitation, and cancellation kinds — handed to the mailer
    /// on a spawned task. Email and live-push failures are logged and never
    /// surface here; only a persistence failure makes this return an error.
    ///
    /// Calls with an email-carrying kind must run inside a Tokio runtime.
    pub fn notify(
        &self,
        user_id: UserId,
        title: impl Into<String>,
        body: impl Into<String>,
        payload: NotificationPayload,
    ) -> Result<Notification, Error> {
        let notification = Notification::new(user_id, title.into(), body.into(), payload, Utc::now());
        self.storage().save_notification(notification.clone())?;

        let delivered = self.presence().publish_to_user(
            &user_id,
            &LiveEvent::Notification {
                notification: notification.clone(),
            },
        );
        debug!(
            notification_id = %notification.id,
            kind = %notification.kind,
            delivered,
            "Notification stored and pushed"
        );

        if let Some(template) = EmailTemplate::required_for(notification.kind) {
            self.spawn_email(&notification, template);
        }

        Ok(notification)
    }

    fn spawn_email(&self, notification: &Notification, template: EmailTemplate) {
        let entry = match self.directory.entry(&notification.user_id) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                warn!(
                    user_id = %notification.user_id,
                    "No directory entry for email fallback, skipping"
                );
                return;
            }
            Err(e) => {
                warn!(
                    user_id = %notification.user_id,
                    "Directory lookup failed, skipping email fallback: {e}"
                );
                return;
            }
        };

        let mailer = Arc::clone(&self.mailer);
        let subject = notification.title.clone();
        let context = MailContext {
            recipient_name: entry.name,
            title: notification.title.clone(),
            body: notification.body.clone(),
            payload: notification.payload.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&entry.email, &subject, template, &context).await {
                warn!("Failed to send notification email: {e}");
            }
        });
    }

    /// Marks one of the user's notifications as read. Idempotent one-way
    /// transition; fails with [`Error::NotAuthorized`] when the
    /// notification belongs to somebody else.
    pub fn mark_notification_read(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> Result<(), Error> {
        self.owned_notification(user_id, notification_id)?;
        self.storage().mark_notification_read(&notification_id)?;
        Ok(())
    }

    /// Marks all of the user's unread notifications as read; returns how
    /// many transitioned.
    pub fn mark_all_notifications_read(&self, user_id: UserId) -> Result<usize, Error> {
        Ok(self.storage().mark_all_notifications_read(&user_id)?)
    }

    /// Permanently deletes one of the user's notifications.
    pub fn delete_notification(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> Result<(), Error> {
        self.owned_notification(user_id, notification_id)?;
        self.storage().delete_notification(&notification_id)?;
        Ok(())
    }

    /// A page of the user's notifications, newest first, optionally
    /// restricted to unread rows.
    pub fn notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
        page: Option<Page>,
    ) -> Result<Vec<Notification>, Error> {
        let page = page.unwrap_or(Page::first(self.config().notification_page_size));
        Ok(self
            .storage()
            .notifications_for_user(&user_id, unread_only, page)?)
    }

    /// The user's unread notification count, derived per request.
    pub fn unread_notification_count(&self, user_id: UserId) -> Result<u64, Error> {
        Ok(self.storage().unread_notification_count(&user_id)?)
    }

    fn owned_notification(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> Result<Notification, Error> {
        let notification = self
            .storage()
            .find_notification(&notification_id)?
            .ok_or_else(|| Error::NotFound(format!("notification {notification_id}")))?;
        if notification.user_id != user_id {
            return Err(Error::NotAuthorized(
                "notification belongs to another user".to_string(),
            ));
        }
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use salon_storage_traits::notifications::types::NotificationKind;

    use super::*;
    use crate::test_util::{TestSalon, create_test_user};

    #[test]
    fn test_notify_persists_and_pushes_to_all_devices() {
        let harness = TestSalon::new();
        let ada = create_test_user(&harness, "Ada");

        let (_first, mut first_rx) = harness.connect(&ada);
        let (_second, mut second_rx) = harness.connect(&ada);

        let notification = harness
            .salon
            .notify(
                ada,
                "Heads up",
                "Something happened",
                NotificationPayload::System,
            )
            .unwrap();
        assert_eq!(notification.kind, NotificationKind::System);

        for rx in [&mut first_rx, &mut second_rx] {
            match rx.try_recv().unwrap() {
                LiveEvent::Notification {
                    notification: delivered,
                } => assert_eq!(delivered.id, notification.id),
                other => panic!("Expected Notification, got {:?}", other),
            }
        }

        let stored = harness.salon.notifications(ada, false, None).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(harness.salon.unread_notification_count(ada).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reminder_kind_triggers_email() {
        let mut harness = TestSalon::new();
        let ada = create_test_user(&harness, "Ada");

        harness
            .salon
            .notify(
                ada,
                "Event Reminder",
                "\"Fireside chat\" starts in 2 hours",
                NotificationPayload::EventReminder {
                    event_id: "evt_42".to_string(),
                    event_title: "Fireside chat".to_string(),
                    starts_at: Utc::now(),
                    meeting_link: None,
                    hours_until_start: 2,
                },
            )
            .unwrap();

        let mail = harness.mail_rx.recv().await.unwrap();
        assert_eq!(mail.to, "ada@example.org");
        assert_eq!(mail.subject, "Event Reminder");
        assert_eq!(mail.template, EmailTemplate::EventReminder);
        assert_eq!(mail.recipient_name, "Ada");
    }

    #[tokio::test]
    async fn test_message_received_kind_sends_no_email() {
        let mut harness = TestSalon::new();
        let ada = create_test_user(&harness, "Ada");
        let bob = create_test_user(&harness, "Bob");

        harness
            .salon
            .notify(
                ada,
                "New message",
                "Bob sent you a message",
                NotificationPayload::MessageReceived {
                    conversation_id: harness.send_text(bob, ada, "hello").conversation_id,
                    sender_id: bob,
                },
            )
            .unwrap();

        tokio::task::yield_now().await;
        assert!(harness.mail_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_email_failure_does_not_roll_back_notification() {
        let harness = TestSalon::with_failing_mailer();
        let ada = create_test_user(&harness, "Ada");

        let notification = harness
            .salon
            .notify(
                ada,
                "Event Cancelled",
                "\"Fireside chat\" was cancelled",
                NotificationPayload::EventCancelled {
                    event_id: "evt_42".to_string(),
                    event_title: "Fireside chat".to_string(),
                    starts_at: Utc::now(),
                },
            )
            .unwrap();

        tokio::task::yield_now().await;
        let stored = harness
            .salon
            .storage()
            .find_notification(&notification.id)
            .unwrap();
        assert!(stored.is_some());
    }

    #[test]
    fn test_mark_read_is_ownership_checked() {
        let harness = TestSalon::new();
        let ada = create_test_user(&harness, "Ada");
        let bob = create_test_user(&harness, "Bob");

        let notification = harness
            .salon
            .notify(ada, "Private", "Ada's business", NotificationPayload::System)
            .unwrap();

        let result = harness.salon.mark_notification_read(bob, notification.id);
        assert!(matches!(result, Err(Error::NotAuthorized(_))));

        harness
            .salon
            .mark_notification_read(ada, notification.id)
            .unwrap();
        // Idempotent
        harness
            .salon
            .mark_notification_read(ada, notification.id)
            .unwrap();
        assert_eq!(harness.salon.unread_notification_count(ada).unwrap(), 0);
    }

    #[test]
    fn test_mark_all_then_unread_fetch_is_empty() {
        let harness = TestSalon::new();
        let ada = create_test_user(&harness, "Ada");

        for i in 0..3 {
            harness
                .salon
                .notify(
                    ada,
                    format!("n{}", i),
                    "body",
                    NotificationPayload::System,
                )
                .unwrap();
        }

        assert_eq!(harness.salon.mark_all_notifications_read(ada).unwrap(), 3);
        assert!(
            harness
                .salon
                .notifications(ada, true, None)
                .unwrap()
                .is_empty()
        );

        // A new arrival leaves the previously-read rows untouched
        harness
            .salon
            .notify(ada, "late", "body", NotificationPayload::System)
            .unwrap();
        let unread = harness.salon.notifications(ada, true, None).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].title, "late");
    }

    #[test]
    fn test_delete_is_ownership_checked_and_permanent() {
        let harness = TestSalon::new();
        let ada = create_test_user(&harness, "Ada");
        let bob = create_test_user(&harness, "Bob");

        let notification = harness
            .salon
            .notify(ada, "Private", "Ada's business", NotificationPayload::System)
            .unwrap();

        let result = harness.salon.delete_notification(bob, notification.id);
        assert!(matches!(result, Err(Error::NotAuthorized(_))));
        // The failed delete left the row unchanged
        let stored = harness
            .salon
            .storage()
            .find_notification(&notification.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored, notification);

        harness
            .salon
            .delete_notification(ada, notification.id)
            .unwrap();
        let result = harness.salon.mark_notification_read(ada, notification.id);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
