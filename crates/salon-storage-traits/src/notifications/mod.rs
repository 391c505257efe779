//! Notifications module
//!
//! This module is responsible for storing and retrieving per-user
//! notifications.
//!
//! The read flag is one-way, mark-read operations are idempotent, and
//! unread counts are derived by counting rows at request time. Rows are
//! removed only by explicit deletion; there is no retention cutoff.

use crate::{NotificationId, Page, UserId};

pub mod error;
pub mod types;

use self::error::NotificationError;
use self::types::Notification;

/// Storage trait for the notifications module
pub trait NotificationStorage {
    /// Save a notification
    fn save_notification(&self, notification: Notification) -> Result<(), NotificationError>;

    /// Find a notification by id
    fn find_notification(
        &self,
        notification_id: &NotificationId,
    ) -> Result<Option<Notification>, NotificationError>;

    /// A page of the user's notifications, newest first, optionally
    /// restricted to unread rows
    fn notifications_for_user(
        &self,
        user_id: &UserId,
        unread_only: bool,
        page: Page,
    ) -> Result<Vec<Notification>, NotificationError>;

    /// Mark a notification as read.
    ///
    /// Idempotent: marking an already-read notification succeeds and
    /// changes nothing. Returns [`NotificationError::NotFound`] if the row
    /// does not exist. Ownership is the caller's concern.
    fn mark_notification_read(
        &self,
        notification_id: &NotificationId,
    ) -> Result<(), NotificationError>;

    /// Mark all of the user's unread notifications as read; returns how
    /// many transitioned
    fn mark_all_notifications_read(&self, user_id: &UserId) -> Result<usize, NotificationError>;

    /// Permanently remove a notification.
    ///
    /// Returns [`NotificationError::NotFound`] if the row does not exist.
    /// Ownership is the caller's concern.
    fn delete_notification(&self, notification_id: &NotificationId)
    -> Result<(), NotificationError>;

    /// Number of unread notifications for the user. Derived by counting
    /// rows.
    fn unread_notification_count(&self, user_id: &UserId) -> Result<u64, NotificationError>;
}
