//! Implementation of NotificationStorage trait for SQLite storage.

use rusqlite::{OptionalExtension, params};
use salon_storage_traits::notifications::NotificationStorage;
use salon_storage_traits::notifications::error::NotificationError;
use salon_storage_traits::notifications::types::Notification;
use salon_storage_traits::{NotificationId, Page, UserId};

use crate::{SalonSqliteStorage, db};

#[inline]
fn into_notification_err<T>(e: T) -> NotificationError
where
    T: std::error::Error,
{
    NotificationError::DatabaseError(e.to_string())
}

impl NotificationStorage for SalonSqliteStorage {
    fn save_notification(&self, notification: Notification) -> Result<(), NotificationError> {
        let payload_json = serde_json::to_string(&notification.payload).map_err(|e| {
            NotificationError::DatabaseError(format!("Failed to serialize payload: {}", e))
        })?;

        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO notifications
                 (id, user_id, title, body, kind, payload, is_read, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    notification.id.to_string(),
                    notification.user_id.to_string(),
                    &notification.title,
                    &notification.body,
                    notification.kind.as_str(),
                    &payload_json,
                    notification.is_read,
                    db::timestamp_to_millis(notification.created_at),
                ],
            )
            .map_err(into_notification_err)?;

            Ok(())
        })
    }

    fn find_notification(
        &self,
        notification_id: &NotificationId,
    ) -> Result<Option<Notification>, NotificationError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM notifications WHERE id = ?")
                .map_err(into_notification_err)?;

            stmt.query_row(
                params![notification_id.to_string()],
                db::row_to_notification,
            )
            .optional()
            .map_err(into_notification_err)
        })
    }

    fn notifications_for_user(
        &self,
        user_id: &UserId,
        unread_only: bool,
        page: Page,
    ) -> Result<Vec<Notification>, NotificationError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM notifications
                     WHERE user_id = ?1 AND (?2 = 0 OR is_read = 0)
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?3 OFFSET ?4",
                )
                .map_err(into_notification_err)?;

            let rows = stmt
                .query_map(
                    params![
                        user_id.to_string(),
                        unread_only,
                        page.limit as i64,
                        page.offset as i64
                    ],
                    db::row_to_notification,
                )
                .map_err(into_notification_err)?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(into_notification_err)
        })
    }

    fn mark_notification_read(
        &self,
        notification_id: &NotificationId,
    ) -> Result<(), NotificationError> {
        self.with_connection(|conn| {
            let changed = conn
                .execute(
                    "UPDATE notifications SET is_read = 1 WHERE id = ?",
                    params![notification_id.to_string()],
                )
                .map_err(into_notification_err)?;

            if changed == 0 {
                return Err(NotificationError::NotFound);
            }
            Ok(())
        })
    }

    fn mark_all_notifications_read(&self, user_id: &UserId) -> Result<usize, NotificationError> {
        self.with_connection(|conn| {
            conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0",
                params![user_id.to_string()],
            )
            .map_err(into_notification_err)
        })
    }

    fn delete_notification(
        &self,
        notification_id: &NotificationId,
    ) -> Result<(), NotificationError> {
        self.with_connection(|conn| {
            let changed = conn
                .execute(
                    "DELETE FROM notifications WHERE id = ?",
                    params![notification_id.to_string()],
                )
                .map_err(into_notification_err)?;

            if changed == 0 {
                return Err(NotificationError::NotFound);
            }
            Ok(())
        })
    }

    fn unread_notification_count(&self, user_id: &UserId) -> Result<u64, NotificationError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0")
                .map_err(into_notification_err)?;

            stmt.query_row(params![user_id.to_string()], |row| row.get::<_, i64>(0))
                .map(|count| count as u64)
                .map_err(into_notification_err)
        })
    }
}
