//! Memory-based implementation of the NotificationStorage trait

use salon_storage_traits::notifications::NotificationStorage;
use salon_storage_traits::notifications::error::NotificationError;
use salon_storage_traits::notifications::types::Notification;
use salon_storage_traits::{NotificationId, Page, UserId};

use crate::SalonMemoryStorage;

impl NotificationStorage for SalonMemoryStorage {
    fn save_notification(&self, notification: Notification) -> Result<(), NotificationError> {
        let mut inner = self.inner.write();
        inner
            .notifications_by_user
            .entry(notification.user_id)
            .or_default()
            .push(notification.id);
        inner.notifications.insert(notification.id, notification);
        Ok(())
    }

    fn find_notification(
        &self,
        notification_id: &NotificationId,
    ) -> Result<Option<Notification>, NotificationError> {
        let inner = self.inner.read();
        Ok(inner.notifications.get(notification_id).cloned())
    }

    fn notifications_for_user(
        &self,
        user_id: &UserId,
        unread_only: bool,
        page: Page,
    ) -> Result<Vec<Notification>, NotificationError> {
        let inner = self.inner.read();
        let Some(ids) = inner.notifications_by_user.get(user_id) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<Notification> = ids
            .iter()
            .filter_map(|id| inner.notifications.get(id))
            .filter(|notification| !unread_only || !notification.is_read)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(rows
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect())
    }

    fn mark_notification_read(
        &self,
        notification_id: &NotificationId,
    ) -> Result<(), NotificationError> {
        let mut inner = self.inner.write();
        let notification = inner
            .notifications
            .get_mut(notification_id)
            .ok_or(NotificationError::NotFound)?;
        notification.is_read = true;
        Ok(())
    }

    fn mark_all_notifications_read(&self, user_id: &UserId) -> Result<usize, NotificationError> {
        let mut inner = self.inner.write();
        let Some(ids) = inner.notifications_by_user.get(user_id).cloned() else {
            return Ok(0);
        };

        let mut transitioned = 0;
        for id in ids {
            if let Some(notification) = inner.notifications.get_mut(&id)
                && !notification.is_read
            {
                notification.is_read = true;
                transitioned += 1;
            }
        }
        Ok(transitioned)
    }

    fn delete_notification(
        &self,
        notification_id: &NotificationId,
    ) -> Result<(), NotificationError> {
        let mut inner = self.inner.write();
        let notification = inner
            .notifications
            .remove(notification_id)
            .ok_or(NotificationError::NotFound)?;
        if let Some(ids) = inner.notifications_by_user.get_mut(&notification.user_id) {
            ids.retain(|id| id != notification_id);
        }
        Ok(())
    }

    fn unread_notification_count(&self, user_id: &UserId) -> Result<u64, NotificationError> {
        let inner = self.inner.read();
        let count = inner
            .notifications_by_user
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.notifications.get(id))
                    .filter(|notification| !notification.is_read)
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }
}
