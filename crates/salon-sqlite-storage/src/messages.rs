//! Implementation of MessageStorage trait for SQLite storage.

use rusqlite::{OptionalExtension, params};
use salon_storage_traits::messages::MessageStorage;
use salon_storage_traits::messages::error::MessageError;
use salon_storage_traits::messages::types::Message;
use salon_storage_traits::{ConversationId, Page, UserId};

use crate::{SalonSqliteStorage, db};

#[inline]
fn into_message_err<T>(e: T) -> MessageError
where
    T: std::error::Error,
{
    MessageError::DatabaseError(e.to_string())
}

impl MessageStorage for SalonSqliteStorage {
    fn save_message(&self, message: Message) -> Result<(), MessageError> {
        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction().map_err(into_message_err)?;

            let conversation_exists = tx
                .prepare("SELECT 1 FROM conversations WHERE id = ?")
                .and_then(|mut stmt| stmt.exists(params![message.conversation_id.to_string()]))
                .map_err(into_message_err)?;
            if !conversation_exists {
                return Err(MessageError::InvalidParameters(
                    "Conversation not found".to_string(),
                ));
            }

            tx.execute(
                "INSERT INTO messages
                 (id, conversation_id, sender_id, receiver_id, content, kind, is_read, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    message.id.to_string(),
                    message.conversation_id.to_string(),
                    message.sender_id.to_string(),
                    message.receiver_id.map(|id| id.to_string()),
                    &message.content,
                    message.kind.as_str(),
                    message.is_read,
                    db::timestamp_to_millis(message.created_at),
                ],
            )
            .map_err(into_message_err)?;

            // Recency bump commits together with the insert
            tx.execute(
                "UPDATE conversations SET last_activity_at = ?2
                 WHERE id = ?1 AND last_activity_at < ?2",
                params![
                    message.conversation_id.to_string(),
                    db::timestamp_to_millis(message.created_at),
                ],
            )
            .map_err(into_message_err)?;

            tx.commit().map_err(into_message_err)
        })
    }

    fn messages_for_conversation(
        &self,
        conversation_id: &ConversationId,
        page: Page,
    ) -> Result<Vec<Message>, MessageError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM messages WHERE conversation_id = ?
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ? OFFSET ?",
                )
                .map_err(into_message_err)?;

            let rows = stmt
                .query_map(
                    params![
                        conversation_id.to_string(),
                        page.limit as i64,
                        page.offset as i64
                    ],
                    db::row_to_message,
                )
                .map_err(into_message_err)?;

            let mut messages = rows
                .collect::<Result<Vec<_>, _>>()
                .map_err(into_message_err)?;
            // Pages are selected newest-first; rows within the page are
            // returned oldest-first
            messages.reverse();
            Ok(messages)
        })
    }

    fn last_message(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Message>, MessageError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM messages WHERE conversation_id = ?
                     ORDER BY created_at DESC, rowid DESC LIMIT 1",
                )
                .map_err(into_message_err)?;

            stmt.query_row(params![conversation_id.to_string()], db::row_to_message)
                .optional()
                .map_err(into_message_err)
        })
    }

    fn unread_message_count(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<u64, MessageError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT COUNT(*) FROM messages
                     WHERE conversation_id = ? AND sender_id != ? AND is_read = 0",
                )
                .map_err(into_message_err)?;

            stmt.query_row(
                params![conversation_id.to_string(), user_id.to_string()],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count as u64)
            .map_err(into_message_err)
        })
    }
}
