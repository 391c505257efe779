//! Database utilities for SQLite storage.

use std::io::{Error as IoError, ErrorKind};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Error, Result as SqliteResult, Row};
use salon_storage_traits::conversations::types::{Conversation, Participant};
use salon_storage_traits::messages::types::{Message, MessageKind};
use salon_storage_traits::notifications::types::{Notification, NotificationPayload};
use salon_storage_traits::users::types::{User, UserRole};
use salon_storage_traits::{ConversationId, MessageId, NotificationId, UserId};

#[inline]
fn map_to_text_boxed_error<T>(e: T) -> Error
where
    T: std::error::Error + Send + Sync + 'static,
{
    Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
}

#[inline]
fn map_invalid_text_data(msg: &str) -> Error {
    Error::FromSqlConversionFailure(
        0,
        Type::Text,
        Box::new(IoError::new(ErrorKind::InvalidData, msg)),
    )
}

#[inline]
fn map_invalid_integer_data(msg: &str) -> Error {
    Error::FromSqlConversionFailure(
        0,
        Type::Integer,
        Box::new(IoError::new(ErrorKind::InvalidData, msg)),
    )
}

/// Parse a TEXT column into one of the uuid id newtypes
fn parse_id<T>(value: &str, what: &str) -> SqliteResult<T>
where
    T: FromStr,
{
    value
        .parse::<T>()
        .map_err(|_| map_invalid_text_data(&format!("Invalid {}", what)))
}

/// Timestamps are stored as unix milliseconds
pub fn timestamp_to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Inverse of [`timestamp_to_millis`]
pub fn millis_to_timestamp(millis: i64) -> SqliteResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| map_invalid_integer_data("Timestamp out of range"))
}

/// Convert a row to a User struct
pub fn row_to_user(row: &Row) -> SqliteResult<User> {
    let id: UserId = parse_id(row.get_ref("id")?.as_str()?, "user ID")?;
    let email: String = row.get("email")?;
    let name: String = row.get("name")?;
    let role: UserRole = UserRole::from_str(row.get_ref("role")?.as_str()?)
        .map_err(|_| map_invalid_text_data("Invalid user role"))?;

    Ok(User {
        id,
        email,
        name,
        role,
    })
}

/// Convert a row to a Conversation struct
pub fn row_to_conversation(row: &Row) -> SqliteResult<Conversation> {
    let id: ConversationId = parse_id(row.get_ref("id")?.as_str()?, "conversation ID")?;
    let title: Option<String> = row.get("title")?;
    let is_group: bool = row.get("is_group")?;
    let created_at = millis_to_timestamp(row.get("created_at")?)?;
    let last_activity_at = millis_to_timestamp(row.get("last_activity_at")?)?;

    Ok(Conversation {
        id,
        title,
        is_group,
        created_at,
        last_activity_at,
    })
}

/// Convert a row to a Participant struct
pub fn row_to_participant(row: &Row) -> SqliteResult<Participant> {
    let conversation_id: ConversationId =
        parse_id(row.get_ref("conversation_id")?.as_str()?, "conversation ID")?;
    let user_id: UserId = parse_id(row.get_ref("user_id")?.as_str()?, "user ID")?;
    let last_read_at: Option<DateTime<Utc>> = row
        .get::<_, Option<i64>>("last_read_at")?
        .map(millis_to_timestamp)
        .transpose()?;

    Ok(Participant {
        conversation_id,
        user_id,
        last_read_at,
    })
}

/// Convert a row to a Message struct
pub fn row_to_message(row: &Row) -> SqliteResult<Message> {
    let id: MessageId = parse_id(row.get_ref("id")?.as_str()?, "message ID")?;
    let conversation_id: ConversationId =
        parse_id(row.get_ref("conversation_id")?.as_str()?, "conversation ID")?;
    let sender_id: UserId = parse_id(row.get_ref("sender_id")?.as_str()?, "sender ID")?;
    let receiver_id: Option<UserId> = row
        .get_ref("receiver_id")?
        .as_str_or_null()?
        .map(|value| parse_id(value, "receiver ID"))
        .transpose()?;
    let content: String = row.get("content")?;
    let kind: MessageKind = MessageKind::from_str(row.get_ref("kind")?.as_str()?)
        .map_err(|_| map_invalid_text_data("Invalid message kind"))?;
    let is_read: bool = row.get("is_read")?;
    let created_at = millis_to_timestamp(row.get("created_at")?)?;

    Ok(Message {
        id,
        conversation_id,
        sender_id,
        receiver_id,
        content,
        kind,
        is_read,
        created_at,
    })
}

/// Convert a row to a Notification struct.
///
/// The payload column is authoritative; the kind column exists for
/// filtering and is re-derived from the payload tag on load.
pub fn row_to_notification(row: &Row) -> SqliteResult<Notification> {
    let id: NotificationId = parse_id(row.get_ref("id")?.as_str()?, "notification ID")?;
    let user_id: UserId = parse_id(row.get_ref("user_id")?.as_str()?, "user ID")?;
    let title: String = row.get("title")?;
    let body: String = row.get("body")?;
    let payload_json: &str = row.get_ref("payload")?.as_str()?;
    let payload: NotificationPayload =
        serde_json::from_str(payload_json).map_err(map_to_text_boxed_error)?;
    let is_read: bool = row.get("is_read")?;
    let created_at = millis_to_timestamp(row.get("created_at")?)?;

    Ok(Notification {
        id,
        user_id,
        title,
        body,
        kind: payload.kind(),
        payload,
        is_read,
        created_at,
    })
}
