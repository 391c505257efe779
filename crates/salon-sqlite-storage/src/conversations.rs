//! Implementation of ConversationStorage trait for SQLite storage.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use salon_storage_traits::conversations::ConversationStorage;
use salon_storage_traits::conversations::error::ConversationError;
use salon_storage_traits::conversations::types::{Conversation, Participant, direct_pair_key};
use salon_storage_traits::{ConversationId, UserId};

use crate::{SalonSqliteStorage, db};

#[inline]
fn into_conversation_err<T>(e: T) -> ConversationError
where
    T: std::error::Error,
{
    ConversationError::DatabaseError(e.to_string())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn insert_conversation_row(
    tx: &Transaction<'_>,
    conversation: &Conversation,
    pair_key: Option<&str>,
) -> Result<(), rusqlite::Error> {
    tx.execute(
        "INSERT INTO conversations (id, title, is_group, pair_key, created_at, last_activity_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            conversation.id.to_string(),
            &conversation.title,
            conversation.is_group,
            pair_key,
            db::timestamp_to_millis(conversation.created_at),
            db::timestamp_to_millis(conversation.last_activity_at),
        ],
    )?;
    Ok(())
}

fn insert_participant_rows(
    tx: &Transaction<'_>,
    conversation_id: &ConversationId,
    participant_ids: &[UserId],
) -> Result<(), rusqlite::Error> {
    let mut stmt = tx.prepare(
        "INSERT INTO participants (conversation_id, user_id, last_read_at) VALUES (?, ?, NULL)",
    )?;
    for user_id in participant_ids {
        stmt.execute(params![conversation_id.to_string(), user_id.to_string()])?;
    }
    Ok(())
}

fn select_direct_by_pair_key(
    conn: &Connection,
    pair_key: &str,
) -> Result<Option<Conversation>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT * FROM conversations WHERE pair_key = ?")?;
    stmt.query_row(params![pair_key], db::row_to_conversation)
        .optional()
}

fn validate_participants(
    conversation: &Conversation,
    participant_ids: &[UserId],
) -> Result<(), ConversationError> {
    let distinct: HashSet<&UserId> = participant_ids.iter().collect();
    if distinct.len() != participant_ids.len() {
        return Err(ConversationError::InvalidParameters(
            "Duplicate participant".to_string(),
        ));
    }
    if participant_ids.is_empty() {
        return Err(ConversationError::InvalidParameters(
            "At least one participant required".to_string(),
        ));
    }
    if !conversation.is_group && participant_ids.len() != 2 {
        return Err(ConversationError::InvalidParameters(
            "A direct conversation requires exactly two participants".to_string(),
        ));
    }
    Ok(())
}

impl ConversationStorage for SalonSqliteStorage {
    fn create_conversation(
        &self,
        conversation: Conversation,
        participant_ids: &[UserId],
    ) -> Result<(), ConversationError> {
        validate_participants(&conversation, participant_ids)?;

        let pair_key = (!conversation.is_group)
            .then(|| direct_pair_key(&participant_ids[0], &participant_ids[1]));

        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction().map_err(into_conversation_err)?;

            insert_conversation_row(&tx, &conversation, pair_key.as_deref()).map_err(|e| {
                if is_unique_violation(&e) {
                    ConversationError::InvalidParameters(
                        "Conversation or direct pair already exists".to_string(),
                    )
                } else {
                    into_conversation_err(e)
                }
            })?;
            insert_participant_rows(&tx, &conversation.id, participant_ids)
                .map_err(into_conversation_err)?;

            tx.commit().map_err(into_conversation_err)
        })
    }

    fn find_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Conversation>, ConversationError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM conversations WHERE id = ?")
                .map_err(into_conversation_err)?;

            stmt.query_row(
                params![conversation_id.to_string()],
                db::row_to_conversation,
            )
            .optional()
            .map_err(into_conversation_err)
        })
    }

    fn find_or_create_direct_conversation(
        &self,
        candidate: Conversation,
        a: &UserId,
        b: &UserId,
    ) -> Result<Conversation, ConversationError> {
        if candidate.is_group {
            return Err(ConversationError::InvalidParameters(
                "Candidate must be a direct conversation".to_string(),
            ));
        }
        if a == b {
            return Err(ConversationError::InvalidParameters(
                "A direct conversation requires two distinct users".to_string(),
            ));
        }

        let pair_key = direct_pair_key(a, b);

        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction().map_err(into_conversation_err)?;

            if let Some(existing) =
                select_direct_by_pair_key(&tx, &pair_key).map_err(into_conversation_err)?
            {
                return Ok(existing);
            }

            match insert_conversation_row(&tx, &candidate, Some(&pair_key)) {
                Ok(()) => {}
                // Another process won the race; the UNIQUE pair key makes
                // the loser re-read the winner's row.
                Err(e) if is_unique_violation(&e) => {
                    drop(tx);
                    return select_direct_by_pair_key(conn, &pair_key)
                        .map_err(into_conversation_err)?
                        .ok_or_else(|| {
                            ConversationError::DatabaseError(
                                "Pair key conflicted but no row found".to_string(),
                            )
                        });
                }
                Err(e) => return Err(into_conversation_err(e)),
            }

            insert_participant_rows(&tx, &candidate.id, &[*a, *b])
                .map_err(into_conversation_err)?;
            tx.commit().map_err(into_conversation_err)?;

            Ok(candidate)
        })
    }

    fn conversations_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Conversation>, ConversationError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT c.* FROM conversations c
                     JOIN participants p ON p.conversation_id = c.id
                     WHERE p.user_id = ?
                     ORDER BY c.last_activity_at DESC, c.created_at DESC",
                )
                .map_err(into_conversation_err)?;

            let rows = stmt
                .query_map(params![user_id.to_string()], db::row_to_conversation)
                .map_err(into_conversation_err)?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(into_conversation_err)
        })
    }

    fn participants(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Participant>, ConversationError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM participants WHERE conversation_id = ? ORDER BY rowid",
                )
                .map_err(into_conversation_err)?;

            let rows = stmt
                .query_map(params![conversation_id.to_string()], db::row_to_participant)
                .map_err(into_conversation_err)?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(into_conversation_err)
        })
    }

    fn is_participant(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<bool, ConversationError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT 1 FROM participants WHERE conversation_id = ? AND user_id = ?")
                .map_err(into_conversation_err)?;

            stmt.exists(params![conversation_id.to_string(), user_id.to_string()])
                .map_err(into_conversation_err)
        })
    }

    fn mark_conversation_read(
        &self,
        conversation_id: &ConversationId,
        reader: &UserId,
        at: DateTime<Utc>,
    ) -> Result<usize, ConversationError> {
        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction().map_err(into_conversation_err)?;

            let is_member = tx
                .prepare("SELECT 1 FROM participants WHERE conversation_id = ? AND user_id = ?")
                .and_then(|mut stmt| {
                    stmt.exists(params![conversation_id.to_string(), reader.to_string()])
                })
                .map_err(into_conversation_err)?;
            if !is_member {
                return Err(ConversationError::NotFound);
            }

            let transitioned = tx
                .execute(
                    "UPDATE messages SET is_read = 1
                     WHERE conversation_id = ? AND sender_id != ? AND is_read = 0",
                    params![conversation_id.to_string(), reader.to_string()],
                )
                .map_err(into_conversation_err)?;

            // last_read_at only ever moves forward
            tx.execute(
                "UPDATE participants SET last_read_at = ?3
                 WHERE conversation_id = ?1 AND user_id = ?2
                   AND (last_read_at IS NULL OR last_read_at < ?3)",
                params![
                    conversation_id.to_string(),
                    reader.to_string(),
                    db::timestamp_to_millis(at),
                ],
            )
            .map_err(into_conversation_err)?;

            tx.commit().map_err(into_conversation_err)?;
            Ok(transitioned)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_or_create_is_idempotent_per_pair() {
        let storage = SalonSqliteStorage::new_in_memory().unwrap();
        let a = UserId::new();
        let b = UserId::new();

        let first = storage
            .find_or_create_direct_conversation(Conversation::direct(Utc::now()), &a, &b)
            .unwrap();
        let second = storage
            .find_or_create_direct_conversation(Conversation::direct(Utc::now()), &b, &a)
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(storage.conversations_for_user(&a).unwrap().len(), 1);
    }

    #[test]
    fn test_unique_pair_key_rejects_second_direct_creation() {
        let storage = SalonSqliteStorage::new_in_memory().unwrap();
        let a = UserId::new();
        let b = UserId::new();

        storage
            .create_conversation(Conversation::direct(Utc::now()), &[a, b])
            .unwrap();
        let result = storage.create_conversation(Conversation::direct(Utc::now()), &[b, a]);
        assert!(matches!(
            result,
            Err(ConversationError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_group_conversations_have_no_pair_key() {
        let storage = SalonSqliteStorage::new_in_memory().unwrap();
        let members_one = [UserId::new(), UserId::new(), UserId::new()];
        let members_two = [UserId::new(), UserId::new()];

        // Several groups coexist; NULL pair keys do not collide
        storage
            .create_conversation(
                Conversation::group(Some("one".to_string()), Utc::now()),
                &members_one,
            )
            .unwrap();
        storage
            .create_conversation(
                Conversation::group(Some("two".to_string()), Utc::now()),
                &members_two,
            )
            .unwrap();
    }

    #[test]
    fn test_participants_in_join_order() {
        let storage = SalonSqliteStorage::new_in_memory().unwrap();
        let creator = UserId::new();
        let other = UserId::new();
        let conversation = Conversation::group(Some("Panel".to_string()), Utc::now());
        let conversation_id = conversation.id;

        storage
            .create_conversation(conversation, &[creator, other])
            .unwrap();

        let links = storage.participants(&conversation_id).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].user_id, creator);
        assert_eq!(links[1].user_id, other);

        assert!(storage.is_participant(&conversation_id, &creator).unwrap());
        assert!(
            !storage
                .is_participant(&conversation_id, &UserId::new())
                .unwrap()
        );
    }

    #[test]
    fn test_mark_read_requires_membership() {
        let storage = SalonSqliteStorage::new_in_memory().unwrap();
        let a = UserId::new();
        let b = UserId::new();
        let conversation = storage
            .find_or_create_direct_conversation(Conversation::direct(Utc::now()), &a, &b)
            .unwrap();

        let result = storage.mark_conversation_read(&conversation.id, &UserId::new(), Utc::now());
        assert!(matches!(result, Err(ConversationError::NotFound)));
    }

    #[test]
    fn test_last_read_at_never_goes_backwards() {
        let storage = SalonSqliteStorage::new_in_memory().unwrap();
        let a = UserId::new();
        let b = UserId::new();
        let conversation = storage
            .find_or_create_direct_conversation(Conversation::direct(Utc::now()), &a, &b)
            .unwrap();

        let later = Utc::now();
        let earlier = later - chrono::Duration::seconds(60);

        storage
            .mark_conversation_read(&conversation.id, &a, later)
            .unwrap();
        storage
            .mark_conversation_read(&conversation.id, &a, earlier)
            .unwrap();

        let links = storage.participants(&conversation.id).unwrap();
        let link = links.iter().find(|link| link.user_id == a).unwrap();
        assert_eq!(
            link.last_read_at.map(|at| at.timestamp_millis()),
            Some(later.timestamp_millis())
        );
    }
}
