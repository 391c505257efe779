//! Memory-based implementation of the ConversationStorage trait

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use salon_storage_traits::conversations::ConversationStorage;
use salon_storage_traits::conversations::error::ConversationError;
use salon_storage_traits::conversations::types::{Conversation, Participant, direct_pair_key};
use salon_storage_traits::{ConversationId, UserId};

use crate::{SalonMemoryStorage, SalonMemoryStorageInner};

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

fn insert_conversation(
    inner: &mut SalonMemoryStorageInner,
    conversation: Conversation,
    participant_ids: &[UserId],
) {
    let conversation_id = conversation.id;
    let links = participant_ids
        .iter()
        .map(|user_id| Participant {
            conversation_id,
            user_id: *user_id,
            last_read_at: None,
        })
        .collect();
    inner.participants.insert(conversation_id, links);
    inner.conversations.insert(conversation_id, conversation);
}

impl ConversationStorage for SalonMemoryStorage {
    fn create_conversation(
        &self,
        conversation: Conversation,
        participant_ids: &[UserId],
    ) -> Result<(), ConversationError> {
        validate_participants(&conversation, participant_ids)?;

        let mut inner = self.inner.write();
        if inner.conversations.contains_key(&conversation.id) {
            return Err(ConversationError::InvalidParameters(
                "Conversation already exists".to_string(),
            ));
        }

        // A direct conversation created through the generic path still
        // participates in the pair uniqueness guard.
        if !conversation.is_group {
            let key = direct_pair_key(&participant_ids[0], &participant_ids[1]);
            if inner.direct_pairs.contains_key(&key) {
                return Err(ConversationError::InvalidParameters(
                    "A direct conversation for this pair already exists".to_string(),
                ));
            }
            inner.direct_pairs.insert(key, conversation.id);
        }

        insert_conversation(&mut inner, conversation, participant_ids);
        Ok(())
    }

    fn find_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Conversation>, ConversationError> {
        let inner = self.inner.read();
        Ok(inner.conversations.get(conversation_id).cloned())
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

        let key = direct_pair_key(a, b);

        // Check and insert under one write guard so concurrent first sends
        // for the same pair converge on a single conversation.
        let mut inner = self.inner.write();
        if let Some(existing_id) = inner.direct_pairs.get(&key) {
            return inner
                .conversations
                .get(existing_id)
                .cloned()
                .ok_or_else(|| {
                    ConversationError::DatabaseError(
                        "Pair index points at a missing conversation".to_string(),
                    )
                });
        }

        inner.direct_pairs.insert(key, candidate.id);
        insert_conversation(&mut inner, candidate.clone(), &[*a, *b]);
        Ok(candidate)
    }

    fn conversations_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Conversation>, ConversationError> {
        let inner = self.inner.read();
        let mut conversations: Vec<Conversation> = inner
            .participants
            .iter()
            .filter(|(_, links)| links.iter().any(|link| link.user_id == *user_id))
            .filter_map(|(conversation_id, _)| inner.conversations.get(conversation_id).cloned())
            .collect();
        conversations.sort_by(|a, b| {
            b.last_activity_at
                .cmp(&a.last_activity_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(conversations)
    }

    fn participants(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Participant>, ConversationError> {
        let inner = self.inner.read();
        Ok(inner
            .participants
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    fn is_participant(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<bool, ConversationError> {
        let inner = self.inner.read();
        Ok(inner
            .participants
            .get(conversation_id)
            .is_some_and(|links| links.iter().any(|link| link.user_id == *user_id)))
    }

    fn mark_conversation_read(
        &self,
        conversation_id: &ConversationId,
        reader: &UserId,
        at: DateTime<Utc>,
    ) -> Result<usize, ConversationError> {
        let mut inner = self.inner.write();

        let link = inner
            .participants
            .get_mut(conversation_id)
            .and_then(|links| links.iter_mut().find(|link| link.user_id == *reader))
            .ok_or(ConversationError::NotFound)?;

        // Monotonically non-decreasing last-read timestamp
        if link.last_read_at.is_none_or(|previous| previous < at) {
            link.last_read_at = Some(at);
        }

        let mut transitioned = 0;
        if let Some(messages) = inner.messages.get_mut(conversation_id) {
            for message in messages.iter_mut() {
                if message.sender_id != *reader && !message.is_read {
                    message.is_read = true;
                    transitioned += 1;
                }
            }
        }

        Ok(transitioned)
    }
}
