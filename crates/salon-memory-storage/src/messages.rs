//! Memory-based implementation of the MessageStorage trait

use salon_storage_traits::messages::MessageStorage;
use salon_storage_traits::messages::error::MessageError;
use salon_storage_traits::messages::types::Message;
use salon_storage_traits::{ConversationId, Page, UserId};

use crate::SalonMemoryStorage;

impl MessageStorage for SalonMemoryStorage {
    fn save_message(&self, message: Message) -> Result<(), MessageError> {
        let mut inner = self.inner.write();

        // Verify the owning conversation exists and bump its recency in the
        // same lock scope as the insert, so there is no window in which the
        // message exists but the conversation ordering is stale.
        let conversation = inner
            .conversations
            .get_mut(&message.conversation_id)
            .ok_or_else(|| MessageError::InvalidParameters("Conversation not found".to_string()))?;
        if conversation.last_activity_at < message.created_at {
            conversation.last_activity_at = message.created_at;
        }

        inner
            .messages
            .entry(message.conversation_id)
            .or_default()
            .push(message);

        Ok(())
    }

    fn messages_for_conversation(
        &self,
        conversation_id: &ConversationId,
        page: Page,
    ) -> Result<Vec<Message>, MessageError> {
        let inner = self.inner.read();
        let Some(messages) = inner.messages.get(conversation_id) else {
            return Ok(Vec::new());
        };

        // Pages count from the newest end; rows within a page stay in
        // insertion order (oldest first).
        let total = messages.len();
        let end = total.saturating_sub(page.offset);
        let start = end.saturating_sub(page.limit);
        Ok(messages[start..end].to_vec())
    }

    fn last_message(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Message>, MessageError> {
        let inner = self.inner.read();
        Ok(inner
            .messages
            .get(conversation_id)
            .and_then(|messages| messages.last().cloned()))
    }

    fn unread_message_count(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<u64, MessageError> {
        let inner = self.inner.read();
        let count = inner
            .messages
            .get(conversation_id)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|message| message.sender_id != *user_id && !message.is_read)
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use salon_storage_traits::conversations::ConversationStorage;
    use salon_storage_traits::conversations::types::Conversation;
    use salon_storage_traits::messages::types::MessageKind;

    use super::*;

    fn create_test_conversation(storage: &SalonMemoryStorage) -> (ConversationId, UserId, UserId) {
        let a = UserId::new();
        let b = UserId::new();
        let conversation = storage
            .find_or_create_direct_conversation(Conversation::direct(Utc::now()), &a, &b)
            .unwrap();
        (conversation.id, a, b)
    }

    fn create_test_message(
        conversation_id: ConversationId,
        sender_id: UserId,
        content: &str,
    ) -> Message {
        Message::new(
            conversation_id,
            sender_id,
            None,
            content.to_string(),
            MessageKind::Text,
            Utc::now(),
        )
    }

    #[test]
    fn test_save_message_requires_conversation() {
        let storage = SalonMemoryStorage::new();
        let message = create_test_message(ConversationId::new(), UserId::new(), "orphan");
        let result = storage.save_message(message);
        assert!(matches!(result, Err(MessageError::InvalidParameters(_))));
    }

    #[test]
    fn test_save_message_bumps_conversation_recency() {
        let storage = SalonMemoryStorage::new();
        let (conversation_id, a, _) = create_test_conversation(&storage);

        let before = storage
            .find_conversation(&conversation_id)
            .unwrap()
            .unwrap()
            .last_activity_at;

        let mut message = create_test_message(conversation_id, a, "bump");
        message.created_at = before + chrono::Duration::seconds(30);
        storage.save_message(message.clone()).unwrap();

        let after = storage
            .find_conversation(&conversation_id)
            .unwrap()
            .unwrap()
            .last_activity_at;
        assert_eq!(after, message.created_at);
    }

    #[test]
    fn test_messages_keep_insertion_order() {
        let storage = SalonMemoryStorage::new();
        let (conversation_id, a, b) = create_test_conversation(&storage);

        for (sender, content) in [(a, "one"), (b, "two"), (a, "three")] {
            storage
                .save_message(create_test_message(conversation_id, sender, content))
                .unwrap();
        }

        let messages = storage
            .messages_for_conversation(&conversation_id, Page::first(50))
            .unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);

        assert_eq!(
            storage
                .last_message(&conversation_id)
                .unwrap()
                .unwrap()
                .content,
            "three"
        );
    }

    #[test]
    fn test_pages_count_from_newest_end() {
        let storage = SalonMemoryStorage::new();
        let (conversation_id, a, _) = create_test_conversation(&storage);

        for i in 0..5 {
            storage
                .save_message(create_test_message(
                    conversation_id,
                    a,
                    &format!("message {}", i),
                ))
                .unwrap();
        }

        let newest_page = storage
            .messages_for_conversation(&conversation_id, Page::new(2, 0))
            .unwrap();
        let contents: Vec<&str> = newest_page.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["message 3", "message 4"]);

        let older_page = storage
            .messages_for_conversation(&conversation_id, Page::new(2, 2))
            .unwrap();
        let contents: Vec<&str> = older_page.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["message 1", "message 2"]);

        // Running past the oldest message yields a short (or empty) page
        let past_the_end = storage
            .messages_for_conversation(&conversation_id, Page::new(2, 4))
            .unwrap();
        assert_eq!(past_the_end.len(), 1);
    }

    #[test]
    fn test_unread_count_is_derived_and_reader_scoped() {
        let storage = SalonMemoryStorage::new();
        let (conversation_id, a, b) = create_test_conversation(&storage);

        for content in ["one", "two", "three"] {
            storage
                .save_message(create_test_message(conversation_id, a, content))
                .unwrap();
        }

        // All three are unread for the receiver, none for the sender
        assert_eq!(
            storage.unread_message_count(&conversation_id, &b).unwrap(),
            3
        );
        assert_eq!(
            storage.unread_message_count(&conversation_id, &a).unwrap(),
            0
        );

        let transitioned = storage
            .mark_conversation_read(&conversation_id, &b, Utc::now())
            .unwrap();
        assert_eq!(transitioned, 3);
        assert_eq!(
            storage.unread_message_count(&conversation_id, &b).unwrap(),
            0
        );

        // Marking again is a no-op
        let transitioned = storage
            .mark_conversation_read(&conversation_id, &b, Utc::now())
            .unwrap();
        assert_eq!(transitioned, 0);

        let messages = storage
            .messages_for_conversation(&conversation_id, Page::first(10))
            .unwrap();
        assert!(messages.iter().all(|message| message.is_read));
    }
}
