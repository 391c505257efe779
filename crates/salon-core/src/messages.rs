//! The message write path.
//!
//! Sending validates the request, resolves the conversation, persists the
//! message (which bumps the conversation's recency in the same storage
//! transaction), and only then fans out to live subscribers. Fan-out is
//! best-effort: a dropped channel is logged and pruned, and the caller's
//! result is decided entirely by persistence. Read-state is never touched
//! here; see the view-driven read path on the conversations module.

use chrono::Utc;
use salon_storage_traits::messages::MessageStorage;
use salon_storage_traits::messages::types::{Message, MessageKind};
use salon_storage_traits::users::UserStorage;
use salon_storage_traits::{ConversationId, SalonStorageProvider, UserId};
use tracing::debug;

use crate::Salon;
use crate::conversations::SendTarget;
use crate::error::Error;
use crate::live::{LiveEvent, SenderProfile};

/// A send-message request as it arrives from the boundary layer.
///
/// Exactly one of `conversation_id` and `receiver_id` must be set; the
/// request carries both as options so the boundary can deserialize
/// whatever the client posted and let [`SendMessageRequest::target`] rule
/// on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    /// Target conversation, for sends into an existing thread
    pub conversation_id: Option<ConversationId>,
    /// Target user, for direct sends that resolve their own thread
    pub receiver_id: Option<UserId>,
    /// The message body
    pub content: String,
    /// The kind of content
    pub kind: MessageKind,
}

impl SendMessageRequest {
    /// A text send into an existing conversation.
    pub fn to_conversation(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id),
            receiver_id: None,
            content: content.into(),
            kind: MessageKind::Text,
        }
    }

    /// A direct text send to a user.
    pub fn to_receiver(receiver_id: UserId, content: impl Into<String>) -> Self {
        Self {
            conversation_id: None,
            receiver_id: Some(receiver_id),
            content: content.into(),
            kind: MessageKind::Text,
        }
    }

    /// Replaces the message kind.
    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// The validated send target: exactly one of the two addressing fields
    /// must be present.
    pub fn target(&self) -> Result<SendTarget, Error> {
        match (self.conversation_id, self.receiver_id) {
            (Some(conversation_id), None) => Ok(SendTarget::Conversation(conversation_id)),
            (None, Some(receiver_id)) => Ok(SendTarget::Direct(receiver_id)),
            _ => Err(Error::Validation(
                "exactly one of conversation_id and receiver_id must be set".to_string(),
            )),
        }
    }
}

impl<Storage> Salon<Storage>
where
    Storage: SalonStorageProvider,
{
    /// Sends a message.
    ///
    /// On success the message is durably stored and the conversation's
    /// recency is bumped; the `new_message` room fan-out and, for direct
    /// sends, the `message_notification` personal-channel ping have been
    /// attempted against every currently subscribed connection. Live
    /// delivery failures never fail the send; offline recipients read the
    /// message from the store on their next fetch.
    pub fn send_message(
        &self,
        sender_id: UserId,
        request: SendMessageRequest,
    ) -> Result<Message, Error> {
        if request.content.trim().is_empty() {
            return Err(Error::Validation(
                "message content must not be empty".to_string(),
            ));
        }
        if request.content.len() > self.config().max_message_length {
            return Err(Error::Validation(format!(
                "message content exceeds {} bytes",
                self.config().max_message_length
            )));
        }
        let target = request.target()?;

        let sender = self
            .storage()
            .find_user(&sender_id)?
            .ok_or_else(|| Error::NotFound(format!("user {sender_id}")))?;

        let conversation = self.resolve_conversation(sender_id, target)?;

        let message = Message::new(
            conversation.id,
            sender_id,
            request.receiver_id,
            request.content,
            request.kind,
            Utc::now(),
        );
        self.storage().save_message(message.clone())?;

        let profile = SenderProfile {
            id: sender.id,
            name: sender.name,
        };

        // Best-effort fan-out, persistence already succeeded. The sender's
        // own subscribed connections receive the room event too.
        let delivered = self.presence().publish_to_room(
            &message.conversation_id,
            &LiveEvent::NewMessage {
                message: message.clone(),
                sender: profile.clone(),
            },
            None,
        );
        debug!(
            message_id = %message.id,
            conversation_id = %message.conversation_id,
            delivered,
            "Message fanned out"
        );

        if let Some(receiver_id) = message.receiver_id {
            self.presence().publish_to_user(
                &receiver_id,
                &LiveEvent::MessageNotification {
                    conversation_id: message.conversation_id,
                    sender: profile,
                    content: message.content.clone(),
                },
            );
        }

        Ok(message)
    }
}
