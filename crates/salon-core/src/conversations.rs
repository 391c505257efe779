//! Conversation resolution and the view-driven read path.
//!
//! Resolution maps a send intent — an explicit conversation id or a bare
//! receiver id — onto a stored conversation, authorizing the former and
//! find-or-creating the latter so a pair of users can never end up with two
//! direct threads. The read path is where read-state changes: fetching a
//! conversation's messages marks everything authored by others as read and
//! advances the caller's last-read timestamp, atomically in storage.

use chrono::Utc;
use salon_storage_traits::conversations::ConversationStorage;
use salon_storage_traits::conversations::types::Conversation;
use salon_storage_traits::messages::MessageStorage;
use salon_storage_traits::messages::types::Message;
use salon_storage_traits::users::UserStorage;
use salon_storage_traits::users::types::User;
use salon_storage_traits::{ConversationId, Page, SalonStorageProvider, UserId};

use crate::Salon;
use crate::error::Error;

/// Where a message send is aimed: an existing conversation, or a bare
/// receiver for a 1:1 thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTarget {
    /// An existing conversation the sender claims membership of
    Conversation(ConversationId),
    /// A direct thread with this user, resolved or created on demand
    Direct(UserId),
}

/// Summary of one conversation for a user's inbox listing: the other
/// participants, the latest message, and the derived unread count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationOverview {
    /// The conversation itself
    pub conversation: Conversation,
    /// Every participant except the requesting user
    pub participants: Vec<User>,
    /// The most recent message, if any
    pub last_message: Option<Message>,
    /// Unread messages authored by others
    pub unread_count: u64,
}

impl<Storage> Salon<Storage>
where
    Storage: SalonStorageProvider,
{
    /// Resolves a send target to a stored conversation.
    ///
    /// An explicit conversation id fails with [`Error::NotFound`] when the
    /// conversation does not exist and [`Error::NotAuthorized`] when the
    /// sender is not a participant. A bare receiver reuses the existing
    /// direct thread for the pair or creates one; repeated calls for the
    /// same pair always return the same conversation, including under
    /// concurrent first sends.
    pub fn resolve_conversation(
        &self,
        sender_id: UserId,
        target: SendTarget,
    ) -> Result<Conversation, Error> {
        match target {
            SendTarget::Conversation(conversation_id) => {
                let conversation = self
                    .storage()
                    .find_conversation(&conversation_id)?
                    .ok_or_else(|| Error::NotFound(format!("conversation {conversation_id}")))?;
                if !self.storage().is_participant(&conversation_id, &sender_id)? {
                    return Err(Error::NotAuthorized(
                        "not a participant of this conversation".to_string(),
                    ));
                }
                Ok(conversation)
            }
            SendTarget::Direct(receiver_id) => {
                if receiver_id == sender_id {
                    return Err(Error::Validation(
                        "cannot open a direct conversation with yourself".to_string(),
                    ));
                }
                if self.storage().find_user(&receiver_id)?.is_none() {
                    return Err(Error::NotFound(format!("user {receiver_id}")));
                }

                let candidate = Conversation::direct(Utc::now());
                Ok(self.storage().find_or_create_direct_conversation(
                    candidate,
                    &sender_id,
                    &receiver_id,
                )?)
            }
        }
    }

    /// Creates a group conversation.
    ///
    /// The creator is always a participant, duplicate ids are collapsed,
    /// and every participant must be a stored user.
    pub fn create_group_conversation(
        &self,
        creator: UserId,
        title: Option<String>,
        participant_ids: &[UserId],
    ) -> Result<Conversation, Error> {
        if participant_ids.is_empty() {
            return Err(Error::Validation(
                "at least one participant is required".to_string(),
            ));
        }

        let mut members = vec![creator];
        for id in participant_ids {
            if !members.contains(id) {
                members.push(*id);
            }
        }
        for id in &members {
            if self.storage().find_user(id)?.is_none() {
                return Err(Error::NotFound(format!("user {id}")));
            }
        }

        let conversation = Conversation::group(title, Utc::now());
        self.storage()
            .create_conversation(conversation.clone(), &members)?;
        Ok(conversation)
    }

    /// The user's conversations, most recent activity first, with the
    /// other participants' profiles, the latest message, and the derived
    /// unread count.
    pub fn conversation_overviews(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationOverview>, Error> {
        let conversations = self.storage().conversations_for_user(&user_id)?;
        let mut overviews = Vec::with_capacity(conversations.len());

        for conversation in conversations {
            let mut participants = Vec::new();
            for link in self.storage().participants(&conversation.id)? {
                if link.user_id == user_id {
                    continue;
                }
                // A participant whose account row is gone is simply omitted
                if let Some(user) = self.storage().find_user(&link.user_id)? {
                    participants.push(user);
                }
            }

            let last_message = self.storage().last_message(&conversation.id)?;
            let unread_count = self
                .storage()
                .unread_message_count(&conversation.id, &user_id)?;

            overviews.push(ConversationOverview {
                conversation,
                participants,
                last_message,
                unread_count,
            });
        }

        Ok(overviews)
    }

    /// Fetches a page of a conversation's messages as `user_id`, marking
    /// every unread message authored by others as read and advancing the
    /// caller's last-read timestamp.
    ///
    /// The returned page reflects the flags as stored at fetch time; the
    /// mark-read transition itself is a single atomic storage operation, so
    /// concurrent fetches by the same user converge without double-counting.
    /// Fails with [`Error::NotFound`] for an unknown conversation and
    /// [`Error::NotAuthorized`] for a non-participant.
    pub fn fetch_messages(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
        page: Option<Page>,
    ) -> Result<Vec<Message>, Error> {
        if self.storage().find_conversation(&conversation_id)?.is_none() {
            return Err(Error::NotFound(format!("conversation {conversation_id}")));
        }
        if !self.storage().is_participant(&conversation_id, &user_id)? {
            return Err(Error::NotAuthorized(
                "not a participant of this conversation".to_string(),
            ));
        }

        let page = page.unwrap_or(Page::first(self.config().message_page_size));
        let messages = self
            .storage()
            .messages_for_conversation(&conversation_id, page)?;

        self.storage()
            .mark_conversation_read(&conversation_id, &user_id, Utc::now())?;

        Ok(messages)
    }
}
