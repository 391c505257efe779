//! Presence registry and live-channel lifecycle.
//!
//! The registry is the single in-process owner of "who is connected and
//! subscribed to what": one entry per live connection, one personal channel
//! per user (auto-subscribed at connect), and explicit per-conversation
//! rooms. It is created with the [`Salon`](crate::Salon) instance and
//! emptied as connections drop; nothing here survives a restart, clients
//! re-join their rooms after reconnecting.
//!
//! Fan-out is fire-and-forget. Publishing clones the target senders under a
//! read lock, releases the lock, then pushes; a send that fails marks the
//! connection dead and prunes it, and never surfaces to whoever triggered
//! the publish.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use salon_storage_traits::conversations::ConversationStorage;
use salon_storage_traits::{ConversationId, SalonStorageProvider, UserId};
use tracing::{debug, warn};

use crate::Salon;
use crate::directory::SessionIdentity;
use crate::error::Error;
use crate::live::{ClientCommand, LiveEvent, LiveSender};

/// Identifier of one live connection. Process-local and never reused
/// within a registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct Connection {
    identity: SessionIdentity,
    sender: LiveSender,
}

#[derive(Default)]
struct PresenceInner {
    connections: HashMap<ConnectionId, Connection>,
    /// Conversation rooms: explicit join/leave only
    rooms: HashMap<ConversationId, HashSet<ConnectionId>>,
    /// Personal channels: every connection of a user, subscribed at connect
    personal: HashMap<UserId, HashSet<ConnectionId>>,
}

/// Tracks which authenticated session is attached to which live connection
/// and which rooms each connection has joined.
#[derive(Default)]
pub struct PresenceRegistry {
    next_connection_id: AtomicU64,
    inner: RwLock<PresenceInner>,
}

impl fmt::Debug for PresenceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceRegistry")
            .field("connections", &self.connection_count())
            .finish()
    }
}

impl PresenceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, identity: SessionIdentity, sender: LiveSender) -> ConnectionId {
        let connection_id = ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        let mut inner = self.inner.write();
        inner
            .personal
            .entry(identity.user_id)
            .or_default()
            .insert(connection_id);
        inner
            .connections
            .insert(connection_id, Connection { identity, sender });
        connection_id
    }

    /// Removes the connection and garbage-collects all of its room
    /// memberships and its personal-channel entry.
    pub(crate) fn unregister(&self, connection_id: ConnectionId) {
        let mut inner = self.inner.write();
        let Some(connection) = inner.connections.remove(&connection_id) else {
            return;
        };

        let user_id = connection.identity.user_id;
        if let Some(channels) = inner.personal.get_mut(&user_id) {
            channels.remove(&connection_id);
            if channels.is_empty() {
                inner.personal.remove(&user_id);
            }
        }
        inner.rooms.retain(|_, members| {
            members.remove(&connection_id);
            !members.is_empty()
        });
    }

    pub(crate) fn identity(&self, connection_id: ConnectionId) -> Option<SessionIdentity> {
        let inner = self.inner.read();
        inner
            .connections
            .get(&connection_id)
            .map(|connection| connection.identity.clone())
    }

    pub(crate) fn join_room(&self, connection_id: ConnectionId, conversation_id: ConversationId) {
        let mut inner = self.inner.write();
        if !inner.connections.contains_key(&connection_id) {
            return;
        }
        inner
            .rooms
            .entry(conversation_id)
            .or_default()
            .insert(connection_id);
    }

    pub(crate) fn leave_room(&self, connection_id: ConnectionId, conversation_id: ConversationId) {
        let mut inner = self.inner.write();
        if let Some(members) = inner.rooms.get_mut(&conversation_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                inner.rooms.remove(&conversation_id);
            }
        }
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.inner.read().connections.len()
    }

    /// Number of connections currently subscribed to a conversation room.
    pub fn room_size(&self, conversation_id: &ConversationId) -> usize {
        self.inner
            .read()
            .rooms
            .get(conversation_id)
            .map_or(0, HashSet::len)
    }

    /// Whether the user has at least one live connection.
    pub fn is_connected(&self, user_id: &UserId) -> bool {
        self.inner.read().personal.contains_key(user_id)
    }

    /// Pushes an event to every connection in the conversation room,
    /// optionally excluding one connection (the originator of a typing
    /// indicator). Returns how many channels accepted the event.
    pub(crate) fn publish_to_room(
        &self,
        conversation_id: &ConversationId,
        event: &LiveEvent,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let targets = {
            let inner = self.inner.read();
            let Some(members) = inner.rooms.get(conversation_id) else {
                return 0;
            };
            members
                .iter()
                .filter(|id| Some(**id) != exclude)
                .filter_map(|id| {
                    inner
                        .connections
                        .get(id)
                        .map(|connection| (*id, connection.sender.clone()))
                })
                .collect::<Vec<_>>()
        };
        self.deliver(targets, event)
    }

    /// Pushes an event to every connection on the user's personal channel.
    /// Multi-device: all of the user's connections are targeted. Returns
    /// how many channels accepted the event.
    pub(crate) fn publish_to_user(&self, user_id: &UserId, event: &LiveEvent) -> usize {
        let targets = {
            let inner = self.inner.read();
            let Some(channels) = inner.personal.get(user_id) else {
                return 0;
            };
            channels
                .iter()
                .filter_map(|id| {
                    inner
                        .connections
                        .get(id)
                        .map(|connection| (*id, connection.sender.clone()))
                })
                .collect::<Vec<_>>()
        };
        self.deliver(targets, event)
    }

    fn deliver(&self, targets: Vec<(ConnectionId, LiveSender)>, event: &LiveEvent) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        for (connection_id, sender) in targets {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(connection_id);
            }
        }
        for connection_id in dead {
            warn!(%connection_id, "Live channel closed mid-delivery, pruning");
            self.unregister(connection_id);
        }
        delivered
    }
}

impl<Storage> Salon<Storage>
where
    Storage: SalonStorageProvider,
{
    /// Attaches a live channel.
    ///
    /// The credential must validate before anything is registered; on
    /// failure nothing is subscribed and the caller should close the
    /// transport. On success the connection is auto-subscribed to the
    /// user's personal channel and nothing else.
    pub fn connect(&self, credential: &str, sender: LiveSender) -> Result<ConnectionId, Error> {
        let identity = self
            .authenticator
            .authenticate(credential)
            .ok_or_else(|| Error::NotAuthorized("invalid credential".to_string()))?;

        debug!(user_id = %identity.user_id, "Live channel connected");
        Ok(self.presence.register(identity, sender))
    }

    /// Detaches a live channel, dropping all of its room memberships.
    /// Idempotent; unknown ids are ignored.
    pub fn disconnect(&self, connection_id: ConnectionId) {
        debug!(%connection_id, "Live channel disconnected");
        self.presence.unregister(connection_id);
    }

    /// Handles one inbound command from a connected client.
    pub fn handle_client_command(
        &self,
        connection_id: ConnectionId,
        command: ClientCommand,
    ) -> Result<(), Error> {
        let identity = self
            .presence
            .identity(connection_id)
            .ok_or_else(|| Error::NotAuthorized("unknown connection".to_string()))?;

        match command {
            ClientCommand::JoinConversation { conversation_id } => {
                self.presence.join_room(connection_id, conversation_id);
            }
            ClientCommand::LeaveConversation { conversation_id } => {
                self.presence.leave_room(connection_id, conversation_id);
            }
            ClientCommand::JoinAllConversations => {
                let conversations = self.storage.conversations_for_user(&identity.user_id)?;
                for conversation in conversations {
                    self.presence.join_room(connection_id, conversation.id);
                }
            }
            ClientCommand::TypingStart { conversation_id } => {
                // Typing indicators skip the originating connection; the
                // sender's other devices still receive them.
                self.presence.publish_to_room(
                    &conversation_id,
                    &LiveEvent::UserTyping {
                        conversation_id,
                        user_id: identity.user_id,
                        user_name: identity.name.clone(),
                    },
                    Some(connection_id),
                );
            }
            ClientCommand::TypingStop { conversation_id } => {
                self.presence.publish_to_room(
                    &conversation_id,
                    &LiveEvent::UserStoppedTyping {
                        conversation_id,
                        user_id: identity.user_id,
                    },
                    Some(connection_id),
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use salon_storage_traits::conversations::types::Conversation;
    use tokio::sync::mpsc;

    use super::*;
    use crate::test_util::{TestSalon, create_test_user};

    #[test]
    fn test_connect_rejects_invalid_credential() {
        let harness = TestSalon::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = harness.salon.connect("bogus-token", tx);
        assert!(matches!(result, Err(Error::NotAuthorized(_))));
        assert_eq!(harness.salon.presence().connection_count(), 0);
    }

    #[test]
    fn test_connect_subscribes_personal_channel_only() {
        let harness = TestSalon::new();
        let ada = create_test_user(&harness, "Ada");
        let (_conn, _rx) = harness.connect(&ada);

        assert_eq!(harness.salon.presence().connection_count(), 1);
        assert!(harness.salon.presence().is_connected(&ada));
    }

    #[test]
    fn test_disconnect_garbage_collects_rooms() {
        let harness = TestSalon::new();
        let ada = create_test_user(&harness, "Ada");
        let (connection_id, _rx) = harness.connect(&ada);

        let conversation_id = ConversationId::new();
        harness
            .salon
            .handle_client_command(
                connection_id,
                ClientCommand::JoinConversation { conversation_id },
            )
            .unwrap();
        assert_eq!(harness.salon.presence().room_size(&conversation_id), 1);

        harness.salon.disconnect(connection_id);
        assert_eq!(harness.salon.presence().room_size(&conversation_id), 0);
        assert!(!harness.salon.presence().is_connected(&ada));

        // Commands on a dead connection fail cleanly
        let result = harness.salon.handle_client_command(
            connection_id,
            ClientCommand::JoinConversation { conversation_id },
        );
        assert!(matches!(result, Err(Error::NotAuthorized(_))));
    }

    #[test]
    fn test_join_all_conversations_loads_from_storage() {
        let harness = TestSalon::new();
        let ada = create_test_user(&harness, "Ada");
        let bob = create_test_user(&harness, "Bob");

        let conversation = harness
            .salon
            .storage()
            .find_or_create_direct_conversation(
                Conversation::direct(chrono::Utc::now()),
                &ada,
                &bob,
            )
            .unwrap();

        let (connection_id, _rx) = harness.connect(&ada);
        assert_eq!(harness.salon.presence().room_size(&conversation.id), 0);

        harness
            .salon
            .handle_client_command(connection_id, ClientCommand::JoinAllConversations)
            .unwrap();
        assert_eq!(harness.salon.presence().room_size(&conversation.id), 1);
    }

    #[test]
    fn test_typing_skips_originating_connection() {
        let harness = TestSalon::new();
        let ada = create_test_user(&harness, "Ada");
        let bob = create_test_user(&harness, "Bob");

        let (ada_conn, mut ada_rx) = harness.connect(&ada);
        let (ada_other_conn, mut ada_other_rx) = harness.connect(&ada);
        let (bob_conn, mut bob_rx) = harness.connect(&bob);

        let conversation_id = ConversationId::new();
        for conn in [ada_conn, ada_other_conn, bob_conn] {
            harness
                .salon
                .handle_client_command(conn, ClientCommand::JoinConversation { conversation_id })
                .unwrap();
        }

        harness
            .salon
            .handle_client_command(ada_conn, ClientCommand::TypingStart { conversation_id })
            .unwrap();

        // The other subscribers see the indicator, the originator does not
        assert!(matches!(
            bob_rx.try_recv().unwrap(),
            LiveEvent::UserTyping { user_id, .. } if user_id == ada
        ));
        assert!(matches!(
            ada_other_rx.try_recv().unwrap(),
            LiveEvent::UserTyping { .. }
        ));
        assert!(ada_rx.try_recv().is_err());
    }

    #[test]
    fn test_dead_channel_is_pruned_on_publish() {
        let harness = TestSalon::new();
        let ada = create_test_user(&harness, "Ada");
        let bob = create_test_user(&harness, "Bob");

        let (bob_conn, bob_rx) = harness.connect(&bob);
        let (_ada_conn, _ada_rx) = harness.connect(&ada);
        drop(bob_rx);

        let conversation_id = ConversationId::new();
        harness
            .salon
            .handle_client_command(bob_conn, ClientCommand::JoinConversation { conversation_id })
            .unwrap();

        assert_eq!(harness.salon.presence().connection_count(), 2);
        let delivered = harness.salon.presence().publish_to_room(
            &conversation_id,
            &LiveEvent::UserStoppedTyping {
                conversation_id,
                user_id: ada,
            },
            None,
        );

        assert_eq!(delivered, 0);
        // The dropped receiver's connection is gone, the live one remains
        assert_eq!(harness.salon.presence().connection_count(), 1);
        assert!(!harness.salon.presence().is_connected(&bob));
    }
}
