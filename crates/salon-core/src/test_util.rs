//! Shared helpers for the crate's unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use salon_memory_storage::SalonMemoryStorage;
use salon_storage_traits::UserId;
use salon_storage_traits::messages::types::Message;
use salon_storage_traits::users::UserStorage;
use salon_storage_traits::users::types::{User, UserRole};
use tokio::sync::mpsc;

use crate::directory::{Authenticator, DirectoryEntry, DirectoryError, SessionIdentity, UserDirectory};
use crate::live::{LiveEvent, LiveSender};
use crate::mailer::{EmailTemplate, MailContext, MailError, Mailer};
use crate::messages::SendMessageRequest;
use crate::presence::ConnectionId;
use crate::Salon;

/// Credential checker backed by a shared token map the test can grow.
#[derive(Debug, Default, Clone)]
pub struct MapAuthenticator {
    sessions: Arc<Mutex<HashMap<String, SessionIdentity>>>,
}

impl MapAuthenticator {
    pub fn insert(&self, token: String, identity: SessionIdentity) {
        self.sessions.lock().unwrap().insert(token, identity);
    }
}

impl Authenticator for MapAuthenticator {
    fn authenticate(&self, credential: &str) -> Option<SessionIdentity> {
        self.sessions.lock().unwrap().get(credential).cloned()
    }
}

/// Directory backed by a shared map the test can grow.
#[derive(Debug, Default, Clone)]
pub struct MapDirectory {
    entries: Arc<Mutex<HashMap<UserId, DirectoryEntry>>>,
}

impl MapDirectory {
    pub fn insert(&self, user_id: UserId, entry: DirectoryEntry) {
        self.entries.lock().unwrap().insert(user_id, entry);
    }
}

impl UserDirectory for MapDirectory {
    fn entry(&self, user_id: &UserId) -> Result<Option<DirectoryEntry>, DirectoryError> {
        Ok(self.entries.lock().unwrap().get(user_id).cloned())
    }
}

/// One email the recording mailer accepted.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub template: EmailTemplate,
    pub recipient_name: String,
}

/// Mailer that forwards every send into a channel the test drains.
#[derive(Debug, Clone)]
pub struct RecordingMailer {
    tx: mpsc::UnboundedSender<SentMail>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        template: EmailTemplate,
        context: &MailContext,
    ) -> Result<(), MailError> {
        let _ = self.tx.send(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            template,
            recipient_name: context.recipient_name.clone(),
        });
        Ok(())
    }
}

/// Mailer whose every send fails.
#[derive(Debug, Clone)]
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(
        &self,
        _to: &str,
        _subject: &str,
        _template: EmailTemplate,
        _context: &MailContext,
    ) -> Result<(), MailError> {
        Err(MailError("smtp outage".to_string()))
    }
}

/// A core over memory storage plus handles on its collaborators.
pub struct TestSalon {
    pub salon: Salon<SalonMemoryStorage>,
    pub authenticator: MapAuthenticator,
    pub directory: MapDirectory,
    pub mail_rx: mpsc::UnboundedReceiver<SentMail>,
}

impl TestSalon {
    pub fn new() -> Self {
        let authenticator = MapAuthenticator::default();
        let directory = MapDirectory::default();
        let (mail_tx, mail_rx) = mpsc::unbounded_channel();
        let salon = Salon::new(
            SalonMemoryStorage::new(),
            Arc::new(authenticator.clone()),
            Arc::new(directory.clone()),
            Arc::new(RecordingMailer { tx: mail_tx }),
        );
        Self {
            salon,
            authenticator,
            directory,
            mail_rx,
        }
    }

    pub fn with_failing_mailer() -> Self {
        let authenticator = MapAuthenticator::default();
        let directory = MapDirectory::default();
        let (_mail_tx, mail_rx) = mpsc::unbounded_channel();
        let salon = Salon::new(
            SalonMemoryStorage::new(),
            Arc::new(authenticator.clone()),
            Arc::new(directory.clone()),
            Arc::new(FailingMailer),
        );
        Self {
            salon,
            authenticator,
            directory,
            mail_rx,
        }
    }

    /// Opens a live channel as the given user, using the token registered
    /// by [`create_test_user`].
    pub fn connect(&self, user_id: &UserId) -> (ConnectionId, mpsc::UnboundedReceiver<LiveEvent>) {
        let (tx, rx): (LiveSender, _) = mpsc::unbounded_channel();
        let connection_id = self
            .salon
            .connect(&format!("token-{user_id}"), tx)
            .expect("test user should have a registered token");
        (connection_id, rx)
    }

    /// Sends a direct text message, panicking on failure.
    pub fn send_text(&self, sender: UserId, receiver: UserId, content: &str) -> Message {
        self.salon
            .send_message(sender, SendMessageRequest::to_receiver(receiver, content))
            .expect("send should succeed")
    }
}

/// Stores a user, registers a `token-<id>` credential for it, and adds a
/// directory entry with a `<name>@example.org` email.
pub fn create_test_user(harness: &TestSalon, name: &str) -> UserId {
    let user = User {
        id: UserId::new(),
        email: format!("{}@example.org", name.to_lowercase()),
        name: name.to_string(),
        role: UserRole::Speaker,
    };
    harness.salon.storage().save_user(user.clone()).unwrap();
    harness.directory.insert(
        user.id,
        DirectoryEntry {
            email: user.email.clone(),
            name: user.name.clone(),
        },
    );
    harness.authenticator.insert(
        format!("token-{}", user.id),
        SessionIdentity {
            user_id: user.id,
            name: user.name.clone(),
        },
    );
    user.id
}
