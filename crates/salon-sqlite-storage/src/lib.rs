//! SQLite-based storage implementation for Salon.
//!
//! This crate provides a durable implementation of the
//! `SalonStorageProvider` trait on top of a single SQLite database file.
//!
//! # Unified Storage Architecture
//!
//! All entity families live in one database behind one connection, so the
//! compound operations of the storage contract run as real transactions:
//! message persistence and its recency bump commit together, and the bulk
//! mark-read transition commits together with the last-read advance.
//!
//! Direct-pair uniqueness is enforced by a `UNIQUE` constraint on a
//! deterministic pair key, which makes the find-or-create race-safe even
//! across processes sharing the database file.
//!
//! # Example
//!
//! ```no_run
//! use salon_sqlite_storage::SalonSqliteStorage;
//!
//! let storage = SalonSqliteStorage::new("/path/to/salon.sqlite")?;
//! # Ok::<(), salon_sqlite_storage::error::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use salon_storage_traits::{Backend, SalonStorageProvider};

mod conversations;
mod db;
pub mod error;
mod messages;
mod migrations;
mod notifications;
mod users;

use self::error::Error;

/// A SQLite-based storage implementation for Salon.
///
/// This struct implements the SalonStorageProvider trait for SQLite
/// databases, using a single connection for all entity families so
/// compound operations can be transactional.
pub struct SalonSqliteStorage {
    /// The unified SQLite connection
    connection: Arc<Mutex<Connection>>,
}

impl SalonSqliteStorage {
    /// Creates a new [`SalonSqliteStorage`] backed by the given database
    /// file, creating the file and running pending migrations as needed.
    pub fn new<P>(file_path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let conn = Connection::open(file_path)?;
        Self::from_connection(conn)
    }

    /// Creates a new [`SalonSqliteStorage`] backed by an in-memory
    /// database. State is lost when the storage is dropped; useful for
    /// tests.
    pub fn new_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, Error> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run_migrations(&mut conn)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn with_connection<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Connection) -> T,
    {
        let conn = self.connection.lock().unwrap();
        f(&conn)
    }
}

impl SalonStorageProvider for SalonSqliteStorage {
    fn backend(&self) -> Backend {
        Backend::SQLite
    }
}

#[cfg(test)]
mod tests {
    use salon_storage_traits::UserId;
    use salon_storage_traits::users::UserStorage;
    use salon_storage_traits::users::types::{User, UserRole};

    use super::*;

    #[test]
    fn test_backend_is_sqlite() {
        let storage = SalonSqliteStorage::new_in_memory().unwrap();
        assert_eq!(storage.backend(), Backend::SQLite);
        assert!(storage.backend().is_persistent());
    }

    #[test]
    fn test_reopening_database_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salon.sqlite");

        let user = User {
            id: UserId::new(),
            email: "ada@example.org".to_string(),
            name: "Ada".to_string(),
            role: UserRole::Organizer,
        };

        {
            let storage = SalonSqliteStorage::new(&path).unwrap();
            storage.save_user(user.clone()).unwrap();
        }

        let storage = SalonSqliteStorage::new(&path).unwrap();
        let found = storage.find_user(&user.id).unwrap().unwrap();
        assert_eq!(found, user);
    }
}
