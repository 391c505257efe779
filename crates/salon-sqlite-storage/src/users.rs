//! Implementation of UserStorage trait for SQLite storage.

use rusqlite::{OptionalExtension, params};
use salon_storage_traits::UserId;
use salon_storage_traits::users::UserStorage;
use salon_storage_traits::users::error::UserError;
use salon_storage_traits::users::types::User;

use crate::{SalonSqliteStorage, db};

#[inline]
fn into_user_err<T>(e: T) -> UserError
where
    T: std::error::Error,
{
    UserError::DatabaseError(e.to_string())
}

impl UserStorage for SalonSqliteStorage {
    fn save_user(&self, user: User) -> Result<(), UserError> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, role)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                     email = excluded.email,
                     name = excluded.name,
                     role = excluded.role",
                params![
                    user.id.to_string(),
                    &user.email,
                    &user.name,
                    user.role.as_str(),
                ],
            )
            .map_err(into_user_err)?;

            Ok(())
        })
    }

    fn find_user(&self, user_id: &UserId) -> Result<Option<User>, UserError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM users WHERE id = ?")
                .map_err(into_user_err)?;

            stmt.query_row(params![user_id.to_string()], db::row_to_user)
                .optional()
                .map_err(into_user_err)
        })
    }
}

#[cfg(test)]
mod tests {
    use salon_storage_traits::users::types::UserRole;

    use super::*;

    #[test]
    fn test_save_and_find_user() {
        let storage = SalonSqliteStorage::new_in_memory().unwrap();
        let user = User {
            id: UserId::new(),
            email: "grace@example.org".to_string(),
            name: "Grace".to_string(),
            role: UserRole::Admin,
        };

        storage.save_user(user.clone()).unwrap();
        let found = storage.find_user(&user.id).unwrap().unwrap();
        assert_eq!(found, user);
    }

    #[test]
    fn test_save_user_upserts() {
        let storage = SalonSqliteStorage::new_in_memory().unwrap();
        let mut user = User {
            id: UserId::new(),
            email: "grace@example.org".to_string(),
            name: "Grace".to_string(),
            role: UserRole::Speaker,
        };

        storage.save_user(user.clone()).unwrap();
        user.role = UserRole::Organizer;
        storage.save_user(user.clone()).unwrap();

        let found = storage.find_user(&user.id).unwrap().unwrap();
        assert_eq!(found.role, UserRole::Organizer);
    }

    #[test]
    fn test_find_unknown_user_returns_none() {
        let storage = SalonSqliteStorage::new_in_memory().unwrap();
        assert!(storage.find_user(&UserId::new()).unwrap().is_none());
    }
}
