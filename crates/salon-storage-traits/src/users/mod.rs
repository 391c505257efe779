//! Users module
//!
//! Storage of directory rows for portal accounts. The core never mutates
//! account data beyond creation; profile editing lives outside this crate.

use crate::UserId;

pub mod error;
pub mod types;

use self::error::UserError;
use self::types::User;

/// Storage trait for the users module
pub trait UserStorage {
    /// Save a user, replacing any existing row with the same id
    fn save_user(&self, user: User) -> Result<(), UserError>;

    /// Find a user by id
    fn find_user(&self, user_id: &UserId) -> Result<Option<User>, UserError>;
}
