//! Memory-based implementation of the UserStorage trait

use salon_storage_traits::UserId;
use salon_storage_traits::users::UserStorage;
use salon_storage_traits::users::error::UserError;
use salon_storage_traits::users::types::User;

use crate::SalonMemoryStorage;

impl UserStorage for SalonMemoryStorage {
    fn save_user(&self, user: User) -> Result<(), UserError> {
        let mut inner = self.inner.write();
        inner.users.insert(user.id, user);
        Ok(())
    }

    fn find_user(&self, user_id: &UserId) -> Result<Option<User>, UserError> {
        let inner = self.inner.read();
        Ok(inner.users.get(user_id).cloned())
    }
}
