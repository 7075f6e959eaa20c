use crate::db::{User, UserStore};
use crate::password::PasswordHasher;

use super::errors::AuthError;

/// Checks a username/password pair against the user store.
#[derive(Clone)]
pub struct CredentialVerifier {
    users: UserStore,
    hasher: PasswordHasher,
}

impl CredentialVerifier {
    pub fn new(users: UserStore, hasher: PasswordHasher) -> Self {
        Self { users, hasher }
    }

    /// Return the active user owning these credentials.
    ///
    /// Unknown users, inactive users and wrong passwords all yield
    /// [`AuthError::WrongCredentials`]. A missing user still costs one bcrypt
    /// verification so response time does not reveal which usernames exist.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let Some(user) = self.users.get_active_by_username(username).await? else {
            self.hasher.verify_dummy(password).await;
            tracing::debug!("Login rejected: no active user with that name");
            return Err(AuthError::WrongCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash).await {
            tracing::debug!(user_id = user.id, "Login rejected: wrong password");
            return Err(AuthError::WrongCredentials);
        }

        Ok(user)
    }
}
