//! Password hashing with bcrypt.
//!
//! bcrypt is deliberately slow, so every call is moved onto the blocking
//! thread pool instead of stalling the async executor.

use std::sync::Arc;
use thiserror::Error;

/// bcrypt work factor used when none is configured.
pub const DEFAULT_COST: u32 = 12;

/// bcrypt only reads this many bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password must not be empty")]
    Empty,
    #[error("Password must be at most 72 bytes")]
    TooLong,
    #[error("bcrypt failure: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("Hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One-way password hasher with a fixed work factor.
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    /// Build a hasher for the given bcrypt cost (4..=31).
    ///
    /// Also computes the hash that [`PasswordHasher::verify_dummy`] checks
    /// against, so construction costs one full bcrypt round.
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        let dummy_hash = bcrypt::hash("dummy-password-for-timing", cost)?;
        Ok(Self {
            cost,
            dummy_hash: dummy_hash.into(),
        })
    }

    /// Hash a plaintext password. Salt and cost are embedded in the result.
    ///
    /// Passwords longer than [`MAX_PASSWORD_BYTES`] are rejected rather than
    /// silently cut short.
    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::Empty);
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong);
        }

        let password = password.to_owned();
        let cost = self.cost;
        let hashed =
            tokio::task::spawn_blocking(move || bcrypt::non_truncating_hash(password, cost))
                .await??;
        Ok(hashed)
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// Malformed hashes, over-long passwords and failed blocking tasks count
    /// as a mismatch.
    pub async fn verify(&self, password: &str, hash: &str) -> bool {
        let password = password.to_owned();
        let hash = hash.to_owned();

        match tokio::task::spawn_blocking(move || bcrypt::non_truncating_verify(password, &hash))
            .await
        {
            Ok(Ok(valid)) => valid,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Password verification rejected input");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Password verification task failed");
                false
            }
        }
    }

    /// Spend one verification's worth of work without a real hash.
    pub async fn verify_dummy(&self, password: &str) {
        let dummy = self.dummy_hash.clone();
        let _ = self.verify(password, &dummy).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4).unwrap()
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("secret1").await.unwrap();

        assert!(hash.starts_with("$2"));
        assert!(hasher.verify("secret1", &hash).await);
        assert!(!hasher.verify("secret2", &hash).await);
    }

    #[tokio::test]
    async fn test_same_password_gets_distinct_salts() {
        let hasher = hasher();
        let first = hasher.hash("secret1").await.unwrap();
        let second = hasher.hash("secret1").await.unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("secret1", &second).await);
    }

    #[tokio::test]
    async fn test_empty_password_rejected() {
        assert!(matches!(
            hasher().hash("").await,
            Err(PasswordError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_malformed_hash_is_false() {
        let hasher = hasher();
        assert!(!hasher.verify("secret1", "not-a-bcrypt-hash").await);
        assert!(!hasher.verify("secret1", "").await);
    }

    #[tokio::test]
    async fn test_hash_from_other_cost_still_verifies() {
        let other = PasswordHasher::new(5).unwrap();
        let hash = other.hash("secret1").await.unwrap();

        assert!(hasher().verify("secret1", &hash).await);
    }

    #[tokio::test]
    async fn test_password_over_byte_limit_rejected() {
        let hasher = hasher();
        let too_long = "a".repeat(MAX_PASSWORD_BYTES + 1);

        assert!(matches!(
            hasher.hash(&too_long).await,
            Err(PasswordError::TooLong)
        ));
        assert!(hasher.hash(&"a".repeat(MAX_PASSWORD_BYTES)).await.is_ok());

        // Multibyte characters count by encoded length.
        assert!(matches!(
            hasher.hash(&"é".repeat(37)).await,
            Err(PasswordError::TooLong)
        ));
    }

    #[tokio::test]
    async fn test_shared_prefix_beyond_limit_does_not_verify() {
        let hasher = hasher();
        let prefix = "a".repeat(MAX_PASSWORD_BYTES);
        let hash = hasher.hash(&prefix).await.unwrap();

        assert!(hasher.verify(&prefix, &hash).await);
        assert!(!hasher.verify(&format!("{prefix}first"), &hash).await);
        assert!(!hasher.verify(&format!("{prefix}second-different"), &hash).await);
    }

    #[test]
    fn test_invalid_cost_rejected() {
        assert!(PasswordHasher::new(3).is_err());
        assert!(PasswordHasher::new(32).is_err());
    }
}
