//! Refresh token storage.
//!
//! Each row is one live refresh session. A user owns at most one row: issuing
//! a new token deletes the previous one inside the same transaction. Token
//! values are stored as lowercase hyphenated UUID text and matched exactly.

use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use super::EntityStore;

/// A persisted refresh session.
#[derive(Debug, Clone)]
pub struct RefreshTokenSession {
    pub id: i64,
    pub token: Uuid,
    pub user_id: i64,
    /// Absolute expiry (Unix seconds).
    pub expires_at: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl RefreshTokenSession {
    /// A session is expired once `now` reaches its expiry.
    pub fn is_expired(&self, now: u64) -> bool {
        i64::try_from(now).map_or(true, |now| now >= self.expires_at)
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: i64,
    refresh_token: String,
    user_id: i64,
    expires_in: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<RefreshTokenRow> for RefreshTokenSession {
    type Error = sqlx::Error;

    fn try_from(row: RefreshTokenRow) -> Result<Self, Self::Error> {
        let token = Uuid::parse_str(&row.refresh_token).map_err(|e| sqlx::Error::Decode(e.into()))?;
        Ok(Self {
            id: row.id,
            token,
            user_id: row.user_id,
            expires_at: row.expires_in,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const TOKEN_COLUMNS: &str = "id, refresh_token, user_id, expires_in, created_at, updated_at";

fn to_db_timestamp(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// Store for refresh sessions.
#[derive(Clone)]
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace every session of `user_id` with a single new one.
    pub async fn issue(
        &self,
        user_id: i64,
        token: Uuid,
        expires_at: u64,
    ) -> Result<RefreshTokenSession, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let row: RefreshTokenRow = sqlx::query_as(&format!(
            "INSERT INTO refresh_tokens (refresh_token, expires_in, user_id) VALUES (?, ?, ?) RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(token.hyphenated().to_string())
        .bind(to_db_timestamp(expires_at))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Find the session holding exactly this token value.
    pub async fn lookup(&self, token: Uuid) -> Result<Option<RefreshTokenSession>, sqlx::Error> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(&format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE refresh_token = ?"
        ))
        .bind(token.hyphenated().to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(RefreshTokenSession::try_from).transpose()
    }

    /// Swap the token value and expiry of a session in place.
    ///
    /// Only succeeds while the row still holds `old_token`, so of two
    /// concurrent rotations of the same value exactly one wins. The loser gets
    /// `None`.
    pub async fn rotate(
        &self,
        id: i64,
        old_token: Uuid,
        new_token: Uuid,
        new_expires_at: u64,
    ) -> Result<Option<RefreshTokenSession>, sqlx::Error> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(&format!(
            "UPDATE refresh_tokens
             SET refresh_token = ?, expires_in = ?, updated_at = datetime('now')
             WHERE id = ? AND refresh_token = ?
             RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(new_token.hyphenated().to_string())
        .bind(to_db_timestamp(new_expires_at))
        .bind(id)
        .bind(old_token.hyphenated().to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(RefreshTokenSession::try_from).transpose()
    }

    /// Delete by token value. Returns the number of rows removed.
    pub async fn revoke(&self, token: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE refresh_token = ?")
            .bind(token.hyphenated().to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<RefreshTokenSession>, sqlx::Error> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(&format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(RefreshTokenSession::try_from).transpose()
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_for_user(&self, user_id: i64) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Delete all sessions whose expiry is at or before `now`.
    pub async fn delete_expired(&self, now: u64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_in <= ?")
            .bind(to_db_timestamp(now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl EntityStore for RefreshTokenStore {
    type Entity = RefreshTokenSession;

    async fn get_by_id(&self, id: i64) -> Result<Option<RefreshTokenSession>, sqlx::Error> {
        RefreshTokenStore::get_by_id(self, id).await
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, sqlx::Error> {
        self.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn new_token() -> Uuid {
        Uuid::from_bytes(rand::random())
    }

    async fn setup() -> (Database, i64) {
        let db = Database::open(":memory:").await.unwrap();
        let user = db.users().create("alice", "hash").await.unwrap();
        (db, user.id)
    }

    #[tokio::test]
    async fn test_issue_and_lookup() {
        let (db, user_id) = setup().await;
        let token = new_token();

        let session = db
            .refresh_tokens()
            .issue(user_id, token, 2_000_000_000)
            .await
            .unwrap();
        assert_eq!(session.token, token);
        assert_eq!(session.expires_at, 2_000_000_000);

        let found = db.refresh_tokens().lookup(token).await.unwrap().unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.user_id, user_id);

        assert!(db.refresh_tokens().lookup(new_token()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_stored_as_lowercase_hyphenated_text() {
        let (db, user_id) = setup().await;
        let token = new_token();
        db.refresh_tokens().issue(user_id, token, 100).await.unwrap();

        let stored: (String,) = sqlx::query_as("SELECT refresh_token FROM refresh_tokens")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(stored.0, token.hyphenated().to_string());
        assert_eq!(stored.0, stored.0.to_lowercase());
    }

    #[tokio::test]
    async fn test_issue_replaces_previous_session() {
        let (db, user_id) = setup().await;
        let first = new_token();
        let second = new_token();

        db.refresh_tokens().issue(user_id, first, 100).await.unwrap();
        db.refresh_tokens().issue(user_id, second, 100).await.unwrap();

        assert_eq!(db.refresh_tokens().count_for_user(user_id).await.unwrap(), 1);
        assert!(db.refresh_tokens().lookup(first).await.unwrap().is_none());
        assert!(db.refresh_tokens().lookup(second).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rotate_keeps_row_id() {
        let (db, user_id) = setup().await;
        let old = new_token();
        let new = new_token();
        let session = db.refresh_tokens().issue(user_id, old, 100).await.unwrap();

        let rotated = db
            .refresh_tokens()
            .rotate(session.id, old, new, 200)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rotated.id, session.id);
        assert_eq!(rotated.token, new);
        assert_eq!(rotated.expires_at, 200);

        assert!(db.refresh_tokens().lookup(old).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rotate_with_stale_token_loses() {
        let (db, user_id) = setup().await;
        let old = new_token();
        let session = db.refresh_tokens().issue(user_id, old, 100).await.unwrap();

        let winner = db
            .refresh_tokens()
            .rotate(session.id, old, new_token(), 200)
            .await
            .unwrap();
        assert!(winner.is_some());

        let loser = db
            .refresh_tokens()
            .rotate(session.id, old, new_token(), 200)
            .await
            .unwrap();
        assert!(loser.is_none());
    }

    #[tokio::test]
    async fn test_revoke_and_delete() {
        let (db, user_id) = setup().await;
        let token = new_token();
        let session = db.refresh_tokens().issue(user_id, token, 100).await.unwrap();

        assert_eq!(db.refresh_tokens().revoke(token).await.unwrap(), 1);
        assert_eq!(db.refresh_tokens().revoke(token).await.unwrap(), 0);
        assert!(!db.refresh_tokens().delete_by_id(session.id).await.unwrap());

        let token = new_token();
        let session = db.refresh_tokens().issue(user_id, token, 100).await.unwrap();
        assert!(db.refresh_tokens().delete_by_id(session.id).await.unwrap());
        assert!(db.refresh_tokens().get_by_id(session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let db = Database::open(":memory:").await.unwrap();
        let alice = db.users().create("alice", "hash").await.unwrap();
        let bob = db.users().create("bob", "hash").await.unwrap();

        db.refresh_tokens().issue(alice.id, new_token(), 1_000).await.unwrap();
        db.refresh_tokens().issue(bob.id, new_token(), 3_000).await.unwrap();

        assert_eq!(db.refresh_tokens().delete_expired(2_000).await.unwrap(), 1);
        assert_eq!(db.refresh_tokens().count_for_user(alice.id).await.unwrap(), 0);
        assert_eq!(db.refresh_tokens().count_for_user(bob.id).await.unwrap(), 1);
    }

    #[test]
    fn test_is_expired_boundary() {
        let session = RefreshTokenSession {
            id: 1,
            token: Uuid::nil(),
            user_id: 1,
            expires_at: 100,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(!session.is_expired(99));
        assert!(session.is_expired(100));
        assert!(session.is_expired(101));
    }
}
