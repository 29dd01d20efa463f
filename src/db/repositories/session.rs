use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::entities::{accounts, prelude::*, sessions};

pub struct SessionRepository {
    conn: DatabaseConnection,
}

impl SessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Sessions that have not yet expired, joined with their owning account.
    ///
    /// Expiry timestamps are RFC 3339 UTC strings, so lexicographic
    /// comparison orders them chronologically.
    pub async fn list_active(&self) -> Result<Vec<(sessions::Model, Option<accounts::Model>)>> {
        let now = chrono::Utc::now().to_rfc3339();

        let rows = Sessions::find()
            .find_also_related(Accounts)
            .filter(sessions::Column::ExpiresAt.gt(now))
            .order_by_asc(sessions::Column::ExpiresAt)
            .all(&self.conn)
            .await
            .context("Failed to list active sessions")?;

        Ok(rows)
    }

    pub async fn list_for_account(&self, account_id: i32) -> Result<Vec<sessions::Model>> {
        let rows = Sessions::find()
            .filter(sessions::Column::AccountId.eq(account_id))
            .all(&self.conn)
            .await
            .context("Failed to list sessions for account")?;

        Ok(rows)
    }

    pub async fn count_for_account(&self, account_id: i32) -> Result<u64> {
        let total = Sessions::find()
            .filter(sessions::Column::AccountId.eq(account_id))
            .count(&self.conn)
            .await
            .context("Failed to count sessions for account")?;

        Ok(total)
    }
}

/// Generate a random session token (64 character hex string).
///
/// The raw token is handed to the caller exactly once; only its hash is
/// persisted, so a database compromise does not expose usable credentials.
#[must_use]
pub fn generate_session_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// SHA-256 digest of a session token, in the stored `sha256:<hex>` form.
#[must_use]
pub fn hash_session_token(token: &str) -> String {
    use sha2::{Digest, Sha256};

    let digest = Sha256::digest(token.as_bytes());
    let hex = digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    });

    format!("sha256:{hex}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique_hex() {
        let a = generate_session_token();
        let b = generate_session_token();

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn token_hash_is_stable_and_not_the_token() {
        let token = "0123456789abcdef";
        let hash = hash_session_token(token);

        assert!(hash.starts_with("sha256:"));
        assert!(!hash.contains(token));
        assert_eq!(hash, hash_session_token(token));
    }
}
