//! Opaque refresh tokens
//!
//! The raw secret goes to the client once. Only its SHA-256 hex digest is
//! stored, so a leaked table cannot be replayed.

use std::sync::Arc;

use base64::Engine;
use chrono::{Duration, Utc};
use leave_core::{
    Account, AccountRepository, NewRefreshToken, RefreshTokenRepository, Result,
};
use rand::Rng;
use tokio::task::JoinHandle;

/// Generate a 32-byte secret from the thread CSPRNG, URL-safe base64
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let token_bytes: [u8; 32] = rng.gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(token_bytes)
}

/// Hash a secret for storage (SHA-256, lowercase hex)
pub fn hash_secret(raw: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Refresh token lifecycle on top of the token and account repositories
#[derive(Clone)]
pub struct RefreshTokenStore {
    tokens: Arc<dyn RefreshTokenRepository>,
    accounts: Arc<dyn AccountRepository>,
    ttl: Duration,
}

impl RefreshTokenStore {
    pub fn new(
        tokens: Arc<dyn RefreshTokenRepository>,
        accounts: Arc<dyn AccountRepository>,
        ttl: Duration,
    ) -> Self {
        Self {
            tokens,
            accounts,
            ttl,
        }
    }

    /// Create and persist a new token for `account_id`, returning the raw secret
    pub async fn issue_and_store(&self, account_id: i64) -> Result<String> {
        let raw = generate_secret();
        self.tokens
            .insert_refresh_token(NewRefreshToken {
                account_id,
                token_hash: hash_secret(&raw),
                expires_at: Utc::now() + self.ttl,
            })
            .await?;
        Ok(raw)
    }

    /// Look up the account behind a live token.
    ///
    /// `None` when the token is unknown, expired, or its account is gone.
    pub async fn resolve(&self, raw: &str) -> Result<Option<Account>> {
        let Some(record) = self.tokens.find_refresh_token(&hash_secret(raw)).await? else {
            return Ok(None);
        };
        if !record.is_live_at(Utc::now()) {
            return Ok(None);
        }
        self.accounts.find_account_by_id(record.account_id).await
    }

    /// Delete the token. Returns whether it existed.
    pub async fn revoke(&self, raw: &str) -> Result<bool> {
        self.tokens.delete_refresh_token(&hash_secret(raw)).await
    }

    /// Consume a live token and hand out its replacement in one step.
    ///
    /// Concurrent rotations of the same secret have at most one winner; the
    /// rest get `None`, exactly like a replay of an already used token.
    pub async fn rotate(&self, raw: &str) -> Result<Option<(Account, String)>> {
        let now = Utc::now();
        let replacement = generate_secret();
        let replacement_hash = hash_secret(&replacement);

        let Some(record) = self
            .tokens
            .rotate_refresh_token(&hash_secret(raw), &replacement_hash, now + self.ttl, now)
            .await?
        else {
            return Ok(None);
        };

        match self.accounts.find_account_by_id(record.account_id).await? {
            Some(account) => Ok(Some((account, replacement))),
            None => {
                self.tokens.delete_refresh_token(&replacement_hash).await?;
                Ok(None)
            }
        }
    }

    /// Delete every token that expired before now
    pub async fn sweep_expired(&self) -> Result<u64> {
        self.tokens.delete_expired_refresh_tokens(Utc::now()).await
    }

    /// Run `sweep_expired` on a fixed interval until the runtime shuts down
    pub fn spawn_sweeper(self, every: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match self.sweep_expired().await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!(count, "Swept expired refresh tokens"),
                    Err(e) => tracing::warn!(error = %e, "Refresh token sweep failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use leave_core::{MemoryStore, NewAccount, Role};

    async fn store_with_account(ttl: Duration) -> (Arc<MemoryStore>, RefreshTokenStore, Account) {
        let db = Arc::new(MemoryStore::new());
        let account = db
            .create_account(NewAccount {
                name: "Dana".to_string(),
                email: "dana@example.com".to_string(),
                department: "Ops".to_string(),
                joining_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                leave_balance: 20,
                password_hash: String::new(),
                role: Role::Employee,
            })
            .await
            .unwrap();
        let store = RefreshTokenStore::new(db.clone(), db.clone(), ttl);
        (db, store, account)
    }

    #[test]
    fn test_secret_shape() {
        let secret = generate_secret();
        // 32 bytes in unpadded base64
        assert_eq!(secret.len(), 43);
        assert!(!secret.contains('='));
        assert!(!secret.contains('+') && !secret.contains('/'));
        assert_ne!(secret, generate_secret());
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        let hash = hash_secret("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_issue_resolve_revoke() {
        let (db, store, account) = store_with_account(Duration::days(7)).await;

        let raw = store.issue_and_store(account.id).await.unwrap();
        assert_eq!(db.refresh_token_count().await, 1);

        // Raw secret is never stored
        assert!(db.find_refresh_token(&raw).await.unwrap().is_none());

        let resolved = store.resolve(&raw).await.unwrap().expect("live token");
        assert_eq!(resolved.id, account.id);

        assert!(store.revoke(&raw).await.unwrap());
        assert!(!store.revoke(&raw).await.unwrap());
        assert!(store.resolve(&raw).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_token_does_not_resolve_or_rotate() {
        let (_db, store, account) = store_with_account(Duration::seconds(-1)).await;

        let raw = store.issue_and_store(account.id).await.unwrap();
        assert!(store.resolve(&raw).await.unwrap().is_none());
        assert!(store.rotate(&raw).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rotate_consumes_presented_token() {
        let (db, store, account) = store_with_account(Duration::days(7)).await;
        let raw = store.issue_and_store(account.id).await.unwrap();

        let (owner, replacement) = store.rotate(&raw).await.unwrap().expect("rotated");
        assert_eq!(owner.id, account.id);
        assert_ne!(replacement, raw);
        assert_eq!(db.refresh_token_count().await, 1);

        // Replay fails, the replacement works
        assert!(store.rotate(&raw).await.unwrap().is_none());
        assert!(store.resolve(&replacement).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let (db, live_store, account) = store_with_account(Duration::days(7)).await;
        let expired_store =
            RefreshTokenStore::new(db.clone(), db.clone(), Duration::seconds(-10));

        let live = live_store.issue_and_store(account.id).await.unwrap();
        expired_store.issue_and_store(account.id).await.unwrap();
        expired_store.issue_and_store(account.id).await.unwrap();

        assert_eq!(live_store.sweep_expired().await.unwrap(), 2);
        assert_eq!(db.refresh_token_count().await, 1);
        assert!(live_store.resolve(&live).await.unwrap().is_some());
    }
}
