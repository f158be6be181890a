//! Credential storage.

use std::collections::HashMap;

use tokio::sync::RwLock;

/// In-memory login → password hash map.
///
/// Writes are serialized behind the write half of an `RwLock`; lookups share
/// the read half and run concurrently. Entries are overwritten on
/// re-registration and never removed.
#[derive(Debug, Default)]
pub struct CredentialStore {
    credentials: RwLock<HashMap<String, String>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `password_hash` for `login`, replacing any previous hash.
    ///
    /// Returns `true` if an existing credential was overwritten.
    pub async fn upsert(&self, login: &str, password_hash: String) -> bool {
        self.credentials
            .write()
            .await
            .insert(login.to_string(), password_hash)
            .is_some()
    }

    /// Stored password hash for `login`, if registered.
    pub async fn password_hash(&self, login: &str) -> Option<String> {
        self.credentials.read().await.get(login).cloned()
    }

    pub async fn contains(&self, login: &str) -> bool {
        self.credentials.read().await.contains_key(login)
    }

    pub async fn len(&self) -> usize {
        self.credentials.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.credentials.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_upsert_and_lookup() {
        let store = CredentialStore::new();
        assert!(store.is_empty().await);

        assert!(!store.upsert("flip", "hash-1".to_string()).await);
        assert_eq!(store.password_hash("flip").await.as_deref(), Some("hash-1"));
        assert!(store.password_hash("flop").await.is_none());
    }

    #[tokio::test]
    async fn test_reregistration_overwrites() {
        let store = CredentialStore::new();
        store.upsert("flip", "hash-1".to_string()).await;

        assert!(store.upsert("flip", "hash-2".to_string()).await);
        assert_eq!(store.password_hash("flip").await.as_deref(), Some("hash-2"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_are_not_lost() {
        let store = Arc::new(CredentialStore::new());

        let handles: Vec<_> = (0..100)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.upsert(&format!("user-{i}"), format!("hash-{i}")).await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len().await, 100);
        for i in 0..100 {
            assert!(store.contains(&format!("user-{i}")).await);
        }
    }
}
