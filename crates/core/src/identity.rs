use chatlet_storage::{SessionId, SharedStore};

/// Source of 64-bit randomness for new session ids.
pub trait Entropy {
    fn next_u64(&mut self) -> u64;
}

/// Operating-system CSPRNG (`crypto.getRandomValues` in browsers).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn next_u64(&mut self) -> u64 {
        match getrandom::u64() {
            Ok(value) => value,
            Err(error) => {
                // Only reachable when the platform has no random source at all.
                tracing::error!(error = %error, "secure randomness unavailable; using clock entropy");
                clock_entropy()
            }
        }
    }
}

fn clock_entropy() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

/// Browser-stable session identity, cached for the page's lifetime.
pub struct IdentityStore {
    store: SharedStore,
    key: String,
    cached: Option<SessionId>,
}

impl IdentityStore {
    pub fn new(store: SharedStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            cached: None,
        }
    }

    pub fn get_or_create_session_id(&mut self) -> SessionId {
        self.get_or_create_session_id_with(&mut OsEntropy)
    }

    /// Returns the persisted id when it is well formed, otherwise mints and
    /// persists a new one. Storage failures only cost durability.
    pub fn get_or_create_session_id_with(&mut self, entropy: &mut dyn Entropy) -> SessionId {
        if let Some(session_id) = &self.cached {
            return session_id.clone();
        }

        let stored = match self.store.get(&self.key) {
            Ok(stored) => stored,
            Err(error) => {
                tracing::warn!(key = %self.key, error = %error, "session id could not be read");
                None
            }
        };

        let session_id = match stored.as_deref().map(SessionId::parse) {
            Some(Ok(session_id)) => session_id,
            Some(Err(error)) => {
                tracing::info!(error = %error, "stored session id is malformed; regenerating");
                self.mint(entropy)
            }
            None => self.mint(entropy),
        };

        self.cached = Some(session_id.clone());
        session_id
    }

    fn mint(&self, entropy: &mut dyn Entropy) -> SessionId {
        let session_id = SessionId::from_entropy(entropy.next_u64());
        if let Err(error) = self.store.set(&self.key, session_id.as_str()) {
            tracing::warn!(
                key = %self.key,
                error = %error,
                "session id kept in memory only for this page load"
            );
        }
        tracing::debug!(session_id = %session_id, "minted new session id");
        session_id
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use chatlet_storage::{KeyValueStore, MemoryStore};

    use super::*;

    struct Fixed(u64);

    impl Entropy for Fixed {
        fn next_u64(&mut self) -> u64 {
            self.0
        }
    }

    fn is_fifteen_digits(raw: &str) -> bool {
        raw.len() == 15 && raw.bytes().all(|byte| byte.is_ascii_digit())
    }

    #[test]
    fn minted_id_is_persisted_and_reused() {
        let store = Rc::new(MemoryStore::new());
        let mut identity = IdentityStore::new(store.clone(), "sperare_chat_uid");

        let first = identity.get_or_create_session_id();
        assert!(is_fifteen_digits(first.as_str()));
        assert_eq!(
            store.get("sperare_chat_uid").ok().flatten().as_deref(),
            Some(first.as_str())
        );

        let mut reopened = IdentityStore::new(store, "sperare_chat_uid");
        assert_eq!(reopened.get_or_create_session_id(), first);
    }

    #[test]
    fn well_formed_stored_id_is_returned_unchanged() {
        let store = Rc::new(MemoryStore::new());
        store.set("uid", "123456789012345").ok();
        let mut identity = IdentityStore::new(store, "uid");

        let session_id = identity.get_or_create_session_id_with(&mut Fixed(7));
        assert_eq!(session_id.as_str(), "123456789012345");
    }

    #[test]
    fn malformed_stored_id_is_replaced() {
        let store = Rc::new(MemoryStore::new());
        store.set("uid", "abc").ok();
        let mut identity = IdentityStore::new(store.clone(), "uid");

        let session_id = identity.get_or_create_session_id_with(&mut Fixed(5));
        assert_eq!(session_id.as_str(), "100000000000005");
        assert_eq!(
            store.get("uid").ok().flatten().as_deref(),
            Some("100000000000005")
        );
    }

    #[test]
    fn id_is_stable_within_one_page_even_when_storage_rejects_writes() {
        let store = Rc::new(chatlet_storage::FallbackStore::new(RejectingStore));
        let mut identity = IdentityStore::new(store, "uid");

        let first = identity.get_or_create_session_id();
        let second = identity.get_or_create_session_id();
        assert_eq!(first, second);
        assert!(is_fifteen_digits(first.as_str()));
    }

    struct RejectingStore;

    impl KeyValueStore for RejectingStore {
        fn get(&self, _key: &str) -> chatlet_storage::StorageResult<Option<String>> {
            Ok(None)
        }

        fn set(&self, key: &str, _value: &str) -> chatlet_storage::StorageResult<()> {
            Err(chatlet_storage::StorageError::Unavailable {
                stage: "test-set",
                key: key.to_string(),
                details: "QuotaExceededError".to_string(),
            })
        }
    }
}
