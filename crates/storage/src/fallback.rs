use std::cell::Cell;

use super::KeyValueStore;
use super::error::StorageResult;
use super::memory::MemoryStore;

/// Wraps a durable backend and degrades to memory the first time it fails.
///
/// Every write is mirrored into memory, so values written before the failure
/// stay readable. Once degraded the durable backend is not consulted again
/// for the rest of the page's life.
pub struct FallbackStore<S> {
    durable: S,
    memory: MemoryStore,
    degraded: Cell<bool>,
}

impl<S: KeyValueStore> FallbackStore<S> {
    pub fn new(durable: S) -> Self {
        Self {
            durable,
            memory: MemoryStore::new(),
            degraded: Cell::new(false),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.get()
    }

    fn degrade(&self, key: &str, operation: &'static str, error: &dyn std::fmt::Display) {
        if !self.degraded.replace(true) {
            tracing::warn!(
                key,
                operation,
                error = %error,
                "durable storage unavailable; continuing with in-memory values"
            );
        }
    }
}

impl<S: KeyValueStore> KeyValueStore for FallbackStore<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        if self.degraded.get() {
            return self.memory.get(key);
        }

        match self.durable.get(key) {
            Ok(value) => Ok(value),
            Err(error) => {
                self.degrade(key, "get", &error);
                self.memory.get(key)
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.memory.set(key, value)?;
        if self.degraded.get() {
            return Ok(());
        }

        if let Err(error) = self.durable.set(key, value) {
            self.degrade(key, "set", &error);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnavailableSnafu;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            UnavailableSnafu {
                stage: "broken-get",
                key: key.to_string(),
                details: "SecurityError".to_string(),
            }
            .fail()
        }

        fn set(&self, key: &str, _value: &str) -> StorageResult<()> {
            UnavailableSnafu {
                stage: "broken-set",
                key: key.to_string(),
                details: "QuotaExceededError".to_string(),
            }
            .fail()
        }
    }

    #[test]
    fn healthy_backend_is_used_directly() {
        let durable = MemoryStore::new();
        durable.set("k", "durable").ok();
        let store = FallbackStore::new(durable);

        assert_eq!(store.get("k").ok().flatten().as_deref(), Some("durable"));
        assert!(!store.is_degraded());
    }

    #[test]
    fn failing_backend_degrades_to_memory_without_errors() {
        let store = FallbackStore::new(BrokenStore);

        assert!(matches!(store.get("k"), Ok(None)));
        assert!(store.is_degraded());
        assert!(store.set("k", "v").is_ok());
        assert_eq!(store.get("k").ok().flatten().as_deref(), Some("v"));
    }
}
