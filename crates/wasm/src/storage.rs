use web_sys::Window;

use chatlet_storage::{KeyValueStore, StorageError, StorageResult};

use crate::js::describe;

/// `window.localStorage`. Access can throw (privacy modes, sandboxed frames),
/// so it is wrapped in a `FallbackStore` by the widget handle.
pub struct LocalStorageStore {
    window: Window,
}

impl LocalStorageStore {
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    fn storage(&self, stage: &'static str, key: &str) -> StorageResult<web_sys::Storage> {
        match self.window.local_storage() {
            Ok(Some(storage)) => Ok(storage),
            Ok(None) => Err(StorageError::Unavailable {
                stage,
                key: key.to_string(),
                details: "localStorage is not exposed".to_string(),
            }),
            Err(error) => Err(StorageError::Unavailable {
                stage,
                key: key.to_string(),
                details: describe(&error),
            }),
        }
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let storage = self.storage("local-storage-open-get", key)?;
        storage
            .get_item(key)
            .map_err(|error| StorageError::Unavailable {
                stage: "local-storage-get-item",
                key: key.to_string(),
                details: describe(&error),
            })
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let storage = self.storage("local-storage-open-set", key)?;
        storage
            .set_item(key, value)
            .map_err(|error| StorageError::Unavailable {
                stage: "local-storage-set-item",
                key: key.to_string(),
                details: describe(&error),
            })
    }
}
