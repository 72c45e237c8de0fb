pub mod error;
mod fallback;
mod file;
pub mod ids;
mod memory;
pub mod types;

use std::rc::Rc;

pub use error::{StorageError, StorageResult};
pub use fallback::FallbackStore;
pub use file::JsonFileStore;
pub use ids::{SESSION_ID_DIGITS, SessionId, SubjectId};
pub use memory::MemoryStore;
pub use types::{DEFAULT_SESSION_KEY, DEFAULT_SUBJECT_KEY, StorageKeys};

/// Durable string key/value storage (browser `localStorage` or equivalent).
///
/// Implementations are used from a single thread; interior mutability is
/// expected behind `&self`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Rc<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }
}

/// Shared handle passed to every component that touches storage.
pub type SharedStore = Rc<dyn KeyValueStore>;
