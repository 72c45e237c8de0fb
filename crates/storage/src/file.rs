use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use snafu::ResultExt;

use super::KeyValueStore;
use super::error::{
    ParseFileSnafu, ReadFileSnafu, SerializeEntriesSnafu, StorageResult, WriteFileSnafu,
};

/// JSON-file backed store for native hosts.
///
/// The whole map is rewritten through a temporary file on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RefCell<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let entries = Self::load(&path)?;
        Ok(Self {
            path,
            entries: RefCell::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> StorageResult<BTreeMap<String, String>> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "storage file not found, starting empty");
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(path).context(ReadFileSnafu {
            stage: "read-storage-file",
            path: path.display().to_string(),
        })?;
        serde_json::from_str(&content).context(ParseFileSnafu {
            stage: "parse-storage-file",
            path: path.display().to_string(),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(WriteFileSnafu {
                stage: "create-storage-directory",
                path: parent.display().to_string(),
            })?;
        }

        let content = serde_json::to_string_pretty(entries).context(SerializeEntriesSnafu {
            stage: "serialize-storage-entries",
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-storage-file",
            path: temp_path.display().to_string(),
        })?;
        std::fs::rename(&temp_path, &self.path).context(WriteFileSnafu {
            stage: "rename-temporary-storage-file",
            path: self.path.display().to_string(),
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.borrow().clone();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)?;
        *self.entries.borrow_mut() = entries;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("widget.json");

        let store = JsonFileStore::open(&path).expect("open empty");
        store.set("sperare_chat_uid", "123456789012345").expect("set");
        store.set("urlId", "42").expect("set");
        drop(store);

        let reopened = JsonFileStore::open(&path).expect("reopen");
        assert_eq!(
            reopened.get("sperare_chat_uid").expect("get"),
            Some("123456789012345".to_string())
        );
        assert_eq!(reopened.get("urlId").expect("get"), Some("42".to_string()));
        assert_eq!(reopened.get("missing").expect("get"), None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("widget.json");
        std::fs::write(&path, "not json").expect("write");

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(crate::StorageError::ParseFile { .. })
        ));
    }
}
