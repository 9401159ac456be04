//! User metadata attached to a darr container.
//!
//! Metadata is a flat map of keys to JSON values stored in `metadata.json`.
//! The file is absent when there is no metadata.

use darrs_filesystem::{AccessMode, DataDir, StorageError};
use darrs_metadata::Attributes;

/// The name of the metadata file.
pub const METADATA_FILE: &str = "metadata.json";

/// The metadata of a darr container.
///
/// Every read goes to disk, so changes made through another handle are visible.
#[derive(Clone, Debug)]
pub struct MetadataStore {
    data_dir: DataDir,
    access_mode: AccessMode,
}

impl MetadataStore {
    pub(crate) fn new(data_dir: DataDir, access_mode: AccessMode) -> Self {
        Self {
            data_dir,
            access_mode,
        }
    }

    pub(crate) fn set_access_mode(&mut self, access_mode: AccessMode) {
        self.access_mode = access_mode;
    }

    /// Return the access mode.
    #[must_use]
    pub fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    /// Return all metadata.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if `metadata.json` exists but cannot be read.
    pub fn to_map(&self) -> Result<Attributes, StorageError> {
        Ok(self
            .data_dir
            .read_json_map_if_exists(METADATA_FILE)?
            .unwrap_or_default())
    }

    /// Return the value of `key`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if `metadata.json` exists but cannot be read.
    pub fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        Ok(self.to_map()?.remove(key))
    }

    /// Returns true if `key` is present.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if `metadata.json` exists but cannot be read.
    pub fn contains_key(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.to_map()?.contains_key(key))
    }

    /// Return the keys.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if `metadata.json` exists but cannot be read.
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.to_map()?.into_iter().map(|(key, _)| key).collect())
    }

    /// Return the number of keys.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if `metadata.json` exists but cannot be read.
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.to_map()?.len())
    }

    /// Returns true if there is no metadata.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if `metadata.json` exists but cannot be read.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.to_map()?.is_empty())
    }

    /// Insert `value` at `key` and return the previous value.
    ///
    /// # Errors
    /// Returns [`StorageError::ReadOnly`] in read-only access mode, or a [`StorageError`] if `metadata.json` cannot be read or written.
    pub fn insert(
        &self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        self.check_writable()?;
        let mut map = self.to_map()?;
        let previous = map.insert(key.into(), value.into());
        self.write(&map)?;
        Ok(previous)
    }

    /// Insert every entry of `entries`, replacing existing keys.
    ///
    /// # Errors
    /// Returns [`StorageError::ReadOnly`] in read-only access mode, or a [`StorageError`] if `metadata.json` cannot be read or written.
    pub fn extend(&self, entries: Attributes) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut map = self.to_map()?;
        map.extend(entries);
        self.write(&map)
    }

    /// Remove `key` and return its value.
    ///
    /// `metadata.json` is deleted when the last key is removed.
    ///
    /// # Errors
    /// Returns [`StorageError::ReadOnly`] in read-only access mode, or a [`StorageError`] if `metadata.json` cannot be read or written.
    pub fn remove(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        self.check_writable()?;
        let mut map = self.to_map()?;
        let previous = map.remove(key);
        if previous.is_some() {
            self.write(&map)?;
        }
        Ok(previous)
    }

    /// Remove all metadata and delete `metadata.json`.
    ///
    /// # Errors
    /// Returns [`StorageError::ReadOnly`] in read-only access mode, or an IO error if `metadata.json` cannot be removed.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.check_writable()?;
        self.data_dir.remove_file(METADATA_FILE)
    }

    /// Replace all metadata, ignoring the access mode.
    pub(crate) fn replace(&self, map: &Attributes) -> Result<(), StorageError> {
        self.write(map)
    }

    fn write(&self, map: &Attributes) -> Result<(), StorageError> {
        if map.is_empty() {
            self.data_dir.remove_file(METADATA_FILE)
        } else {
            self.data_dir.write_json(METADATA_FILE, map)
        }
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        self.access_mode.check_writable(self.data_dir.path())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn metadata_store() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let data_dir = DataDir::create(tmp.path(), true)?;
        let metadata = MetadataStore::new(data_dir.clone(), AccessMode::ReadWrite);
        assert!(metadata.is_empty()?);
        assert!(!data_dir.contains(METADATA_FILE));

        assert_eq!(metadata.insert("fs", 20000)?, None);
        metadata.insert("channels", json!(["a", "b"]))?;
        assert_eq!(metadata.get("fs")?, Some(json!(20000)));
        assert_eq!(metadata.keys()?, vec!["channels", "fs"]);
        assert!(data_dir.contains(METADATA_FILE));

        let read_only = MetadataStore::new(data_dir.clone(), AccessMode::ReadOnly);
        assert!(matches!(
            read_only.insert("x", 1),
            Err(StorageError::ReadOnly(_))
        ));
        assert_eq!(read_only.len()?, 2);

        metadata.remove("fs")?;
        assert_eq!(metadata.remove("fs")?, None);
        metadata.remove("channels")?;
        assert!(!data_dir.contains(METADATA_FILE));

        metadata.insert("a", 1)?;
        metadata.clear()?;
        assert!(!data_dir.contains(METADATA_FILE));
        Ok(())
    }
}
