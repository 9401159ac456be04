use std::{
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use darrs_metadata::{to_json_pretty, Attributes};
use serde::Serialize;
use walkdir::WalkDir;

use crate::StorageError;

/// A darr container directory.
#[derive(Clone, Debug)]
pub struct DataDir {
    path: PathBuf,
}

impl DataDir {
    /// Open an existing data directory.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if `path` does not exist or is not a directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if std::fs::metadata(&path)?.is_dir() {
            Ok(Self { path })
        } else {
            Err(StorageError::NotADirectory(path))
        }
    }

    /// Create a data directory.
    ///
    /// An existing directory is reused if `overwrite` is true.
    /// Files in it are replaced as they are written.
    ///
    /// # Errors
    /// Returns [`StorageError::PathExists`] if `path` exists and `overwrite` is false,
    /// [`StorageError::NotADirectory`] if `path` is an existing file,
    /// or an IO error if the directory cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, overwrite: bool) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            if !overwrite {
                return Err(StorageError::PathExists(path));
            }
            if !path.is_dir() {
                return Err(StorageError::NotADirectory(path));
            }
        } else {
            std::fs::create_dir_all(&path)?;
        }
        Ok(Self { path })
    }

    /// Return the path of the directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the path of a file or subdirectory within the directory.
    #[must_use]
    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Returns true if a file or subdirectory named `name` exists in the directory.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.join(name).exists()
    }

    /// Read a JSON object from the file `name`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the file cannot be read or does not hold a JSON object.
    pub fn read_json_map(&self, name: &str) -> Result<Attributes, StorageError> {
        let path = self.join(name);
        let bytes = std::fs::read(&path)?;
        match serde_json::from_slice(&bytes) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::NotAJsonObject(path)),
            Err(err) => Err(StorageError::InvalidJson(path, err)),
        }
    }

    /// Read a JSON object from the file `name`, or [`None`] if the file does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the file exists but cannot be read or does not hold a JSON object.
    pub fn read_json_map_if_exists(&self, name: &str) -> Result<Option<Attributes>, StorageError> {
        match self.read_json_map(name) {
            Ok(map) => Ok(Some(map)),
            Err(StorageError::IOError(err)) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Write `value` as JSON to the file `name`, replacing any existing file.
    ///
    /// Keys are sorted and indented with four spaces.
    /// An existing file is replaced by renaming a synced temporary file over it, so it always holds either the old or the new document.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if `value` cannot be serialised or the file cannot be written.
    /// The existing file is then left untouched.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let path = self.join(name);
        let bytes = to_json_pretty(value).map_err(|err| StorageError::InvalidJson(path.clone(), err))?;
        let existing = match std::fs::metadata(&path) {
            Ok(metadata) => Some(metadata.permissions()),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };
        let Some(permissions) = existing else {
            std::fs::write(path, bytes)?;
            return Ok(());
        };
        let mut file = tempfile::Builder::new()
            .prefix(".darrs_")
            .suffix(".tmp")
            .tempfile_in(&self.path)?;
        file.write_all(&bytes)?;
        file.as_file().set_permissions(permissions)?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|err| err.error)?;
        Ok(())
    }

    /// Remove the file `name` if it exists.
    ///
    /// # Errors
    /// Returns an IO error if the file exists but cannot be removed.
    pub fn remove_file(&self, name: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.join(name)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    /// Return the paths of all files in the directory, recursively and sorted.
    ///
    /// # Errors
    /// Returns an IO error if the directory cannot be walked.
    pub fn files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.path).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Delete the files `names` and then the directory itself.
    ///
    /// Subdirectories among `names` must already be empty.
    ///
    /// # Errors
    /// Returns [`StorageError::DirectoryNotEmpty`] if other files remain in the directory.
    /// In that case the directory is left in place.
    pub fn delete(self, names: &[&str]) -> Result<(), StorageError> {
        for name in names {
            let path = self.join(name);
            if path.is_dir() {
                std::fs::remove_dir(path)?;
            } else {
                self.remove_file(name)?;
            }
        }
        if std::fs::read_dir(&self.path)?.next().is_some() {
            return Err(StorageError::DirectoryNotEmpty(self.path));
        }
        std::fs::remove_dir(&self.path)?;
        Ok(())
    }
}
