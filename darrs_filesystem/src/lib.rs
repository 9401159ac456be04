//! Filesystem support for darr data directories in the [`darrs`](https://docs.rs/darrs/latest/darrs/index.html) crate.
//!
//! A darr container is a directory of plain files:
//!  - a [`DataDir`] manages the directory itself, its JSON sidecar files and the set of files the container owns, and
//!  - a [`PayloadFile`] manages a raw binary payload, which is grown by appending and accessed through memory maps that only live for the duration of one operation.
//!
//! There is no cross-process locking.
//! A container opened with [`AccessMode::ReadWrite`] is intended for a single writer.
//!
//! ## Licence
//! `darrs_filesystem` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod access_mode;
mod data_dir;
mod payload_file;

pub use access_mode::{AccessMode, InvalidAccessModeError};
pub use data_dir::DataDir;
pub use payload_file::{PayloadAppender, PayloadFile};

use std::path::PathBuf;

use thiserror::Error;

/// A storage error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// A path already exists and overwriting was not permitted.
    #[error("path {} already exists; use overwrite to replace it", _0.display())]
    PathExists(PathBuf),
    /// A path is not a directory.
    #[error("path {} is not a directory", _0.display())]
    NotADirectory(PathBuf),
    /// A write operation was attempted in read-only access mode.
    #[error("{} is opened read-only; open it with access mode \"r+\" to write", _0.display())]
    ReadOnly(PathBuf),
    /// A directory still contains files after its darr files were removed.
    #[error("directory {} contains files that do not belong to it and was not removed", _0.display())]
    DirectoryNotEmpty(PathBuf),
    /// A JSON file could not be parsed or written.
    #[error("invalid JSON in {}: {_1}", _0.display())]
    InvalidJson(PathBuf, serde_json::Error),
    /// A JSON file does not hold an object.
    #[error("JSON file {} does not hold an object", _0.display())]
    NotAJsonObject(PathBuf),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}
