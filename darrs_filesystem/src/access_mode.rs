use std::{path::Path, str::FromStr};

use derive_more::Display;
use thiserror::Error;

use crate::StorageError;

/// An invalid access mode error.
#[derive(Clone, Debug, Error)]
#[error("invalid access mode {_0:?}, expected \"r\" or \"r+\"")]
pub struct InvalidAccessModeError(String);

/// The access mode of a darr container.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Display)]
pub enum AccessMode {
    /// Read-only (`r`). Any number of readers may coexist.
    #[default]
    #[display("r")]
    ReadOnly,
    /// Read-write (`r+`). Intended for a single writer.
    #[display("r+")]
    ReadWrite,
}

impl AccessMode {
    /// Returns true if the access mode permits writes.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::ReadWrite)
    }

    /// Check that the access mode permits writes to the container at `path`.
    ///
    /// # Errors
    /// Returns [`StorageError::ReadOnly`] if the access mode is [`AccessMode::ReadOnly`].
    pub fn check_writable(self, path: &Path) -> Result<(), StorageError> {
        if self.is_writable() {
            Ok(())
        } else {
            Err(StorageError::ReadOnly(path.to_path_buf()))
        }
    }
}

impl FromStr for AccessMode {
    type Err = InvalidAccessModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(Self::ReadOnly),
            "r+" => Ok(Self::ReadWrite),
            _ => Err(InvalidAccessModeError(s.to_string())),
        }
    }
}
