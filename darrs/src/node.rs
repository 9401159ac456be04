//! Opening darr containers of any kind.
//!
//! The kind of container in a directory is given by the `darrobject` field of its `arraydescription.json`.

use std::path::{Path, PathBuf};

use darrs_filesystem::{AccessMode, DataDir, StorageError};
use darrs_metadata::{DarrObject, UnsupportedObjectTypeError};
use thiserror::Error;

use crate::array::{ARRAY_DESCRIPTION, Array, ArrayCreateError, ArrayOpenOptions};
use crate::metadata_store::MetadataStore;
use crate::ragged_array::RaggedArray;
use crate::vardim_array::VarDimArray;

/// A node open error.
#[derive(Debug, Error)]
pub enum NodeOpenError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// The description has no `darrobject` string.
    #[error("the description of {0} has no darrobject string")]
    MissingObjectType(PathBuf),
    /// The `darrobject` is not a known container kind.
    #[error(transparent)]
    UnsupportedObjectType(#[from] UnsupportedObjectTypeError),
    /// The container could not be opened.
    #[error(transparent)]
    ArrayCreateError(#[from] ArrayCreateError),
}

/// An open darr container of any kind.
#[derive(Debug, derive_more::From)]
pub enum Node {
    /// An array.
    Array(Array),
    /// A ragged array.
    RaggedArray(RaggedArray),
    /// A variable-dimension array.
    VarDimArray(VarDimArray),
}

impl Node {
    /// Return the kind of container.
    #[must_use]
    pub fn object_type(&self) -> DarrObject {
        match self {
            Self::Array(_) => DarrObject::Array,
            Self::RaggedArray(_) => DarrObject::RaggedArray,
            Self::VarDimArray(_) => DarrObject::VarDimArray,
        }
    }

    /// Return the path of the container directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Array(array) => array.path(),
            Self::RaggedArray(ragged_array) => ragged_array.path(),
            Self::VarDimArray(vardim_array) => vardim_array.path(),
        }
    }

    /// Return the access mode.
    #[must_use]
    pub fn access_mode(&self) -> AccessMode {
        match self {
            Self::Array(array) => array.access_mode(),
            Self::RaggedArray(ragged_array) => ragged_array.access_mode(),
            Self::VarDimArray(vardim_array) => vardim_array.access_mode(),
        }
    }

    /// Return the user metadata.
    #[must_use]
    pub fn metadata(&self) -> &MetadataStore {
        match self {
            Self::Array(array) => array.metadata(),
            Self::RaggedArray(ragged_array) => ragged_array.metadata(),
            Self::VarDimArray(vardim_array) => vardim_array.metadata(),
        }
    }

    /// Return the paths of all files in the container directory, sorted.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the directory cannot be walked.
    pub fn files(&self) -> Result<Vec<PathBuf>, StorageError> {
        match self {
            Self::Array(array) => array.files(),
            Self::RaggedArray(ragged_array) => ragged_array.files(),
            Self::VarDimArray(vardim_array) => vardim_array.files(),
        }
    }
}

/// Open the darr container at `path`, whatever its kind.
///
/// ```
/// # use darrs::array::ArrayBuilder;
/// # use darrs::data_type::NumericType;
/// # use darrs::filesystem::AccessMode;
/// # use darrs::metadata::DarrObject;
/// # use darrs::node::{Node, open_node};
/// # let tmp = tempfile::TempDir::new()?;
/// ArrayBuilder::new(vec![3], NumericType::UInt8).build(tmp.path().join("a.darr"))?;
/// let node = open_node(tmp.path().join("a.darr"), AccessMode::ReadOnly)?;
/// assert_eq!(node.object_type(), DarrObject::Array);
/// assert!(matches!(node, Node::Array(_)));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Errors
/// Returns
///  - [`NodeOpenError::MissingObjectType`] if the description has no `darrobject` string,
///  - [`NodeOpenError::UnsupportedObjectType`] if the `darrobject` is not known, or
///  - [`NodeOpenError::ArrayCreateError`] if the container cannot be opened.
pub fn open_node<P: AsRef<Path>>(path: P, access_mode: AccessMode) -> Result<Node, NodeOpenError> {
    open_node_opt(path, access_mode, &ArrayOpenOptions::default())
}

/// Open the darr container at `path` with non-default options, whatever its kind.
///
/// # Errors
/// See [`open_node`].
pub fn open_node_opt<P: AsRef<Path>>(
    path: P,
    access_mode: AccessMode,
    options: &ArrayOpenOptions,
) -> Result<Node, NodeOpenError> {
    let data_dir = DataDir::open(path)?;
    let description = data_dir.read_json_map(ARRAY_DESCRIPTION)?;
    let object_type: DarrObject = description
        .get("darrobject")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| NodeOpenError::MissingObjectType(data_dir.path().to_path_buf()))?
        .parse()?;
    let path = data_dir.path();
    Ok(match object_type {
        DarrObject::Array => Array::open_opt(path, access_mode, options)?.into(),
        DarrObject::RaggedArray => RaggedArray::open_opt(path, access_mode, options)?.into(),
        DarrObject::VarDimArray => VarDimArray::open_opt(path, access_mode, options)?.into(),
    })
}
