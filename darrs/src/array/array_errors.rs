use std::path::PathBuf;

use darrs_data_type::{NumericType, UnsupportedNumericTypeError};
use darrs_filesystem::StorageError;
use darrs_metadata::{DarrObject, DescriptionError, InvalidFormatVersionError};
use thiserror::Error;

use super::{ArrayShape, ArraySubset};

/// A boxed error from a caller supplied source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An array creation or open error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArrayCreateError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An invalid array description.
    #[error(transparent)]
    DescriptionError(#[from] DescriptionError),
    /// An unsupported numeric type.
    #[error(transparent)]
    UnsupportedNumericType(#[from] UnsupportedNumericTypeError),
    /// An unsupported index type for a ragged or variable-dimension array.
    #[error("unsupported index type {_0}: expected one of int8, uint8, int16, uint16, int32, uint32 or int64")]
    UnsupportedIndexType(NumericType),
    /// An invalid format version.
    #[error(transparent)]
    InvalidFormatVersion(#[from] InvalidFormatVersionError),
    /// An invalid array shape.
    #[error("invalid shape {_0:?}: an array needs at least one dimension and a byte size that fits in 64 bits")]
    InvalidShape(ArrayShape),
    /// The payload file size disagrees with the array description.
    #[error("payload file {} has {actual} bytes, but its description implies {expected} bytes", path.display())]
    Inconsistent {
        /// The payload file path.
        path: PathBuf,
        /// The expected size in bytes.
        expected: u64,
        /// The actual size in bytes.
        actual: u64,
    },
    /// The sub-arrays of a container disagree.
    #[error("container {} is inconsistent: {reason}", path.display())]
    InconsistentContainer {
        /// The container path.
        path: PathBuf,
        /// A description of the inconsistency.
        reason: String,
    },
    /// The directory holds a different kind of darr object.
    #[error("expected a darr {expected}, found {found}")]
    UnexpectedObjectType {
        /// The requested object type.
        expected: DarrObject,
        /// The object type in the description.
        found: DarrObject,
    },
    /// The source yielded no chunks or elements.
    #[error("the source is empty")]
    EmptySource,
    /// The source failed before yielding its first chunk or element.
    #[error("the source failed: {_0}")]
    Source(BoxError),
    /// The destination of a copy is the source itself.
    #[error("cannot copy {} onto itself", _0.display())]
    SamePath(PathBuf),
    /// An array error while writing data.
    #[error(transparent)]
    ArrayError(#[from] ArrayError),
}

/// Array errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArrayError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// The trailing dimensions of a chunk do not match the array.
    #[error("chunk shape {got:?} is incompatible with array shape {expected:?}: the dimensionality and all dimensions but the first must match")]
    ShapeMismatch {
        /// The array shape.
        expected: ArrayShape,
        /// The chunk shape.
        got: ArrayShape,
    },
    /// The element type does not match the numeric type.
    #[error("the element type {got} does not match the numeric type {expected}")]
    IncompatibleElementType {
        /// The numeric type of the array or chunk.
        expected: NumericType,
        /// The numeric type of the element.
        got: NumericType,
    },
    /// An array subset is not within the array shape.
    #[error("array subset {_0} is not compatible with array shape {_1:?}")]
    InvalidArraySubset(ArraySubset, ArrayShape),
    /// Data has the wrong shape.
    #[error("data has shape {_0:?}, expected {_1:?}")]
    InvalidDataShape(ArrayShape, ArrayShape),
    /// Data has the wrong number of bytes or elements.
    #[error("got {_0} bytes, expected {_1}")]
    InvalidBytesLength(usize, u64),
    /// A truncation length is not less than the current length.
    #[error("cannot truncate length {current} to {len}: the new length must be less than the current length")]
    InvalidTruncation {
        /// The requested length.
        len: u64,
        /// The current length.
        current: u64,
    },
    /// An element index is out of bounds.
    #[error("index {index} is out of bounds for length {len}")]
    OutOfBounds {
        /// The index.
        index: u64,
        /// The length.
        len: u64,
    },
    /// An offset or dimension does not fit in the index type.
    #[error("value {value} exceeds the maximum of index type {index_type}")]
    IndexOverflow {
        /// The value that does not fit.
        value: u64,
        /// The index type.
        index_type: NumericType,
    },
    /// Stored indices are corrupt.
    #[error("invalid indices for element {index}: {reason}")]
    InvalidIndices {
        /// The element index.
        index: u64,
        /// A description of the problem.
        reason: String,
    },
    /// Column-major arrays cannot be appended to or truncated.
    #[error("array {} is stored in column-major order and cannot grow or shrink", _0.display())]
    ColumnMajorNotGrowable(PathBuf),
    /// A size does not fit in the address space of the platform.
    #[error("size {_0} exceeds the address space")]
    ExceedsAddressSpace(u64),
    /// An append did not complete.
    #[error(transparent)]
    AppendIncomplete(#[from] Box<AppendIncompleteError>),
}

impl ArrayError {
    /// Returns true if the error rejects the input without anything being written.
    pub(crate) fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch { .. }
                | Self::IncompatibleElementType { .. }
                | Self::InvalidDataShape(..)
                | Self::InvalidBytesLength(..)
                | Self::IndexOverflow { .. }
        )
    }
}

/// An append that failed part way.
///
/// The container has been left consistent with its description, holding exactly the data that was completely written.
#[derive(Debug, Error)]
#[error("appending did not complete ({source}); shape was {shape_before:?} and is now {shape_after:?}")]
pub struct AppendIncompleteError {
    source: BoxError,
    shape_before: ArrayShape,
    shape_after: ArrayShape,
}

impl AppendIncompleteError {
    pub(crate) fn new(source: BoxError, shape_before: ArrayShape, shape_after: ArrayShape) -> Self {
        Self {
            source,
            shape_before,
            shape_after,
        }
    }

    /// Return the error that interrupted the append.
    #[must_use]
    pub fn error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// Consume the error and return the error that interrupted the append.
    #[must_use]
    pub fn into_error(self) -> BoxError {
        self.source
    }

    /// Return the shape before the append.
    ///
    /// Ragged and variable-dimension arrays report `[len]`.
    #[must_use]
    pub fn shape_before(&self) -> &[u64] {
        &self.shape_before
    }

    /// Return the shape after the append.
    #[must_use]
    pub fn shape_after(&self) -> &[u64] {
        &self.shape_after
    }
}

impl From<AppendIncompleteError> for ArrayError {
    fn from(err: AppendIncompleteError) -> Self {
        Self::AppendIncomplete(Box::new(err))
    }
}
