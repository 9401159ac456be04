//! darr arrays.
//!
//! An [`Array`] is a fixed-shape numeric array store: one raw payload file plus a JSON description.
//! The first dimension is the growable axis.
//! Every other dimension is fixed when the array is created.
//!
//! An array can be:
//!  - created with an [`ArrayBuilder`] from a fill value or a fill function,
//!  - created from a stream of [`ArrayChunk`]s with [`Array::from_source`],
//!  - opened with [`Array::open`], which checks that the payload size agrees with the description,
//!  - read and written element-wise through [`ArraySubset`]s,
//!  - grown with [`Array::append`] and [`Array::iter_append`], and
//!  - shrunk with [`Array::truncate`].
//!
//! The payload is memory mapped for the duration of a single read or write and never held open across calls.

mod append;
mod array_builder;
mod array_chunk;
mod array_errors;
mod array_subset;
mod frames;
mod from_source;

use std::num::NonZeroU64;
use std::ops::Range;
use std::path::{Path, PathBuf};

pub use self::array_builder::ArrayBuilder;
pub use self::array_chunk::ArrayChunk;
pub use self::array_errors::{AppendIncompleteError, ArrayCreateError, ArrayError, BoxError};
pub use self::array_subset::{ArraySubset, ArraySubsetError};
pub use self::frames::{FitFrames, FrameIterator, fit_frames};
pub use self::from_source::FromSourceOptions;
pub(crate) use self::append::{AppendSession, AppendStage};

use darrs_data_type::{Element, NumericType, reverse_endianness};
use darrs_filesystem::{AccessMode, DataDir, PayloadFile, StorageError};
use darrs_metadata::{
    ArrayDescription, ArrayOrder, DarrObject, Endianness, FORMAT_VERSION, FormatVersion,
};

use crate::metadata_store::{METADATA_FILE, MetadataStore};

/// An array shape. The first dimension is the growable axis.
pub type ArrayShape = Vec<u64>;

/// Indices of an element in an array.
pub type ArrayIndices = Vec<u64>;

/// The default number of bytes per chunk when streaming rows.
pub const DEFAULT_CHUNK_BYTES: u64 = 80 * 1024 * 1024;

pub(crate) const ARRAY_VALUES: &str = "arrayvalues.bin";
pub(crate) const ARRAY_DESCRIPTION: &str = "arraydescription.json";
pub(crate) const README: &str = "README.txt";

/// Options for opening darr containers.
#[derive(Clone, Debug)]
pub struct ArrayOpenOptions {
    pub(crate) format_version: String,
}

impl Default for ArrayOpenOptions {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
        }
    }
}

impl ArrayOpenOptions {
    /// Set the format version that descriptions are compared against.
    ///
    /// A description written by a newer version opens with a warning.
    /// Defaults to [`FORMAT_VERSION`].
    pub fn format_version(&mut self, format_version: impl Into<String>) -> &mut Self {
        self.format_version = format_version.into();
        self
    }
}

/// A darr array.
///
/// ## Reading
/// Reads copy elements out of a transient memory map into native byte order and row-major layout.
///  - [`retrieve_chunk`](Array::retrieve_chunk) returns a type-erased [`ArrayChunk`],
///  - [`retrieve_array_subset_elements`](Array::retrieve_array_subset_elements), [`retrieve_rows_elements`](Array::retrieve_rows_elements), [`retrieve_elements`](Array::retrieve_elements) and [`retrieve_element`](Array::retrieve_element) return typed elements, and
///  - [`retrieve_array_subset_ndarray`](Array::retrieve_array_subset_ndarray) and [`retrieve_ndarray`](Array::retrieve_ndarray) return [`ndarray`] arrays.
///
/// ## Writing
/// Writes require [`AccessMode::ReadWrite`].
/// Elements must have the numeric type of the array.
///
/// ## Column-major arrays
/// Arrays written by other tools in column-major (`F`) order can be read and written element-wise, but cannot be appended to or truncated.
#[derive(Debug)]
pub struct Array {
    data_dir: DataDir,
    payload: PayloadFile,
    access_mode: AccessMode,
    description: ArrayDescription,
    numeric_type: NumericType,
    metadata: MetadataStore,
}

impl Array {
    /// The names of the files that belong to an array.
    pub const PROTECTED_FILES: [&'static str; 4] =
        [ARRAY_DESCRIPTION, ARRAY_VALUES, README, METADATA_FILE];

    /// Open an existing array.
    ///
    /// # Errors
    /// Returns an [`ArrayCreateError`] if the description is missing, malformed or describes another kind of darr object,
    /// or if the payload size disagrees with the description.
    pub fn open<P: AsRef<Path>>(path: P, access_mode: AccessMode) -> Result<Self, ArrayCreateError> {
        Self::open_opt(path, access_mode, &ArrayOpenOptions::default())
    }

    /// Open an existing array with non-default options.
    ///
    /// # Errors
    /// See [`Array::open`].
    pub fn open_opt<P: AsRef<Path>>(
        path: P,
        access_mode: AccessMode,
        options: &ArrayOpenOptions,
    ) -> Result<Self, ArrayCreateError> {
        let data_dir = DataDir::open(path)?;
        let description =
            ArrayDescription::from_json_map(data_dir.read_json_map(ARRAY_DESCRIPTION)?)?;
        if description.darrobject != DarrObject::Array {
            return Err(ArrayCreateError::UnexpectedObjectType {
                expected: DarrObject::Array,
                found: description.darrobject,
            });
        }
        check_format_version(
            &description.darrversion,
            &options.format_version,
            data_dir.path(),
        )?;
        let numeric_type: NumericType = description.numtype.parse()?;
        let expected = checked_nbytes(&description.shape, numeric_type)
            .ok_or_else(|| ArrayCreateError::InvalidShape(description.shape.clone()))?;
        let payload = PayloadFile::new(data_dir.join(ARRAY_VALUES));
        let actual = payload.size()?;
        if expected != actual {
            return Err(ArrayCreateError::Inconsistent {
                path: payload.path().to_path_buf(),
                expected,
                actual,
            });
        }
        let metadata = MetadataStore::new(data_dir.clone(), access_mode);
        Ok(Self {
            data_dir,
            payload,
            access_mode,
            description,
            numeric_type,
            metadata,
        })
    }

    /// Return the path of the array directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Return the path of the payload file.
    #[must_use]
    pub fn payload_path(&self) -> &Path {
        self.payload.path()
    }

    /// Return the shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.description.shape
    }

    /// Return the length of the first dimension.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.description.shape[0]
    }

    /// Returns true if the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_elements() == 0
    }

    /// Return the number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.description.shape.len()
    }

    /// Return the number of elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.description.num_elements()
    }

    /// Return the numeric type.
    #[must_use]
    pub fn numeric_type(&self) -> NumericType {
        self.numeric_type
    }

    /// Return the size of an element in bytes.
    #[must_use]
    pub fn itemsize(&self) -> usize {
        self.numeric_type.size()
    }

    /// Return the size of the payload in bytes.
    #[must_use]
    pub fn nbytes(&self) -> u64 {
        self.num_elements() * self.itemsize() as u64
    }

    /// Return the byte order of the payload.
    #[must_use]
    pub fn endianness(&self) -> Endianness {
        self.description.byteorder
    }

    /// Return the layout order of the payload.
    #[must_use]
    pub fn array_order(&self) -> ArrayOrder {
        self.description.arrayorder
    }

    /// Return the format version of the description.
    #[must_use]
    pub fn format_version(&self) -> &str {
        &self.description.darrversion
    }

    /// Return the access mode.
    #[must_use]
    pub fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    /// Set the access mode.
    pub fn set_access_mode(&mut self, access_mode: AccessMode) {
        self.access_mode = access_mode;
        self.metadata.set_access_mode(access_mode);
    }

    /// Return the description.
    #[must_use]
    pub fn description(&self) -> &ArrayDescription {
        &self.description
    }

    /// Return the user metadata.
    #[must_use]
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Return the paths of all files in the array directory, sorted.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the directory cannot be walked.
    pub fn files(&self) -> Result<Vec<PathBuf>, StorageError> {
        self.data_dir.files()
    }

    /// Return the number of elements in a row, i.e. the product of all dimensions but the first.
    #[must_use]
    pub fn row_elements(&self) -> u64 {
        self.description.shape[1..].iter().product()
    }

    pub(crate) fn row_bytes(&self) -> u64 {
        self.row_elements() * self.itemsize() as u64
    }

    /// Return the default number of rows per chunk when streaming the array.
    #[must_use]
    pub fn default_chunk_len(&self) -> NonZeroU64 {
        default_chunk_len(self.row_bytes())
    }

    /// Return an array subset spanning the whole array.
    #[must_use]
    pub fn subset_all(&self) -> ArraySubset {
        ArraySubset::new_with_shape(self.shape().to_vec())
    }

    /// Return an array subset spanning `rows` and every element of each row.
    #[must_use]
    pub fn subset_rows(&self, rows: Range<u64>) -> ArraySubset {
        ArraySubset::from(
            std::iter::once(rows).chain(self.description.shape[1..].iter().map(|&dim| 0..dim)),
        )
    }

    /// Read an array subset.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidArraySubset`] if the subset is not within the array, or a [`StorageError`] if the payload cannot be mapped.
    pub fn retrieve_chunk(&self, array_subset: &ArraySubset) -> Result<ArrayChunk, ArrayError> {
        self.check_subset(array_subset)?;
        let itemsize = self.itemsize();
        let runs = array_subset.contiguous_runs(self.shape(), self.array_order());
        let num_bytes = to_usize(array_subset.num_elements() * itemsize as u64)?;
        let mut bytes = self.payload.with_map(to_usize(self.nbytes())?, |payload| {
            let mut bytes = Vec::with_capacity(num_bytes);
            for (offset, len) in runs {
                bytes.extend_from_slice(&payload[byte_range(offset, len, itemsize)]);
            }
            bytes
        })?;
        if !self.endianness().is_native() {
            reverse_endianness(&mut bytes, self.numeric_type);
        }
        ArrayChunk::new(bytes, self.numeric_type, array_subset.shape().to_vec())
    }

    /// Read the rows in `rows`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidArraySubset`] if `rows` is not within the array, or a [`StorageError`] if the payload cannot be mapped.
    pub fn retrieve_rows_chunk(&self, rows: Range<u64>) -> Result<ArrayChunk, ArrayError> {
        self.retrieve_chunk(&self.subset_rows(rows))
    }

    /// Read the elements of an array subset.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementType`] if `T` does not match the numeric type of the array, or see [`Array::retrieve_chunk`].
    pub fn retrieve_array_subset_elements<T: Element>(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<Vec<T>, ArrayError> {
        self.check_element_type::<T>()?;
        self.retrieve_chunk(array_subset)?.into_elements()
    }

    /// Read the elements of the rows in `rows`.
    ///
    /// # Errors
    /// See [`Array::retrieve_array_subset_elements`].
    pub fn retrieve_rows_elements<T: Element>(
        &self,
        rows: Range<u64>,
    ) -> Result<Vec<T>, ArrayError> {
        self.retrieve_array_subset_elements(&self.subset_rows(rows))
    }

    /// Read all elements.
    ///
    /// # Errors
    /// See [`Array::retrieve_array_subset_elements`].
    pub fn retrieve_elements<T: Element>(&self) -> Result<Vec<T>, ArrayError> {
        self.retrieve_array_subset_elements(&self.subset_all())
    }

    /// Read the element at `indices`.
    ///
    /// # Errors
    /// See [`Array::retrieve_array_subset_elements`].
    pub fn retrieve_element<T: Element>(&self, indices: &[u64]) -> Result<T, ArrayError> {
        let array_subset = element_subset(indices);
        self.retrieve_array_subset_elements(&array_subset)?
            .into_iter()
            .next()
            .ok_or_else(|| ArrayError::InvalidArraySubset(array_subset, self.shape().to_vec()))
    }

    #[cfg(feature = "ndarray")]
    /// Read an array subset into an [`ndarray::ArrayD`].
    ///
    /// # Errors
    /// See [`Array::retrieve_array_subset_elements`].
    pub fn retrieve_array_subset_ndarray<T: Element>(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<ndarray::ArrayD<T>, ArrayError> {
        let elements = self.retrieve_array_subset_elements(array_subset)?;
        elements_to_ndarray(array_subset.shape(), elements)
    }

    #[cfg(feature = "ndarray")]
    /// Read the whole array into an [`ndarray::ArrayD`].
    ///
    /// # Errors
    /// See [`Array::retrieve_array_subset_elements`].
    pub fn retrieve_ndarray<T: Element>(&self) -> Result<ndarray::ArrayD<T>, ArrayError> {
        self.retrieve_array_subset_ndarray(&self.subset_all())
    }

    /// Write `chunk` to an array subset.
    ///
    /// The chunk is cast to the numeric type of the array.
    ///
    /// # Errors
    /// Returns
    ///  - [`StorageError::ReadOnly`] if the array is not writable,
    ///  - [`ArrayError::InvalidArraySubset`] if the subset is not within the array,
    ///  - [`ArrayError::InvalidDataShape`] if the chunk does not have as many elements as the subset, or
    ///  - a [`StorageError`] if the payload cannot be mapped.
    pub fn store_chunk(
        &self,
        array_subset: &ArraySubset,
        chunk: ArrayChunk,
    ) -> Result<(), ArrayError> {
        self.access_mode.check_writable(self.path())?;
        self.check_subset(array_subset)?;
        if chunk.num_elements() != array_subset.num_elements() {
            return Err(ArrayError::InvalidDataShape(
                chunk.shape().to_vec(),
                array_subset.shape().to_vec(),
            ));
        }
        let mut bytes = chunk.cast(self.numeric_type).into_bytes();
        if !self.endianness().is_native() {
            reverse_endianness(&mut bytes, self.numeric_type);
        }
        let itemsize = self.itemsize();
        let runs = array_subset.contiguous_runs(self.shape(), self.array_order());
        self.payload
            .with_map_mut(to_usize(self.nbytes())?, |payload| {
                let mut position = 0;
                for (offset, len) in runs {
                    let range = byte_range(offset, len, itemsize);
                    let next = position + range.len();
                    payload[range].copy_from_slice(&bytes[position..next]);
                    position = next;
                }
            })?;
        Ok(())
    }

    /// Write elements to an array subset.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementType`] if `T` does not match the numeric type of the array,
    /// [`ArrayError::InvalidBytesLength`] if the number of elements does not match the subset, or see [`Array::store_chunk`].
    pub fn store_array_subset_elements<T: Element>(
        &self,
        array_subset: &ArraySubset,
        elements: &[T],
    ) -> Result<(), ArrayError> {
        self.check_element_type::<T>()?;
        let chunk = ArrayChunk::from_elements(elements.to_vec(), array_subset.shape().to_vec())?;
        self.store_chunk(array_subset, chunk)
    }

    /// Write the element at `indices`.
    ///
    /// # Errors
    /// See [`Array::store_array_subset_elements`].
    pub fn store_element<T: Element>(&self, indices: &[u64], element: T) -> Result<(), ArrayError> {
        self.store_array_subset_elements(&element_subset(indices), &[element])
    }

    #[cfg(feature = "ndarray")]
    /// Write an [`ndarray::Array`] to the array subset starting at `subset_start`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidArraySubset`] if the dimensionality of `subset_start` does not match the array, or see [`Array::store_array_subset_elements`].
    pub fn store_array_subset_ndarray<T: Element, D: ndarray::Dimension>(
        &self,
        subset_start: &[u64],
        array: ndarray::Array<T, D>,
    ) -> Result<(), ArrayError> {
        self.check_element_type::<T>()?;
        let chunk = ArrayChunk::from(array);
        let array_subset =
            ArraySubset::new_with_start_shape(subset_start.to_vec(), chunk.shape().to_vec())
                .map_err(|_| {
                    ArrayError::InvalidArraySubset(
                        element_subset(subset_start),
                        self.shape().to_vec(),
                    )
                })?;
        self.store_chunk(&array_subset, chunk)
    }

    /// Truncate the array to `len` rows.
    ///
    /// `len` must be less than the current length.
    /// Truncating to zero is permitted.
    ///
    /// # Errors
    /// Returns
    ///  - [`ArrayError::InvalidTruncation`] if `len` is not less than the current length,
    ///  - [`StorageError::ReadOnly`] if the array is not writable,
    ///  - [`ArrayError::ColumnMajorNotGrowable`] if the array is column-major, or
    ///  - a [`StorageError`] if the payload or description cannot be written.
    pub fn truncate(&mut self, len: u64) -> Result<(), ArrayError> {
        if len >= self.len() {
            return Err(ArrayError::InvalidTruncation {
                len,
                current: self.len(),
            });
        }
        self.truncate_to(len)
    }

    /// Truncate the array to `len` rows. Truncating to the current length does nothing.
    pub(crate) fn truncate_to(&mut self, len: u64) -> Result<(), ArrayError> {
        self.check_growable()?;
        let current = self.len();
        if len == current {
            return Ok(());
        } else if len > current {
            return Err(ArrayError::InvalidTruncation { len, current });
        }
        self.payload.set_len(len * self.row_bytes())?;
        let mut shape = self.shape().to_vec();
        shape[0] = len;
        self.write_shape(shape)?;
        log::debug!("truncated {} from {current} to {len} rows", self.path().display());
        Ok(())
    }

    /// Delete the array.
    ///
    /// The files in [`PROTECTED_FILES`](Array::PROTECTED_FILES) are removed, then the directory.
    ///
    /// # Errors
    /// Returns [`StorageError::ReadOnly`] if the array is not writable,
    /// or [`StorageError::DirectoryNotEmpty`] if other files remain in the directory, which is then kept.
    pub fn delete(self) -> Result<(), ArrayError> {
        self.access_mode.check_writable(self.path())?;
        self.data_dir.delete(&Self::PROTECTED_FILES)?;
        Ok(())
    }

    /// Return an iterator over frames of `frame_len` rows spanning the array.
    ///
    /// Use [`FrameIterator`] directly for a partial range.
    #[must_use]
    pub fn iter_frames(&self, frame_len: NonZeroU64) -> FrameIterator {
        FrameIterator::new(0..self.len(), frame_len)
    }

    /// Return an iterator reading the rows of each frame as an [`ArrayChunk`].
    ///
    /// ```
    /// # use std::num::NonZeroU64;
    /// # use darrs::array::ArrayBuilder;
    /// # use darrs::data_type::NumericType;
    /// # let tmp = tempfile::TempDir::new()?;
    /// let array = ArrayBuilder::new(vec![5], NumericType::UInt8).fill_value(1u8).build(tmp.path().join("a.darr"))?;
    /// let frames = array.iter_frames(NonZeroU64::new(2).unwrap());
    /// let lens: Vec<u64> = array
    ///     .iter_chunks(frames)
    ///     .map(|chunk| chunk.map(|chunk| chunk.len()))
    ///     .collect::<Result<_, _>>()?;
    /// assert_eq!(lens, vec![2, 2, 1]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn iter_chunks<I>(&self, frames: I) -> impl Iterator<Item = Result<ArrayChunk, ArrayError>>
    where
        I: IntoIterator<Item = Range<u64>>,
    {
        frames
            .into_iter()
            .map(|rows| self.retrieve_rows_chunk(rows))
    }

    /// Copy the array to `path` through [`Array::from_source`].
    ///
    /// The numeric type and metadata of this array are used unless `options` sets them.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError::SamePath`] if `path` is this array, or see [`Array::from_source`].
    pub fn copy<P: AsRef<Path>>(
        &self,
        path: P,
        options: &FromSourceOptions,
    ) -> Result<Self, ArrayCreateError> {
        let path = path.as_ref();
        check_distinct_paths(self.path(), path)?;
        let mut options = options.clone();
        if options.numeric_type.is_none() {
            options.numeric_type = Some(self.numeric_type);
        }
        if options.metadata.is_none() {
            options.metadata = Some(self.metadata.to_map()?);
        }
        let chunk_len = options
            .chunk_len
            .unwrap_or_else(|| self.default_chunk_len());
        let frames: Box<dyn Iterator<Item = Range<u64>>> = if self.len() == 0 {
            Box::new(std::iter::once(0..0))
        } else {
            Box::new(self.iter_frames(chunk_len))
        };
        Self::from_source(path, self.iter_chunks(frames), &options)
    }

    pub(crate) fn check_growable(&self) -> Result<(), ArrayError> {
        self.access_mode.check_writable(self.path())?;
        if self.array_order() == ArrayOrder::F {
            return Err(ArrayError::ColumnMajorNotGrowable(self.path().to_path_buf()));
        }
        Ok(())
    }

    /// Rewrite the description with a new shape.
    ///
    /// The shape held in memory only changes once the description is on disk.
    pub(crate) fn write_shape(&mut self, shape: ArrayShape) -> Result<(), StorageError> {
        let description = ArrayDescription {
            shape,
            ..self.description.clone()
        };
        self.data_dir
            .write_json(ARRAY_DESCRIPTION, &description)?;
        self.description = description;
        Ok(())
    }

    fn check_subset(&self, array_subset: &ArraySubset) -> Result<(), ArrayError> {
        if array_subset.inbounds_shape(self.shape()) {
            Ok(())
        } else {
            Err(ArrayError::InvalidArraySubset(
                array_subset.clone(),
                self.shape().to_vec(),
            ))
        }
    }

    fn check_element_type<T: Element>(&self) -> Result<(), ArrayError> {
        if T::NUMERIC_TYPE == self.numeric_type {
            Ok(())
        } else {
            Err(ArrayError::IncompatibleElementType {
                expected: self.numeric_type,
                got: T::NUMERIC_TYPE,
            })
        }
    }
}

/// Warn if a description was written by a newer format version than `reader_version`.
pub(crate) fn check_format_version(
    file_version: &str,
    reader_version: &str,
    path: &Path,
) -> Result<(), ArrayCreateError> {
    let file: FormatVersion = file_version.parse()?;
    let reader: FormatVersion = reader_version.parse()?;
    if file > reader {
        log::warn!(
            "{} was written with darr format version {file}, which is newer than {reader}; it may not be read correctly",
            path.display()
        );
    }
    Ok(())
}

/// Return an error if `destination` is the same directory as `source`.
pub(crate) fn check_distinct_paths(source: &Path, destination: &Path) -> Result<(), ArrayCreateError> {
    let same = match (source.canonicalize(), destination.canonicalize()) {
        (Ok(source), Ok(destination)) => source == destination,
        _ => false,
    };
    if same {
        Err(ArrayCreateError::SamePath(destination.to_path_buf()))
    } else {
        Ok(())
    }
}

/// Return the number of payload bytes for `shape`, or [`None`] if the shape is zero-dimensional or the size overflows.
pub(crate) fn checked_nbytes(shape: &[u64], numeric_type: NumericType) -> Option<u64> {
    if shape.is_empty() {
        return None;
    }
    shape
        .iter()
        .try_fold(numeric_type.size() as u64, |acc, &dim| acc.checked_mul(dim))
}

/// Return the default number of rows per chunk for rows of `row_bytes` bytes.
pub(crate) fn default_chunk_len(row_bytes: u64) -> NonZeroU64 {
    NonZeroU64::new(DEFAULT_CHUNK_BYTES / row_bytes.max(1)).unwrap_or(NonZeroU64::MIN)
}

fn element_subset(indices: &[u64]) -> ArraySubset {
    ArraySubset::from(indices.iter().map(|&index| index..index.saturating_add(1)))
}

fn to_usize(value: u64) -> Result<usize, ArrayError> {
    usize::try_from(value).map_err(|_| ArrayError::ExceedsAddressSpace(value))
}

/// Return the byte range of a run of elements. The run must be within a mapped payload.
#[allow(clippy::cast_possible_truncation)]
fn byte_range(offset: u64, len: u64, itemsize: usize) -> Range<usize> {
    let start = offset as usize * itemsize;
    start..start + len as usize * itemsize
}

#[cfg(feature = "ndarray")]
/// Convert a vector of elements to an [`ndarray::ArrayD`].
///
/// # Errors
/// Returns an error if the length of `elements` is not equal to the product of the components in `shape`.
pub fn elements_to_ndarray<T>(
    shape: &[u64],
    elements: Vec<T>,
) -> Result<ndarray::ArrayD<T>, ArrayError> {
    let length = elements.len();
    let shape_usize = shape
        .iter()
        .map(|&dim| to_usize(dim))
        .collect::<Result<Vec<_>, _>>()?;
    ndarray::ArrayD::<T>::from_shape_vec(shape_usize, elements)
        .map_err(|_| ArrayError::InvalidDataShape(vec![length as u64], shape.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_checked_nbytes() {
        assert_eq!(checked_nbytes(&[5, 2], NumericType::Int64), Some(80));
        assert_eq!(checked_nbytes(&[0, 2], NumericType::Int64), Some(0));
        assert_eq!(checked_nbytes(&[], NumericType::Int64), None);
        assert_eq!(checked_nbytes(&[u64::MAX, 2], NumericType::UInt8), None);
    }

    #[test]
    fn array_default_chunk_len() {
        assert_eq!(default_chunk_len(0).get(), DEFAULT_CHUNK_BYTES);
        assert_eq!(default_chunk_len(16).get(), DEFAULT_CHUNK_BYTES / 16);
        assert_eq!(default_chunk_len(u64::MAX).get(), 1);
    }

    #[test]
    fn array_open_and_query() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let path = tmp.path().join("array.darr");
        ArrayBuilder::new(vec![3, 2], NumericType::Float32)
            .fill_fn(|indices: &[u64]| (indices[0] * 10 + indices[1]) as f32)
            .build(&path)?;
        let array = Array::open(&path, AccessMode::ReadOnly)?;
        assert_eq!(array.shape(), &[3, 2]);
        assert_eq!(array.len(), 3);
        assert_eq!(array.ndim(), 2);
        assert_eq!(array.itemsize(), 4);
        assert_eq!(array.nbytes(), 24);
        assert_eq!(array.row_elements(), 2);
        assert_eq!(array.format_version(), FORMAT_VERSION);
        assert_eq!(array.endianness(), Endianness::native());
        assert_eq!(
            array.retrieve_elements::<f32>()?,
            vec![0.0, 1.0, 10.0, 11.0, 20.0, 21.0]
        );
        assert_eq!(array.retrieve_element::<f32>(&[2, 1])?, 21.0);
        assert!(matches!(
            array.retrieve_element::<f32>(&[3, 0]),
            Err(ArrayError::InvalidArraySubset(..))
        ));
        assert!(matches!(
            array.retrieve_elements::<f64>(),
            Err(ArrayError::IncompatibleElementType { .. })
        ));
        assert!(matches!(
            array.store_element(&[0, 0], 1.0f32),
            Err(ArrayError::StorageError(StorageError::ReadOnly(_)))
        ));
        Ok(())
    }

    #[test]
    fn array_open_inconsistent() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let path = tmp.path().join("array.darr");
        ArrayBuilder::new(vec![4], NumericType::Int16).build(&path)?;
        std::fs::write(path.join(ARRAY_VALUES), [0u8; 6])?;
        assert!(matches!(
            Array::open(&path, AccessMode::ReadOnly),
            Err(ArrayCreateError::Inconsistent {
                expected: 8,
                actual: 6,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn array_big_endian_and_column_major() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let path = tmp.path();
        let values: [u16; 6] = [1, 2, 3, 4, 5, 6];
        let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_be_bytes()).collect();
        std::fs::write(path.join(ARRAY_VALUES), bytes)?;
        std::fs::write(
            path.join(ARRAY_DESCRIPTION),
            r#"{"arrayorder": "F", "byteorder": "big", "darrversion": "0.4.0", "numtype": "uint16", "shape": [2, 3]}"#,
        )?;
        let mut array = Array::open(path, AccessMode::ReadWrite)?;
        // column-major [[1, 3, 5], [2, 4, 6]]
        assert_eq!(array.retrieve_elements::<u16>()?, vec![1, 3, 5, 2, 4, 6]);
        assert_eq!(array.retrieve_rows_elements::<u16>(1..2)?, vec![2, 4, 6]);

        array.store_element(&[1, 0], 20u16)?;
        assert_eq!(array.retrieve_element::<u16>(&[1, 0])?, 20);
        assert_eq!(&std::fs::read(path.join(ARRAY_VALUES))?[2..4], &[0, 20]);

        assert!(matches!(
            array.truncate(1),
            Err(ArrayError::ColumnMajorNotGrowable(_))
        ));
        assert!(matches!(
            array.append(vec![1u16, 2, 3]),
            Err(ArrayError::ColumnMajorNotGrowable(_))
        ));
        Ok(())
    }
}
