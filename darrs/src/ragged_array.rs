//! darr ragged arrays.
//!
//! A [`RaggedArray`] is a sequence of subarrays that are identical in all dimensions except the first.
//! It is stored as a directory holding
//!  - `values/`: an [`Array`] concatenating every subarray along the first axis,
//!  - `indices/`: an [`Array`] of shape `(n, 2)` holding the `[start, end)` rows of each subarray in `values`, and
//!  - `arraydescription.json`: a summary of the container.
//!
//! The indices partition the values contiguously and in order.

mod ragged_append;
mod ragged_array_builder;

use std::ops::Range;
use std::path::{Path, PathBuf};

pub(crate) use self::ragged_append::{RaggedAppendSession, offsets_chunk};
pub use self::ragged_array_builder::RaggedArrayBuilder;

use darrs_data_type::{Element, NumericType, Scalar};
use darrs_filesystem::{AccessMode, DataDir, StorageError};
use darrs_metadata::{DarrObject, RaggedArrayDescription};

use crate::array::{
    ARRAY_DESCRIPTION, Array, ArrayChunk, ArrayCreateError, ArrayError, ArrayOpenOptions,
    BoxError, FromSourceOptions, README, check_distinct_paths, check_format_version,
};
use crate::metadata_store::{METADATA_FILE, MetadataStore};

pub(crate) const VALUES: &str = "values";
pub(crate) const INDICES: &str = "indices";

/// The default index type of ragged and variable-dimension arrays.
pub const DEFAULT_INDEX_TYPE: NumericType = NumericType::Int64;

/// A darr ragged array.
#[derive(Debug)]
pub struct RaggedArray {
    data_dir: DataDir,
    access_mode: AccessMode,
    values: Array,
    indices: Array,
    description: RaggedArrayDescription,
    metadata: MetadataStore,
}

impl RaggedArray {
    /// The names of the files and directories that belong to a ragged array.
    pub const PROTECTED_FILES: [&'static str; 5] =
        [VALUES, INDICES, README, METADATA_FILE, ARRAY_DESCRIPTION];

    /// Open an existing ragged array.
    ///
    /// # Errors
    /// Returns an [`ArrayCreateError`] if the summary description or either sub-array cannot be opened,
    /// or [`ArrayCreateError::InconsistentContainer`] if the indices do not fit the values.
    pub fn open<P: AsRef<Path>>(path: P, access_mode: AccessMode) -> Result<Self, ArrayCreateError> {
        Self::open_opt(path, access_mode, &ArrayOpenOptions::default())
    }

    /// Open an existing ragged array with non-default options.
    ///
    /// # Errors
    /// See [`RaggedArray::open`].
    pub fn open_opt<P: AsRef<Path>>(
        path: P,
        access_mode: AccessMode,
        options: &ArrayOpenOptions,
    ) -> Result<Self, ArrayCreateError> {
        let data_dir = DataDir::open(path)?;
        let mut description =
            RaggedArrayDescription::from_json_map(data_dir.read_json_map(ARRAY_DESCRIPTION)?)?;
        if description.darrobject != DarrObject::RaggedArray {
            return Err(ArrayCreateError::UnexpectedObjectType {
                expected: DarrObject::RaggedArray,
                found: description.darrobject,
            });
        }
        check_format_version(
            &description.darrversion,
            &options.format_version,
            data_dir.path(),
        )?;
        let values = Array::open_opt(data_dir.join(VALUES), access_mode, options)?;
        let indices = Array::open_opt(data_dir.join(INDICES), access_mode, options)?;

        let inconsistent = |reason: String| ArrayCreateError::InconsistentContainer {
            path: data_dir.path().to_path_buf(),
            reason,
        };
        if indices.ndim() != 2 || indices.shape()[1] != 2 {
            return Err(inconsistent(format!(
                "indices have shape {:?}, expected (n, 2)",
                indices.shape()
            )));
        }
        check_index_type(indices.numeric_type())?;
        let values_len = match indices.len() {
            0 => 0,
            len => index_row(&indices, len - 1)?.end,
        };
        if values_len != values.len() {
            return Err(inconsistent(format!(
                "the last index ends at {values_len}, but the values have length {}",
                values.len()
            )));
        }

        let summary = RaggedArrayDescription {
            atom: values.shape()[1..].to_vec(),
            darrobject: DarrObject::RaggedArray,
            darrversion: description.darrversion.clone(),
            len: indices.len(),
            numtype: values.numeric_type().name().to_string(),
            size: values.num_elements(),
        };
        if summary != description {
            log::warn!(
                "the summary description of {} is stale and was derived from its values and indices",
                data_dir.path().display()
            );
            description = summary;
        }
        let metadata = MetadataStore::new(data_dir.clone(), access_mode);
        Ok(Self {
            data_dir,
            access_mode,
            values,
            indices,
            description,
            metadata,
        })
    }

    /// Return the path of the ragged array directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Return the path of the values array.
    #[must_use]
    pub fn values_path(&self) -> &Path {
        self.values.path()
    }

    /// Return the path of the indices array.
    #[must_use]
    pub fn indices_path(&self) -> &Path {
        self.indices.path()
    }

    /// Return the values array.
    #[must_use]
    pub fn values(&self) -> &Array {
        &self.values
    }

    /// Return the indices array.
    #[must_use]
    pub fn indices(&self) -> &Array {
        &self.indices
    }

    /// Return the number of elements.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.description.len
    }

    /// Returns true if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the total number of values.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.description.size
    }

    /// Return the shape shared by every element excluding its first axis.
    #[must_use]
    pub fn atom(&self) -> &[u64] {
        &self.description.atom
    }

    /// Return the numeric type of the values.
    #[must_use]
    pub fn numeric_type(&self) -> NumericType {
        self.values.numeric_type()
    }

    /// Return the numeric type of the indices.
    #[must_use]
    pub fn index_type(&self) -> NumericType {
        self.indices.numeric_type()
    }

    /// Return the summary description.
    #[must_use]
    pub fn description(&self) -> &RaggedArrayDescription {
        &self.description
    }

    /// Return the user metadata.
    #[must_use]
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Return the access mode.
    #[must_use]
    pub fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    /// Set the access mode of the ragged array and its sub-arrays.
    pub fn set_access_mode(&mut self, access_mode: AccessMode) {
        self.access_mode = access_mode;
        self.values.set_access_mode(access_mode);
        self.indices.set_access_mode(access_mode);
        self.metadata.set_access_mode(access_mode);
    }

    /// Return the paths of all files in the ragged array directory, sorted.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the directory cannot be walked.
    pub fn files(&self) -> Result<Vec<PathBuf>, StorageError> {
        self.data_dir.files()
    }

    /// Return the range of rows of element `index` in the values.
    ///
    /// # Errors
    /// Returns [`ArrayError::OutOfBounds`] if `index` is not less than the length,
    /// or [`ArrayError::InvalidIndices`] if the stored indices are corrupt.
    pub fn element_range(&self, index: u64) -> Result<Range<u64>, ArrayError> {
        if index >= self.len() {
            return Err(ArrayError::OutOfBounds {
                index,
                len: self.len(),
            });
        }
        let range = index_row(&self.indices, index)?;
        if range.end > self.values.len() {
            return Err(ArrayError::InvalidIndices {
                index,
                reason: format!(
                    "end {} exceeds the values length {}",
                    range.end,
                    self.values.len()
                ),
            });
        }
        Ok(range)
    }

    /// Read element `index`.
    ///
    /// The chunk has shape `(end - start, *atom)`.
    ///
    /// # Errors
    /// See [`RaggedArray::element_range`].
    pub fn get_chunk(&self, index: u64) -> Result<ArrayChunk, ArrayError> {
        self.values.retrieve_rows_chunk(self.element_range(index)?)
    }

    /// Read the values of element `index`.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementType`] if `T` does not match the numeric type, or see [`RaggedArray::element_range`].
    pub fn get_elements<T: Element>(&self, index: u64) -> Result<Vec<T>, ArrayError> {
        self.values
            .retrieve_rows_elements(self.element_range(index)?)
    }

    #[cfg(feature = "ndarray")]
    /// Read element `index` into an [`ndarray::ArrayD`].
    ///
    /// # Errors
    /// See [`RaggedArray::get_elements`].
    pub fn get_ndarray<T: Element>(&self, index: u64) -> Result<ndarray::ArrayD<T>, ArrayError> {
        let range = self.element_range(index)?;
        self.values
            .retrieve_array_subset_ndarray(&self.values.subset_rows(range))
    }

    /// Return an iterator reading the elements at `indices`.
    ///
    /// Pass a range for consecutive elements, or step through it with [`Iterator::step_by`].
    pub fn iter_chunks<I>(&self, indices: I) -> impl Iterator<Item = Result<ArrayChunk, ArrayError>>
    where
        I: IntoIterator<Item = u64>,
    {
        indices.into_iter().map(|index| self.get_chunk(index))
    }

    /// Verify that the indices partition the values contiguously and in order.
    ///
    /// This reads every index.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidIndices`] for the first element that breaks the partition.
    pub fn check_partition(&self) -> Result<(), ArrayError> {
        let mut expected_start = 0;
        let frames = self.indices.iter_frames(self.indices.default_chunk_len());
        let mut index = 0;
        for chunk in self.indices.iter_chunks(frames) {
            for row in chunk?.to_scalars().chunks_exact(2) {
                let (start, end) = (to_offset(row[0], index)?, to_offset(row[1], index)?);
                if start != expected_start || end < start {
                    return Err(ArrayError::InvalidIndices {
                        index,
                        reason: format!("[{start}, {end}) does not follow {expected_start}"),
                    });
                }
                expected_start = end;
                index += 1;
            }
        }
        if expected_start == self.values.len() {
            Ok(())
        } else {
            Err(ArrayError::InvalidIndices {
                index: index.saturating_sub(1),
                reason: format!(
                    "the indices end at {expected_start}, but the values have length {}",
                    self.values.len()
                ),
            })
        }
    }

    /// Append an element.
    ///
    /// The trailing dimensions of the element must match the atom shape.
    /// The element is cast to the numeric type of the values.
    ///
    /// # Errors
    /// Returns
    ///  - [`ArrayError::ShapeMismatch`] if the element does not match the atom shape, in which case nothing is written,
    ///  - [`ArrayError::IndexOverflow`] if the values would outgrow the index type, in which case nothing is written,
    ///  - [`StorageError::ReadOnly`] if the ragged array is not writable, or
    ///  - [`ArrayError::AppendIncomplete`] if writing failed part way.
    pub fn append(&mut self, element: impl Into<ArrayChunk>) -> Result<(), ArrayError> {
        self.iter_append(std::iter::once(Ok::<_, std::convert::Infallible>(
            element.into(),
        )))
    }

    /// Append a stream of elements.
    ///
    /// Each element is written to the values and then its index row to the indices.
    /// The descriptions of both sub-arrays and the summary are updated together once all elements are written.
    /// On failure both sub-arrays are cut back to the last complete element, and [`ArrayError::AppendIncomplete`] reports the lengths before and after.
    ///
    /// # Errors
    /// See [`RaggedArray::append`].
    pub fn iter_append<I, E>(&mut self, elements: I) -> Result<(), ArrayError>
    where
        I: IntoIterator<Item = Result<ArrayChunk, E>>,
        E: Into<BoxError>,
    {
        use crate::array::AppendStage;
        RaggedAppendSession::new(self)?.run(elements)
    }

    /// Truncate the ragged array to `len` elements.
    ///
    /// `len` must be less than the current length.
    /// Truncating to zero is permitted.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidTruncation`] if `len` is not less than the current length,
    /// [`StorageError::ReadOnly`] if the ragged array is not writable, or a [`StorageError`] if a file cannot be written.
    pub fn truncate(&mut self, len: u64) -> Result<(), ArrayError> {
        if len >= self.len() {
            return Err(ArrayError::InvalidTruncation {
                len,
                current: self.len(),
            });
        }
        self.truncate_to(len)
    }

    pub(crate) fn truncate_to(&mut self, len: u64) -> Result<(), ArrayError> {
        self.access_mode.check_writable(self.path())?;
        if len == self.len() {
            return Ok(());
        }
        // The values boundary is derived from the surviving indices
        self.indices.truncate_to(len)?;
        let values_len = match len {
            0 => 0,
            len => index_row(&self.indices, len - 1)?.end,
        };
        self.values.truncate_to(values_len)?;
        write_summary(
            &self.data_dir,
            &mut self.description,
            &self.values,
            &self.indices,
        )?;
        Ok(())
    }

    /// Copy the ragged array to `path`.
    ///
    /// The numeric type, index type and metadata of this ragged array are used unless `options` sets them.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError::SamePath`] if `path` is this ragged array, or an [`ArrayCreateError`] if the copy cannot be created or written.
    pub fn copy<P: AsRef<Path>>(
        &self,
        path: P,
        options: &FromSourceOptions,
    ) -> Result<Self, ArrayCreateError> {
        let path = path.as_ref();
        check_distinct_paths(self.path(), path)?;
        let metadata = match &options.metadata {
            Some(metadata) => metadata.clone(),
            None => self.metadata.to_map()?,
        };
        let mut copy = RaggedArrayBuilder::new(
            self.atom().to_vec(),
            options.numeric_type.unwrap_or(self.numeric_type()),
        )
        .index_type(options.index_type.unwrap_or(self.index_type()))
        .metadata(metadata)
        .overwrite(options.overwrite)
        .build(path)?;
        copy.iter_append(self.iter_chunks(0..self.len()))?;
        copy.set_access_mode(options.access_mode);
        Ok(copy)
    }

    /// Create a ragged array at `path` from a stream of elements.
    ///
    /// The first element determines the atom shape and, unless set in `options`, the numeric type.
    /// A zero-dimensional first element is treated as a single row.
    ///
    /// # Errors
    /// Returns
    ///  - [`ArrayCreateError::EmptySource`] if the source yields nothing,
    ///  - [`ArrayCreateError::Source`] if the source fails before its first element,
    ///  - [`ArrayCreateError::UnsupportedIndexType`] if the index type is not supported, or
    ///  - [`ArrayCreateError::ArrayError`] if an element cannot be appended.
    pub fn from_elements<P, I, E>(
        path: P,
        elements: I,
        options: &FromSourceOptions,
    ) -> Result<Self, ArrayCreateError>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = Result<ArrayChunk, E>>,
        E: Into<BoxError>,
    {
        let mut elements = elements.into_iter();
        let first = match elements.next() {
            None => return Err(ArrayCreateError::EmptySource),
            Some(Err(err)) => return Err(ArrayCreateError::Source(err.into())),
            Some(Ok(chunk)) if chunk.shape().is_empty() => chunk.reshape(vec![1])?,
            Some(Ok(chunk)) => chunk,
        };
        let mut builder = RaggedArrayBuilder::new(
            first.shape()[1..].to_vec(),
            options.numeric_type.unwrap_or(first.numeric_type()),
        );
        builder.overwrite(options.overwrite);
        if let Some(index_type) = options.index_type {
            builder.index_type(index_type);
        }
        if let Some(metadata) = &options.metadata {
            builder.metadata(metadata.clone());
        }
        let mut ragged_array = builder.build(path)?;
        let first: Result<ArrayChunk, BoxError> = Ok(first);
        ragged_array.iter_append(
            std::iter::once(first).chain(elements.map(|element| element.map_err(Into::into))),
        )?;
        ragged_array.set_access_mode(options.access_mode);
        Ok(ragged_array)
    }

    /// Delete the ragged array.
    ///
    /// # Errors
    /// Returns [`StorageError::ReadOnly`] if the ragged array is not writable,
    /// or [`StorageError::DirectoryNotEmpty`] if other files remain in a directory, which is then kept.
    pub fn delete(self) -> Result<(), ArrayError> {
        self.access_mode.check_writable(self.path())?;
        self.values.delete()?;
        self.indices.delete()?;
        self.data_dir.delete(&Self::PROTECTED_FILES)?;
        Ok(())
    }
}

/// Check that `index_type` can be used for ragged array indices.
pub(crate) fn check_index_type(index_type: NumericType) -> Result<(), ArrayCreateError> {
    match index_type {
        NumericType::Int8
        | NumericType::UInt8
        | NumericType::Int16
        | NumericType::UInt16
        | NumericType::Int32
        | NumericType::UInt32
        | NumericType::Int64 => Ok(()),
        _ => Err(ArrayCreateError::UnsupportedIndexType(index_type)),
    }
}

/// Check that `value` fits in `index_type`.
pub(crate) fn check_index_value(value: u64, index_type: NumericType) -> Result<(), ArrayError> {
    match index_type.integer_max() {
        Some(max) if value <= max => Ok(()),
        _ => Err(ArrayError::IndexOverflow { value, index_type }),
    }
}

/// Convert a stored index of element `index` to an offset.
pub(crate) fn to_offset(scalar: Scalar, index: u64) -> Result<u64, ArrayError> {
    match scalar {
        Scalar::UInt(value) => Ok(value),
        Scalar::Int(value) => u64::try_from(value).map_err(|_| ArrayError::InvalidIndices {
            index,
            reason: format!("negative offset {value}"),
        }),
        Scalar::Float(_) | Scalar::Complex(_) => Err(ArrayError::InvalidIndices {
            index,
            reason: "offsets are not integers".to_string(),
        }),
    }
}

/// Read the `[start, end)` row of element `index` from an indices array.
fn index_row(indices: &Array, index: u64) -> Result<Range<u64>, ArrayError> {
    let row = indices
        .retrieve_rows_chunk(index..index.saturating_add(1))?
        .to_scalars();
    let &[start, end] = row.as_slice() else {
        return Err(ArrayError::InvalidIndices {
            index,
            reason: format!("expected 2 offsets, found {}", row.len()),
        });
    };
    let (start, end) = (to_offset(start, index)?, to_offset(end, index)?);
    if start > end {
        return Err(ArrayError::InvalidIndices {
            index,
            reason: format!("start {start} is after end {end}"),
        });
    }
    Ok(start..end)
}

/// Update the summary from the sub-arrays and write it.
fn write_summary(
    data_dir: &DataDir,
    description: &mut RaggedArrayDescription,
    values: &Array,
    indices: &Array,
) -> Result<(), StorageError> {
    description.len = indices.len();
    description.size = values.num_elements();
    data_dir.write_json(ARRAY_DESCRIPTION, description)
}
