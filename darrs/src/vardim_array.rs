//! darr variable-dimension arrays.
//!
//! A [`VarDimArray`] is a sequence of subarrays whose shapes may differ in every dimension, including their number of dimensions.
//! It is stored as a directory holding
//!  - `values/`: a one-dimensional [`Array`] concatenating the flattened values of every subarray,
//!  - `indicesandshapes/`: a [`RaggedArray`] of integer rows `[start, end, d0, d1, ...]`, one per subarray, and
//!  - `arraydescription.json`: a summary of the container.

mod vardim_append;
mod vardim_array_builder;

use std::ops::Range;
use std::path::{Path, PathBuf};

pub(crate) use self::vardim_append::VarDimAppendSession;
pub use self::vardim_array_builder::VarDimArrayBuilder;

use darrs_data_type::{Element, NumericType};
use darrs_filesystem::{AccessMode, DataDir, StorageError};
use darrs_metadata::{DarrObject, VarDimArrayDescription};

use crate::array::{
    ARRAY_DESCRIPTION, Array, ArrayChunk, ArrayCreateError, ArrayError, ArrayOpenOptions,
    ArrayShape, BoxError, FromSourceOptions, README, check_distinct_paths, check_format_version,
};
use crate::metadata_store::{METADATA_FILE, MetadataStore};
use crate::ragged_array::{RaggedArray, VALUES, check_index_type, to_offset};

pub(crate) const INDICES_AND_SHAPES: &str = "indicesandshapes";

/// A darr variable-dimension array.
#[derive(Debug)]
pub struct VarDimArray {
    data_dir: DataDir,
    access_mode: AccessMode,
    values: Array,
    indices_and_shapes: RaggedArray,
    description: VarDimArrayDescription,
    metadata: MetadataStore,
}

impl VarDimArray {
    /// The names of the files and directories that belong to a variable-dimension array.
    pub const PROTECTED_FILES: [&'static str; 5] = [
        VALUES,
        INDICES_AND_SHAPES,
        README,
        METADATA_FILE,
        ARRAY_DESCRIPTION,
    ];

    /// Open an existing variable-dimension array.
    ///
    /// # Errors
    /// Returns an [`ArrayCreateError`] if the summary description or either sub-container cannot be opened,
    /// or [`ArrayCreateError::InconsistentContainer`] if the rows of `indicesandshapes` do not fit the values.
    pub fn open<P: AsRef<Path>>(path: P, access_mode: AccessMode) -> Result<Self, ArrayCreateError> {
        Self::open_opt(path, access_mode, &ArrayOpenOptions::default())
    }

    /// Open an existing variable-dimension array with non-default options.
    ///
    /// # Errors
    /// See [`VarDimArray::open`].
    pub fn open_opt<P: AsRef<Path>>(
        path: P,
        access_mode: AccessMode,
        options: &ArrayOpenOptions,
    ) -> Result<Self, ArrayCreateError> {
        let data_dir = DataDir::open(path)?;
        let mut description =
            VarDimArrayDescription::from_json_map(data_dir.read_json_map(ARRAY_DESCRIPTION)?)?;
        if description.darrobject != DarrObject::VarDimArray {
            return Err(ArrayCreateError::UnexpectedObjectType {
                expected: DarrObject::VarDimArray,
                found: description.darrobject,
            });
        }
        check_format_version(
            &description.darrversion,
            &options.format_version,
            data_dir.path(),
        )?;
        let values = Array::open_opt(data_dir.join(VALUES), access_mode, options)?;
        let indices_and_shapes =
            RaggedArray::open_opt(data_dir.join(INDICES_AND_SHAPES), access_mode, options)?;

        let inconsistent = |reason: String| ArrayCreateError::InconsistentContainer {
            path: data_dir.path().to_path_buf(),
            reason,
        };
        if values.ndim() != 1 {
            return Err(inconsistent(format!(
                "values have shape {:?}, expected one dimension",
                values.shape()
            )));
        }
        if !indices_and_shapes.atom().is_empty() {
            return Err(inconsistent(format!(
                "{INDICES_AND_SHAPES} has atom {:?}, expected []",
                indices_and_shapes.atom()
            )));
        }
        check_index_type(indices_and_shapes.numeric_type())?;
        let values_len = match indices_and_shapes.len() {
            0 => 0,
            len => element_row(&indices_and_shapes, len - 1)?.0.end,
        };
        if values_len != values.len() {
            return Err(inconsistent(format!(
                "the last element ends at {values_len}, but the values have length {}",
                values.len()
            )));
        }

        let summary = VarDimArrayDescription {
            darrobject: DarrObject::VarDimArray,
            darrversion: description.darrversion.clone(),
            len: indices_and_shapes.len(),
            numtype: values.numeric_type().name().to_string(),
            size: values.num_elements(),
        };
        if summary != description {
            log::warn!(
                "the summary description of {} is stale and was derived from its values and {INDICES_AND_SHAPES}",
                data_dir.path().display()
            );
            description = summary;
        }
        let metadata = MetadataStore::new(data_dir.clone(), access_mode);
        Ok(Self {
            data_dir,
            access_mode,
            values,
            indices_and_shapes,
            description,
            metadata,
        })
    }

    /// Return the path of the variable-dimension array directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Return the path of the values array.
    #[must_use]
    pub fn values_path(&self) -> &Path {
        self.values.path()
    }

    /// Return the path of the `indicesandshapes` ragged array.
    #[must_use]
    pub fn indices_and_shapes_path(&self) -> &Path {
        self.indices_and_shapes.path()
    }

    /// Return the values array.
    #[must_use]
    pub fn values(&self) -> &Array {
        &self.values
    }

    /// Return the `indicesandshapes` ragged array.
    #[must_use]
    pub fn indices_and_shapes(&self) -> &RaggedArray {
        &self.indices_and_shapes
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

    /// Return the numeric type of the values.
    #[must_use]
    pub fn numeric_type(&self) -> NumericType {
        self.values.numeric_type()
    }

    /// Return the numeric type of the rows of `indicesandshapes`.
    #[must_use]
    pub fn index_type(&self) -> NumericType {
        self.indices_and_shapes.numeric_type()
    }

    /// Return the summary description.
    #[must_use]
    pub fn description(&self) -> &VarDimArrayDescription {
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

    /// Set the access mode of the variable-dimension array and its sub-containers.
    pub fn set_access_mode(&mut self, access_mode: AccessMode) {
        self.access_mode = access_mode;
        self.values.set_access_mode(access_mode);
        self.indices_and_shapes.set_access_mode(access_mode);
        self.metadata.set_access_mode(access_mode);
    }

    /// Return the paths of all files in the variable-dimension array directory, sorted.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the directory cannot be walked.
    pub fn files(&self) -> Result<Vec<PathBuf>, StorageError> {
        self.data_dir.files()
    }

    /// Return the value range and shape of element `index`.
    fn element_layout(&self, index: u64) -> Result<(Range<u64>, ArrayShape), ArrayError> {
        if index >= self.len() {
            return Err(ArrayError::OutOfBounds {
                index,
                len: self.len(),
            });
        }
        let (range, shape) = element_row(&self.indices_and_shapes, index)?;
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
        let num_elements = shape.iter().product::<u64>();
        if range.end - range.start != num_elements {
            return Err(ArrayError::InvalidIndices {
                index,
                reason: format!(
                    "[{}, {}) does not hold the {num_elements} values of shape {shape:?}",
                    range.start, range.end
                ),
            });
        }
        Ok((range, shape))
    }

    /// Return the range of element `index` in the values.
    ///
    /// # Errors
    /// Returns [`ArrayError::OutOfBounds`] if `index` is not less than the length,
    /// or [`ArrayError::InvalidIndices`] if the stored row is corrupt.
    pub fn element_range(&self, index: u64) -> Result<Range<u64>, ArrayError> {
        Ok(self.element_layout(index)?.0)
    }

    /// Return the shape of element `index`.
    ///
    /// # Errors
    /// See [`VarDimArray::element_range`].
    pub fn element_shape(&self, index: u64) -> Result<ArrayShape, ArrayError> {
        Ok(self.element_layout(index)?.1)
    }

    /// Read element `index` with its stored shape.
    ///
    /// # Errors
    /// See [`VarDimArray::element_range`].
    pub fn get_chunk(&self, index: u64) -> Result<ArrayChunk, ArrayError> {
        let (range, shape) = self.element_layout(index)?;
        self.values.retrieve_rows_chunk(range)?.reshape(shape)
    }

    /// Read the values of element `index` in row-major order.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementType`] if `T` does not match the numeric type, or see [`VarDimArray::element_range`].
    pub fn get_elements<T: Element>(&self, index: u64) -> Result<Vec<T>, ArrayError> {
        self.values.retrieve_rows_elements(self.element_range(index)?)
    }

    #[cfg(feature = "ndarray")]
    /// Read element `index` into an [`ndarray::ArrayD`] with its stored shape.
    ///
    /// # Errors
    /// See [`VarDimArray::get_elements`].
    pub fn get_ndarray<T: Element>(&self, index: u64) -> Result<ndarray::ArrayD<T>, ArrayError> {
        let (range, shape) = self.element_layout(index)?;
        let elements = self.values.retrieve_rows_elements(range)?;
        crate::array::elements_to_ndarray(&shape, elements)
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

    /// Append an element of any shape.
    ///
    /// The element is cast to the numeric type of the values.
    ///
    /// # Errors
    /// Returns
    ///  - [`ArrayError::IndexOverflow`] if the values, a dimension of the element or the `indicesandshapes` offsets would outgrow the index type.
    ///    All three are checked before the values of the element are written, so nothing is written,
    ///  - [`StorageError::ReadOnly`] if the variable-dimension array is not writable, or
    ///  - [`ArrayError::AppendIncomplete`] if writing failed part way.
    pub fn append(&mut self, element: impl Into<ArrayChunk>) -> Result<(), ArrayError> {
        self.iter_append(std::iter::once(Ok::<_, std::convert::Infallible>(
            element.into(),
        )))
    }

    /// Append a stream of elements.
    ///
    /// On failure the values and `indicesandshapes` are cut back to the last complete element,
    /// and [`ArrayError::AppendIncomplete`] reports the lengths before and after.
    ///
    /// # Errors
    /// See [`VarDimArray::append`].
    pub fn iter_append<I, E>(&mut self, elements: I) -> Result<(), ArrayError>
    where
        I: IntoIterator<Item = Result<ArrayChunk, E>>,
        E: Into<BoxError>,
    {
        use crate::array::AppendStage;
        VarDimAppendSession::new(self)?.run(elements)
    }

    /// Truncate the variable-dimension array to `len` elements.
    ///
    /// `len` must be less than the current length.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidTruncation`] if `len` is not less than the current length,
    /// [`StorageError::ReadOnly`] if the variable-dimension array is not writable, or a [`StorageError`] if a file cannot be written.
    pub fn truncate(&mut self, len: u64) -> Result<(), ArrayError> {
        if len >= self.len() {
            return Err(ArrayError::InvalidTruncation {
                len,
                current: self.len(),
            });
        }
        self.access_mode.check_writable(self.path())?;
        self.indices_and_shapes.truncate_to(len)?;
        let values_len = match len {
            0 => 0,
            len => element_row(&self.indices_and_shapes, len - 1)?.0.end,
        };
        self.values.truncate_to(values_len)?;
        write_summary(
            &self.data_dir,
            &mut self.description,
            len,
            self.values.num_elements(),
        )?;
        Ok(())
    }

    /// Copy the variable-dimension array to `path`.
    ///
    /// The numeric type, index type and metadata of this array are used unless `options` sets them.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError::SamePath`] if `path` is this array, or an [`ArrayCreateError`] if the copy cannot be created or written.
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
        let mut copy =
            VarDimArrayBuilder::new(options.numeric_type.unwrap_or(self.numeric_type()))
                .index_type(options.index_type.unwrap_or(self.index_type()))
                .metadata(metadata)
                .overwrite(options.overwrite)
                .build(path)?;
        copy.iter_append(self.iter_chunks(0..self.len()))?;
        copy.set_access_mode(options.access_mode);
        Ok(copy)
    }

    /// Create a variable-dimension array at `path` from a stream of elements.
    ///
    /// Unless set in `options`, the numeric type is that of the first element.
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
            Some(Ok(chunk)) => chunk,
        };
        let mut builder =
            VarDimArrayBuilder::new(options.numeric_type.unwrap_or(first.numeric_type()));
        builder.overwrite(options.overwrite);
        if let Some(index_type) = options.index_type {
            builder.index_type(index_type);
        }
        if let Some(metadata) = &options.metadata {
            builder.metadata(metadata.clone());
        }
        let mut vardim_array = builder.build(path)?;
        let first: Result<ArrayChunk, BoxError> = Ok(first);
        vardim_array.iter_append(
            std::iter::once(first).chain(elements.map(|element| element.map_err(Into::into))),
        )?;
        vardim_array.set_access_mode(options.access_mode);
        Ok(vardim_array)
    }

    /// Delete the variable-dimension array.
    ///
    /// # Errors
    /// Returns [`StorageError::ReadOnly`] if the array is not writable,
    /// or [`StorageError::DirectoryNotEmpty`] if other files remain in a directory, which is then kept.
    pub fn delete(self) -> Result<(), ArrayError> {
        self.access_mode.check_writable(self.path())?;
        self.values.delete()?;
        self.indices_and_shapes.delete()?;
        self.data_dir.delete(&Self::PROTECTED_FILES)?;
        Ok(())
    }
}

/// Read the value range and shape of element `index` from `indicesandshapes`.
fn element_row(
    indices_and_shapes: &RaggedArray,
    index: u64,
) -> Result<(Range<u64>, ArrayShape), ArrayError> {
    let row = indices_and_shapes
        .get_chunk(index)?
        .to_scalars()
        .into_iter()
        .map(|scalar| to_offset(scalar, index))
        .collect::<Result<Vec<_>, _>>()?;
    let [start, end, shape @ ..] = row.as_slice() else {
        return Err(ArrayError::InvalidIndices {
            index,
            reason: format!("expected at least 2 offsets, found {}", row.len()),
        });
    };
    if start > end {
        return Err(ArrayError::InvalidIndices {
            index,
            reason: format!("start {start} is after end {end}"),
        });
    }
    Ok((*start..*end, shape.to_vec()))
}

fn write_summary(
    data_dir: &DataDir,
    description: &mut VarDimArrayDescription,
    len: u64,
    size: u64,
) -> Result<(), StorageError> {
    description.len = len;
    description.size = size;
    data_dir.write_json(ARRAY_DESCRIPTION, description)
}
