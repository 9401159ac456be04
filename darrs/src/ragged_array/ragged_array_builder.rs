use std::path::Path;

use darrs_data_type::NumericType;
use darrs_filesystem::{AccessMode, DataDir};
use darrs_metadata::{Attributes, DarrObject, FORMAT_VERSION, RaggedArrayDescription};

use super::{DEFAULT_INDEX_TYPE, INDICES, RaggedArray, VALUES, check_index_type};
use crate::array::{ARRAY_DESCRIPTION, ArrayBuilder, ArrayCreateError, ArrayShape};
use crate::metadata_store::MetadataStore;

/// A builder for creating an empty [`RaggedArray`].
///
/// ```
/// # use darrs::ragged_array::RaggedArrayBuilder;
/// # use darrs::data_type::NumericType;
/// # let tmp = tempfile::TempDir::new()?;
/// let mut ragged_array = RaggedArrayBuilder::new(vec![2], NumericType::Float32)
///     .build(tmp.path().join("ragged.darr"))?;
/// ragged_array.append(darrs::array::ArrayChunk::from_elements(vec![1.0f32, 2.0, 3.0, 4.0], vec![2, 2])?)?;
/// assert_eq!(ragged_array.len(), 1);
/// assert_eq!(ragged_array.size(), 4);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct RaggedArrayBuilder {
    atom: ArrayShape,
    numeric_type: NumericType,
    index_type: NumericType,
    metadata: Option<Attributes>,
    access_mode: AccessMode,
    overwrite: bool,
}

impl RaggedArrayBuilder {
    /// Create a new ragged array builder.
    ///
    /// `atom` is the shape of every element excluding its first axis.
    #[must_use]
    pub fn new(atom: ArrayShape, numeric_type: NumericType) -> Self {
        Self {
            atom,
            numeric_type,
            index_type: DEFAULT_INDEX_TYPE,
            metadata: None,
            access_mode: AccessMode::ReadWrite,
            overwrite: false,
        }
    }

    /// Set the numeric type of the indices. Defaults to `int64`.
    pub fn index_type(&mut self, index_type: NumericType) -> &mut Self {
        self.index_type = index_type;
        self
    }

    /// Set the user metadata.
    pub fn metadata(&mut self, metadata: Attributes) -> &mut Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the access mode of the built ragged array. Defaults to [`AccessMode::ReadWrite`].
    pub fn access_mode(&mut self, access_mode: AccessMode) -> &mut Self {
        self.access_mode = access_mode;
        self
    }

    /// Set whether an existing directory may be overwritten. Defaults to false.
    pub fn overwrite(&mut self, overwrite: bool) -> &mut Self {
        self.overwrite = overwrite;
        self
    }

    /// Build an empty ragged array at `path`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError::UnsupportedIndexType`] if the index type is not a supported integer type,
    /// or an [`ArrayCreateError`] if the directory or either sub-array cannot be created.
    pub fn build<P: AsRef<Path>>(&self, path: P) -> Result<RaggedArray, ArrayCreateError> {
        check_index_type(self.index_type)?;
        let data_dir = DataDir::create(path, self.overwrite)?;
        let values_shape = std::iter::once(0).chain(self.atom.iter().copied()).collect();
        let values = ArrayBuilder::new(values_shape, self.numeric_type)
            .overwrite(true)
            .build(data_dir.join(VALUES))?;
        let indices = ArrayBuilder::new(vec![0, 2], self.index_type)
            .overwrite(true)
            .build(data_dir.join(INDICES))?;

        let description = RaggedArrayDescription {
            atom: self.atom.clone(),
            darrobject: DarrObject::RaggedArray,
            darrversion: FORMAT_VERSION.to_string(),
            len: 0,
            numtype: self.numeric_type.name().to_string(),
            size: 0,
        };
        data_dir.write_json(ARRAY_DESCRIPTION, &description)?;
        let metadata = MetadataStore::new(data_dir.clone(), AccessMode::ReadWrite);
        metadata.replace(&self.metadata.clone().unwrap_or_default())?;
        log::debug!("created ragged array {}", data_dir.path().display());

        let mut ragged_array = RaggedArray {
            data_dir,
            access_mode: AccessMode::ReadWrite,
            values,
            indices,
            description,
            metadata,
        };
        ragged_array.set_access_mode(self.access_mode);
        Ok(ragged_array)
    }
}
