use std::path::Path;

use darrs_data_type::NumericType;
use darrs_filesystem::{AccessMode, DataDir};
use darrs_metadata::{Attributes, DarrObject, FORMAT_VERSION, VarDimArrayDescription};

use super::{INDICES_AND_SHAPES, VarDimArray};
use crate::array::{ARRAY_DESCRIPTION, ArrayBuilder, ArrayCreateError};
use crate::metadata_store::MetadataStore;
use crate::ragged_array::{DEFAULT_INDEX_TYPE, RaggedArrayBuilder, VALUES, check_index_type};

/// A builder for creating an empty [`VarDimArray`].
///
/// ```
/// # use darrs::vardim_array::VarDimArrayBuilder;
/// # use darrs::array::ArrayChunk;
/// # use darrs::data_type::NumericType;
/// # let tmp = tempfile::TempDir::new()?;
/// let mut vardim_array = VarDimArrayBuilder::new(NumericType::Int16)
///     .build(tmp.path().join("vardim.darr"))?;
/// vardim_array.append(ArrayChunk::from_elements(vec![1i16, 2, 3, 4, 5, 6], vec![3, 2])?)?;
/// vardim_array.append(vec![7i16])?;
/// assert_eq!(vardim_array.element_shape(0)?, vec![3, 2]);
/// assert_eq!(vardim_array.get_elements::<i16>(1)?, vec![7]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct VarDimArrayBuilder {
    numeric_type: NumericType,
    index_type: NumericType,
    metadata: Option<Attributes>,
    access_mode: AccessMode,
    overwrite: bool,
}

impl VarDimArrayBuilder {
    /// Create a new variable-dimension array builder.
    #[must_use]
    pub fn new(numeric_type: NumericType) -> Self {
        Self {
            numeric_type,
            index_type: DEFAULT_INDEX_TYPE,
            metadata: None,
            access_mode: AccessMode::ReadWrite,
            overwrite: false,
        }
    }

    /// Set the numeric type of the values.
    pub fn numeric_type(&mut self, numeric_type: NumericType) -> &mut Self {
        self.numeric_type = numeric_type;
        self
    }

    /// Set the numeric type of the `indicesandshapes` rows. Defaults to `int64`.
    pub fn index_type(&mut self, index_type: NumericType) -> &mut Self {
        self.index_type = index_type;
        self
    }

    /// Set the user metadata.
    pub fn metadata(&mut self, metadata: Attributes) -> &mut Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the access mode of the built array. Defaults to [`AccessMode::ReadWrite`].
    pub fn access_mode(&mut self, access_mode: AccessMode) -> &mut Self {
        self.access_mode = access_mode;
        self
    }

    /// Set whether an existing directory may be overwritten. Defaults to false.
    pub fn overwrite(&mut self, overwrite: bool) -> &mut Self {
        self.overwrite = overwrite;
        self
    }

    /// Build an empty variable-dimension array at `path`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError::UnsupportedIndexType`] if the index type is not a supported integer type,
    /// or an [`ArrayCreateError`] if the directory or a sub-container cannot be created.
    pub fn build<P: AsRef<Path>>(&self, path: P) -> Result<VarDimArray, ArrayCreateError> {
        check_index_type(self.index_type)?;
        let data_dir = DataDir::create(path, self.overwrite)?;
        let values = ArrayBuilder::new(vec![0], self.numeric_type)
            .overwrite(true)
            .build(data_dir.join(VALUES))?;
        let indices_and_shapes = RaggedArrayBuilder::new(vec![], self.index_type)
            .index_type(self.index_type)
            .overwrite(true)
            .build(data_dir.join(INDICES_AND_SHAPES))?;

        let description = VarDimArrayDescription {
            darrobject: DarrObject::VarDimArray,
            darrversion: FORMAT_VERSION.to_string(),
            len: 0,
            numtype: self.numeric_type.name().to_string(),
            size: 0,
        };
        data_dir.write_json(ARRAY_DESCRIPTION, &description)?;
        let metadata = MetadataStore::new(data_dir.clone(), AccessMode::ReadWrite);
        metadata.replace(&self.metadata.clone().unwrap_or_default())?;
        log::debug!("created variable-dimension array {}", data_dir.path().display());

        let mut vardim_array = VarDimArray {
            data_dir,
            access_mode: AccessMode::ReadWrite,
            values,
            indices_and_shapes,
            description,
            metadata,
        };
        vardim_array.set_access_mode(self.access_mode);
        Ok(vardim_array)
    }
}
