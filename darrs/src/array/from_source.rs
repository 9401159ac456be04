use std::convert::Infallible;
use std::num::NonZeroU64;
use std::path::Path;

use darrs_data_type::NumericType;
use darrs_filesystem::{AccessMode, DataDir, PayloadFile};
use darrs_metadata::{ArrayDescription, Attributes, FORMAT_VERSION};

use super::{
    ARRAY_DESCRIPTION, ARRAY_VALUES, Array, ArrayChunk, ArrayCreateError, BoxError,
    checked_nbytes, default_chunk_len,
};
use crate::metadata_store::MetadataStore;

/// Options for creating darr containers from a source.
///
/// Used by [`Array::from_source`], [`Array::copy`] and the equivalent ragged and variable-dimension array functions.
#[derive(Clone, Debug)]
pub struct FromSourceOptions {
    pub(crate) numeric_type: Option<NumericType>,
    pub(crate) chunk_len: Option<NonZeroU64>,
    pub(crate) metadata: Option<Attributes>,
    pub(crate) access_mode: AccessMode,
    pub(crate) overwrite: bool,
    pub(crate) index_type: Option<NumericType>,
}

impl Default for FromSourceOptions {
    fn default() -> Self {
        Self {
            numeric_type: None,
            chunk_len: None,
            metadata: None,
            access_mode: AccessMode::ReadWrite,
            overwrite: false,
            index_type: None,
        }
    }
}

impl FromSourceOptions {
    /// Set the numeric type. Defaults to the numeric type of the source.
    pub fn numeric_type(&mut self, numeric_type: NumericType) -> &mut Self {
        self.numeric_type = Some(numeric_type);
        self
    }

    /// Set the number of rows per chunk when a source is split or streamed.
    ///
    /// Defaults to as many rows as fit in [`DEFAULT_CHUNK_BYTES`](super::DEFAULT_CHUNK_BYTES).
    pub fn chunk_len(&mut self, chunk_len: NonZeroU64) -> &mut Self {
        self.chunk_len = Some(chunk_len);
        self
    }

    /// Set the user metadata. Defaults to none, or the metadata of the source when copying.
    pub fn metadata(&mut self, metadata: Attributes) -> &mut Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the access mode of the returned container. Defaults to [`AccessMode::ReadWrite`].
    pub fn access_mode(&mut self, access_mode: AccessMode) -> &mut Self {
        self.access_mode = access_mode;
        self
    }

    /// Set whether an existing directory may be overwritten. Defaults to false.
    pub fn overwrite(&mut self, overwrite: bool) -> &mut Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the index type of ragged and variable-dimension arrays.
    ///
    /// Defaults to `int64`, or the index type of the source when copying.
    pub fn index_type(&mut self, index_type: NumericType) -> &mut Self {
        self.index_type = Some(index_type);
        self
    }
}

impl Array {
    /// Create an array at `path` from a stream of chunks.
    ///
    /// The first chunk determines the trailing dimensions and, unless set in `options`, the numeric type.
    /// A zero-dimensional first chunk is treated as a single row.
    /// The length of the array is the sum of the lengths of all chunks.
    /// Chunks are always written in row-major order and native byte order.
    ///
    /// # Errors
    /// Returns
    ///  - [`ArrayCreateError::EmptySource`] if the source yields nothing,
    ///  - [`ArrayCreateError::Source`] if the source fails before its first chunk,
    ///  - a [`StorageError`](darrs_filesystem::StorageError) if `path` exists and overwriting is not permitted, or
    ///  - [`ArrayCreateError::ArrayError`] if a later chunk cannot be appended.
    pub fn from_source<P, I, E>(
        path: P,
        source: I,
        options: &FromSourceOptions,
    ) -> Result<Self, ArrayCreateError>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = Result<ArrayChunk, E>>,
        E: Into<BoxError>,
    {
        let mut source = source.into_iter();
        let first = match source.next() {
            None => return Err(ArrayCreateError::EmptySource),
            Some(Err(err)) => return Err(ArrayCreateError::Source(err.into())),
            Some(Ok(chunk)) => chunk,
        };
        let first = if first.shape().is_empty() {
            first.reshape(vec![1])?
        } else {
            first
        };
        let numeric_type = options.numeric_type.unwrap_or(first.numeric_type());
        let first = first.cast(numeric_type);
        let shape = first.shape().to_vec();
        if checked_nbytes(&shape, numeric_type).is_none() {
            return Err(ArrayCreateError::InvalidShape(shape));
        }

        let data_dir = DataDir::create(path, options.overwrite)?;
        let payload = PayloadFile::new(data_dir.join(ARRAY_VALUES));
        payload.replace(first.bytes())?;
        let description = ArrayDescription::new(
            numeric_type.name().to_string(),
            shape,
            FORMAT_VERSION.to_string(),
        );
        data_dir.write_json(ARRAY_DESCRIPTION, &description)?;
        let metadata = MetadataStore::new(data_dir.clone(), AccessMode::ReadWrite);
        metadata.replace(&options.metadata.clone().unwrap_or_default())?;

        let mut array = Self {
            data_dir,
            payload,
            access_mode: AccessMode::ReadWrite,
            description,
            numeric_type,
            metadata,
        };
        array.iter_append(source)?;
        array.set_access_mode(options.access_mode);
        Ok(array)
    }

    /// Create an array at `path` from a single in-memory chunk.
    ///
    /// The chunk is written in chunks of [`chunk_len`](FromSourceOptions::chunk_len) rows.
    /// Anything convertible to an [`ArrayChunk`] is accepted, such as a `Vec` of elements or an [`ndarray::Array`].
    /// Column-major [`ndarray::Array`]s are written in row-major order and a warning is logged.
    ///
    /// # Errors
    /// See [`Array::from_source`].
    pub fn from_chunk<P: AsRef<Path>>(
        path: P,
        chunk: impl Into<ArrayChunk>,
        options: &FromSourceOptions,
    ) -> Result<Self, ArrayCreateError> {
        let chunk: ArrayChunk = chunk.into();
        let row_bytes = chunk.shape().iter().skip(1).product::<u64>() * chunk.numeric_type().size() as u64;
        let chunk_len = options
            .chunk_len
            .unwrap_or_else(|| default_chunk_len(row_bytes));
        let chunks = chunk.split_rows(chunk_len);
        Self::from_source(path, chunks.into_iter().map(Ok::<_, Infallible>), options)
    }
}

#[cfg(test)]
mod tests {
    use darrs_data_type::Scalar;

    use super::*;
    use crate::array::ArrayError;

    #[test]
    fn array_from_source() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let path = tmp.path().join("array.darr");
        let chunks = vec![
            ArrayChunk::from_elements(vec![1u16, 2], vec![1, 2]),
            ArrayChunk::from_elements(vec![3u16, 4, 5, 6], vec![2, 2]),
        ];
        let mut options = FromSourceOptions::default();
        options.numeric_type(NumericType::Float32);
        let array = Array::from_source(&path, chunks, &options)?;
        assert_eq!(array.shape(), &[3, 2]);
        assert_eq!(array.numeric_type(), NumericType::Float32);
        assert_eq!(
            array.retrieve_elements::<f32>()?,
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
        assert!(!path.join("metadata.json").exists());

        assert!(matches!(
            Array::from_source(&path, Vec::<Result<ArrayChunk, ArrayError>>::new(), &options),
            Err(ArrayCreateError::EmptySource)
        ));
        Ok(())
    }

    #[test]
    fn array_from_scalar() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let chunk = ArrayChunk::from_scalar(Scalar::Float(2.5), NumericType::Float64).reshape(vec![])?;
        let array = Array::from_chunk(tmp.path().join("a.darr"), chunk, &FromSourceOptions::default())?;
        assert_eq!(array.shape(), &[1]);
        assert_eq!(array.retrieve_elements::<f64>()?, vec![2.5]);
        Ok(())
    }

    #[test]
    fn array_from_chunk_split() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let path = tmp.path().join("a.darr");
        let mut options = FromSourceOptions::default();
        options
            .chunk_len(NonZeroU64::new(3).unwrap())
            .access_mode(AccessMode::ReadOnly);
        let array = Array::from_chunk(&path, (0i8..10).collect::<Vec<_>>(), &options)?;
        assert_eq!(array.len(), 10);
        assert_eq!(array.access_mode(), AccessMode::ReadOnly);
        assert_eq!(array.retrieve_rows_elements::<i8>(8..10)?, vec![8, 9]);

        assert!(Array::from_chunk(&path, vec![1i8], &options).is_err());
        options.overwrite(true);
        let array = Array::from_chunk(&path, vec![1i8], &options)?;
        assert_eq!(array.len(), 1);
        Ok(())
    }
}
