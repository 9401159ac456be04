use std::num::NonZeroU64;
use std::ops::Range;
use std::path::Path;

use darrs_data_type::{Element, NumericType, Scalar};
use darrs_filesystem::AccessMode;
use darrs_metadata::Attributes;

use super::{
    Array, ArrayChunk, ArrayCreateError, ArrayError, ArrayShape, ArraySubset, FrameIterator,
    FromSourceOptions, checked_nbytes, default_chunk_len,
};

/// The fill of an [`ArrayBuilder`].
enum ArrayBuilderFill {
    Value(Scalar),
    Function(Box<dyn Fn(&[u64]) -> Scalar>),
}

impl std::fmt::Debug for ArrayBuilderFill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(scalar) => f.debug_tuple("Value").field(scalar).finish(),
            Self::Function(_) => f.write_str("Function"),
        }
    }
}

/// A builder for creating an [`Array`] of a given shape filled with a value or by a function.
///
/// The array is written in chunks, so arrays larger than memory can be created.
///
/// ```
/// # use darrs::array::ArrayBuilder;
/// # use darrs::data_type::NumericType;
/// # let tmp = tempfile::TempDir::new()?;
/// let array = ArrayBuilder::new(vec![3, 2], NumericType::Int64)
///     .fill_fn(|indices: &[u64]| (indices[0] * 2 + indices[1]) as i64)
///     .build(tmp.path().join("array.darr"))?;
/// assert_eq!(array.retrieve_elements::<i64>()?, vec![0, 1, 2, 3, 4, 5]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct ArrayBuilder {
    shape: ArrayShape,
    numeric_type: NumericType,
    fill: ArrayBuilderFill,
    chunk_len: Option<NonZeroU64>,
    metadata: Option<Attributes>,
    access_mode: AccessMode,
    overwrite: bool,
}

impl ArrayBuilder {
    /// Create a new array builder with a zero fill value.
    #[must_use]
    pub fn new(shape: ArrayShape, numeric_type: NumericType) -> Self {
        Self {
            shape,
            numeric_type,
            fill: ArrayBuilderFill::Value(Scalar::UInt(0)),
            chunk_len: None,
            metadata: None,
            access_mode: AccessMode::ReadWrite,
            overwrite: false,
        }
    }

    /// Set the fill value, cast to the numeric type of the array.
    ///
    /// Replaces a fill function.
    pub fn fill_value(&mut self, fill_value: impl Into<Scalar>) -> &mut Self {
        self.fill = ArrayBuilderFill::Value(fill_value.into());
        self
    }

    /// Set a fill function, which is called with the indices of every element.
    ///
    /// Replaces a fill value.
    pub fn fill_fn<T: Element>(&mut self, fill_fn: impl Fn(&[u64]) -> T + 'static) -> &mut Self {
        self.fill = ArrayBuilderFill::Function(Box::new(move |indices: &[u64]| {
            fill_fn(indices).into_scalar()
        }));
        self
    }

    /// Set the number of rows written per chunk.
    pub fn chunk_len(&mut self, chunk_len: NonZeroU64) -> &mut Self {
        self.chunk_len = Some(chunk_len);
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

    /// Build the array at `path`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError::InvalidShape`] if the shape is zero-dimensional or its byte size overflows,
    /// or see [`Array::from_source`].
    pub fn build<P: AsRef<Path>>(&self, path: P) -> Result<Array, ArrayCreateError> {
        if checked_nbytes(&self.shape, self.numeric_type).is_none() {
            return Err(ArrayCreateError::InvalidShape(self.shape.clone()));
        }
        let row_bytes =
            self.shape[1..].iter().product::<u64>() * self.numeric_type.size() as u64;
        let chunk_len = self
            .chunk_len
            .unwrap_or_else(|| default_chunk_len(row_bytes));
        let len = self.shape[0];
        let frames: Box<dyn Iterator<Item = Range<u64>>> = if len == 0 {
            Box::new(std::iter::once(0..0))
        } else {
            Box::new(FrameIterator::new(0..len, chunk_len))
        };
        let chunks = frames.map(|rows| self.fill_chunk(rows));

        let mut options = FromSourceOptions::default();
        options
            .numeric_type(self.numeric_type)
            .chunk_len(chunk_len)
            .access_mode(self.access_mode)
            .overwrite(self.overwrite);
        if let Some(metadata) = &self.metadata {
            options.metadata(metadata.clone());
        }
        Array::from_source(path, chunks, &options)
    }

    fn fill_chunk(&self, rows: Range<u64>) -> Result<ArrayChunk, ArrayError> {
        let subset = ArraySubset::from(
            std::iter::once(rows).chain(self.shape[1..].iter().map(|&dim| 0..dim)),
        );
        let num_elements = usize::try_from(subset.num_elements())
            .map_err(|_| ArrayError::ExceedsAddressSpace(subset.num_elements()))?;
        let bytes = match &self.fill {
            ArrayBuilderFill::Value(scalar) => scalar.to_ne_bytes(self.numeric_type).repeat(num_elements),
            ArrayBuilderFill::Function(fill_fn) => {
                let mut bytes = Vec::with_capacity(num_elements * self.numeric_type.size());
                for indices in subset.indices() {
                    fill_fn(&indices).write_ne_bytes(self.numeric_type, &mut bytes);
                }
                bytes
            }
        };
        ArrayChunk::new(bytes, self.numeric_type, subset.shape().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_builder_fill_value() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let array = ArrayBuilder::new(vec![5, 2], NumericType::Int64)
            .fill_value(7i64)
            .chunk_len(NonZeroU64::new(2).unwrap())
            .build(tmp.path().join("a.darr"))?;
        assert_eq!(array.shape(), &[5, 2]);
        assert_eq!(array.retrieve_elements::<i64>()?, vec![7; 10]);
        Ok(())
    }

    #[test]
    fn array_builder_fill_fn() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let array = ArrayBuilder::new(vec![4], NumericType::Float64)
            .fill_value(1.0f64)
            .fill_fn(|indices: &[u64]| indices[0] as f64 / 2.0)
            .chunk_len(NonZeroU64::new(3).unwrap())
            .build(tmp.path().join("a.darr"))?;
        assert_eq!(array.retrieve_elements::<f64>()?, vec![0.0, 0.5, 1.0, 1.5]);
        Ok(())
    }

    #[test]
    fn array_builder_empty_and_invalid() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let array = ArrayBuilder::new(vec![0, 3], NumericType::Complex64).build(tmp.path().join("a.darr"))?;
        assert_eq!(array.shape(), &[0, 3]);
        assert!(array.is_empty());
        assert!(matches!(
            ArrayBuilder::new(vec![], NumericType::Int8).build(tmp.path().join("b.darr")),
            Err(ArrayCreateError::InvalidShape(_))
        ));
        assert!(matches!(
            ArrayBuilder::new(vec![u64::MAX, 4], NumericType::Int8).build(tmp.path().join("c.darr")),
            Err(ArrayCreateError::InvalidShape(_))
        ));
        Ok(())
    }

    #[test]
    fn array_builder_metadata() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let mut metadata = Attributes::new();
        metadata.insert("fs".to_string(), 1000.into());
        let array = ArrayBuilder::new(vec![2], NumericType::UInt32)
            .metadata(metadata)
            .access_mode(AccessMode::ReadOnly)
            .build(tmp.path().join("a.darr"))?;
        assert_eq!(array.metadata().get("fs")?, Some(1000.into()));
        assert_eq!(array.access_mode(), AccessMode::ReadOnly);
        Ok(())
    }
}
