use darrs_data_type::{
    Element, NumericType, Scalar, cast_bytes, transmute_from_bytes_vec, transmute_to_bytes_vec,
};

use super::{ArrayError, ArrayShape};

/// An in-memory block of array elements.
///
/// The bytes are row-major and in native byte order.
/// The first dimension of the shape is the row axis, which is the axis an [`Array`](super::Array) grows along.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayChunk {
    bytes: Vec<u8>,
    numeric_type: NumericType,
    shape: ArrayShape,
}

impl ArrayChunk {
    /// Create a new chunk from native endian `bytes`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidBytesLength`] if the length of `bytes` does not match `shape` and `numeric_type`.
    pub fn new(
        bytes: Vec<u8>,
        numeric_type: NumericType,
        shape: ArrayShape,
    ) -> Result<Self, ArrayError> {
        let expected = shape
            .iter()
            .fold(numeric_type.size() as u64, |acc, &dim| acc.saturating_mul(dim));
        if bytes.len() as u64 == expected {
            Ok(Self {
                bytes,
                numeric_type,
                shape,
            })
        } else {
            Err(ArrayError::InvalidBytesLength(bytes.len(), expected))
        }
    }

    /// Create a new chunk from a vector of elements.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidBytesLength`] if the number of elements does not match `shape`.
    pub fn from_elements<T: Element>(elements: Vec<T>, shape: ArrayShape) -> Result<Self, ArrayError> {
        Self::new(transmute_to_bytes_vec(elements), T::NUMERIC_TYPE, shape)
    }

    /// Create a chunk of shape `[1]` holding `scalar` as `numeric_type`.
    #[must_use]
    pub fn from_scalar(scalar: Scalar, numeric_type: NumericType) -> Self {
        Self {
            bytes: scalar.to_ne_bytes(numeric_type),
            numeric_type,
            shape: vec![1],
        }
    }

    /// Return the native endian bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the chunk and return its native endian bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Return the numeric type.
    #[must_use]
    pub fn numeric_type(&self) -> NumericType {
        self.numeric_type
    }

    /// Return the shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the number of rows, i.e. the length of the first dimension.
    ///
    /// A zero-dimensional chunk has one row.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Returns true if the chunk has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Return the number of elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Cast the chunk to `numeric_type`.
    ///
    /// Values are converted with the semantics of a Rust `as` cast.
    /// Casting a complex chunk to a real type keeps the real part and logs a warning.
    #[must_use]
    pub fn cast(self, numeric_type: NumericType) -> Self {
        if self.numeric_type == numeric_type {
            return self;
        }
        if self.numeric_type.is_complex() && !numeric_type.is_complex() && !self.is_empty() {
            log::warn!(
                "casting {} values to {}: the imaginary part is discarded",
                self.numeric_type,
                numeric_type
            );
        }
        Self {
            bytes: cast_bytes(&self.bytes, self.numeric_type, numeric_type),
            numeric_type,
            shape: self.shape,
        }
    }

    /// Reshape the chunk without changing its elements.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidDataShape`] if `shape` has a different number of elements.
    pub fn reshape(self, shape: ArrayShape) -> Result<Self, ArrayError> {
        if shape.iter().product::<u64>() == self.num_elements() {
            Ok(Self { shape, ..self })
        } else {
            Err(ArrayError::InvalidDataShape(shape, self.shape))
        }
    }

    /// Consume the chunk and return its elements.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementType`] if `T` does not match the numeric type of the chunk.
    pub fn into_elements<T: Element>(self) -> Result<Vec<T>, ArrayError> {
        self.check_element_type::<T>()?;
        Ok(transmute_from_bytes_vec(self.bytes))
    }

    /// Return a copy of the elements.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementType`] if `T` does not match the numeric type of the chunk.
    pub fn to_elements<T: Element>(&self) -> Result<Vec<T>, ArrayError> {
        self.check_element_type::<T>()?;
        Ok(darrs_data_type::convert_from_bytes_slice(&self.bytes))
    }

    /// Return the elements as [`Scalar`]s.
    #[must_use]
    pub fn to_scalars(&self) -> Vec<Scalar> {
        self.bytes
            .chunks_exact(self.numeric_type.size())
            .map(|bytes| Scalar::from_ne_bytes(self.numeric_type, bytes))
            .collect()
    }

    /// Split the chunk into chunks of at most `rows` rows.
    ///
    /// A chunk with no rows is returned unchanged.
    #[must_use]
    pub fn split_rows(self, rows: std::num::NonZeroU64) -> Vec<Self> {
        let len = self.len();
        if len <= rows.get() || self.shape.is_empty() {
            return vec![self];
        }
        let row_elements: u64 = self.shape[1..].iter().product();
        let row_bytes = usize::try_from(row_elements).unwrap_or(usize::MAX) * self.numeric_type.size();
        let step = usize::try_from(rows.get()).unwrap_or(usize::MAX);
        if row_bytes == 0 {
            return vec![self];
        }
        self.bytes
            .chunks(row_bytes.saturating_mul(step))
            .map(|bytes| {
                let mut shape = self.shape.clone();
                shape[0] = (bytes.len() / row_bytes) as u64;
                Self {
                    bytes: bytes.to_vec(),
                    numeric_type: self.numeric_type,
                    shape,
                }
            })
            .collect()
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

impl<T: Element> From<Vec<T>> for ArrayChunk {
    fn from(elements: Vec<T>) -> Self {
        let shape = vec![elements.len() as u64];
        Self {
            bytes: transmute_to_bytes_vec(elements),
            numeric_type: T::NUMERIC_TYPE,
            shape,
        }
    }
}

impl<T: Element> From<&[T]> for ArrayChunk {
    fn from(elements: &[T]) -> Self {
        Self::from(elements.to_vec())
    }
}

#[cfg(feature = "ndarray")]
impl<T: Element, D: ndarray::Dimension> From<ndarray::Array<T, D>> for ArrayChunk {
    fn from(array: ndarray::Array<T, D>) -> Self {
        if array.ndim() > 1 && !array.is_standard_layout() && array.t().is_standard_layout() {
            log::warn!(
                "converting a column-major array of shape {:?} to row-major order",
                array.shape()
            );
        }
        let shape = array.shape().iter().map(|&dim| dim as u64).collect();
        let elements: Vec<T> = array.iter().copied().collect();
        Self {
            bytes: transmute_to_bytes_vec(elements),
            numeric_type: T::NUMERIC_TYPE,
            shape,
        }
    }
}

#[cfg(feature = "ndarray")]
impl ArrayChunk {
    /// Convert the chunk to an [`ndarray::ArrayD`].
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementType`] if `T` does not match the numeric type of the chunk.
    pub fn to_ndarray<T: Element>(&self) -> Result<ndarray::ArrayD<T>, ArrayError> {
        let elements = self.to_elements::<T>()?;
        super::elements_to_ndarray(&self.shape, elements)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;

    use super::*;

    #[test]
    fn array_chunk_new() {
        let chunk = ArrayChunk::from_elements(vec![1i32, 2, 3, 4, 5, 6], vec![3, 2]).unwrap();
        assert_eq!(chunk.len(), 3);
        assert_eq!(chunk.num_elements(), 6);
        assert_eq!(chunk.numeric_type(), NumericType::Int32);
        assert!(matches!(
            ArrayChunk::from_elements(vec![1i32, 2, 3], vec![2, 2]),
            Err(ArrayError::InvalidBytesLength(12, 16))
        ));
        assert!(matches!(
            chunk.to_elements::<f32>(),
            Err(ArrayError::IncompatibleElementType { .. })
        ));
    }

    #[test]
    fn array_chunk_cast_and_reshape() {
        let chunk = ArrayChunk::from(vec![1.5f64, -2.5]).cast(NumericType::Int16);
        assert_eq!(chunk.to_elements::<i16>().unwrap(), vec![1, -2]);
        let chunk = chunk.reshape(vec![1, 2]).unwrap();
        assert_eq!(chunk.shape(), &[1, 2]);
        assert!(chunk.reshape(vec![3]).is_err());

        let scalar = ArrayChunk::from_scalar(Scalar::Int(7), NumericType::UInt8);
        assert_eq!(scalar.to_elements::<u8>().unwrap(), vec![7]);
    }

    #[test]
    fn array_chunk_split_rows() {
        let chunk = ArrayChunk::from_elements((0u8..10).collect(), vec![5, 2]).unwrap();
        let chunks = chunk.split_rows(NonZeroU64::new(2).unwrap());
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].shape(), &[2, 2]);
        assert_eq!(chunks[2].shape(), &[1, 2]);
        assert_eq!(chunks[2].to_elements::<u8>().unwrap(), vec![8, 9]);
    }

    #[cfg(feature = "ndarray")]
    #[test]
    fn array_chunk_ndarray() {
        let array = ndarray::array![[1.0f32, 2.0], [3.0, 4.0]];
        let chunk = ArrayChunk::from(array.clone().reversed_axes());
        assert_eq!(chunk.to_elements::<f32>().unwrap(), vec![1.0, 3.0, 2.0, 4.0]);
        let chunk = ArrayChunk::from(array.clone());
        assert_eq!(chunk.to_ndarray::<f32>().unwrap(), array.into_dyn());
    }
}
