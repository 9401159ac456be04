//! Array subsets.
//!
//! An [`ArraySubset`] is a hyperrectangular region of an array, defined by a start and a shape.

use std::fmt::{Debug, Display};
use std::ops::Range;

use darrs_metadata::ArrayOrder;
use itertools::Itertools;
use thiserror::Error;

use super::{ArrayIndices, ArrayShape};

/// An incompatible start/shape error.
#[derive(Clone, Debug, Error)]
#[error("incompatible start {start:?} with shape {shape:?}")]
pub struct ArraySubsetError {
    start: ArrayIndices,
    shape: ArrayShape,
}

/// An array subset.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ArraySubset {
    start: ArrayIndices,
    shape: ArrayShape,
}

impl Display for ArraySubset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.to_ranges().fmt(f)
    }
}

impl<T: IntoIterator<Item = Range<u64>>> From<T> for ArraySubset {
    fn from(ranges: T) -> Self {
        let (start, shape) = ranges
            .into_iter()
            .map(|range| (range.start, range.end.saturating_sub(range.start)))
            .unzip();
        Self { start, shape }
    }
}

impl ArraySubset {
    /// Create a new array subset from a list of [`Range`]s.
    #[must_use]
    pub fn new_with_ranges(ranges: &[Range<u64>]) -> Self {
        Self::from(ranges.iter().cloned())
    }

    /// Create a new array subset with `shape` starting at the origin.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new array subset.
    ///
    /// # Errors
    /// Returns [`ArraySubsetError`] if the lengths of `start` and `shape` do not match.
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: ArrayShape,
    ) -> Result<Self, ArraySubsetError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(ArraySubsetError { start, shape })
        }
    }

    /// Return the start of the array subset.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape of the array subset.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the end (exclusive) of the array subset.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start + size)
            .collect()
    }

    /// Return the array subset as a list of ranges.
    #[must_use]
    pub fn to_ranges(&self) -> Vec<Range<u64>> {
        std::iter::zip(&self.start, &self.shape)
            .map(|(&start, &size)| start..start + size)
            .collect()
    }

    /// Return the dimensionality of the array subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the number of elements of the array subset.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Returns if the array subset is empty (i.e. has a zero element in its shape).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|i| i == &0)
    }

    /// Returns true if the array subset is within the bounds of `array_shape`.
    #[must_use]
    pub fn inbounds_shape(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && itertools::izip!(&self.start, &self.shape, array_shape)
                .all(|(start, size, dim)| start.checked_add(*size).is_some_and(|end| end <= *dim))
    }

    /// Return the indices of every element within the subset in row-major order.
    pub fn indices(&self) -> impl Iterator<Item = ArrayIndices> + '_ {
        let all_indices: Box<dyn Iterator<Item = ArrayIndices>> = if self.dimensionality() == 0 {
            Box::new(std::iter::once(Vec::new()))
        } else {
            Box::new(self.to_ranges().into_iter().multi_cartesian_product())
        };
        all_indices
    }

    /// Return the runs of contiguous elements of the subset within an array of `array_shape` stored in `order`.
    ///
    /// Runs are `(linearised start, length)` pairs, in the row-major order of the subset.
    /// The subset must be within the bounds of `array_shape`.
    pub(crate) fn contiguous_runs(&self, array_shape: &[u64], order: ArrayOrder) -> Vec<(u64, u64)> {
        if self.is_empty() {
            return Vec::new();
        }
        let strides = strides(array_shape, order);
        let linearise = |indices: &[u64]| -> u64 {
            std::iter::zip(indices, &strides)
                .map(|(index, stride)| index * stride)
                .sum()
        };
        match order {
            ArrayOrder::F => self
                .indices()
                .map(|indices| (linearise(&indices), 1))
                .collect(),
            ArrayOrder::C => {
                // Trailing dimensions that are fully covered merge into a single run
                let ndim = self.dimensionality();
                let mut outer = ndim.saturating_sub(1);
                while outer > 0
                    && self.start[outer] == 0
                    && self.shape[outer] == array_shape[outer]
                {
                    outer -= 1;
                }
                let run_len: u64 = self.shape[outer..].iter().product();
                let outer_subset = Self {
                    start: self.start[..outer].to_vec(),
                    shape: self.shape[..outer].to_vec(),
                };
                let inner_start = &self.start[outer..];
                outer_subset
                    .indices()
                    .map(|mut indices| {
                        indices.extend_from_slice(inner_start);
                        (linearise(&indices), run_len)
                    })
                    .collect()
            }
        }
    }
}

/// Return the element strides of an array of `shape` stored in `order`.
pub(crate) fn strides(shape: &[u64], order: ArrayOrder) -> Vec<u64> {
    let mut strides = vec![1; shape.len()];
    let mut stride = 1;
    match order {
        ArrayOrder::C => {
            for (s, dim) in strides.iter_mut().zip(shape).rev() {
                *s = stride;
                stride *= dim;
            }
        }
        ArrayOrder::F => {
            for (s, dim) in strides.iter_mut().zip(shape) {
                *s = stride;
                stride *= dim;
            }
        }
    }
    strides
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_subset() {
        assert!(ArraySubset::new_with_start_shape(vec![0, 0], vec![10, 10]).is_ok());
        assert!(ArraySubset::new_with_start_shape(vec![0, 0], vec![10]).is_err());
        let subset = ArraySubset::new_with_ranges(&[1..3, 0..2]);
        assert_eq!(subset.start(), &[1, 0]);
        assert_eq!(subset.shape(), &[2, 2]);
        assert_eq!(subset.end_exc(), vec![3, 2]);
        assert_eq!(subset.num_elements(), 4);
        assert_eq!(subset.to_string(), "[1..3, 0..2]");
        assert!(subset.inbounds_shape(&[3, 2]));
        assert!(!subset.inbounds_shape(&[2, 2]));
        assert!(!subset.inbounds_shape(&[3, 2, 1]));
        assert!(ArraySubset::new_with_ranges(&[0..0, 0..2]).is_empty());
    }

    #[test]
    fn array_subset_indices() {
        let subset = ArraySubset::new_with_ranges(&[1..3, 4..6]);
        assert_eq!(
            subset.indices().collect::<Vec<_>>(),
            vec![vec![1, 4], vec![1, 5], vec![2, 4], vec![2, 5]]
        );
        assert_eq!(
            ArraySubset::new_with_shape(vec![]).indices().count(),
            1
        );
    }

    #[test]
    fn array_subset_contiguous_runs() {
        let shape = [4, 3, 2];
        let whole = ArraySubset::new_with_shape(shape.to_vec());
        assert_eq!(whole.contiguous_runs(&shape, ArrayOrder::C), vec![(0, 24)]);

        let rows = ArraySubset::new_with_ranges(&[1..3, 0..3, 0..2]);
        assert_eq!(rows.contiguous_runs(&shape, ArrayOrder::C), vec![(6, 12)]);

        let partial = ArraySubset::new_with_ranges(&[1..3, 1..2, 0..2]);
        assert_eq!(
            partial.contiguous_runs(&shape, ArrayOrder::C),
            vec![(8, 2), (14, 2)]
        );

        let column = ArraySubset::new_with_ranges(&[0..2, 2..3]);
        assert_eq!(
            column.contiguous_runs(&[2, 3], ArrayOrder::F),
            vec![(4, 1), (5, 1)]
        );
    }

    #[test]
    fn array_strides() {
        assert_eq!(strides(&[4, 3, 2], ArrayOrder::C), vec![6, 2, 1]);
        assert_eq!(strides(&[4, 3, 2], ArrayOrder::F), vec![1, 4, 12]);
    }
}
