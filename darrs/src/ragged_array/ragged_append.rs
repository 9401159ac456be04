use darrs_data_type::{NumericType, Scalar};
use darrs_filesystem::DataDir;
use darrs_metadata::RaggedArrayDescription;

use super::{RaggedArray, check_index_value, write_summary};
use crate::array::{AppendSession, AppendStage, ArrayChunk, ArrayError, ArrayShape};

/// An in-progress append to a [`RaggedArray`].
///
/// Values are written before their index row, so the values of an element without an index row are discarded on settle.
pub(crate) struct RaggedAppendSession<'a> {
    data_dir: &'a DataDir,
    description: &'a mut RaggedArrayDescription,
    values: AppendSession<'a>,
    indices: AppendSession<'a>,
    index_type: NumericType,
    len_before: u64,
    elements_written: u64,
    value_rows_written: u64,
}

impl<'a> RaggedAppendSession<'a> {
    pub(crate) fn new(ragged_array: &'a mut RaggedArray) -> Result<Self, ArrayError> {
        ragged_array
            .access_mode
            .check_writable(ragged_array.data_dir.path())?;
        let len_before = ragged_array.len();
        let index_type = ragged_array.index_type();
        let RaggedArray {
            data_dir,
            values,
            indices,
            description,
            ..
        } = ragged_array;
        Ok(Self {
            data_dir,
            description,
            values: AppendSession::new(values)?,
            indices: AppendSession::new(indices)?,
            index_type,
            len_before,
            elements_written: 0,
            value_rows_written: 0,
        })
    }

    /// Check that `rows` more value rows keep the index ends within the index type.
    pub(crate) fn check_value_rows(&self, rows: u64) -> Result<(), ArrayError> {
        check_index_value(self.values.len() + rows, self.index_type)
    }

    /// Return the committed number of elements.
    pub(crate) fn committed_len(&self) -> u64 {
        self.indices.array().len()
    }

    fn write_summary(&mut self) -> Result<(), ArrayError> {
        write_summary(
            self.data_dir,
            self.description,
            self.values.array(),
            self.indices.array(),
        )?;
        Ok(())
    }
}

/// Return `offsets` as a one-dimensional chunk of `index_type`.
pub(crate) fn offsets_chunk(offsets: &[u64], index_type: NumericType) -> Result<ArrayChunk, ArrayError> {
    let mut bytes = Vec::with_capacity(offsets.len() * index_type.size());
    for &offset in offsets {
        Scalar::UInt(offset).write_ne_bytes(index_type, &mut bytes);
    }
    ArrayChunk::new(bytes, index_type, vec![offsets.len() as u64])
}

impl AppendStage for RaggedAppendSession<'_> {
    type Item = ArrayChunk;

    fn append_item(&mut self, element: ArrayChunk) -> Result<(), ArrayError> {
        let element = if element.shape().is_empty() && self.values.shape_before().len() == 1 {
            element.reshape(vec![1])?
        } else {
            element
        };
        let (rows, bytes) = self.values.prepare(element)?;
        let start = self.values.len();
        let end = start + rows;
        check_index_value(end, self.index_type)?;
        let (_, index_bytes) = self
            .indices
            .prepare(offsets_chunk(&[start, end], self.index_type)?.reshape(vec![1, 2])?)?;

        self.values.write(rows, &bytes)?;
        self.indices.write(1, &index_bytes)?;
        self.value_rows_written += rows;
        self.elements_written += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ArrayError> {
        self.values.commit_rows()?;
        self.indices.commit_rows()?;
        if self.elements_written > 0 {
            self.write_summary()?;
            log::debug!(
                "appended {} elements to {}",
                self.elements_written,
                self.data_dir.path().display()
            );
        }
        Ok(())
    }

    fn settle(&mut self) -> Result<(ArrayShape, ArrayShape), ArrayError> {
        self.values.settle_rows(self.value_rows_written)?;
        if let Err(err) = self.indices.settle_rows(self.elements_written) {
            // The indices were left at their last committed length
            if self.indices.array().len() == self.len_before {
                self.values.settle_rows(0)?;
            }
            return Err(err.into());
        }
        self.write_summary()?;
        Ok((
            vec![self.len_before],
            vec![self.len_before + self.elements_written],
        ))
    }
}
