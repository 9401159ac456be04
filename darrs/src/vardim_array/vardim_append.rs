use darrs_data_type::NumericType;
use darrs_filesystem::DataDir;
use darrs_metadata::VarDimArrayDescription;

use super::{VarDimArray, write_summary};
use crate::array::{AppendSession, AppendStage, ArrayChunk, ArrayError, ArrayShape};
use crate::ragged_array::{RaggedAppendSession, check_index_value, offsets_chunk};

/// An in-progress append to a [`VarDimArray`].
///
/// The flattened values of an element are written before its row in `indicesandshapes`.
pub(crate) struct VarDimAppendSession<'a> {
    data_dir: &'a DataDir,
    description: &'a mut VarDimArrayDescription,
    values: AppendSession<'a>,
    indices_and_shapes: RaggedAppendSession<'a>,
    index_type: NumericType,
    len_before: u64,
    elements_written: u64,
    value_rows_written: u64,
}

impl<'a> VarDimAppendSession<'a> {
    pub(crate) fn new(vardim_array: &'a mut VarDimArray) -> Result<Self, ArrayError> {
        vardim_array
            .access_mode
            .check_writable(vardim_array.data_dir.path())?;
        let len_before = vardim_array.len();
        let index_type = vardim_array.index_type();
        let VarDimArray {
            data_dir,
            values,
            indices_and_shapes,
            description,
            ..
        } = vardim_array;
        Ok(Self {
            data_dir,
            description,
            values: AppendSession::new(values)?,
            indices_and_shapes: RaggedAppendSession::new(indices_and_shapes)?,
            index_type,
            len_before,
            elements_written: 0,
            value_rows_written: 0,
        })
    }

    fn write_summary(&mut self) -> Result<(), ArrayError> {
        write_summary(
            self.data_dir,
            self.description,
            self.len_before + self.elements_written,
            self.values.array().num_elements(),
        )?;
        Ok(())
    }
}

impl AppendStage for VarDimAppendSession<'_> {
    type Item = ArrayChunk;

    fn append_item(&mut self, element: ArrayChunk) -> Result<(), ArrayError> {
        let shape = element.shape().to_vec();
        let num_elements = element.num_elements();
        let (rows, bytes) = self.values.prepare(element.reshape(vec![num_elements])?)?;
        let start = self.values.len();
        let end = start + rows;
        let row: ArrayShape = [start, end].into_iter().chain(shape).collect();
        for &offset in &row {
            check_index_value(offset, self.index_type)?;
        }
        self.indices_and_shapes
            .check_value_rows(row.len() as u64)?;

        self.values.write(rows, &bytes)?;
        self.indices_and_shapes
            .append_item(offsets_chunk(&row, self.index_type)?)?;
        self.value_rows_written += rows;
        self.elements_written += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ArrayError> {
        self.values.commit_rows()?;
        self.indices_and_shapes.commit()?;
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
        if let Err(err) = self.indices_and_shapes.settle() {
            if self.indices_and_shapes.committed_len() == self.len_before {
                self.values.settle_rows(0)?;
            }
            return Err(err);
        }
        self.write_summary()?;
        Ok((
            vec![self.len_before],
            vec![self.len_before + self.elements_written],
        ))
    }
}
