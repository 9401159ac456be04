use std::convert::Infallible;

use darrs_data_type::reverse_endianness;
use darrs_filesystem::{PayloadAppender, StorageError};

use super::{AppendIncompleteError, Array, ArrayChunk, ArrayError, ArrayShape, BoxError};

/// An in-progress append to an [`Array`].
///
/// Rows are written to the end of the payload file as they arrive.
/// The description is only rewritten by [`commit_rows`](AppendSession::commit_rows) or [`settle_rows`](AppendSession::settle_rows),
/// after the payload has been synced.
pub(crate) struct AppendSession<'a> {
    array: &'a mut Array,
    appender: Option<PayloadAppender>,
    shape_before: ArrayShape,
    rows_written: u64,
}

impl<'a> AppendSession<'a> {
    pub(crate) fn new(array: &'a mut Array) -> Result<Self, ArrayError> {
        array.check_growable()?;
        let shape_before = array.shape().to_vec();
        Ok(Self {
            array,
            appender: None,
            shape_before,
            rows_written: 0,
        })
    }

    pub(crate) fn array(&self) -> &Array {
        self.array
    }

    /// Return the length including rows written so far.
    pub(crate) fn len(&self) -> u64 {
        self.shape_before[0] + self.rows_written
    }

    pub(crate) fn shape_before(&self) -> &[u64] {
        &self.shape_before
    }

    /// Validate a chunk and convert it to payload bytes without writing anything.
    pub(crate) fn prepare(&self, chunk: ArrayChunk) -> Result<(u64, Vec<u8>), ArrayError> {
        let shape = self.array.shape();
        if chunk.shape().len() != shape.len() || chunk.shape()[1..] != shape[1..] {
            return Err(ArrayError::ShapeMismatch {
                expected: shape.to_vec(),
                got: chunk.shape().to_vec(),
            });
        }
        let rows = chunk.len();
        let numeric_type = self.array.numeric_type();
        let mut bytes = chunk.cast(numeric_type).into_bytes();
        if !self.array.endianness().is_native() {
            reverse_endianness(&mut bytes, numeric_type);
        }
        Ok((rows, bytes))
    }

    /// Write prepared rows to the end of the payload file.
    pub(crate) fn write(&mut self, rows: u64, bytes: &[u8]) -> Result<(), StorageError> {
        if !bytes.is_empty() {
            if let Some(appender) = &mut self.appender {
                appender.write_all(bytes)?;
            } else if self.shape_before.iter().product::<u64>() == 0 && self.rows_written == 0 {
                // An empty payload is replaced outright rather than extended
                self.array.payload.replace(bytes)?;
                self.appender = Some(self.array.payload.appender()?);
            } else {
                let mut appender = self.array.payload.appender()?;
                appender.write_all(bytes)?;
                self.appender = Some(appender);
            }
        }
        self.rows_written += rows;
        Ok(())
    }

    /// Flush and sync written rows.
    pub(crate) fn sync(&mut self) -> Result<(), StorageError> {
        if let Some(appender) = &mut self.appender {
            appender.sync()?;
        }
        Ok(())
    }

    /// Sync written rows and rewrite the description with the new length.
    pub(crate) fn commit_rows(&mut self) -> Result<(), StorageError> {
        self.sync()?;
        if self.rows_written > 0 {
            let mut shape = self.shape_before.clone();
            shape[0] += self.rows_written;
            self.array.write_shape(shape)?;
            log::debug!(
                "appended {} rows to {}",
                self.rows_written,
                self.array.path().display()
            );
        }
        Ok(())
    }

    /// Keep the first `keep_rows` appended rows, discard anything written after them, and return the resulting shape.
    ///
    /// If the description cannot be rewritten, the payload is cut back to the shape the description on disk still holds.
    pub(crate) fn settle_rows(&mut self, keep_rows: u64) -> Result<ArrayShape, StorageError> {
        self.appender = None;
        let mut shape = self.shape_before.clone();
        shape[0] += keep_rows;
        let row_bytes = self.array.row_bytes();
        self.array.payload.set_len(shape[0] * row_bytes)?;
        if let Err(err) = self.array.write_shape(shape.clone()) {
            self.array.payload.set_len(self.array.len() * row_bytes)?;
            return Err(err);
        }
        Ok(shape)
    }
}

/// A streaming append that leaves its container consistent on failure.
pub(crate) trait AppendStage {
    /// The item appended at each step.
    type Item;

    /// Validate and write one item.
    ///
    /// Validation errors must be returned before anything is written.
    fn append_item(&mut self, item: Self::Item) -> Result<(), ArrayError>;

    /// Make every written item durable and update the descriptions.
    fn commit(&mut self) -> Result<(), ArrayError>;

    /// Discard any partly written item, make the container consistent, and return its shape before and after the append.
    fn settle(&mut self) -> Result<(ArrayShape, ArrayShape), ArrayError>;

    /// Append every item of `items`.
    ///
    /// On failure the container is settled. A source error is always reported as [`ArrayError::AppendIncomplete`].
    /// An error from a write is reported as is if the container ends up unchanged, and as [`ArrayError::AppendIncomplete`] otherwise.
    /// If settling fails too, its error is returned and the container is left at its last committed shape.
    fn run<I, E>(&mut self, items: I) -> Result<(), ArrayError>
    where
        Self: Sized,
        I: IntoIterator<Item = Result<Self::Item, E>>,
        E: Into<BoxError>,
    {
        let mut failure = None;
        for item in items {
            let result = match item {
                Ok(item) => self.append_item(item),
                Err(err) => {
                    failure = Some(AppendFailure::Source(err.into()));
                    break;
                }
            };
            if let Err(err) = result {
                failure = Some(AppendFailure::Write(err));
                break;
            }
        }
        let failure = match failure {
            Some(failure) => failure,
            None => match self.commit() {
                Ok(()) => return Ok(()),
                Err(err) => AppendFailure::Write(err),
            },
        };
        let (shape_before, shape_after) = self.settle()?;
        let source: BoxError = match failure {
            AppendFailure::Write(err) if err.is_invalid_input() && shape_before == shape_after => {
                return Err(err);
            }
            AppendFailure::Write(err) => Box::new(err),
            AppendFailure::Source(err) => err,
        };
        Err(AppendIncompleteError::new(source, shape_before, shape_after).into())
    }
}

enum AppendFailure {
    Source(BoxError),
    Write(ArrayError),
}

impl AppendStage for AppendSession<'_> {
    type Item = ArrayChunk;

    fn append_item(&mut self, chunk: ArrayChunk) -> Result<(), ArrayError> {
        let (rows, bytes) = self.prepare(chunk)?;
        self.write(rows, &bytes)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ArrayError> {
        Ok(self.commit_rows()?)
    }

    fn settle(&mut self) -> Result<(ArrayShape, ArrayShape), ArrayError> {
        let shape_after = self.settle_rows(self.rows_written)?;
        Ok((self.shape_before.clone(), shape_after))
    }
}

impl Array {
    /// Append a chunk along the first axis.
    ///
    /// The trailing dimensions of the chunk must match the array.
    /// The chunk is cast to the numeric type of the array.
    ///
    /// # Errors
    /// Returns
    ///  - [`ArrayError::ShapeMismatch`] if the trailing dimensions of the chunk do not match, in which case nothing is written,
    ///  - [`StorageError::ReadOnly`] if the array is not writable,
    ///  - [`ArrayError::ColumnMajorNotGrowable`] if the array is column-major, or
    ///  - [`ArrayError::AppendIncomplete`] if writing failed part way.
    pub fn append(&mut self, chunk: impl Into<ArrayChunk>) -> Result<(), ArrayError> {
        self.iter_append(std::iter::once(Ok::<_, Infallible>(chunk.into())))
    }

    /// Append a stream of chunks along the first axis.
    ///
    /// Chunks are written as they arrive and the description is rewritten once at the end.
    /// If the source fails or a chunk cannot be written, the payload is truncated to the last complete chunk,
    /// the description is updated to match, and [`ArrayError::AppendIncomplete`] reports the error and the shapes before and after.
    ///
    /// # Errors
    /// See [`Array::append`].
    pub fn iter_append<I, E>(&mut self, chunks: I) -> Result<(), ArrayError>
    where
        I: IntoIterator<Item = Result<ArrayChunk, E>>,
        E: Into<BoxError>,
    {
        AppendSession::new(self)?.run(chunks)
    }
}
