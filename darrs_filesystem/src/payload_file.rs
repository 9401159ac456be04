use std::{
    fs::{File, OpenOptions},
    io::{Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use memmap2::{MmapMut, MmapOptions};

use crate::StorageError;

/// A raw binary payload file.
///
/// Memory maps are scoped to a single closure call.
/// They are released on every exit path, so no map outlives the operation that created it.
#[derive(Clone, Debug)]
pub struct PayloadFile {
    path: PathBuf,
}

impl PayloadFile {
    /// Create a handle to the payload file at `path`. The file is not touched.
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Return the path of the payload file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the size of the payload file in bytes.
    ///
    /// # Errors
    /// Returns an IO error if the file metadata cannot be read.
    pub fn size(&self) -> Result<u64, StorageError> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Replace the payload file with `bytes` and sync it to disk.
    ///
    /// # Errors
    /// Returns an IO error if the file cannot be written.
    pub fn replace(&self, bytes: &[u8]) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        file.write_all(bytes)?;
        file.sync_data()?;
        Ok(())
    }

    /// Open the payload file for appending at its end.
    ///
    /// # Errors
    /// Returns an IO error if the file cannot be opened.
    pub fn appender(&self) -> Result<PayloadAppender, StorageError> {
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::End(0))?;
        Ok(PayloadAppender { file })
    }

    /// Truncate or extend the payload file to `len` bytes and sync it to disk.
    ///
    /// # Errors
    /// Returns an IO error if the file cannot be resized.
    pub fn set_len(&self, len: u64) -> Result<(), StorageError> {
        let file = OpenOptions::new().write(true).open(&self.path)?;
        file.set_len(len)?;
        file.sync_all()?;
        Ok(())
    }

    /// Call `f` with a read-only memory map of the first `len` bytes of the payload file.
    ///
    /// A zero `len` does not map the file.
    ///
    /// # Errors
    /// Returns an IO error if the file cannot be opened or mapped.
    pub fn with_map<R>(&self, len: usize, f: impl FnOnce(&[u8]) -> R) -> Result<R, StorageError> {
        if len == 0 {
            return Ok(f(&[]));
        }
        let file = File::open(&self.path)?;
        // SAFETY: the map is dropped before this function returns and darr containers have a single writer.
        let map = unsafe { MmapOptions::new().len(len).map(&file)? };
        Ok(f(&map))
    }

    /// Call `f` with a writable memory map of the first `len` bytes of the payload file.
    ///
    /// The map is flushed to disk after `f` returns.
    /// A zero `len` does not map the file.
    ///
    /// # Errors
    /// Returns an IO error if the file cannot be opened, mapped or flushed.
    pub fn with_map_mut<R>(
        &self,
        len: usize,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, StorageError> {
        if len == 0 {
            return Ok(f(&mut []));
        }
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        // SAFETY: the map is dropped before this function returns and darr containers have a single writer.
        let mut map: MmapMut = unsafe { MmapOptions::new().len(len).map_mut(&file)? };
        let result = f(&mut map);
        map.flush()?;
        Ok(result)
    }
}

/// A payload file opened for appending.
#[derive(Debug)]
pub struct PayloadAppender {
    file: File,
}

impl PayloadAppender {
    /// Append `bytes` to the end of the payload file.
    ///
    /// # Errors
    /// Returns an IO error if the bytes cannot be written.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        self.file.write_all(bytes)?;
        Ok(())
    }

    /// Flush appended bytes and sync them to disk.
    ///
    /// # Errors
    /// Returns an IO error if the file cannot be synced.
    pub fn sync(&mut self) -> Result<(), StorageError> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_file_append_and_truncate() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let payload = PayloadFile::new(tmp.path().join("arrayvalues.bin"));
        payload.replace(&[])?;
        assert_eq!(payload.size()?, 0);

        payload.replace(&[1, 2])?;
        let mut appender = payload.appender()?;
        appender.write_all(&[3, 4, 5])?;
        appender.sync()?;
        assert_eq!(std::fs::read(payload.path())?, vec![1, 2, 3, 4, 5]);

        drop(appender);

        payload.set_len(3)?;
        let mut appender = payload.appender()?;
        appender.write_all(&[6])?;
        appender.sync()?;
        assert_eq!(std::fs::read(payload.path())?, vec![1, 2, 3, 6]);
        Ok(())
    }

    #[test]
    fn payload_file_maps() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let payload = PayloadFile::new(tmp.path().join("arrayvalues.bin"));
        payload.replace(&[1, 2, 3, 4])?;

        let sum = payload.with_map(4, |bytes| bytes.iter().map(|&b| u32::from(b)).sum::<u32>())?;
        assert_eq!(sum, 10);
        assert_eq!(payload.with_map(0, <[u8]>::len)?, 0);

        payload.with_map_mut(4, |bytes| bytes[1..3].copy_from_slice(&[7, 8]))?;
        assert_eq!(std::fs::read(payload.path())?, vec![1, 7, 8, 4]);
        Ok(())
    }
}
