//! Low-level byte stream abstraction.
//!
//! The engine core never talks to the filesystem or network directly; it
//! consumes whatever byte source the host application hands it through the
//! narrow [`Stream`] trait rather than calling `std::fs` inline.
//! [`FileStream`] is the one concrete implementation the core ships,
//! covering the common case of loading shader binaries and textures from
//! disk.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;

/// Errors a [`Stream`] implementation may report.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("stream is closed")]
    Closed,
    #[error("operation not supported by this stream")]
    NotSupported,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("seek or read out of range")]
    OutOfRange,
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// A minimal, synchronous byte source. The core reads shader binaries and
/// texture bytes through this trait rather than assuming a filesystem.
pub trait Stream {
    /// Reads the entire remaining contents of the stream.
    fn read_all(&mut self) -> Result<Vec<u8>, StreamError>;

    /// Total length in bytes, if known ahead of time.
    fn len(&self) -> Result<u64, StreamError>;

    /// `true` if the stream is known to be empty.
    fn is_empty(&self) -> Result<bool, StreamError> {
        Ok(self.len()? == 0)
    }
}

/// A [`Stream`] backed by an open file.
pub struct FileStream {
    file: File,
}

impl FileStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let file = File::open(path)?;
        Ok(Self { file })
    }
}

impl Stream for FileStream {
    fn read_all(&mut self) -> Result<Vec<u8>, StreamError> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buf = Vec::new();
        self.file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn len(&self) -> Result<u64, StreamError> {
        Ok(self.file.metadata()?.len())
    }
}

/// A [`Stream`] over an in-memory byte buffer, used by tests and embedded
/// assets that never touch the filesystem.
pub struct MemoryStream {
    bytes: Vec<u8>,
}

impl MemoryStream {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl Stream for MemoryStream {
    fn read_all(&mut self) -> Result<Vec<u8>, StreamError> {
        Ok(self.bytes.clone())
    }

    fn len(&self) -> Result<u64, StreamError> {
        Ok(self.bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_stream_reports_its_length() {
        let stream = MemoryStream::new(vec![1, 2, 3, 4]);
        assert_eq!(stream.len().unwrap(), 4);
        assert!(!stream.is_empty().unwrap());
    }

    #[test]
    fn memory_stream_reads_all_bytes() {
        let mut stream = MemoryStream::new(vec![9, 8, 7]);
        assert_eq!(stream.read_all().unwrap(), vec![9, 8, 7]);
    }
}
