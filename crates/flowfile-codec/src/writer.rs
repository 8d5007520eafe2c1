use std::io::{ErrorKind, Write};

use tracing::trace;

use crate::error::{FlowFileError, Result};
use crate::flowfile::FlowFile;

/// Write all of `bytes`, retrying interrupted and would-block writes.
///
/// A write that accepts zero bytes means the sink is closed and surfaces as
/// `ErrorKind::WriteZero`.
pub(crate) fn write_full<W: Write + ?Sized>(dst: &mut W, bytes: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match dst.write(&bytes[offset..]) {
            Ok(0) => return Err(FlowFileError::Io(std::io::Error::from(ErrorKind::WriteZero))),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(FlowFileError::Io(err)),
        }
    }
    Ok(())
}

/// Writes FlowFile records back to back to any `Write` stream.
pub struct FlowFileWriter<T> {
    inner: T,
    written: u64,
}

impl<T: Write> FlowFileWriter<T> {
    /// Create a new writer.
    pub fn new(inner: T) -> Self {
        Self { inner, written: 0 }
    }

    /// Serialize one record and flush (blocking).
    ///
    /// On error the stream may hold a partial record and should be discarded.
    pub fn write_flowfile<F: FlowFile>(&mut self, flowfile: &F) -> Result<()> {
        flowfile.serialize(&mut self.inner)?;
        self.written += 1;
        trace!(record = self.written, "wrote flowfile record");
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FlowFileError::Io(err)),
            }
        }
    }

    /// Number of records written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
