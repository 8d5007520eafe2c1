use std::io::{ErrorKind, Read};

use tracing::{debug, trace};

use crate::codec::{read_attributes, read_content, read_header_or_eof};
use crate::config::CodecConfig;
use crate::error::{FlowFileError, Result};
use crate::flowfile::FlowFileV3;

/// Read until `buf` is full or the source is exhausted.
///
/// Returns the number of bytes read; anything short of `buf.len()` means
/// end-of-stream. A single short `read` is never treated as EOF.
pub(crate) fn read_full<R: Read + ?Sized>(src: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FlowFileError::Io(err)),
        }
    }
    Ok(filled)
}

/// Reads a package of back-to-back FlowFile v3 records from any `Read`
/// stream.
pub struct FlowFileReader<T> {
    inner: T,
    config: CodecConfig,
    records: u64,
    failed: bool,
}

impl<T: Read> FlowFileReader<T> {
    /// Create a new reader with default limits.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, CodecConfig::default())
    }

    /// Create a new reader with explicit limits.
    pub fn with_config(inner: T, config: CodecConfig) -> Self {
        Self {
            inner,
            config,
            records: 0,
            failed: false,
        }
    }

    /// Read the next record (blocking).
    ///
    /// Returns `Ok(None)` when the stream ends cleanly on a record boundary.
    pub fn read_flowfile(&mut self) -> Result<Option<FlowFileV3>> {
        if !read_header_or_eof(&mut self.inner)? {
            debug!(records = self.records, "end of flowfile package");
            return Ok(None);
        }
        let attributes = read_attributes(&mut self.inner, &self.config)?;
        let content = read_content(&mut self.inner, &self.config)?;

        self.records += 1;
        trace!(
            record = self.records,
            attributes = attributes.len(),
            content_len = content.len(),
            "read flowfile record"
        );
        Ok(Some(FlowFileV3::from_parts(attributes, content)))
    }

    /// Number of records read so far.
    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current decode limits.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

impl<T: Read> Iterator for FlowFileReader<T> {
    type Item = Result<FlowFileV3>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_flowfile() {
            Ok(Some(flowfile)) => Some(Ok(flowfile)),
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
