use std::fmt;

/// Structural field of a FlowFile v3 record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Magic,
    AttributeCount,
    AttributeKey,
    AttributeValue,
    ContentLength,
    Content,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Magic => "magic header",
            Section::AttributeCount => "attribute count",
            Section::AttributeKey => "attribute key",
            Section::AttributeValue => "attribute value",
            Section::ContentLength => "content length",
            Section::Content => "content",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while encoding or decoding FlowFiles.
#[derive(Debug, thiserror::Error)]
pub enum FlowFileError {
    /// The stream does not start with the `NiFiFF3` marker.
    #[error("not a recognized FlowFile v3 stream (invalid magic header)")]
    InvalidMagic,

    /// The stream ended before a field was complete.
    #[error("truncated input: {section} needs {expected} bytes, got {actual}")]
    Truncated {
        section: Section,
        expected: u64,
        actual: u64,
    },

    /// A length is outside the wire range or a configured decode limit.
    #[error("{section} length {size} exceeds limit {max}")]
    LimitExceeded { section: Section, size: u64, max: u64 },

    /// The underlying stream reported an error.
    #[error("flowfile I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FlowFileError>;
