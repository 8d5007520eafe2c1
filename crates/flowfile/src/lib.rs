//! FlowFile v3 packaging: key/value attributes plus an opaque payload in one
//! linear byte stream.
//!
//! # Crate Structure
//!
//! - [`codec`] — The wire codec, the [`FlowFile`] contract and the
//!   [`FlowFileV3`] entity
//! - `flowfile` binary — Pack and unpack FlowFile packages (behind `cli` feature)

/// Re-export codec types.
pub mod codec {
    pub use flowfile_codec::*;
}

pub use flowfile_codec::{
    Attributes, CodecConfig, FlowFile, FlowFileError, FlowFileReader, FlowFileV3, FlowFileWriter,
    Result,
};
