//! Encoder and decoder for the FlowFile v3 container format.
//!
//! A FlowFile bundles key/value attributes with an opaque content payload.
//! Every v3 record is laid out as:
//! - The 7-byte magic marker `NiFiFF3`
//! - An attribute count followed by length-prefixed keys and values
//! - An 8-byte big-endian content length followed by the content
//!
//! Counts and string lengths use a two-tier big-endian encoding: two bytes
//! below `0xFFFF`, otherwise `0xFFFF` and a 4-byte value. Several records
//! may be concatenated into one stream; see [`FlowFileReader`] and
//! [`FlowFileWriter`].

pub mod codec;
pub mod config;
pub mod error;
pub mod flowfile;
pub mod reader;
pub mod writer;

pub use codec::{
    encode_varlen, read_varlen, varlen_size, CONTENT_LENGTH_SIZE, MAGIC, VARLEN_ESCAPE,
};
pub use config::CodecConfig;
pub use error::{FlowFileError, Result, Section};
pub use flowfile::{Attributes, FlowFile, FlowFileV3};
pub use reader::FlowFileReader;
pub use writer::FlowFileWriter;
