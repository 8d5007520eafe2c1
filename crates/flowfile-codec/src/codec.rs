use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::config::CodecConfig;
use crate::error::{FlowFileError, Result, Section};
use crate::flowfile::Attributes;
use crate::reader::read_full;
use crate::writer::write_full;

/// Magic marker that opens every FlowFile v3 record: "NiFiFF3".
pub const MAGIC: [u8; 7] = *b"NiFiFF3";

/// Short-form value that announces a 4-byte long-form length.
pub const VARLEN_ESCAPE: u16 = 0xFFFF;

/// Width of the fixed big-endian content length field.
pub const CONTENT_LENGTH_SIZE: usize = 8;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Encode a count or string length in the two-tier variable-length form.
///
/// Values below `0xFFFF` take two bytes. Everything else, including
/// `0xFFFF` itself, is written as the escape followed by a 4-byte value.
pub fn encode_varlen(value: usize, section: Section, dst: &mut BytesMut) -> Result<()> {
    let value = u32::try_from(value).map_err(|_| FlowFileError::LimitExceeded {
        section,
        size: value as u64,
        max: u64::from(u32::MAX),
    })?;
    if value < u32::from(VARLEN_ESCAPE) {
        dst.put_u16(value as u16);
    } else {
        dst.put_u16(VARLEN_ESCAPE);
        dst.put_u32(value);
    }
    Ok(())
}

/// Number of bytes [`encode_varlen`] emits for `value`.
pub fn varlen_size(value: usize) -> usize {
    if value < usize::from(VARLEN_ESCAPE) {
        2
    } else {
        6
    }
}

/// Decode a variable-length count or string length.
///
/// Once the escape is seen the 4-byte field is authoritative, even when it
/// holds a value that would have fit the short form.
pub fn read_varlen<R: Read + ?Sized>(src: &mut R, section: Section) -> Result<u32> {
    let mut short = [0u8; 2];
    read_exact(src, &mut short, section)?;
    let short = u16::from_be_bytes(short);
    if short < VARLEN_ESCAPE {
        return Ok(u32::from(short));
    }

    let mut long = [0u8; 4];
    read_exact(src, &mut long, section)?;
    Ok(u32::from_be_bytes(long))
}

/// Encode a length-prefixed byte string.
pub fn encode_string(value: &[u8], section: Section, dst: &mut BytesMut) -> Result<()> {
    encode_varlen(value.len(), section, dst)?;
    dst.put_slice(value);
    Ok(())
}

/// Decode a length-prefixed byte string, rejecting lengths above `max_len`.
pub fn read_string<R: Read + ?Sized>(src: &mut R, section: Section, max_len: u32) -> Result<Bytes> {
    let len = read_varlen(src, section)?;
    if len > max_len {
        return Err(FlowFileError::LimitExceeded {
            section,
            size: u64::from(len),
            max: u64::from(max_len),
        });
    }
    Ok(read_body(src, u64::from(len), section)?.freeze())
}

/// Write the magic marker.
pub fn encode_header(dst: &mut BytesMut) {
    dst.put_slice(&MAGIC);
}

/// Read and validate the magic marker.
pub fn read_header<R: Read + ?Sized>(src: &mut R) -> Result<()> {
    if read_header_or_eof(src)? {
        Ok(())
    } else {
        Err(FlowFileError::Truncated {
            section: Section::Magic,
            expected: MAGIC.len() as u64,
            actual: 0,
        })
    }
}

/// Like [`read_header`], but an empty stream yields `Ok(false)` instead of
/// an error. Used to detect the end of a multi-record package.
pub fn read_header_or_eof<R: Read + ?Sized>(src: &mut R) -> Result<bool> {
    let mut magic = [0u8; MAGIC.len()];
    let got = read_full(src, &mut magic)?;
    if got == 0 {
        return Ok(false);
    }
    if got < magic.len() {
        return Err(FlowFileError::Truncated {
            section: Section::Magic,
            expected: MAGIC.len() as u64,
            actual: got as u64,
        });
    }
    if magic != MAGIC {
        return Err(FlowFileError::InvalidMagic);
    }
    Ok(true)
}

/// Encode the attribute count followed by each key and value.
pub fn encode_attributes(attributes: &Attributes, dst: &mut BytesMut) -> Result<()> {
    encode_varlen(attributes.len(), Section::AttributeCount, dst)?;
    for (key, value) in attributes {
        encode_string(key, Section::AttributeKey, dst)?;
        encode_string(value, Section::AttributeValue, dst)?;
    }
    Ok(())
}

/// Decode an attribute map. Keys and values stay raw bytes; a key that
/// appears twice keeps its later value.
pub fn read_attributes<R: Read + ?Sized>(src: &mut R, config: &CodecConfig) -> Result<Attributes> {
    let count = read_varlen(src, Section::AttributeCount)?;
    if count > config.max_attribute_count {
        return Err(FlowFileError::LimitExceeded {
            section: Section::AttributeCount,
            size: u64::from(count),
            max: u64::from(config.max_attribute_count),
        });
    }
    trace!(count, "decoding attributes");

    let mut attributes = Attributes::new();
    for _ in 0..count {
        let key = read_string(src, Section::AttributeKey, config.max_string_len)?;
        let value = read_string(src, Section::AttributeValue, config.max_string_len)?;
        if attributes.insert(key, value).is_some() {
            trace!("duplicate attribute key, keeping later value");
        }
    }
    Ok(attributes)
}

/// Encode the fixed 8-byte big-endian content length.
pub fn encode_content_length(len: usize, dst: &mut BytesMut) {
    dst.put_u64(len as u64);
}

/// Decode the content length and body.
///
/// The body is read in bounded chunks so a forged length never turns into
/// one large up-front allocation.
pub fn read_content<R: Read + ?Sized>(src: &mut R, config: &CodecConfig) -> Result<Bytes> {
    let mut len = [0u8; CONTENT_LENGTH_SIZE];
    read_exact(src, &mut len, Section::ContentLength)?;
    let len = u64::from_be_bytes(len);
    if len > config.max_content_size {
        return Err(FlowFileError::LimitExceeded {
            section: Section::Content,
            size: len,
            max: config.max_content_size,
        });
    }
    trace!(len, "decoding content");
    Ok(read_body(src, len, Section::Content)?.freeze())
}

/// Encode everything that precedes the content body: magic, attributes
/// and the content length.
pub fn encode_prefix(attributes: &Attributes, content_len: usize, dst: &mut BytesMut) -> Result<()> {
    encode_header(dst);
    encode_attributes(attributes, dst)?;
    encode_content_length(content_len, dst);
    Ok(())
}

/// Write one complete record: the encoded prefix, then the content.
pub fn write_record<W: Write + ?Sized>(
    dst: &mut W,
    attributes: &Attributes,
    content: &[u8],
) -> Result<()> {
    let mut prefix = BytesMut::with_capacity(prefix_size(attributes));
    encode_prefix(attributes, content.len(), &mut prefix)?;
    write_full(dst, &prefix)?;
    write_full(dst, content)
}

/// Exact encoded size of a record with these attributes and content length.
pub fn record_size(attributes: &Attributes, content_len: usize) -> u64 {
    prefix_size(attributes) as u64 + content_len as u64
}

fn prefix_size(attributes: &Attributes) -> usize {
    let strings: usize = attributes
        .iter()
        .map(|(key, value)| {
            varlen_size(key.len()) + key.len() + varlen_size(value.len()) + value.len()
        })
        .sum();
    MAGIC.len() + varlen_size(attributes.len()) + strings + CONTENT_LENGTH_SIZE
}

fn read_exact<R: Read + ?Sized>(src: &mut R, buf: &mut [u8], section: Section) -> Result<()> {
    let got = read_full(src, buf)?;
    if got < buf.len() {
        return Err(FlowFileError::Truncated {
            section,
            expected: buf.len() as u64,
            actual: got as u64,
        });
    }
    Ok(())
}

fn read_body<R: Read + ?Sized>(src: &mut R, len: u64, section: Section) -> Result<BytesMut> {
    let initial = usize::try_from(len).unwrap_or(usize::MAX).min(READ_CHUNK_SIZE);
    let mut body = BytesMut::with_capacity(initial);
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    let mut remaining = len;

    while remaining > 0 {
        let want = remaining.min(READ_CHUNK_SIZE as u64) as usize;
        let got = read_full(src, &mut chunk[..want])?;
        body.extend_from_slice(&chunk[..got]);
        if got < want {
            return Err(FlowFileError::Truncated {
                section,
                expected: len,
                actual: body.len() as u64,
            });
        }
        remaining -= want as u64;
    }
    Ok(body)
}
