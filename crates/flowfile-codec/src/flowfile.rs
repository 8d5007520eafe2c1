use std::collections::BTreeMap;
use std::io::{Read, Write};

use bytes::Bytes;
use tracing::debug;

use crate::codec::{read_attributes, read_content, read_header, record_size, write_record};
use crate::config::CodecConfig;
use crate::error::Result;

/// Attribute map of a FlowFile.
///
/// Keys and values are raw bytes exactly as they appear on the wire; use
/// [`FlowFileV3::attribute_str`] for text access. Iteration is in key
/// order, which makes encoding deterministic.
pub type Attributes = BTreeMap<Bytes, Bytes>;

/// The capability set every FlowFile wire format provides.
///
/// Pipeline code written against this trait does not care which format
/// variant it is handling.
pub trait FlowFile {
    /// Look up a single attribute.
    fn attribute<K: AsRef<[u8]>>(&self, key: K) -> Option<&[u8]>;

    /// All attributes, read-only.
    fn attributes(&self) -> &Attributes;

    /// Replace every attribute at once.
    fn set_attributes(&mut self, attributes: Attributes) -> &mut Self;

    /// The content payload.
    fn content(&self) -> &Bytes;

    /// Replace the content payload.
    fn set_content(&mut self, content: Bytes) -> &mut Self;

    /// Encode this FlowFile to `out`.
    ///
    /// Bytes already written are not undone if a later step fails.
    fn serialize<W: Write>(&self, out: W) -> Result<()>;

    /// Decode a FlowFile from `src`, replacing this one's state.
    fn deserialize<R: Read>(&mut self, src: R) -> Result<()>;
}

/// A FlowFile in the v3 wire format.
///
/// ```text
/// ┌───────────┬─────────┬──────────────────────┬─────────────┬──────────┐
/// │ "NiFiFF3" │ Count   │ (Key, Value) * Count │ Content len │ Content  │
/// │ (7B)      │ (VarLen)│ (VarLen + bytes)     │ (8B BE)     │          │
/// └───────────┴─────────┴──────────────────────┴─────────────┴──────────┘
/// ```
///
/// VarLen is a 2-byte big-endian value, or `0xFFFF` followed by a 4-byte
/// big-endian value for lengths of 65535 and above.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowFileV3 {
    attributes: Attributes,
    content: Bytes,
}

impl FlowFileV3 {
    /// Create an empty FlowFile: no attributes, no content.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a FlowFile from already decoded parts.
    pub fn from_parts(attributes: Attributes, content: impl Into<Bytes>) -> Self {
        Self {
            attributes,
            content: content.into(),
        }
    }

    /// Split into attributes and content.
    pub fn into_parts(self) -> (Attributes, Bytes) {
        (self.attributes, self.content)
    }

    /// Builder form of [`FlowFile::set_attributes`].
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Builder form of [`FlowFileV3::put_attribute`].
    pub fn with_attribute(mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        self.put_attribute(key, value);
        self
    }

    /// Builder form of [`FlowFile::set_content`].
    pub fn with_content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = content.into();
        self
    }

    /// Insert one attribute, returning the value it replaced.
    pub fn put_attribute(&mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Option<Bytes> {
        self.attributes.insert(key.into(), value.into())
    }

    /// Look up an attribute as text. `None` when it is absent or its value
    /// is not UTF-8.
    pub fn attribute_str<K: AsRef<[u8]>>(&self, key: K) -> Option<&str> {
        self.attribute(key)
            .and_then(|value| std::str::from_utf8(value).ok())
    }

    /// Exact number of bytes [`FlowFile::serialize`] writes.
    pub fn wire_size(&self) -> u64 {
        record_size(&self.attributes, self.content.len())
    }

    /// Serialize into a new buffer.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(usize::try_from(self.wire_size()).unwrap_or(0));
        self.serialize(&mut out)?;
        Ok(out)
    }

    /// Decode a single FlowFile from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let mut flowfile = Self::new();
        flowfile.deserialize(bytes)?;
        Ok(flowfile)
    }

    /// [`FlowFile::deserialize`] with explicit decode limits.
    ///
    /// Attributes are replaced as soon as they decode; content only once the
    /// content decodes. A failure while reading content therefore leaves the
    /// new attributes next to the old content. Snapshot the FlowFile first if
    /// all-or-nothing behavior is needed.
    pub fn deserialize_with_config<R: Read>(
        &mut self,
        mut src: R,
        config: &CodecConfig,
    ) -> Result<()> {
        read_header(&mut src)?;
        self.attributes = read_attributes(&mut src, config)?;
        self.content = read_content(&mut src, config)?;
        debug!(
            attributes = self.attributes.len(),
            content_len = self.content.len(),
            "deserialized flowfile"
        );
        Ok(())
    }
}

impl FlowFile for FlowFileV3 {
    fn attribute<K: AsRef<[u8]>>(&self, key: K) -> Option<&[u8]> {
        self.attributes.get(key.as_ref()).map(|value| value.as_ref())
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn set_attributes(&mut self, attributes: Attributes) -> &mut Self {
        self.attributes = attributes;
        self
    }

    fn content(&self) -> &Bytes {
        &self.content
    }

    fn set_content(&mut self, content: Bytes) -> &mut Self {
        self.content = content;
        self
    }

    fn serialize<W: Write>(&self, mut out: W) -> Result<()> {
        write_record(&mut out, &self.attributes, &self.content)?;
        debug!(
            attributes = self.attributes.len(),
            content_len = self.content.len(),
            "serialized flowfile"
        );
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, src: R) -> Result<()> {
        self.deserialize_with_config(src, &CodecConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};
    use proptest::prelude::*;

    use super::*;
    use crate::codec::MAGIC;
    use crate::error::{FlowFileError, Section};

    fn reference_stream() -> Vec<u8> {
        let mut wire = BytesMut::new();
        wire.put_slice(&MAGIC);
        wire.put_slice(&[0, 2]);
        wire.put_slice(&[0, 4]);
        wire.put_slice(b"key1");
        wire.put_slice(&[0, 6]);
        wire.put_slice(b"value1");
        wire.put_slice(&[0, 4]);
        wire.put_slice(b"key2");
        wire.put_slice(&[0, 6]);
        wire.put_slice(b"value2");
        wire.put_slice(&[0, 0, 0, 0, 0, 0, 0, 7]);
        wire.put_slice(b"content");
        wire.to_vec()
    }

    fn reference_flowfile() -> FlowFileV3 {
        let attributes = Attributes::from([
            (Bytes::from_static(b"key1"), Bytes::from_static(b"value1")),
            (Bytes::from_static(b"key2"), Bytes::from_static(b"value2")),
        ]);
        FlowFileV3::new()
            .with_attributes(attributes)
            .with_content(&b"content"[..])
    }

    #[test]
    fn decodes_reference_stream() {
        let mut decoded = FlowFileV3::new();
        decoded.deserialize(Cursor::new(reference_stream())).unwrap();

        assert_eq!(decoded.attribute_str("key1"), Some("value1"));
        assert_eq!(decoded.attribute("key2"), Some(&b"value2"[..]));
        assert_eq!(decoded.attribute("key3"), None);
        assert_eq!(decoded.content().as_ref(), b"content");
        assert_eq!(decoded, reference_flowfile());
    }

    #[test]
    fn serialize_then_deserialize_matches() {
        let original = reference_flowfile();
        let mut wire = Vec::new();
        original.serialize(&mut wire).unwrap();

        // Key-ordered attributes reproduce the reference bytes exactly.
        assert_eq!(wire, reference_stream());

        let mut decoded = FlowFileV3::new();
        decoded.deserialize(wire.as_slice()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn empty_flowfile_roundtrip() {
        let empty = FlowFileV3::new();
        let wire = empty.to_vec().unwrap();
        assert_eq!(wire.len(), MAGIC.len() + 2 + 8);
        assert_eq!(FlowFileV3::from_slice(&wire).unwrap(), empty);
    }

    #[test]
    fn fluent_setters_replace_wholesale() {
        let mut flowfile = reference_flowfile();
        flowfile
            .set_attributes(Attributes::from([(
                Bytes::from_static(b"only"),
                Bytes::from_static(b"one"),
            )]))
            .set_content(Bytes::from_static(b"new"));

        assert_eq!(flowfile.attributes().len(), 1);
        assert_eq!(flowfile.attribute("key1"), None);
        assert_eq!(flowfile.attribute_str("only"), Some("one"));
        assert_eq!(flowfile.content().as_ref(), b"new");
    }

    #[test]
    fn put_attribute_last_write_wins() {
        let mut flowfile = FlowFileV3::new();
        assert_eq!(flowfile.put_attribute("k", "a"), None);
        assert_eq!(flowfile.put_attribute("k", "b"), Some(Bytes::from_static(b"a")));
        assert_eq!(flowfile.attribute_str("k"), Some("b"));
    }

    #[test]
    fn deserialize_replaces_previous_state() {
        let mut flowfile = FlowFileV3::new()
            .with_attribute("stale", "yes")
            .with_content(&b"old"[..]);
        flowfile.deserialize(reference_stream().as_slice()).unwrap();

        assert_eq!(flowfile.attribute("stale"), None);
        assert_eq!(flowfile, reference_flowfile());
    }

    #[test]
    fn bad_magic_leaves_flowfile_untouched() {
        let mut wire = reference_stream();
        wire[6] = b'2';

        let mut flowfile = FlowFileV3::new()
            .with_attribute("keep", "me")
            .with_content(&b"old"[..]);
        let before = flowfile.clone();

        let err = flowfile.deserialize(wire.as_slice()).unwrap_err();
        assert!(matches!(err, FlowFileError::InvalidMagic));
        assert_eq!(flowfile, before);
    }

    #[test]
    fn content_failure_keeps_new_attributes_and_old_content() {
        let mut wire = reference_stream();
        wire.truncate(wire.len() - 2);

        let mut flowfile = FlowFileV3::new()
            .with_attribute("keep", "me")
            .with_content(&b"old"[..]);

        let err = flowfile.deserialize(wire.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            FlowFileError::Truncated {
                section: Section::Content,
                ..
            }
        ));
        assert_eq!(flowfile.attributes(), reference_flowfile().attributes());
        assert_eq!(flowfile.content().as_ref(), b"old");
    }

    #[test]
    fn attribute_failure_leaves_flowfile_untouched() {
        let mut wire = reference_stream();
        wire.truncate(MAGIC.len() + 2 + 2 + 4 + 1);

        let mut flowfile = FlowFileV3::new().with_attribute("keep", "me");
        let before = flowfile.clone();
        assert!(flowfile.deserialize(wire.as_slice()).is_err());
        assert_eq!(flowfile, before);
    }

    #[test]
    fn truncation_at_every_boundary() {
        let wire = reference_stream();
        // magic | count | key len | key | value len | value | ... | content len | content
        let cases = [
            (3, Section::Magic),
            (8, Section::AttributeCount),
            (10, Section::AttributeKey),
            (13, Section::AttributeKey),
            (16, Section::AttributeValue),
            (19, Section::AttributeValue),
            (41, Section::ContentLength),
            (48, Section::Content),
        ];
        for (len, section) in cases {
            let err = FlowFileV3::from_slice(&wire[..len]).unwrap_err();
            match err {
                FlowFileError::Truncated { section: got, .. } => {
                    assert_eq!(got, section, "truncated at {len}")
                }
                other => panic!("truncated at {len}: unexpected error {other}"),
            }
        }
    }

    #[test]
    fn every_prefix_fails_cleanly() {
        let wire = reference_stream();
        for len in 0..wire.len() {
            let err = FlowFileV3::from_slice(&wire[..len]).unwrap_err();
            assert!(
                matches!(err, FlowFileError::Truncated { .. }),
                "prefix {len}: {err}"
            );
        }
        assert!(FlowFileV3::from_slice(&wire).is_ok());
    }

    #[test]
    fn long_form_attribute_roundtrip() {
        for len in [65534usize, 65535, 65536] {
            let flowfile = FlowFileV3::new().with_attribute("k", "v".repeat(len));
            let wire = flowfile.to_vec().unwrap();
            assert_eq!(wire.len() as u64, flowfile.wire_size());

            let decoded = FlowFileV3::from_slice(&wire).unwrap();
            assert_eq!(decoded.attribute("k").map(<[u8]>::len), Some(len));
        }
    }

    #[test]
    fn non_utf8_attribute_bytes_roundtrip() {
        let mut wire = BytesMut::new();
        wire.put_slice(&MAGIC);
        wire.put_slice(&[0, 1]);
        wire.put_slice(&[0, 1, b'k']);
        wire.put_slice(&[0, 1, 0xE9]);
        wire.put_slice(&[0, 0, 0, 0, 0, 0, 0, 1, b'x']);

        let decoded = FlowFileV3::from_slice(&wire).unwrap();
        assert_eq!(decoded.attribute("k"), Some(&[0xE9][..]));
        assert_eq!(decoded.attribute_str("k"), None);
        assert_eq!(decoded.content().as_ref(), b"x");
        assert_eq!(decoded.to_vec().unwrap(), wire.to_vec());

        let binary_key = FlowFileV3::new().with_attribute(vec![0xE9, 0x00], vec![0xFF]);
        let decoded = FlowFileV3::from_slice(&binary_key.to_vec().unwrap()).unwrap();
        assert_eq!(decoded.attribute([0xE9, 0x00]), Some(&[0xFF][..]));
        assert_eq!(decoded, binary_key);
    }

    #[test]
    fn into_parts_returns_state() {
        let (attributes, content) = reference_flowfile().into_parts();
        assert_eq!(attributes.len(), 2);
        assert_eq!(content.as_ref(), b"content");
    }

    proptest! {
        #[test]
        fn roundtrip_arbitrary_flowfiles(
            attributes in proptest::collection::btree_map(
                proptest::collection::vec(any::<u8>(), 0..16).prop_map(Bytes::from),
                proptest::collection::vec(any::<u8>(), 0..64).prop_map(Bytes::from),
                0..8,
            ),
            content in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let original = FlowFileV3::from_parts(attributes, content);
            let wire = original.to_vec().unwrap();
            prop_assert_eq!(wire.len() as u64, original.wire_size());
            prop_assert_eq!(FlowFileV3::from_slice(&wire).unwrap(), original);
        }
    }
}
