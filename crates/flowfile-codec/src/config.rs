/// Decode limits applied while reading FlowFile records.
///
/// The defaults are the widest values the wire format can express, so a
/// default config accepts every well-formed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Maximum number of attributes in one record.
    pub max_attribute_count: u32,
    /// Maximum byte length of a single attribute key or value.
    pub max_string_len: u32,
    /// Maximum content size in bytes.
    pub max_content_size: u64,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_attribute_count: u32::MAX,
            max_string_len: u32::MAX,
            max_content_size: u64::MAX,
        }
    }
}
