use helperlink_frame::{FramedBuffer, DEFAULT_MAX_TEXT_LEN};

/// Sizing for a channel's buffers and text conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Capacity of each direction's buffer. Also the largest frame encoding
    /// (length + opcode + payload) the helper may send.
    pub buffer_capacity: usize,
    /// Payloads longer than this reach callbacks as the overflow marker.
    pub max_text_len: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: FramedBuffer::DEFAULT_CAPACITY,
            max_text_len: DEFAULT_MAX_TEXT_LEN,
        }
    }
}
