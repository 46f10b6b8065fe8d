use std::borrow::Cow;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::buffer::FramedBuffer;
use crate::error::{FrameError, Result};
use crate::opcode::{tag_display, Opcode, OpcodeTag, OPCODE_SIZE};

/// Size of the length field that prefixes every frame.
pub const LENGTH_SIZE: usize = 4;

/// Length field plus opcode tag.
pub const HEADER_SIZE: usize = LENGTH_SIZE + OPCODE_SIZE;

/// Largest length field a default-sized receive buffer can ever complete.
pub const DEFAULT_MAX_FRAME_LEN: usize = FramedBuffer::DEFAULT_CAPACITY - LENGTH_SIZE;

/// Longest payload converted to text before the overflow marker is substituted.
pub const DEFAULT_MAX_TEXT_LEN: usize = 8191;

/// Text handed to callbacks in place of a payload longer than the text limit.
pub const OVERFLOW_TEXT: &str = "<STRING OVERFLOW>";

/// An owned frame, as read by a helper-side [`FrameReader`](crate::FrameReader).
#[derive(Debug, Clone)]
pub struct Frame {
    /// The raw opcode tag.
    pub opcode: OpcodeTag,
    /// The payload following the tag.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(opcode: Opcode, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode: *opcode.tag(),
            payload: payload.into(),
        }
    }

    /// The known opcode for this frame's tag, if any.
    pub fn kind(&self) -> Option<Opcode> {
        Opcode::from_tag(&self.opcode)
    }

    /// The tag as text.
    pub fn tag(&self) -> String {
        tag_display(&self.opcode)
    }

    /// The payload as text (lossy).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// The total wire size of this frame (length + opcode + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// A complete frame borrowed from the front of a receive buffer.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    /// The 5-byte opcode tag.
    pub tag: &'a [u8],
    /// Payload bytes (`length - 5`).
    pub payload: &'a [u8],
}

impl RawFrame<'_> {
    /// Bytes this frame occupies in the buffer, length field included.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Drop exactly one trailing `'\n'`; the wire never carries a line terminator.
pub fn strip_line_terminator(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}

/// Wire size of a frame carrying `payload_len` payload bytes.
pub fn encoded_len(payload_len: usize) -> usize {
    HEADER_SIZE + payload_len
}

fn length_field(payload_len: usize) -> Result<u32> {
    u32::try_from(OPCODE_SIZE + payload_len).map_err(|_| FrameError::PayloadTooLarge {
        size: payload_len,
        max: u32::MAX as usize - OPCODE_SIZE,
    })
}

/// Encode a frame into a growable buffer.
///
/// Wire format:
/// ```text
/// ┌────────────────┬──────────────┬──────────────────────┐
/// │ Length (4B)    │ Opcode (5B)  │ Payload              │
/// │ host order     │ ASCII tag    │ (Length - 5 bytes)   │
/// └────────────────┴──────────────┴──────────────────────┘
/// ```
///
/// The length field is in host byte order. Both ends of a helper pipe run on
/// the same machine, so this is not a portable encoding.
pub fn encode_frame(opcode: &OpcodeTag, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let length = length_field(payload.len())?;
    dst.reserve(encoded_len(payload.len()));
    dst.put_u32_ne(length);
    dst.put_slice(opcode);
    dst.put_slice(payload);
    Ok(())
}

/// Encode a frame at the tail of a fixed-capacity buffer.
///
/// Nothing is written when the buffer cannot make room for the whole frame.
/// Returns the number of bytes appended.
pub fn encode_into(opcode: &OpcodeTag, payload: &[u8], dst: &mut FramedBuffer) -> Result<usize> {
    let length = length_field(payload.len())?;
    let needed = encoded_len(payload.len());
    dst.make_space(needed)?;

    let mut tail = &mut dst.spare_mut()[..needed];
    tail.put_u32_ne(length);
    tail.put_slice(opcode);
    tail.put_slice(payload);

    dst.mark_used(needed);
    Ok(needed)
}

/// Look at the first complete frame in `src` without consuming it.
///
/// Returns `Ok(None)` while the frame is incomplete. Only more than
/// [`LENGTH_SIZE`] buffered bytes are inspected.
pub fn peek_frame(src: &[u8]) -> Result<Option<RawFrame<'_>>> {
    if src.len() <= LENGTH_SIZE {
        return Ok(None);
    }

    let length = (&src[..LENGTH_SIZE]).get_u32_ne() as usize;
    if length > src.len() - LENGTH_SIZE {
        return Ok(None);
    }
    if length < OPCODE_SIZE {
        return Err(FrameError::Truncated { length });
    }

    let body = &src[LENGTH_SIZE..LENGTH_SIZE + length];
    let (tag, payload) = body.split_at(OPCODE_SIZE);
    Ok(Some(RawFrame { tag, payload }))
}

/// Decode and consume one frame from a growable buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// `max_frame_len` bounds the length field (opcode + payload).
pub fn decode_frame(src: &mut BytesMut, max_frame_len: usize) -> Result<Option<Frame>> {
    if src.len() < LENGTH_SIZE {
        return Ok(None);
    }

    let length = (&src[..LENGTH_SIZE]).get_u32_ne() as usize;
    if length > max_frame_len {
        return Err(FrameError::PayloadTooLarge {
            size: length,
            max: max_frame_len,
        });
    }
    if length < OPCODE_SIZE {
        return Err(FrameError::Truncated { length });
    }
    if src.len() < LENGTH_SIZE + length {
        return Ok(None);
    }

    src.advance(LENGTH_SIZE);
    let mut opcode = [0u8; OPCODE_SIZE];
    src.copy_to_slice(&mut opcode);
    let payload = src.split_to(length - OPCODE_SIZE).freeze();

    Ok(Some(Frame { opcode, payload }))
}

/// Convert a payload to text for a callback, bounded by `max_len` bytes.
///
/// Oversized payloads become [`OVERFLOW_TEXT`] instead of being truncated.
pub fn bounded_text(payload: &[u8], max_len: usize) -> Cow<'_, str> {
    if payload.len() > max_len {
        return Cow::Borrowed(OVERFLOW_TEXT);
    }
    String::from_utf8_lossy(payload)
}

/// Interpret a `LOGIN` payload: only a case-insensitive `success` accepts.
pub fn login_accepted(payload: &[u8]) -> bool {
    payload.eq_ignore_ascii_case(b"success")
}

/// Configuration for the blocking helper-side codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum length field (opcode + payload). Default: receive capacity - 4.
    pub max_frame_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}
