use helperlink_frame::{
    encode_into, parse_tag, strip_line_terminator, FrameError, FramedBuffer, Opcode, OpcodeTag,
};
use tracing::{trace, warn};

/// Messages queued for the helper, waiting for the next send pump.
///
/// Capability callbacks receive the outbox so they can reply while a frame is
/// being dispatched; nothing here touches the pipe.
pub struct Outbox {
    buf: FramedBuffer,
}

impl Outbox {
    /// An empty outbox holding at most `capacity` encoded bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: FramedBuffer::with_capacity(capacity),
        }
    }

    /// Queue a frame with a known opcode. One trailing `\n` is stripped from
    /// `text` before framing.
    ///
    /// Returns the number of bytes queued. On `BufferFull` nothing is queued.
    pub fn send(&mut self, opcode: Opcode, text: &str) -> Result<usize, FrameError> {
        self.push(opcode.tag(), text)
    }

    /// Queue a frame with a caller-supplied tag, which must be exactly five
    /// bytes.
    pub fn enqueue(&mut self, opcode: &str, text: &str) -> Result<usize, FrameError> {
        let tag = parse_tag(opcode)?;
        self.push(&tag, text)
    }

    fn push(&mut self, tag: &OpcodeTag, text: &str) -> Result<usize, FrameError> {
        let payload = strip_line_terminator(text).as_bytes();
        match encode_into(tag, payload, &mut self.buf) {
            Ok(written) => {
                trace!(opcode = %String::from_utf8_lossy(tag), bytes = written, "queued frame");
                Ok(written)
            }
            Err(err) => {
                warn!(
                    opcode = %String::from_utf8_lossy(tag),
                    pending = self.buf.len(),
                    error = %err,
                    "dropping message for helper"
                );
                Err(err)
            }
        }
    }

    /// Bytes queued and not yet written to the helper.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The underlying send buffer.
    pub fn buffer(&self) -> &FramedBuffer {
        &self.buf
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut FramedBuffer {
        &mut self.buf
    }
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("pending", &self.buf.len())
            .field("capacity", &self.buf.capacity())
            .finish()
    }
}
