use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, encoded_len, FrameConfig, LENGTH_SIZE};
use crate::error::{FrameError, Result};
use crate::opcode::{parse_tag, Opcode, OpcodeTag};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Blocking frame writer for the helper side of the pipe.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Send a frame with a known opcode.
    pub fn send(&mut self, opcode: Opcode, text: &str) -> Result<()> {
        self.send_raw(opcode.tag(), text.as_bytes())
    }

    /// Send a frame with an arbitrary 5-byte tag.
    pub fn send_tag(&mut self, opcode: &str, text: &str) -> Result<()> {
        let tag = parse_tag(opcode)?;
        self.send_raw(&tag, text.as_bytes())
    }

    /// Encode and write one frame, then flush.
    pub fn send_raw(&mut self, opcode: &OpcodeTag, payload: &[u8]) -> Result<()> {
        let frame_len = encoded_len(payload.len()) - LENGTH_SIZE;
        if frame_len > self.config.max_frame_len {
            return Err(FrameError::PayloadTooLarge {
                size: frame_len,
                max: self.config.max_frame_len,
            });
        }

        self.buf.clear();
        encode_frame(opcode, payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
