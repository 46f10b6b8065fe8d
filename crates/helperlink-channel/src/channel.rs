use std::io::ErrorKind;

use helperlink_frame::{peek_frame, FramedBuffer, Opcode};
use helperlink_transport::{HelperStream, TransportError};
#[cfg(unix)]
use helperlink_transport::{launch, HelperPipes};
use tracing::{debug, trace, warn};

use crate::capabilities::Capabilities;
use crate::config::ChannelConfig;
use crate::dispatch::dispatch;
use crate::error::{ChannelError, Result};
use crate::outbox::Outbox;
use crate::status::Pump;

/// A framed, non-blocking conversation with one login helper.
///
/// The owner drives it by calling [`Channel::check`] from its main loop.
/// Every pump performs at most one read and one write, and each complete
/// inbound frame becomes exactly one callback on `H`, in order.
///
/// Errors other than [`ChannelError::Frame`] mean the stream can no longer be
/// trusted; the owner should drop the channel.
///
/// On unix the usual stream is [`HelperPipes`], see [`HelperChannel`].
pub struct Channel<H, S> {
    stream: S,
    handler: H,
    recv: FramedBuffer,
    outbox: Outbox,
    config: ChannelConfig,
}

/// A channel to a helper process launched by [`Channel::spawn`].
#[cfg(unix)]
pub type HelperChannel<H> = Channel<H, HelperPipes>;

#[cfg(unix)]
impl<H: Capabilities> Channel<H, HelperPipes> {
    /// Launch `command` through `/bin/sh -c` and connect to it.
    pub fn spawn(command: &str, handler: H) -> Result<Self> {
        Self::spawn_with_config(command, handler, ChannelConfig::default())
    }

    pub fn spawn_with_config(command: &str, handler: H, config: ChannelConfig) -> Result<Self> {
        let pipes = launch(command)?;
        Ok(Self::with_config(pipes, handler, config))
    }
}

impl<H: Capabilities, S: HelperStream> Channel<H, S> {
    /// Wrap an already-connected helper stream.
    pub fn new(stream: S, handler: H) -> Self {
        Self::with_config(stream, handler, ChannelConfig::default())
    }

    pub fn with_config(stream: S, handler: H, config: ChannelConfig) -> Self {
        Self {
            stream,
            handler,
            recv: FramedBuffer::with_capacity(config.buffer_capacity),
            outbox: Outbox::with_capacity(config.buffer_capacity),
            config,
        }
    }

    /// Queue a message for the helper and try to write it right away.
    ///
    /// `opcode` must be exactly five bytes. One trailing `\n` is stripped
    /// from `text`. A full send buffer or bad opcode drops this message only
    /// and leaves the channel usable.
    pub fn enqueue(&mut self, opcode: &str, text: &str) -> Result<()> {
        self.outbox.enqueue(opcode, text)?;
        self.pump_send().map(drop)
    }

    /// [`Channel::enqueue`] with a known opcode.
    pub fn send(&mut self, opcode: Opcode, text: &str) -> Result<()> {
        self.outbox.send(opcode, text)?;
        self.pump_send().map(drop)
    }

    /// One non-blocking write of pending bytes.
    pub fn pump_send(&mut self) -> Result<Pump> {
        let buf = self.outbox.buffer_mut();
        if buf.is_empty() {
            return Ok(Pump::Idle);
        }

        match self.stream.write(buf.filled()) {
            Ok(0) => {
                debug!("helper stopped accepting input");
                Err(ChannelError::HelperClosed)
            }
            Ok(n) => {
                buf.mark_unused(n);
                if buf.is_empty() {
                    buf.clear();
                }
                trace!(bytes = n, pending = buf.len(), "wrote to helper");
                Ok(Pump::Progress { bytes: n, frames: 0 })
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(Pump::Idle)
            }
            Err(err) => {
                debug!(error = %err, "helper input failed");
                Err(ChannelError::HelperIo(err))
            }
        }
    }

    /// One non-blocking read, then dispatch of every complete frame.
    pub fn pump_receive(&mut self) -> Result<Pump> {
        let avail = self.recv.avail();
        if avail == 0 {
            warn!(
                capacity = self.recv.capacity(),
                "helper frame does not fit the receive buffer"
            );
            return Err(ChannelError::Overflow {
                capacity: self.recv.capacity(),
            });
        }

        let read = match self.stream.read(&mut self.recv.spare_mut()[..avail]) {
            Ok(0) => {
                debug!("helper closed its output");
                return Err(ChannelError::HelperClosed);
            }
            Ok(n) => n,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                return Ok(Pump::Idle);
            }
            Err(err) => {
                debug!(error = %err, "helper output failed");
                return Err(ChannelError::HelperIo(err));
            }
        };
        self.recv.mark_used(read);

        let mut frames = 0;
        loop {
            let frame = match peek_frame(self.recv.filled()) {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "malformed frame from helper");
                    return Err(ChannelError::Protocol(err));
                }
            };
            let size = frame.wire_size();

            let dispatched = dispatch(
                frame,
                &mut self.handler,
                &mut self.outbox,
                self.config.max_text_len,
            );
            if let Err(err) = dispatched {
                warn!(error = %err, "dropping helper stream");
                return Err(err);
            }
            self.recv.mark_unused(size);
            frames += 1;
        }

        self.recv.reorganize();
        trace!(bytes = read, frames, buffered = self.recv.len(), "read from helper");
        Ok(Pump::Progress {
            bytes: read,
            frames,
        })
    }

    /// Poll both pipes without blocking and pump whichever side is ready.
    ///
    /// Replies queued by callbacks during this tick are flushed
    /// opportunistically before returning.
    pub fn check(&mut self) -> Result<Pump> {
        let want_write = !self.outbox.is_empty();
        let ready = self
            .stream
            .poll_ready(want_write)
            .map_err(TransportError::Poll)?;

        let mut outcome = Pump::Idle;
        if ready.writable && want_write {
            outcome = outcome.merge(self.pump_send()?);
        }
        if ready.readable {
            outcome = outcome.merge(self.pump_receive()?);
            if !self.outbox.is_empty() {
                outcome = outcome.merge(self.pump_send()?);
            }
        }
        Ok(outcome)
    }

    pub fn pid(&self) -> Option<u32> {
        self.stream.pid()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Messages waiting for the helper.
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Bytes received but not yet forming a complete frame.
    pub fn receive_buffer(&self) -> &FramedBuffer {
        &self.recv
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Tear the channel down, returning the handler and its state.
    pub fn into_handler(self) -> H {
        self.handler
    }
}

impl<H, S: HelperStream> std::fmt::Debug for Channel<H, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("pid", &self.stream.pid())
            .field("received", &self.recv.len())
            .field("outbox", &self.outbox)
            .finish()
    }
}
