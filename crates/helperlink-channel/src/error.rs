use helperlink_frame::{FrameError, Opcode};
use helperlink_transport::TransportError;

use crate::status::Status;

/// Errors reported by a channel's pump and enqueue operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Launching or polling the helper failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A local send-side problem: bad opcode width or a full send buffer.
    /// The message was not queued; the channel remains usable.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The receive buffer is saturated by a frame that can never complete.
    #[error("receive buffer overflow ({capacity}-byte buffer holds an incomplete frame)")]
    Overflow { capacity: usize },

    /// The helper's output reached end-of-stream.
    #[error("helper closed its output")]
    HelperClosed,

    /// A helper pipe failed for a reason other than would-block.
    #[error("helper pipe failed: {0}")]
    HelperIo(#[source] std::io::Error),

    /// The helper sent a frame that cannot be dispatched.
    #[error("protocol error: {0}")]
    Protocol(#[source] FrameError),

    /// A capability callback reported failure for a well-formed frame.
    #[error("{opcode} handler failed: {source}")]
    Capability {
        opcode: Opcode,
        #[source]
        source: CapabilityError,
    },
}

impl ChannelError {
    /// Flat status code for this error.
    pub fn status(&self) -> Status {
        match self {
            ChannelError::Frame(FrameError::InvalidOpcode(_)) => Status::InvalidOpcode,
            ChannelError::Frame(_) | ChannelError::Overflow { .. } => Status::Overflow,
            ChannelError::Transport(_)
            | ChannelError::HelperClosed
            | ChannelError::HelperIo(_) => Status::HelperClosed,
            ChannelError::Protocol(_) | ChannelError::Capability { .. } => Status::ProtocolError,
        }
    }

    /// Whether the channel must be torn down after this error.
    ///
    /// Only send-side frame errors leave the channel usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ChannelError::Frame(_))
    }
}

/// Failure reported by a capability callback.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// The server does not implement this capability.
    #[error("not supported by this server")]
    Unsupported,

    /// The server refused the request.
    #[error("{0}")]
    Rejected(String),

    /// A reply could not be queued for the helper.
    #[error("reply not queued: {0}")]
    Reply(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
