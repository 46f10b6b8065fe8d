/// Errors that can occur while buffering, encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffer cannot hold the requested bytes even after compaction.
    #[error("buffer full ({requested} bytes requested, {free} free of {capacity})")]
    BufferFull {
        requested: usize,
        free: usize,
        capacity: usize,
    },

    /// An outbound opcode is not exactly five bytes long.
    #[error("invalid opcode {0:?} (opcodes are exactly 5 bytes)")]
    InvalidOpcode(String),

    /// An inbound frame carries a tag outside the opcode table.
    #[error("unknown opcode {0:?}")]
    UnknownOpcode(String),

    /// An inbound frame carries a tag that is only valid in the other direction.
    #[error("opcode {0} is not accepted from the helper")]
    UnexpectedOpcode(&'static str),

    /// The length field is too short to hold an opcode.
    #[error("truncated frame (length {length}, minimum 5)")]
    Truncated { length: usize },

    /// The payload cannot be described by a 32-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
