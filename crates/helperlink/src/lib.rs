//! Framed, non-blocking pipe channels between a server and external login helpers.
//!
//! A server launches a helper program, then exchanges opcode-tagged frames
//! with it over the helper's stdin/stdout without ever blocking its own loop.
//!
//! # Crate Structure
//!
//! - [`frame`] - Fixed-capacity buffer, opcode table and wire codec
//! - [`transport`] - Helper launch and non-blocking pipe I/O
//! - [`channel`] - The pumped channel and the server's capability callbacks

/// Re-export frame types.
pub mod frame {
    pub use helperlink_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use helperlink_transport::*;
}

/// Re-export channel types.
pub mod channel {
    pub use helperlink_channel::*;
}
