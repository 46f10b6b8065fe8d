//! Fixed-capacity buffering and opcode-tagged framing for login helper pipes.
//!
//! Every message is framed with:
//! - A 4-byte length in host byte order (opcode + payload)
//! - A 5-byte ASCII opcode tag
//! - The payload, interpreted per opcode as text
//!
//! [`FramedBuffer`] is the bounded store the server-side channel pumps bytes
//! through. [`FrameReader`] and [`FrameWriter`] are the blocking helper-side
//! counterparts.

pub mod buffer;
pub mod codec;
pub mod error;
pub mod opcode;
pub mod reader;
pub mod writer;

pub use buffer::FramedBuffer;
pub use codec::{
    bounded_text, decode_frame, encode_frame, encode_into, encoded_len, login_accepted,
    peek_frame, strip_line_terminator, Frame, FrameConfig, RawFrame, DEFAULT_MAX_FRAME_LEN,
    DEFAULT_MAX_TEXT_LEN, HEADER_SIZE, LENGTH_SIZE, OVERFLOW_TEXT,
};
pub use error::{FrameError, Result};
pub use opcode::{parse_tag, tag_display, Direction, Opcode, OpcodeTag, OPCODE_SIZE};
pub use reader::FrameReader;
pub use writer::FrameWriter;
