//! Opcode table for protocol version 1.
//!
//! Every opcode is a fixed 5-byte ASCII tag. Tags from other protocol
//! revisions (for example a bare `SETINFO`-style credential opcode) are not
//! aliases of these and are rejected as unknown.

use crate::error::{FrameError, Result};

/// Size of every opcode tag on the wire.
pub const OPCODE_SIZE: usize = 5;

/// A raw opcode tag as it appears on the wire.
pub type OpcodeTag = [u8; OPCODE_SIZE];

/// Which side may originate a frame carrying a given opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by the helper, dispatched by the server.
    ToServer,
    /// Sent by the server, read by the helper.
    ToHelper,
    /// Valid in both directions (query from the helper, reply from the server).
    Both,
}

/// Known opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Query (helper) or reply (server) carrying the serverinfo string.
    ServerInfo,
    /// Query (helper) or reply (server) carrying the session userinfo string.
    UserInfo,
    /// Set the session's auth credential key.
    SetAuth,
    /// High priority print on the client's console.
    Print,
    /// Print in the center of the client's screen.
    CenterPrint,
    /// Broadcast to every connected user.
    Broadcast,
    /// Prompt the user for a line of input.
    Input,
    /// Execute a command on the server console.
    ServerCommand,
    /// Execute a command on the client console.
    ClientCommand,
    /// Final login decision.
    Login,
    /// Marks the end of output from a server command.
    EndOfCommand,
    /// Client console output, including answers to `INPUT` prompts.
    ClientOutput,
    /// Output produced by a server command.
    ServerOutput,
}

impl Opcode {
    /// Every known opcode, in table order.
    pub const ALL: [Opcode; 13] = [
        Opcode::ServerInfo,
        Opcode::UserInfo,
        Opcode::SetAuth,
        Opcode::Print,
        Opcode::CenterPrint,
        Opcode::Broadcast,
        Opcode::Input,
        Opcode::ServerCommand,
        Opcode::ClientCommand,
        Opcode::Login,
        Opcode::EndOfCommand,
        Opcode::ClientOutput,
        Opcode::ServerOutput,
    ];

    /// The wire tag.
    pub const fn tag(self) -> &'static OpcodeTag {
        match self {
            Opcode::ServerInfo => b"SINFO",
            Opcode::UserInfo => b"UINFO",
            Opcode::SetAuth => b"SAUTH",
            Opcode::Print => b"PRINT",
            Opcode::CenterPrint => b"CPRNT",
            Opcode::Broadcast => b"BCAST",
            Opcode::Input => b"INPUT",
            Opcode::ServerCommand => b"SVCMD",
            Opcode::ClientCommand => b"CLCMD",
            Opcode::Login => b"LOGIN",
            Opcode::EndOfCommand => b"EOCMD",
            Opcode::ClientOutput => b"CLOUT",
            Opcode::ServerOutput => b"SVOUT",
        }
    }

    /// The wire tag as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Opcode::ServerInfo => "SINFO",
            Opcode::UserInfo => "UINFO",
            Opcode::SetAuth => "SAUTH",
            Opcode::Print => "PRINT",
            Opcode::CenterPrint => "CPRNT",
            Opcode::Broadcast => "BCAST",
            Opcode::Input => "INPUT",
            Opcode::ServerCommand => "SVCMD",
            Opcode::ClientCommand => "CLCMD",
            Opcode::Login => "LOGIN",
            Opcode::EndOfCommand => "EOCMD",
            Opcode::ClientOutput => "CLOUT",
            Opcode::ServerOutput => "SVOUT",
        }
    }

    /// Resolve a wire tag by exact match.
    pub fn from_tag(tag: &[u8]) -> Option<Opcode> {
        Self::ALL.into_iter().find(|op| op.tag().as_slice() == tag)
    }

    /// Which side originates frames with this opcode.
    pub fn direction(self) -> Direction {
        match self {
            Opcode::ServerInfo | Opcode::UserInfo | Opcode::EndOfCommand => Direction::Both,
            Opcode::ClientOutput | Opcode::ServerOutput => Direction::ToHelper,
            _ => Direction::ToServer,
        }
    }

    /// Whether the server accepts this opcode from the helper.
    pub fn accepted_from_helper(self) -> bool {
        self.direction() != Direction::ToHelper
    }

    /// Whether the payload is meaningful text for the dispatched callback.
    pub fn carries_text(self) -> bool {
        matches!(
            self,
            Opcode::SetAuth
                | Opcode::Print
                | Opcode::CenterPrint
                | Opcode::Broadcast
                | Opcode::ServerCommand
                | Opcode::ClientCommand
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Opcode {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        let tag = parse_tag(s)?;
        Opcode::from_tag(&tag).ok_or_else(|| FrameError::UnknownOpcode(s.to_string()))
    }
}

/// Validate an outbound tag: exactly five bytes, no other constraint.
pub fn parse_tag(opcode: &str) -> Result<OpcodeTag> {
    opcode
        .as_bytes()
        .try_into()
        .map_err(|_| FrameError::InvalidOpcode(opcode.to_string()))
}

/// Render a raw tag for diagnostics.
pub fn tag_display(tag: &[u8]) -> String {
    String::from_utf8_lossy(tag).into_owned()
}
