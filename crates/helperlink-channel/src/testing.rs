//! Test doubles shared by the channel's unit tests.

use std::collections::VecDeque;
use std::io;

use helperlink_frame::{parse_tag, Opcode};
use helperlink_transport::{HelperStream, Readiness};

use crate::capabilities::{Capabilities, CapabilityResult};
use crate::error::CapabilityError;
use crate::outbox::Outbox;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    ServerInfo,
    UserInfo,
    SetAuth(String),
    Print(String),
    CenterPrint(String),
    Broadcast(String),
    Input,
    ServerCommand(String),
    ClientCommand(String),
    Login(bool),
}

/// Records every callback. Answers `UINFO` with `userinfo` and refuses
/// `refuse`, if set.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub events: Vec<Event>,
    pub userinfo: Option<String>,
    pub refuse: Option<Opcode>,
}

impl Recorder {
    fn record(&mut self, opcode: Opcode, event: Event) -> CapabilityResult {
        if self.refuse == Some(opcode) {
            return Err(CapabilityError::Rejected(format!("{opcode} refused")));
        }
        self.events.push(event);
        Ok(())
    }
}

impl Capabilities for Recorder {
    fn server_info(&mut self, _outbox: &mut Outbox) -> CapabilityResult {
        self.record(Opcode::ServerInfo, Event::ServerInfo)
    }

    fn user_info(&mut self, outbox: &mut Outbox) -> CapabilityResult {
        self.record(Opcode::UserInfo, Event::UserInfo)?;
        if let Some(userinfo) = &self.userinfo {
            outbox.send(Opcode::UserInfo, userinfo)?;
        }
        Ok(())
    }

    fn set_auth(&mut self, _outbox: &mut Outbox, auth: &str) -> CapabilityResult {
        self.record(Opcode::SetAuth, Event::SetAuth(auth.to_string()))
    }

    fn print(&mut self, _outbox: &mut Outbox, message: &str) -> CapabilityResult {
        self.record(Opcode::Print, Event::Print(message.to_string()))
    }

    fn center_print(&mut self, _outbox: &mut Outbox, message: &str) -> CapabilityResult {
        self.record(Opcode::CenterPrint, Event::CenterPrint(message.to_string()))
    }

    fn broadcast(&mut self, _outbox: &mut Outbox, message: &str) -> CapabilityResult {
        self.record(Opcode::Broadcast, Event::Broadcast(message.to_string()))
    }

    fn input(&mut self, _outbox: &mut Outbox) -> CapabilityResult {
        self.record(Opcode::Input, Event::Input)
    }

    fn server_command(&mut self, _outbox: &mut Outbox, command: &str) -> CapabilityResult {
        self.record(Opcode::ServerCommand, Event::ServerCommand(command.to_string()))
    }

    fn client_command(&mut self, _outbox: &mut Outbox, command: &str) -> CapabilityResult {
        self.record(Opcode::ClientCommand, Event::ClientCommand(command.to_string()))
    }

    fn login(&mut self, _outbox: &mut Outbox, accepted: bool) -> CapabilityResult {
        self.record(Opcode::Login, Event::Login(accepted))
    }
}

#[derive(Debug)]
pub(crate) enum ReadStep {
    Data(Vec<u8>),
    Fail(io::ErrorKind),
    Eof,
}

#[derive(Debug)]
pub(crate) enum WriteStep {
    Accept(usize),
    Fail(io::ErrorKind),
}

/// A helper stream driven by a script. An exhausted read script would-blocks;
/// an exhausted write script accepts everything.
#[derive(Debug, Default)]
pub(crate) struct ScriptedStream {
    pub reads: VecDeque<ReadStep>,
    pub writes: VecDeque<WriteStep>,
    pub written: Vec<u8>,
    pub readiness: Option<Readiness>,
    pub read_calls: usize,
}

impl ScriptedStream {
    pub fn with_chunks(chunks: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            reads: chunks.into_iter().map(ReadStep::Data).collect(),
            ..Self::default()
        }
    }
}

impl HelperStream for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_calls += 1;
        match self.reads.pop_front() {
            None => Err(io::ErrorKind::WouldBlock.into()),
            Some(ReadStep::Eof) => Ok(0),
            Some(ReadStep::Fail(kind)) => Err(kind.into()),
            Some(ReadStep::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.reads.push_front(ReadStep::Data(data.split_off(n)));
                }
                Ok(n)
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = match self.writes.pop_front() {
            None => buf.len(),
            Some(WriteStep::Accept(limit)) => limit.min(buf.len()),
            Some(WriteStep::Fail(kind)) => return Err(kind.into()),
        };
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn poll_ready(&mut self, want_write: bool) -> io::Result<Readiness> {
        let ready = self.readiness.unwrap_or(Readiness::ALL);
        Ok(Readiness {
            readable: ready.readable,
            writable: ready.writable && want_write,
        })
    }
}

/// Encode `(opcode, payload)` pairs the way a helper writes them.
pub(crate) fn wire(frames: &[(&str, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (opcode, payload) in frames {
        let tag = parse_tag(opcode).expect("five-byte test opcode");
        out.extend_from_slice(&((payload.len() + tag.len()) as u32).to_ne_bytes());
        out.extend_from_slice(&tag);
        out.extend_from_slice(payload.as_bytes());
    }
    out
}
