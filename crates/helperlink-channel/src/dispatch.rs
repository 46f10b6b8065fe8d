use std::borrow::Cow;

use helperlink_frame::{bounded_text, login_accepted, tag_display, FrameError, Opcode, RawFrame};
use tracing::trace;

use crate::capabilities::Capabilities;
use crate::error::{ChannelError, Result};
use crate::outbox::Outbox;

/// Route one inbound frame to its capability callback.
pub(crate) fn dispatch<H>(
    frame: RawFrame<'_>,
    handler: &mut H,
    outbox: &mut Outbox,
    max_text_len: usize,
) -> Result<Opcode>
where
    H: Capabilities + ?Sized,
{
    let opcode = Opcode::from_tag(frame.tag)
        .ok_or_else(|| ChannelError::Protocol(FrameError::UnknownOpcode(tag_display(frame.tag))))?;
    trace!(%opcode, size = frame.payload.len(), "dispatching frame from helper");

    if !opcode.accepted_from_helper() {
        return Err(ChannelError::Protocol(FrameError::UnexpectedOpcode(
            opcode.as_str(),
        )));
    }

    let text = if opcode.carries_text() {
        bounded_text(frame.payload, max_text_len)
    } else {
        Cow::Borrowed("")
    };
    let result = match opcode {
        Opcode::ServerInfo => handler.server_info(outbox),
        Opcode::UserInfo => handler.user_info(outbox),
        Opcode::SetAuth => handler.set_auth(outbox, &text),
        Opcode::Print => handler.print(outbox, &text),
        Opcode::CenterPrint => handler.center_print(outbox, &text),
        Opcode::Broadcast => handler.broadcast(outbox, &text),
        Opcode::Input => handler.input(outbox),
        Opcode::ServerCommand => handler.server_command(outbox, &text),
        Opcode::ClientCommand => handler.client_command(outbox, &text),
        Opcode::Login => handler.login(outbox, login_accepted(frame.payload)),
        Opcode::EndOfCommand | Opcode::ClientOutput | Opcode::ServerOutput => Ok(()),
    };

    result.map_err(|source| ChannelError::Capability { opcode, source })?;
    Ok(opcode)
}
