use crate::error::CapabilityError;
use crate::outbox::Outbox;

pub type CapabilityResult = std::result::Result<(), CapabilityError>;

/// Server operations a login helper may invoke.
///
/// The channel calls exactly one method per inbound frame, in arrival order,
/// on the thread that pumps it. `outbox` queues replies to the helper; they
/// are written by a later send pump, never inside the callback. Text
/// arguments are already stripped of framing and bounded in length.
///
/// Returning an error makes the pump report a protocol error.
pub trait Capabilities {
    /// `SINFO`: the helper wants the server info string.
    fn server_info(&mut self, outbox: &mut Outbox) -> CapabilityResult;

    /// `UINFO`: the helper wants the connecting client's userinfo string.
    fn user_info(&mut self, outbox: &mut Outbox) -> CapabilityResult;

    /// `SAUTH`: record `auth` as the client's authenticated identity.
    fn set_auth(&mut self, outbox: &mut Outbox, auth: &str) -> CapabilityResult;

    /// `PRINT`: show `message` to the connecting client.
    fn print(&mut self, outbox: &mut Outbox, message: &str) -> CapabilityResult;

    /// `CPRNT`: center-print `message` to the connecting client.
    fn center_print(&mut self, outbox: &mut Outbox, message: &str) -> CapabilityResult;

    /// `BCAST`: broadcast `message` to every client.
    fn broadcast(&mut self, outbox: &mut Outbox, message: &str) -> CapabilityResult;

    /// `INPUT`: the next line the client types goes back to the helper as
    /// `CLOUT`.
    fn input(&mut self, outbox: &mut Outbox) -> CapabilityResult;

    /// `SVCMD`: run `command` on the server console.
    fn server_command(&mut self, outbox: &mut Outbox, command: &str) -> CapabilityResult;

    /// `CLCMD`: run `command` as the connecting client.
    fn client_command(&mut self, outbox: &mut Outbox, command: &str) -> CapabilityResult;

    /// `LOGIN`: the helper's verdict. `accepted` is true only for a
    /// `success` payload.
    fn login(&mut self, outbox: &mut Outbox, accepted: bool) -> CapabilityResult;
}

impl<C: Capabilities + ?Sized> Capabilities for Box<C> {
    fn server_info(&mut self, outbox: &mut Outbox) -> CapabilityResult {
        (**self).server_info(outbox)
    }

    fn user_info(&mut self, outbox: &mut Outbox) -> CapabilityResult {
        (**self).user_info(outbox)
    }

    fn set_auth(&mut self, outbox: &mut Outbox, auth: &str) -> CapabilityResult {
        (**self).set_auth(outbox, auth)
    }

    fn print(&mut self, outbox: &mut Outbox, message: &str) -> CapabilityResult {
        (**self).print(outbox, message)
    }

    fn center_print(&mut self, outbox: &mut Outbox, message: &str) -> CapabilityResult {
        (**self).center_print(outbox, message)
    }

    fn broadcast(&mut self, outbox: &mut Outbox, message: &str) -> CapabilityResult {
        (**self).broadcast(outbox, message)
    }

    fn input(&mut self, outbox: &mut Outbox) -> CapabilityResult {
        (**self).input(outbox)
    }

    fn server_command(&mut self, outbox: &mut Outbox, command: &str) -> CapabilityResult {
        (**self).server_command(outbox, command)
    }

    fn client_command(&mut self, outbox: &mut Outbox, command: &str) -> CapabilityResult {
        (**self).client_command(outbox, command)
    }

    fn login(&mut self, outbox: &mut Outbox, accepted: bool) -> CapabilityResult {
        (**self).login(outbox, accepted)
    }
}
