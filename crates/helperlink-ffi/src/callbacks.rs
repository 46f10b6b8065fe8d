use std::ffi::c_void;

use helperlink_channel::{Capabilities, CapabilityError, CapabilityResult, Outbox};

use crate::error::c_string;
use crate::types::{HlCallbacks, HlOutboxHandle, HlRequestFn, HlTextFn};

/// Capabilities backed by a C callback table and its userdata pointer.
pub(crate) struct ForeignCapabilities {
    callbacks: HlCallbacks,
    userdata: *mut c_void,
}

fn outbox_handle(outbox: &mut Outbox) -> HlOutboxHandle {
    outbox as *mut Outbox as HlOutboxHandle
}

fn verdict(name: &str, rc: i32) -> CapabilityResult {
    if rc == 0 {
        Ok(())
    } else {
        Err(CapabilityError::Rejected(format!(
            "{name} callback returned {rc}"
        )))
    }
}

impl ForeignCapabilities {
    pub(crate) fn new(callbacks: HlCallbacks, userdata: *mut c_void) -> Self {
        Self {
            callbacks,
            userdata,
        }
    }

    fn request(
        &self,
        name: &str,
        cb: Option<HlRequestFn>,
        outbox: &mut Outbox,
    ) -> CapabilityResult {
        let cb = cb.ok_or(CapabilityError::Unsupported)?;
        verdict(name, cb(self.userdata, outbox_handle(outbox)))
    }

    fn text(
        &self,
        name: &str,
        cb: Option<HlTextFn>,
        outbox: &mut Outbox,
        text: &str,
    ) -> CapabilityResult {
        let cb = cb.ok_or(CapabilityError::Unsupported)?;
        let text = c_string(text);
        verdict(name, cb(self.userdata, outbox_handle(outbox), text.as_ptr()))
    }
}

impl Capabilities for ForeignCapabilities {
    fn server_info(&mut self, outbox: &mut Outbox) -> CapabilityResult {
        self.request("server_info", self.callbacks.server_info, outbox)
    }

    fn user_info(&mut self, outbox: &mut Outbox) -> CapabilityResult {
        self.request("user_info", self.callbacks.user_info, outbox)
    }

    fn set_auth(&mut self, outbox: &mut Outbox, auth: &str) -> CapabilityResult {
        self.text("set_auth", self.callbacks.set_auth, outbox, auth)
    }

    fn print(&mut self, outbox: &mut Outbox, message: &str) -> CapabilityResult {
        self.text("print", self.callbacks.print, outbox, message)
    }

    fn center_print(&mut self, outbox: &mut Outbox, message: &str) -> CapabilityResult {
        self.text("center_print", self.callbacks.center_print, outbox, message)
    }

    fn broadcast(&mut self, outbox: &mut Outbox, message: &str) -> CapabilityResult {
        self.text("broadcast", self.callbacks.broadcast, outbox, message)
    }

    fn input(&mut self, outbox: &mut Outbox) -> CapabilityResult {
        self.request("input", self.callbacks.input, outbox)
    }

    fn server_command(&mut self, outbox: &mut Outbox, command: &str) -> CapabilityResult {
        self.text("server_command", self.callbacks.server_command, outbox, command)
    }

    fn client_command(&mut self, outbox: &mut Outbox, command: &str) -> CapabilityResult {
        self.text("client_command", self.callbacks.client_command, outbox, command)
    }

    fn login(&mut self, outbox: &mut Outbox, accepted: bool) -> CapabilityResult {
        let cb = self.callbacks.login.ok_or(CapabilityError::Unsupported)?;
        verdict(
            "login",
            cb(self.userdata, outbox_handle(outbox), i32::from(accepted)),
        )
    }
}
