use std::ffi::c_void;
use std::os::raw::c_char;

#[cfg(unix)]
use helperlink_channel::HelperChannel;

#[cfg(unix)]
use crate::callbacks::ForeignCapabilities;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HlStatus {
    Ok = 0,
    Idle = 1,
    Overflow = 2,
    HelperClosed = 3,
    ProtocolError = 4,
    InvalidOpcode = 5,
    InvalidArgument = 6,
    Internal = 99,
}

/// Callback with no argument (`SINFO`, `UINFO`, `INPUT`).
pub type HlRequestFn = extern "C" fn(userdata: *mut c_void, outbox: HlOutboxHandle) -> i32;

/// Callback with a NUL-terminated text argument.
pub type HlTextFn =
    extern "C" fn(userdata: *mut c_void, outbox: HlOutboxHandle, text: *const c_char) -> i32;

/// `LOGIN` callback; `accepted` is 1 or 0.
pub type HlLoginFn =
    extern "C" fn(userdata: *mut c_void, outbox: HlOutboxHandle, accepted: i32) -> i32;

/// The server's capability table. Every entry must be non-null.
///
/// Callbacks return 0 on success; any other value stops the channel with
/// `ProtocolError`. `text` pointers are only valid for the duration of the
/// call. `outbox` may be passed to `hl_outbox_write` during the call only.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct HlCallbacks {
    pub server_info: Option<HlRequestFn>,
    pub user_info: Option<HlRequestFn>,
    pub set_auth: Option<HlTextFn>,
    pub print: Option<HlTextFn>,
    pub center_print: Option<HlTextFn>,
    pub broadcast: Option<HlTextFn>,
    pub input: Option<HlRequestFn>,
    pub server_command: Option<HlTextFn>,
    pub client_command: Option<HlTextFn>,
    pub login: Option<HlLoginFn>,
}

impl HlCallbacks {
    /// Name of the first null entry, if any.
    pub(crate) fn first_missing(&self) -> Option<&'static str> {
        [
            ("server_info", self.server_info.is_none()),
            ("user_info", self.user_info.is_none()),
            ("set_auth", self.set_auth.is_none()),
            ("print", self.print.is_none()),
            ("center_print", self.center_print.is_none()),
            ("broadcast", self.broadcast.is_none()),
            ("input", self.input.is_none()),
            ("server_command", self.server_command.is_none()),
            ("client_command", self.client_command.is_none()),
            ("login", self.login.is_none()),
        ]
        .into_iter()
        .find_map(|(name, missing)| missing.then_some(name))
    }
}

pub type HlChannelHandle = *mut c_void;
pub type HlOutboxHandle = *mut c_void;

#[cfg(unix)]
pub(crate) struct ChannelHandle {
    pub(crate) channel: HelperChannel<ForeignCapabilities>,
}
