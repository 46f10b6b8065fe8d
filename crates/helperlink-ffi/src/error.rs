use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use helperlink_channel::{ChannelError, Status};
use helperlink_frame::FrameError;

use crate::types::HlStatus;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

/// Convert to a C string, replacing interior NULs.
pub(crate) fn c_string(text: &str) -> CString {
    CString::new(text.replace('\0', "?")).unwrap_or_default()
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let message = message.into();
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = c_string(&message);
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> HlStatus {
    set_error_message(message);
    HlStatus::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_status(status: Status) -> HlStatus {
    match status {
        Status::Ok => HlStatus::Ok,
        Status::Idle => HlStatus::Idle,
        Status::Overflow => HlStatus::Overflow,
        Status::HelperClosed => HlStatus::HelperClosed,
        Status::ProtocolError => HlStatus::ProtocolError,
        Status::InvalidOpcode => HlStatus::InvalidOpcode,
    }
}

pub(crate) fn map_channel_error(err: &ChannelError) -> HlStatus {
    set_error_message(err.to_string());
    map_status(err.status())
}

/// Errors from queueing a reply inside a callback.
pub(crate) fn map_frame_error(err: &FrameError) -> HlStatus {
    set_error_message(err.to_string());
    match err {
        FrameError::InvalidOpcode(_) => HlStatus::InvalidOpcode,
        FrameError::BufferFull { .. } | FrameError::PayloadTooLarge { .. } => HlStatus::Overflow,
        _ => HlStatus::Internal,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}
