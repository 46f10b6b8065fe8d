//! helperlink-ffi: C-ABI exports for login helper channels.
//!
//! A C server creates a channel with `hl_channel_new`, calls
//! `hl_channel_check` once per frame of its main loop and receives helper
//! requests through the `HlCallbacks` table.

mod args;
mod callbacks;
#[cfg(unix)]
mod channel;
mod error;
mod types;

use std::panic::AssertUnwindSafe;

#[cfg(unix)]
pub use channel::{
    hl_channel_check, hl_channel_free, hl_channel_new, hl_channel_pid, hl_channel_write,
    hl_outbox_write,
};
pub use types::{
    HlCallbacks, HlChannelHandle, HlLoginFn, HlOutboxHandle, HlRequestFn, HlStatus, HlTextFn,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Message for the last failed call on this thread; empty when it succeeded.
#[no_mangle]
pub extern "C" fn hl_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}
