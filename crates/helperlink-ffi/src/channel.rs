use std::ffi::c_void;
use std::os::raw::c_char;

use helperlink_channel::{HelperChannel, Outbox};

use crate::args;
use crate::callbacks::ForeignCapabilities;
use crate::error;
use crate::types::{ChannelHandle, HlCallbacks, HlChannelHandle, HlOutboxHandle, HlStatus};

fn with_channel_mut<T>(
    handle: HlChannelHandle,
    on_error: T,
    f: impl FnOnce(&mut ChannelHandle) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("channel handle cannot be null");
        return on_error;
    }

    let channel_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *(handle as *mut ChannelHandle) }
    };

    f(channel_handle)
}

/// Launch `command` through `/bin/sh -c` and open a channel to it.
///
/// Returns null on failure; `hl_last_error` describes why.
///
/// # Safety
/// `command` must be a non-null pointer to a valid UTF-8, NUL-terminated C string.
/// `callbacks` must be non-null and point to a fully populated table. `userdata` is
/// passed back to every callback untouched and must outlive the channel.
#[no_mangle]
pub unsafe extern "C" fn hl_channel_new(
    command: *const c_char,
    callbacks: *const HlCallbacks,
    userdata: *mut c_void,
) -> HlChannelHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        let command = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::required_str_arg(command, "command") } {
                Some(v) => v,
                None => return std::ptr::null_mut(),
            }
        };

        if callbacks.is_null() {
            let _ = error::set_invalid_argument("callbacks cannot be null");
            return std::ptr::null_mut();
        }
        let callbacks = {
            // SAFETY: Checked for null above; the caller guarantees it points to a table.
            unsafe { *callbacks }
        };
        if let Some(name) = callbacks.first_missing() {
            let _ = error::set_invalid_argument(format!("callback {name} cannot be null"));
            return std::ptr::null_mut();
        }

        let handler = ForeignCapabilities::new(callbacks, userdata);
        match HelperChannel::spawn(command, handler) {
            Ok(channel) => Box::into_raw(Box::new(ChannelHandle { channel })) as HlChannelHandle,
            Err(err) => {
                let _ = error::map_channel_error(&err);
                std::ptr::null_mut()
            }
        }
    })
}

/// Pump the channel once without blocking.
///
/// `Ok` means bytes moved, `Idle` that nothing was ready. Any other status
/// is fatal; free the channel.
///
/// # Safety
/// `channel` must be a valid handle from `hl_channel_new`, and must not be
/// used from inside its own callbacks.
#[no_mangle]
pub unsafe extern "C" fn hl_channel_check(channel: HlChannelHandle) -> HlStatus {
    crate::ffi_boundary(HlStatus::Internal, || {
        error::clear_error_state();

        with_channel_mut(channel, HlStatus::InvalidArgument, |handle| {
            match handle.channel.check() {
                Ok(pump) => error::map_status(pump.status()),
                Err(err) => error::map_channel_error(&err),
            }
        })
    })
}

/// Queue a message for the helper and try to write it immediately.
///
/// `opcode` must be exactly five bytes. A null `text` sends an empty payload.
///
/// # Safety
/// `channel` must be a valid handle from `hl_channel_new`, not used from inside
/// its own callbacks. `opcode` and `text` must be null or valid C strings.
#[no_mangle]
pub unsafe extern "C" fn hl_channel_write(
    channel: HlChannelHandle,
    opcode: *const c_char,
    text: *const c_char,
) -> HlStatus {
    crate::ffi_boundary(HlStatus::Internal, || {
        error::clear_error_state();

        let (opcode, text) = {
            // SAFETY: We validate null and UTF-8 in helpers.
            match unsafe {
                (
                    args::required_str_arg(opcode, "opcode"),
                    args::text_arg(text, "text"),
                )
            } {
                (Some(opcode), Some(text)) => (opcode, text),
                _ => return HlStatus::InvalidArgument,
            }
        };

        with_channel_mut(channel, HlStatus::InvalidArgument, |handle| {
            match handle.channel.enqueue(opcode, text) {
                Ok(()) => HlStatus::Ok,
                Err(err) => error::map_channel_error(&err),
            }
        })
    })
}

/// Queue a reply from inside a callback. It is written by a later pump.
///
/// # Safety
/// `outbox` must be the handle passed to the currently running callback.
/// `opcode` and `text` must be null or valid C strings.
#[no_mangle]
pub unsafe extern "C" fn hl_outbox_write(
    outbox: HlOutboxHandle,
    opcode: *const c_char,
    text: *const c_char,
) -> HlStatus {
    crate::ffi_boundary(HlStatus::Internal, || {
        error::clear_error_state();

        if outbox.is_null() {
            return error::set_invalid_argument("outbox cannot be null");
        }

        let (opcode, text) = {
            // SAFETY: We validate null and UTF-8 in helpers.
            match unsafe {
                (
                    args::required_str_arg(opcode, "opcode"),
                    args::text_arg(text, "text"),
                )
            } {
                (Some(opcode), Some(text)) => (opcode, text),
                _ => return HlStatus::InvalidArgument,
            }
        };

        let outbox = {
            // SAFETY: Checked for null above; callbacks receive a pointer to a live `Outbox`.
            unsafe { &mut *(outbox as *mut Outbox) }
        };

        match outbox.enqueue(opcode, text) {
            Ok(_) => HlStatus::Ok,
            Err(err) => error::map_frame_error(&err),
        }
    })
}

/// Process id of the helper, or -1.
///
/// # Safety
/// `channel` must be null or a valid handle from `hl_channel_new`.
#[no_mangle]
pub unsafe extern "C" fn hl_channel_pid(channel: HlChannelHandle) -> i32 {
    crate::ffi_boundary(-1, || {
        with_channel_mut(channel, -1, |handle| {
            handle
                .channel
                .pid()
                .and_then(|pid| i32::try_from(pid).ok())
                .unwrap_or(-1)
        })
    })
}

/// Close both pipes and free the channel.
///
/// # Safety
/// `channel` must be null or a handle returned by `hl_channel_new`, freed at most once.
#[no_mangle]
pub unsafe extern "C" fn hl_channel_free(channel: HlChannelHandle) {
    crate::ffi_boundary((), || {
        if channel.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by hl_channel_new.
        unsafe {
            drop(Box::from_raw(channel as *mut ChannelHandle));
        }
    });
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::callbacks::tests::{table, Log};

    fn last_error() -> String {
        // SAFETY: hl_last_error returns a pointer to a thread-local CString.
        unsafe { CStr::from_ptr(crate::hl_last_error()) }
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn rejects_missing_callback() {
        let callbacks = HlCallbacks {
            login: None,
            ..table()
        };
        // SAFETY: Arguments are valid literals and a local table.
        let handle = unsafe { hl_channel_new(c"cat".as_ptr(), &callbacks, std::ptr::null_mut()) };
        assert!(handle.is_null());
        assert_eq!(last_error(), "callback login cannot be null");
    }

    #[test]
    fn rejects_null_arguments() {
        let callbacks = table();
        // SAFETY: Null pointers are the case under test.
        unsafe {
            assert!(hl_channel_new(std::ptr::null(), &callbacks, std::ptr::null_mut()).is_null());
            assert!(
                hl_channel_new(c"cat".as_ptr(), std::ptr::null(), std::ptr::null_mut()).is_null()
            );
            assert_eq!(hl_channel_check(std::ptr::null_mut()), HlStatus::InvalidArgument);
            assert_eq!(hl_channel_pid(std::ptr::null_mut()), -1);
            hl_channel_free(std::ptr::null_mut());
        }
    }

    #[test]
    fn outbox_write_validates_opcode() {
        let mut outbox = Outbox::with_capacity(64);
        let handle = &mut outbox as *mut Outbox as HlOutboxHandle;

        // SAFETY: `handle` points to a live outbox; strings are literals.
        unsafe {
            assert_eq!(
                hl_outbox_write(handle, c"PRIN".as_ptr(), c"x".as_ptr()),
                HlStatus::InvalidOpcode
            );
            assert_eq!(hl_outbox_write(handle, c"PRINT".as_ptr(), std::ptr::null()), HlStatus::Ok);
        }
        assert_eq!(outbox.pending(), 9);
    }

    #[test]
    fn echo_helper_round_trip() {
        let mut log = Log::default();
        let userdata = &mut log as *mut Log;
        let callbacks = table();
        // SAFETY: Valid command, table and userdata that outlives the channel.
        let handle = unsafe { hl_channel_new(c"cat".as_ptr(), &callbacks, userdata.cast()) };
        assert!(!handle.is_null());

        // SAFETY: `handle` is live until freed below.
        unsafe {
            assert!(hl_channel_pid(handle) > 0);
            assert_eq!(
                hl_channel_write(handle, c"PRINT".as_ptr(), c"hello\n".as_ptr()),
                HlStatus::Ok
            );
            assert_eq!(
                hl_channel_write(handle, c"LOGIN".as_ptr(), c"success".as_ptr()),
                HlStatus::Ok
            );
            assert_eq!(
                hl_channel_write(handle, c"TOOLONG".as_ptr(), c"".as_ptr()),
                HlStatus::InvalidOpcode
            );

            let deadline = Instant::now() + Duration::from_secs(5);
            let mut dispatched = 0;
            while dispatched < 2 {
                assert!(Instant::now() < deadline, "timed out waiting for helper");
                match hl_channel_check(handle) {
                    HlStatus::Ok | HlStatus::Idle => {}
                    other => panic!("unexpected status {other:?}: {}", last_error()),
                }
                dispatched = (*userdata).lines.len();
                std::thread::sleep(Duration::from_millis(5));
            }
            hl_channel_free(handle);
        }

        assert_eq!(log.lines, vec!["text:hello", "login:1"]);
    }

    #[test]
    fn exited_helper_reports_closed() {
        let callbacks = table();
        // SAFETY: Valid command and table; callbacks never fire for this helper.
        let handle = unsafe { hl_channel_new(c"true".as_ptr(), &callbacks, std::ptr::null_mut()) };
        assert!(!handle.is_null());

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            // SAFETY: `handle` is live until freed below.
            let status = unsafe { hl_channel_check(handle) };
            if status == HlStatus::HelperClosed {
                break;
            }
            assert!(Instant::now() < deadline, "timed out waiting for helper");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!last_error().is_empty());

        // SAFETY: Freed exactly once.
        unsafe { hl_channel_free(handle) };
    }
}
