use std::io;

/// Which directions of a helper stream can make progress right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// Data (or end-of-stream) is available on the helper's output.
    pub readable: bool,
    /// The helper's input can accept bytes.
    pub writable: bool,
}

impl Readiness {
    /// Nothing ready.
    pub const NONE: Readiness = Readiness {
        readable: false,
        writable: false,
    };

    /// Both directions ready; used by streams that rely on would-block returns.
    pub const ALL: Readiness = Readiness {
        readable: true,
        writable: true,
    };
}

/// The server's view of a helper: a non-blocking duplex byte stream.
///
/// `read` and `write` must never block. When no progress is possible they
/// return [`io::ErrorKind::WouldBlock`]; `read` returns `Ok(0)` once the
/// helper's output reached end-of-stream.
pub trait HelperStream {
    /// Read helper output into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write `buf` to the helper's input, possibly partially.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Zero-timeout readiness query.
    ///
    /// `want_write` is false when there is nothing queued for the helper, so
    /// implementations can skip checking the write side. The default reports
    /// both sides ready and leaves the decision to the non-blocking calls.
    fn poll_ready(&mut self, want_write: bool) -> io::Result<Readiness> {
        Ok(Readiness {
            readable: true,
            writable: want_write,
        })
    }

    /// Process identifier of the helper, when there is one.
    fn pid(&self) -> Option<u32> {
        None
    }
}

impl<S: HelperStream + ?Sized> HelperStream for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn poll_ready(&mut self, want_write: bool) -> io::Result<Readiness> {
        (**self).poll_ready(want_write)
    }

    fn pid(&self) -> Option<u32> {
        (**self).pid()
    }
}
