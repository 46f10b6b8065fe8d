//! Helper process launcher and non-blocking pipe transport.
//!
//! A login helper is an external program reached only through two anonymous
//! pipes: the server writes to the helper's stdin and reads from its stdout.
//! This crate starts the helper, switches the server's pipe ends to
//! non-blocking mode, and exposes them through [`HelperStream`].
//!
//! This is the lowest layer of helperlink. Everything else builds on top of
//! the [`HelperStream`] trait provided here.

pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod pipes;

pub use error::{Result, TransportError};
pub use stream::{HelperStream, Readiness};

#[cfg(unix)]
pub use pipes::{launch, HelperPipes};
