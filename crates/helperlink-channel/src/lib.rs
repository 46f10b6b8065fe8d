//! Server side of the login helper protocol.
//!
//! A [`Channel`] owns one helper process's pipes, a receive buffer and an
//! [`Outbox`]. The server's main loop calls [`Channel::check`] once per tick;
//! every complete frame the helper sent becomes one call on the server's
//! [`Capabilities`] implementation.

mod capabilities;
mod channel;
mod config;
mod dispatch;
mod error;
mod outbox;
mod status;
#[cfg(test)]
mod testing;

pub use capabilities::{Capabilities, CapabilityResult};
pub use channel::Channel;
#[cfg(unix)]
pub use channel::HelperChannel;
pub use config::ChannelConfig;
pub use error::{CapabilityError, ChannelError, Result};
pub use outbox::Outbox;
pub use status::{Pump, Status};
