/// Errors that can occur while launching a helper or driving its pipes.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The helper process could not be started.
    #[error("failed to launch helper {command:?}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// The spawned process did not expose one of its standard pipes.
    #[error("helper {0} pipe unavailable")]
    MissingPipe(&'static str),

    /// A pipe end could not be switched to non-blocking mode.
    #[error("failed to make helper {pipe} non-blocking: {source}")]
    NonBlocking {
        pipe: &'static str,
        source: std::io::Error,
    },

    /// Readiness polling failed.
    #[error("poll failed: {0}")]
    Poll(#[source] std::io::Error),

    /// An I/O error occurred on a helper pipe.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
