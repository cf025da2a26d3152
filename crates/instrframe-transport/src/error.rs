use std::time::Duration;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the named port.
    #[error("failed to open {path}: {message}")]
    Open { path: String, message: String },

    /// Not all requested bytes arrived before the deadline.
    #[error("read timed out after {timeout:?} ({received} of {wanted} bytes)")]
    Timeout {
        wanted: usize,
        received: usize,
        timeout: Duration,
    },

    /// An I/O error occurred on the underlying port.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The port reported end-of-stream or has been closed.
    #[error("transport closed")]
    Closed,

    /// A scripted port received bytes it was not told to expect.
    #[error("unexpected write: expected {expected:02X?}, got {actual:02X?}")]
    UnexpectedWrite { expected: Vec<u8>, actual: Vec<u8> },
}

impl TransportError {
    /// Number of bytes delivered before the failure, if known.
    pub fn bytes_received(&self) -> usize {
        match self {
            TransportError::Timeout { received, .. } => *received,
            _ => 0,
        }
    }

    /// Whether this error is a read deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
