use instrframe_frame::{ErrorClass, FrameError};
use instrframe_registry::{ErrorKind, Severity};
use instrframe_transport::TransportError;

/// Errors that can occur during a request/response exchange.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error outside frame reading.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Framing, integrity, timeout or payload decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Building an error table failed.
    #[error("registry error: {0}")]
    Registry(#[from] instrframe_registry::RegistryError),

    /// The device answered with a non-success status code.
    #[error("device rejected request: {kind} (code 0x{code:04X})")]
    Device {
        kind: ErrorKind,
        code: u16,
        severity: Severity,
    },

    /// The reply does not echo the request's command.
    #[error("reply to command 0x{actual:04X} while waiting for 0x{expected:04X}")]
    UnexpectedResponse { expected: u16, actual: u16 },

    /// The reply was not sent by the addressed device to this host.
    #[error(
        "reply from 0x{sender:02X} to 0x{recipient:02X}, expected 0x{device:02X} to 0x{host:02X}"
    )]
    AddressMismatch {
        device: u8,
        host: u8,
        sender: u8,
        recipient: u8,
    },
}

impl ClientError {
    /// Classified device error, if this is one.
    pub fn device_kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Device { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Errors that may clear up if the same request is sent again.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Frame(err) => matches!(
                err.class(),
                ErrorClass::Framing | ErrorClass::Integrity | ErrorClass::Timeout
            ),
            ClientError::Transport(err) => err.is_timeout(),
            _ => false,
        }
    }

    /// Whether unread bytes of a reply may still be in the port.
    pub fn leaves_stream_dirty(&self) -> bool {
        match self {
            ClientError::Frame(err) => err.leaves_stream_dirty(),
            ClientError::Transport(_)
            | ClientError::UnexpectedResponse { .. }
            | ClientError::AddressMismatch { .. } => true,
            ClientError::Registry(_) | ClientError::Device { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
