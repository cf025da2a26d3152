use std::time::Duration;

use instrframe_transport::TransportError;

/// Broad class of a [`FrameError`], used by callers deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The byte stream did not form a frame.
    Framing,
    /// A frame arrived but failed its checksum.
    Integrity,
    /// Nothing arrived before the deadline.
    Timeout,
    /// A payload could not be interpreted as the requested value.
    Value,
    /// The read was abandoned on request.
    Cancelled,
    /// The transport itself failed.
    Transport,
}

/// Errors that can occur during frame encoding, reading and value decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Bytes arrived but none of them was the sync byte before the deadline.
    #[error("no sync byte 0x{sync:02X} before deadline ({discarded} stray bytes discarded)")]
    DesyncTimeout { sync: u8, discarded: usize },

    /// A buffer contained no sync byte at all.
    #[error("no sync byte 0x{sync:02X} in buffer ({discarded} bytes skipped)")]
    NoSync { sync: u8, discarded: usize },

    /// The frame started but did not complete.
    #[error("truncated frame ({received} of {expected} bytes)")]
    TruncatedStream { expected: usize, received: usize },

    /// The payload does not fit the variant's length field.
    #[error("payload too large ({size} bytes, max {max})")]
    LengthOverflow { size: usize, max: usize },

    /// The length field cannot describe a valid frame body.
    #[error("invalid length field 0x{0:02X}")]
    InvalidLength(u8),

    /// The command does not fit the variant's command width.
    #[error("command 0x{command:04X} does not fit in {width} byte(s)")]
    CommandOutOfRange { command: u16, width: usize },

    /// The received checksum does not match the computed one.
    #[error("checksum mismatch (expected {expected:02X?}, got {actual:02X?})")]
    ChecksumMismatch { expected: Vec<u8>, actual: Vec<u8> },

    /// No byte at all arrived before the deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The read was stopped through a [`StopSignal`](crate::StopSignal).
    #[error("read cancelled")]
    Cancelled,

    /// A payload was shorter than the value being decoded.
    #[error("payload truncated (needed {needed} bytes, got {available})")]
    TruncatedPayload { needed: usize, available: usize },

    /// A fixed-width value was followed by bytes that belong to nothing.
    #[error("payload has {extra} unexpected byte(s) after a {width}-byte value")]
    TrailingPayload { width: usize, extra: usize },

    /// A payload or argument could not be converted.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The transport failed underneath the frame layer.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl FrameError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            FrameError::DesyncTimeout { .. }
            | FrameError::NoSync { .. }
            | FrameError::TruncatedStream { .. }
            | FrameError::LengthOverflow { .. }
            | FrameError::InvalidLength(_)
            | FrameError::CommandOutOfRange { .. } => ErrorClass::Framing,
            FrameError::ChecksumMismatch { .. } => ErrorClass::Integrity,
            FrameError::Timeout(_) => ErrorClass::Timeout,
            FrameError::TruncatedPayload { .. }
            | FrameError::TrailingPayload { .. }
            | FrameError::InvalidValue(_) => ErrorClass::Value,
            FrameError::Cancelled => ErrorClass::Cancelled,
            FrameError::Transport(_) => ErrorClass::Transport,
        }
    }

    /// Whether the stream may still hold bytes of an unfinished frame.
    pub fn leaves_stream_dirty(&self) -> bool {
        match self {
            FrameError::LengthOverflow { .. } | FrameError::CommandOutOfRange { .. } => false,
            other => other.class() != ErrorClass::Value,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
