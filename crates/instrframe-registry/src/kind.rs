use serde::{Deserialize, Serialize};

/// Why a device rejected or flagged a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    OutOfRange,
    InvalidParameter,
    ReadOnly,
    NotRegistered,
    NotAuthorized,
    LocalMode,
    Unsupported,
    /// A code missing from the registry.
    Unknown(u16),
}

impl ErrorKind {
    pub fn is_unknown(self) -> bool {
        matches!(self, ErrorKind::Unknown(_))
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::OutOfRange => f.write_str("value out of range"),
            ErrorKind::InvalidParameter => f.write_str("invalid parameter"),
            ErrorKind::ReadOnly => f.write_str("read-only"),
            ErrorKind::NotRegistered => f.write_str("host not registered"),
            ErrorKind::NotAuthorized => f.write_str("not authorized"),
            ErrorKind::LocalMode => f.write_str("device in local mode"),
            ErrorKind::Unsupported => f.write_str("unsupported"),
            ErrorKind::Unknown(code) => write!(f, "unknown code 0x{code:04X}"),
        }
    }
}

/// Whether a flagged condition aborts the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The request was not carried out.
    Fatal,
    /// The request was carried out; the device reports a condition.
    Warning,
}

/// Outcome of looking a code up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error { kind: ErrorKind, severity: Severity },
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }

    /// True for errors that abort the request, including unknown codes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Status::Error {
                severity: Severity::Fatal,
                ..
            }
        )
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Status::Ok => None,
            Status::Error { kind, .. } => Some(*kind),
        }
    }
}
