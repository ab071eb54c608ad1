use std::fmt;

/// Failure talking to the device.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("{kind}: {message}")]
    Transport { kind: TransportKind, message: String },
    #[error("firmware package not found: {filename}")]
    PackageNotFound { filename: String },
}

impl DeviceError {
    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PackageNotFound { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge,
    Network,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::InvalidUrl => write!(f, "invalid url"),
            TransportKind::HttpStatus(code) => write!(f, "http status {code}"),
            TransportKind::Timeout => write!(f, "timeout"),
            TransportKind::TooLarge => write!(f, "response too large"),
            TransportKind::Network => write!(f, "network error"),
        }
    }
}

/// Requests rejected by the workflow before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("not a firmware package: {filename} (expected a .bin file)")]
    InvalidFileType { filename: String },
    #[error("cannot {action} while {state}")]
    PreconditionViolation { action: &'static str, state: String },
}
