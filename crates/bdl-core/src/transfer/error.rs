//! Per-object transfer error.

use std::fmt;

/// Why a single object transfer failed. Never aborts sibling transfers.
#[derive(Debug)]
pub enum TransferError {
    /// Directory creation, temp file open, or write failed.
    Io(std::io::Error),
    /// Curl reported an error (timeout, connection, partial body, etc.).
    Curl(curl::Error),
    /// Server answered with a non-2xx status.
    Http(u32),
    /// Proxy address could not be parsed.
    Proxy(String),
    /// Body was complete but the temp file could not be moved into place.
    Rename(std::io::Error),
}

impl TransferError {
    /// True when the request hit the configured deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransferError::Curl(e) if e.is_operation_timedout())
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Io(e) => write!(f, "local I/O: {}", e),
            TransferError::Curl(e) => write!(f, "{}", e),
            TransferError::Http(code) => write!(f, "HTTP {}", code),
            TransferError::Proxy(p) => write!(f, "invalid proxy `{}`", p),
            TransferError::Rename(e) => write!(f, "rename temp file: {}", e),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransferError::Io(e) | TransferError::Rename(e) => Some(e),
            TransferError::Curl(e) => Some(e),
            TransferError::Http(_) | TransferError::Proxy(_) => None,
        }
    }
}

impl From<curl::Error> for TransferError {
    fn from(e: curl::Error) -> Self {
        TransferError::Curl(e)
    }
}
