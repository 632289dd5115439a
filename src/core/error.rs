use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed composite bytes, bad hex, truncated segment or WAL data.
    Decode,
    /// A value type with no index encoding (decimal, raw bytes).
    UnsupportedType,
    /// I/O against the index directory failed, or the directory is held by
    /// another index instance.
    IndexUnavailable,
    /// Lifecycle violation: work submitted to an index that is not open.
    InvalidState,
    Parse,
    InvalidArgument,
    NotFound,
    Timeout,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error { kind, context: context.into() }
    }

    pub fn decode(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Decode, context)
    }

    pub fn unsupported(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::UnsupportedType, context)
    }

    pub fn invalid_state(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidState, context)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::IndexUnavailable,
            context: err.to_string(),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error {
            kind: ErrorKind::Decode,
            context: err.to_string(),
        }
    }
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Error {
            kind: ErrorKind::Decode,
            context: format!("invalid hex: {}", err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: format!("config: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
