use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    // connection setup
    BindFailed,
    ConnectFailed,
    AcceptFailed,
    SpawnFailed,
    SshConnectFailed,
    SshAuthFailed,
    NoRoute,
    InvalidArgument,
    // transport
    SendFailed,
    RecvFailed,
    ConnectionBroken,
    // framing and codec
    EncodeFailed,
    DecodeFailed,
    // schema and application
    UnknownMethod,
    UnknownEvent,
    Timeout,
    /// Handler-side failure carried back over the error response frame.
    #[serde(untagged)]
    Remote(String),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub msg: String,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, msg: String) -> Self {
        Self { kind, msg }
    }

    #[must_use]
    pub fn kind(kind: ErrorKind) -> Self {
        Self {
            kind,
            msg: String::default(),
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::kind(kind)
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(value: std::num::TryFromIntError) -> Self {
        Self {
            kind: ErrorKind::InvalidArgument,
            msg: value.to_string(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.msg.is_empty() {
            write!(f, "{:?}", self.kind)
        } else {
            write!(f, "{:?}: {}", self.kind, self.msg)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        let kind = ErrorKind::Timeout;
        let error: Error = kind.into();
        assert_eq!(error.to_string(), "Timeout");

        let error = Error::new(ErrorKind::ConnectFailed, "connection refused".into());
        assert_eq!(error.to_string(), "ConnectFailed: connection refused");

        let error = Error::kind(ErrorKind::Remote("handler exploded".into()));
        assert_eq!(error.kind, ErrorKind::Remote("handler exploded".into()));
    }
}
