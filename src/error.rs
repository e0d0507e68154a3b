//! Failure taxonomy shared by parsers, dispatch, pipeline and transport.
use std::fmt;
use std::io;

/// Any failure surfaced by this crate.
///
/// Parse failures carry the grammar category that rejected the input so
/// callers can tell *which* component of a message was malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A parse failed against its grammar.
    MalformedInput {
        category: &'static str,
        input: String,
    },
    /// An operation was refused by a variant that cannot support it.
    UnsupportedOperation(String),
    /// The transport could not read or write bytes.
    Io(String),
    /// The request could not be written to the transport.
    NotSent(String),
    /// The response could not be read from the transport.
    NotReceived(String),
    /// Wire bytes arrived but the status line or headers are not HTTP.
    Malformed(String),
    /// The response head parsed but the body could not be decoded.
    NotParsed(String),
    /// The exchange was cancelled through the engine handle.
    Cancelled,
    /// A pipe gave up waiting for the transport.
    Timeout,
    /// The response parsed but was rejected by a user predicate.
    Unexpected(String),
    /// Invariant violation.
    Internal(String),
}

impl Error {
    pub fn malformed_input(category: &'static str, input: &str) -> Self {
        Error::MalformedInput {
            category,
            input: input.to_string(),
        }
    }

    /// The failure event name published for this error, for the
    /// disconnect sub-kinds that have one.
    pub fn trigger(&self) -> Option<&'static str> {
        match self {
            Error::NotSent(_) => Some("not-sent"),
            Error::NotReceived(_) => Some("not-received"),
            Error::Malformed(_) => Some("malformed"),
            Error::NotParsed(_) => Some("not-parsed"),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedInput { category, input } => {
                write!(f, "malformed {}: {:?}", category, input)
            }
            Error::UnsupportedOperation(s) => write!(f, "unsupported operation: {}", s),
            Error::Io(s) => write!(f, "I/O error: {}", s),
            Error::NotSent(s) => write!(f, "request not sent: {}", s),
            Error::NotReceived(s) => write!(f, "response not received: {}", s),
            Error::Malformed(s) => write!(f, "malformed response: {}", s),
            Error::NotParsed(s) => write!(f, "response not parsed: {}", s),
            Error::Cancelled => write!(f, "cancelled"),
            Error::Timeout => write!(f, "timed out"),
            Error::Unexpected(s) => write!(f, "unexpected response: {}", s),
            Error::Internal(s) => write!(f, "internal error: {}", s),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
