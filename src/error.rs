//! Error types for async-agentx.
//!
//! This module provides:
//!
//! - [`Error`] - The main error type covering transport, codec, protocol and
//!   session failures
//! - [`AgentxStatus`] - AgentX response error codes (RFC 2741 Section 6.2.16)
//! - [`DecodeErrorKind`] - Detail carried by codec failures
//!
//! Errors are boxed for efficiency: `Result<T> = Result<T, Box<Error>>`.
//!
//! ```rust
//! use async_agentx::{Error, Result};
//!
//! fn handle_error(result: Result<()>) {
//!     match result {
//!         Ok(()) => println!("Success"),
//!         Err(e) => match &*e {
//!             Error::Agentx { status } => {
//!                 println!("master rejected the request: {}", status);
//!             }
//!             Error::Timeout { elapsed } => {
//!                 println!("no response after {:?}", elapsed);
//!             }
//!             _ => println!("Error: {}", e),
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

/// Result type alias using the library's boxed Error type.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// The main error type for all async-agentx operations.
///
/// Errors are boxed (via [`Result`]) to keep the size small on the stack.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Connecting to the master agent failed.
    #[error("dial {network} {address}: {source}")]
    Dial {
        network: String,
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// No response arrived within the configured session timeout.
    #[error("timeout after {elapsed:?} waiting for response")]
    Timeout { elapsed: Duration },

    /// The master answered with a nonzero AgentX error code.
    #[error("master returned {status}")]
    Agentx { status: AgentxStatus },

    /// Malformed frame or PDU body.
    #[error("decode error at offset {offset}: {kind}")]
    Decode { offset: usize, kind: DecodeErrorKind },

    /// A value could not be encoded into a PDU.
    #[error("encode error: {0}")]
    Encode(Box<str>),

    /// Invalid OID text.
    #[error("invalid OID {input:?}")]
    InvalidOid { input: Box<str> },

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(Box<str>),

    /// `register` was called on a session that already holds a registration.
    #[error("session is already registered")]
    AlreadyRegistered,

    /// `unregister` was called on a session without a registration.
    #[error("session is not registered")]
    NotRegistered,

    /// The client was closed while the operation was in flight.
    #[error("client is closed")]
    Closed,
}

impl Error {
    /// Box this error (convenience for constructing boxed errors).
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub(crate) fn decode(offset: usize, kind: DecodeErrorKind) -> Box<Self> {
        Error::Decode { offset, kind }.boxed()
    }
}

/// Detail about why decoding a frame or PDU body failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeErrorKind {
    /// Fewer bytes remained than the field required.
    Truncated { needed: usize, remaining: usize },
    /// The varbind type code is not defined by RFC 2741.
    UnknownVariableType(u16),
    /// The header type byte does not name a decodable PDU.
    UnsupportedPduType(u8),
    /// An OID claimed more sub-identifiers than the protocol allows.
    OidTooLong { count: usize, max: usize },
    /// Bytes remained after the body was fully decoded.
    TrailingBytes(usize),
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated { needed, remaining } => {
                write!(f, "truncated field: needed {} bytes, {} remain", needed, remaining)
            }
            Self::UnknownVariableType(code) => write!(f, "unknown variable type {}", code),
            Self::UnsupportedPduType(ty) => write!(f, "unsupported PDU type {}", ty),
            Self::OidTooLong { count, max } => {
                write!(f, "OID with {} sub-identifiers exceeds maximum of {}", count, max)
            }
            Self::TrailingBytes(n) => write!(f, "{} trailing bytes after body", n),
        }
    }
}

/// AgentX response error codes (RFC 2741 Section 6.2.16).
///
/// Returned by the master agent in the `res.error` field of a Response PDU.
/// A nonzero status is surfaced to callers as [`Error::Agentx`].
///
/// # Example
///
/// ```
/// use async_agentx::AgentxStatus;
///
/// let status = AgentxStatus::from_u16(263);
/// assert_eq!(status, AgentxStatus::DuplicateRegistration);
/// assert_eq!(status.as_u16(), 263);
/// println!("Error: {}", status); // prints "duplicateRegistration"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AgentxStatus {
    /// Operation completed successfully (status = 0).
    NoAgentxError,
    /// The master could not open the session (status = 256).
    OpenFailed,
    /// The PDU named a session that is not open (status = 257).
    NotOpen,
    /// Index value has the wrong type (status = 258).
    IndexWrongType,
    /// Index value is already allocated (status = 259).
    IndexAlreadyAllocated,
    /// No index value is available (status = 260).
    IndexNoneAvailable,
    /// Index value was never allocated (status = 261).
    IndexNotAllocated,
    /// The named context is not supported (status = 262).
    UnsupportedContext,
    /// The registration duplicates an existing one (status = 263).
    DuplicateRegistration,
    /// No such registration exists (status = 264).
    UnknownRegistration,
    /// The agent capabilities entry is unknown (status = 265).
    UnknownAgentCaps,
    /// The PDU could not be parsed (status = 266).
    ParseError,
    /// The master declined to process the request (status = 267).
    RequestDenied,
    /// Processing the request failed (status = 268).
    ProcessingError,
    /// Unknown or future status code.
    Unknown(u16),
}

impl Default for AgentxStatus {
    fn default() -> Self {
        AgentxStatus::NoAgentxError
    }
}

impl AgentxStatus {
    /// Create from a raw status code.
    pub fn from_u16(code: u16) -> Self {
        match code {
            0 => Self::NoAgentxError,
            256 => Self::OpenFailed,
            257 => Self::NotOpen,
            258 => Self::IndexWrongType,
            259 => Self::IndexAlreadyAllocated,
            260 => Self::IndexNoneAvailable,
            261 => Self::IndexNotAllocated,
            262 => Self::UnsupportedContext,
            263 => Self::DuplicateRegistration,
            264 => Self::UnknownRegistration,
            265 => Self::UnknownAgentCaps,
            266 => Self::ParseError,
            267 => Self::RequestDenied,
            268 => Self::ProcessingError,
            other => Self::Unknown(other),
        }
    }

    /// Get the raw status code.
    pub fn as_u16(&self) -> u16 {
        match self {
            Self::NoAgentxError => 0,
            Self::OpenFailed => 256,
            Self::NotOpen => 257,
            Self::IndexWrongType => 258,
            Self::IndexAlreadyAllocated => 259,
            Self::IndexNoneAvailable => 260,
            Self::IndexNotAllocated => 261,
            Self::UnsupportedContext => 262,
            Self::DuplicateRegistration => 263,
            Self::UnknownRegistration => 264,
            Self::UnknownAgentCaps => 265,
            Self::ParseError => 266,
            Self::RequestDenied => 267,
            Self::ProcessingError => 268,
            Self::Unknown(code) => *code,
        }
    }

    /// Whether this status reports success.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::NoAgentxError)
    }
}

impl std::fmt::Display for AgentxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NoAgentxError => "noAgentXError",
            Self::OpenFailed => "openFailed",
            Self::NotOpen => "notOpen",
            Self::IndexWrongType => "indexWrongType",
            Self::IndexAlreadyAllocated => "indexAlreadyAllocated",
            Self::IndexNoneAvailable => "indexNoneAvailable",
            Self::IndexNotAllocated => "indexNotAllocated",
            Self::UnsupportedContext => "unsupportedContext",
            Self::DuplicateRegistration => "duplicateRegistration",
            Self::UnknownRegistration => "unknownRegistration",
            Self::UnknownAgentCaps => "unknownAgentCaps",
            Self::ParseError => "parseError",
            Self::RequestDenied => "requestDenied",
            Self::ProcessingError => "processingError",
            Self::Unknown(code) => return write!(f, "unknown({})", code),
        };
        f.write_str(name)
    }
}
