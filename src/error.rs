//! Error types for database open, lookup, and record decoding.
//!
//! Every failure is surfaced to the caller as a typed value; nothing is
//! logged or retried inside the library. Engine-reported failures carry the
//! native status code together with the engine's own description of it.

use std::fmt;

/// The engine failed to open or parse a database file.
///
/// Fatal to the attempt to construct a handle; no handle exists afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenError {
    /// Native engine status code.
    pub code: i32,
    /// Engine-provided description of the failure.
    pub message: String,
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot open database: {} (status {})", self.message, self.code)
    }
}

impl std::error::Error for OpenError {}

/// A lookup failed before any record could be matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The supplied address text could not be resolved to an IP address.
    AddressResolution {
        /// Native resolver status code.
        code: i32,
        /// Resolver-provided description.
        message: String,
    },
    /// The engine's search itself failed.
    Engine {
        /// Native engine status code.
        code: i32,
        /// Engine-provided description.
        message: String,
    },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::AddressResolution { code, message } => {
                write!(f, "address resolution failed: {} (status {})", message, code)
            }
            LookupError::Engine { code, message } => {
                write!(f, "lookup failed: {} (status {})", message, code)
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// A matched record could not be decoded into a [`DataValue`].
///
/// [`DataValue`]: crate::DataValue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A node's type tag is not one of the recognized kinds.
    ///
    /// Carries the native tag value. Reserved and future tags land here
    /// rather than being skipped.
    UnsupportedType(u32),
    /// A map's key node is not UTF-8 text.
    InvalidKey,
    /// String bytes are not valid UTF-8, or the byte buffer is shorter than
    /// the declared length.
    InvalidEncoding,
    /// The node list ended while a container still expected entries.
    UnexpectedEnd,
    /// Nesting exceeded the decoder's depth bound.
    TooDeep(usize),
    /// The engine failed to materialize the entry after a successful lookup.
    Engine {
        /// Native engine status code.
        code: i32,
        /// Engine-provided description.
        message: String,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnsupportedType(tag) => write!(f, "unsupported data type tag {}", tag),
            DecodeError::InvalidKey => write!(f, "map key is not UTF-8 text"),
            DecodeError::InvalidEncoding => write!(f, "string data is not valid UTF-8"),
            DecodeError::UnexpectedEnd => write!(f, "node list ended inside a container"),
            DecodeError::TooDeep(limit) => {
                write!(f, "record nesting exceeds depth limit {}", limit)
            }
            DecodeError::Engine { code, message } => {
                write!(f, "entry materialization failed: {} (status {})", message, code)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Any failure a full lookup-and-decode pipeline can surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The lookup step failed.
    Lookup(LookupError),
    /// The decode step failed.
    Decode(DecodeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lookup(err) => write!(f, "{}", err),
            Error::Decode(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Lookup(err) => Some(err),
            Error::Decode(err) => Some(err),
        }
    }
}

impl From<LookupError> for Error {
    fn from(err: LookupError) -> Self {
        Error::Lookup(err)
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Error::Decode(err)
    }
}
