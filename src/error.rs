use std::fmt::{self, Display};

/// Crate-wide error taxonomy.
///
/// Translation-internal fallbacks are never surfaced through this type; a
/// predicate or operator that cannot be lowered natively silently degrades to
/// in-memory evaluation. Only structurally invalid queries and platform-level
/// conditions reach the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Null/empty/malformed input to a public entry point.
    InvalidArgument(String),
    /// An expression shape the translator structurally cannot represent even
    /// partially (multi-column comparison, multi-member flattening). Indicates
    /// a query-construction bug, not a recoverable condition.
    NotSupported(String),
    /// Permission denied by the platform.
    Unauthorized,
    /// No data source available (e.g. no enabled location providers).
    Unavailable,
    /// A requested resource does not exist. Lookups return `Ok(None)` instead;
    /// this variant is reserved for terminal operators that demand a row.
    NotFound,
    /// A single-result operator matched more than one row.
    Ambiguous,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(what) => write!(f, "invalid argument: {}", what),
            Error::NotSupported(what) => write!(f, "not supported: {}", what),
            Error::Unauthorized => write!(f, "permission denied by the platform"),
            Error::Unavailable => write!(f, "no data source available"),
            Error::NotFound => write!(f, "no matching element"),
            Error::Ambiguous => write!(f, "more than one matching element"),
        }
    }
}

impl std::error::Error for Error {}
