//! Error types for strict line parsing

use thiserror::Error;

/// Errors returned by the strict [`FromStr`](std::str::FromStr) entry point
/// of [`DeviceMessage`](crate::DeviceMessage).
///
/// The lenient [`parse_line`](crate::parse_line) never fails; it reports
/// unparsable input as `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line was empty after stripping terminators and whitespace
    #[error("Empty line")]
    Empty,

    /// The line did not contain a single usable `key=value` assignment
    #[error("No key=value assignment in line: {0}")]
    NoAssignment(String),
}

/// Result type alias for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;
