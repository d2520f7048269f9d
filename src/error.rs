//! Error taxonomy for the `cdb` core.
//!
//! Mirrors the error kinds named by the format's propagation policy: every
//! fallible operation checks the handle's latch first and, on internal
//! failure, sets it once (idempotent) before returning. `NotFound` is not a
//! member of this enum — it is a normal `Ok(None)` result from `lookup`/
//! `get`/`count`, never a latching error.

use std::fmt;

/// Closed set of failure kinds a [`crate::Cdb`] handle can latch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Catch-all for conditions not covered by a more specific kind.
    Generic,
    /// A secondary-table slot's stored hash does not agree with the bucket
    /// index it was read from.
    HashInvariant,
    /// A seek, read, or record offset fell outside the region it is
    /// required to lie within.
    BoundsViolation,
    /// An offset or length computation would have wrapped.
    ArithmeticOverflow,
    /// The storage adapter failed to open the underlying resource.
    OpenFailed,
    /// The storage adapter failed to seek.
    SeekFailed,
    /// A write delivered fewer bytes than requested.
    WriteShort,
    /// A read delivered fewer bytes than requested.
    ReadShort,
    /// A heap allocation failed.
    AllocationFailed,
    /// An operation was attempted against a handle in the wrong mode
    /// (e.g. `add` on a read-only handle).
    ModeMismatch,
    /// A requested feature (e.g. a flush hook) is not available.
    FeatureDisabled,
    /// The configured word size is not one of 2, 4, or 8 bytes.
    InvalidSize,
}

impl ErrorKind {
    fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Generic => "generic error",
            ErrorKind::HashInvariant => "secondary slot hash does not match its bucket",
            ErrorKind::BoundsViolation => "offset outside the permitted region",
            ErrorKind::ArithmeticOverflow => "offset or length arithmetic overflowed",
            ErrorKind::OpenFailed => "storage adapter failed to open",
            ErrorKind::SeekFailed => "storage adapter failed to seek",
            ErrorKind::WriteShort => "short write",
            ErrorKind::ReadShort => "short read",
            ErrorKind::AllocationFailed => "allocation failed",
            ErrorKind::ModeMismatch => "operation not valid in the handle's current mode",
            ErrorKind::FeatureDisabled => "feature not available on this adapter",
            ErrorKind::InvalidSize => "word size must be 2, 4, or 8 bytes",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned by a `cdb` core operation.
///
/// Carries the [`ErrorKind`] plus, when the failure originated in the
/// injected [`crate::Storage`] adapter, the adapter's own error for a useful
/// source chain.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Error { kind, source: None }
    }

    pub fn from_storage(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// The latched kind this error carries.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.kind, source),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_source() {
        let e = Error::new(ErrorKind::ModeMismatch);
        assert_eq!(e.to_string(), "operation not valid in the handle's current mode");
    }

    #[test]
    fn kind_roundtrips() {
        let e: Error = ErrorKind::BoundsViolation.into();
        assert_eq!(e.kind(), ErrorKind::BoundsViolation);
    }
}
