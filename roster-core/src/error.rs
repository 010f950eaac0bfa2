//! Error types for roster.
//!
//! A single `thiserror` hierarchy covers storage failures, validation, and
//! configuration. Errors surfaced through the cache are wrapped in
//! [`RosterError::Cache`] so callers can see which cache operation failed,
//! while [`RosterError::root`] and [`RosterError::is_not_found`] still expose
//! the original failure.

use std::fmt;

use thiserror::Error;

/// Result type alias using `RosterError`.
pub type Result<T> = std::result::Result<T, RosterError>;

/// Cache operation that surfaced a backing-store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOp {
    /// `create`
    Create,
    /// `read`
    Read,
    /// `update`
    Update,
    /// `delete`
    Delete,
}

impl CacheOp {
    /// Lowercase operation name, used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOp::Create => "create",
            CacheOp::Read => "read",
            CacheOp::Update => "update",
            CacheOp::Delete => "delete",
        }
    }
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for all roster operations.
#[derive(Debug, Error)]
pub enum RosterError {
    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// No record exists for the key.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A record already exists for the key.
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    /// Backing store failed for a reason other than a missing record.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A backing-store failure observed through the cache.
    #[error("Cache {op} failed: {source}")]
    Cache {
        /// Operation that was in flight.
        op: CacheOp,
        /// Failure returned by the backing store.
        #[source]
        source: Box<RosterError>,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION & I/O ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data uses a format version this build cannot read.
    #[error("Format version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Version this build writes and reads.
        expected: u8,
        /// Version found in the stored data.
        actual: u8,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input validation failed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RosterError {
    /// Wraps a backing-store error with the cache operation that observed it.
    pub fn cache(op: CacheOp, source: RosterError) -> Self {
        RosterError::Cache {
            op,
            source: Box::new(source),
        }
    }

    /// Returns the innermost error, looking through any cache wrappers.
    pub fn root(&self) -> &RosterError {
        let mut err = self;
        while let RosterError::Cache { source, .. } = err {
            err = source;
        }
        err
    }

    /// Returns the cache operation that observed this error, if any.
    pub fn cache_op(&self) -> Option<CacheOp> {
        match self {
            RosterError::Cache { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// Returns true if the root cause is a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), RosterError::NotFound(_))
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(self.root(), RosterError::Validation(_))
    }

    /// Returns true if this error is a conflict on an existing key.
    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), RosterError::AlreadyExists(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_error_display() {
        let err = RosterError::cache(CacheOp::Read, RosterError::NotFound("42".into()));
        let msg = err.to_string();
        assert!(msg.contains("read"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_not_found_survives_wrapping() {
        let err = RosterError::cache(CacheOp::Delete, RosterError::NotFound("k".into()));
        assert!(err.is_not_found());
        assert_eq!(err.cache_op(), Some(CacheOp::Delete));
        assert!(matches!(err.root(), RosterError::NotFound(k) if k == "k"));
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;

        let err = RosterError::cache(CacheOp::Update, RosterError::Storage("disk".into()));
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Storage error: disk");
    }

    #[test_case(RosterError::NotFound("x".into()), true, false ; "not found")]
    #[test_case(RosterError::Validation("x".into()), false, true ; "validation")]
    #[test_case(RosterError::Storage("x".into()), false, false ; "storage")]
    fn test_error_classification(err: RosterError, not_found: bool, validation: bool) {
        assert_eq!(err.is_not_found(), not_found);
        assert_eq!(err.is_validation_error(), validation);
        assert!(err.cache_op().is_none());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let roster_result: Result<serde_json::Value> = json_result.map_err(RosterError::from);
        assert!(matches!(roster_result, Err(RosterError::Json(_))));
    }
}
