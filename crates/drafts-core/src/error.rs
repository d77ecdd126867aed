//! Error types for the drafts session store.

use thiserror::Error;

/// A shared error type for every drafts crate.
///
/// Variants map onto the failure classes a caller has to tell apart: a missing
/// session, a failed write, a malformed lineage, and bad input.
#[derive(Error, Debug, Clone)]
pub enum DraftsError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A stored metadata record could not be decoded
    #[error("Corrupt metadata for session '{session}': {message}")]
    MetadataCorrupt { session: String, message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Parent references loop back onto an already visited session
    #[error("Lineage cycle detected: {}", .chain.join(" -> "))]
    LineageCycle { chain: Vec<String> },

    /// A session reference or storage key is malformed
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// A variant write would leave a hole in the index sequence
    #[error("Variant {index} of session '{session}' has no predecessor")]
    VariantGap { session: String, index: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DraftsError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a NotFound error for a session
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::not_found("session", id)
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an InvalidReference error
    pub fn invalid_reference(message: impl Into<String>) -> Self {
        Self::InvalidReference(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if this is a lineage cycle
    pub fn is_lineage_cycle(&self) -> bool {
        matches!(self, Self::LineageCycle { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for DraftsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for DraftsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for DraftsError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// A type alias for `Result<T, DraftsError>`.
pub type Result<T> = std::result::Result<T, DraftsError>;
