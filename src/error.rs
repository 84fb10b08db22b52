//! Error types for the portal.

use std::fmt;

use thiserror::Error;

/// Failures of the underlying key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure in a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A store lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,

    /// Failure injected by a test double.
    #[error("simulated storage failure")]
    Simulated,
}

/// A single violated form rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Identifier must match the format XXX-00-XXXXX")]
    InvalidId,

    #[error("Enter the staff member's name")]
    EmptyName,

    #[error("Enter the staff member's position")]
    EmptyPosition,

    #[error("Enter the staff member's achievements")]
    EmptyAchievements,

    #[error("Access level must be between 1 and 4")]
    InvalidAccessLevel,

    #[error("Status must be present or absent")]
    InvalidStatus,

    #[error("A staff member with identifier {0} already exists")]
    DuplicateId(String),
}

/// Every rule a draft violated, in the order the rules are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub(crate) Vec<ValidationError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, error: &ValidationError) -> bool {
        self.0.contains(error)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&lines.join("\n"))
    }
}

impl std::error::Error for ValidationErrors {}

/// Portal errors
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The value under `key` could not be (de)serialized.
    #[error("corrupt data under key {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("validation failed:\n{0}")]
    Validation(#[from] ValidationErrors),

    #[error("no staff member with identifier {0}")]
    UnknownStaff(String),

    #[error("invalid login: {0}")]
    InvalidLogin(String),
}

/// Result type for portal operations
pub type Result<T> = std::result::Result<T, PortalError>;
