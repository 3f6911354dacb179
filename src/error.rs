//! Error types for `todoika`.
//!
//! Every fallible operation in the library returns [`Result`]. Storage
//! adapters classify driver errors at their boundary so that callers only
//! ever match on the domain variants below.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TodoError>;

/// All errors produced by `todoika`.
#[derive(Debug, Error)]
pub enum TodoError {
    /// A referenced row does not exist (or is not owned by the caller).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A user with this name already exists.
    #[error("user name already taken: {name}")]
    DuplicateName { name: String },

    /// The user already owns a list with this description.
    #[error("list '{description}' already exists for user {user_id}")]
    DuplicateList { user_id: i64, description: String },

    /// Input rejected before touching storage.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The backend could not be reached or the connection failed mid-call.
    #[error("{backend} storage unavailable: {reason}")]
    StorageUnavailable {
        backend: &'static str,
        reason: String,
    },

    /// Wrong user name or password. The two cases are deliberately
    /// indistinguishable.
    #[error("wrong username or password")]
    Authentication,

    /// Fatal configuration problem detected at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Credential hashing failed.
    #[error("credential error: {0}")]
    Credential(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("sqlite error: {0}")]
    Database(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),
}

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    DuplicateName,
    DuplicateList,
    Validation,
    StorageUnavailable,
    Authentication,
    Config,
    Internal,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::DuplicateName => "duplicate_name",
            Self::DuplicateList => "duplicate_list",
            Self::Validation => "validation",
            Self::StorageUnavailable => "storage_unavailable",
            Self::Authentication => "authentication",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }

    /// Process exit code used by the binary when this error is fatal.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Config => 2,
            Self::StorageUnavailable => 3,
            Self::Authentication => 4,
            Self::NotFound
            | Self::DuplicateName
            | Self::DuplicateList
            | Self::Validation
            | Self::Internal => 1,
        }
    }
}

impl TodoError {
    /// Shorthand for [`TodoError::Validation`].
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`TodoError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::DuplicateName { .. } => ErrorCode::DuplicateName,
            Self::DuplicateList { .. } => ErrorCode::DuplicateList,
            Self::Validation { .. } => ErrorCode::Validation,
            Self::StorageUnavailable { .. } => ErrorCode::StorageUnavailable,
            Self::Authentication => ErrorCode::Authentication,
            Self::Config(_) | Self::Toml(_) => ErrorCode::Config,
            Self::Credential(_) | Self::Io(_) | Self::Database(_) => ErrorCode::Internal,
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => ErrorCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_message_is_generic() {
        assert_eq!(
            TodoError::Authentication.to_string(),
            "wrong username or password"
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            TodoError::not_found("task", 7).code().as_str(),
            "not_found"
        );
        assert_eq!(
            TodoError::validation("description", "empty").code(),
            ErrorCode::Validation
        );
        assert_eq!(TodoError::Config("x".into()).code().exit_code(), 2);
    }

    #[test]
    fn not_found_renders_entity_and_id() {
        let err = TodoError::not_found("list", 42);
        assert_eq!(err.to_string(), "list not found: 42");
    }
}
