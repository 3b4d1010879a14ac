//! Error types for cf-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for cf-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Cloud Files operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration: bad region code, empty credentials, unreadable config file
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// The identity service rejected the credentials
    #[error("Authentication failed ({status}): {body}")]
    Auth { status: u16, body: String },

    /// A response did not have the shape the protocol requires
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Container or object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unexpected status from the storage or identity service
    #[error("Remote service error ({status}): {body}")]
    Remote { status: u16, body: String },

    /// Connection-level failure from the HTTP transport
    #[error("Network error: {0}")]
    Network(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) => 2,                          // UsageError
            Error::Config(_) => 2,                               // UsageError
            Error::Network(_) => 3,                              // NetworkError
            Error::Auth { .. } => 4,                             // AuthError
            Error::NotFound(_) | Error::ProfileNotFound(_) => 5, // NotFound
            _ => 1,                                              // GeneralError
        }
    }

    /// Whether this error means the addressed resource is absent
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::InvalidPath("test".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::Network("test".into()).exit_code(), 3);
        let auth = Error::Auth {
            status: 401,
            body: "unauthorized".into(),
        };
        assert_eq!(auth.exit_code(), 4);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::ProfileNotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::Protocol("test".into()).exit_code(), 1);
        let remote = Error::Remote {
            status: 500,
            body: String::new(),
        };
        assert_eq!(remote.exit_code(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = Error::ProfileNotFound("prod".into());
        assert_eq!(err.to_string(), "Profile not found: prod");

        let err = Error::Remote {
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(err.to_string(), "Remote service error (503): busy");
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::NotFound("photos".into()).is_not_found());
        assert!(!Error::ProfileNotFound("prod".into()).is_not_found());
        assert!(!Error::Network("reset".into()).is_not_found());
    }
}
