use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong with the configuration.
        message: String,
    },

    /// Local key-value storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The hosted backend failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Admin sign-in failed.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The dashboard could not be loaded.
    #[error("Dashboard error: {0}")]
    Dashboard(#[from] DashboardError),

    /// Anything else.
    #[error("Internal error: {message}")]
    Internal {
        /// Error detail.
        message: String,
    },
}

/// Durable key-value storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database could not be opened.
    #[error("Storage connection failed: {message}")]
    Connection {
        /// Driver message.
        message: String,
    },

    /// A statement failed.
    #[error("Query failed: {message}")]
    Query {
        /// Driver message.
        message: String,
    },

    /// Embedded migrations could not be applied.
    #[error("Migration failed: {message}")]
    Migration {
        /// Migrator message.
        message: String,
    },

    /// Raw sqlx error.
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Hosted analytics backend errors
#[derive(Debug, Error)]
pub enum BackendError {
    /// Non-success HTTP status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// Body could not be decoded.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Decoder message.
        message: String,
    },

    /// No answer within the request timeout.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure to deliver a visit event. Always recovered by the reporter.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// The backend rejected or failed the insert.
    #[error("Visit insert failed: {0}")]
    Backend(#[from] BackendError),

    /// The insert did not finish in time.
    #[error("Visit insert timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The event could not be encoded.
    #[error("Visit event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Admin authentication errors. The message is shown to the user as-is.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A credential field was left blank.
    #[error("{field} is required")]
    MissingField {
        /// Name of the blank field.
        field: String,
    },

    /// The backend refused the credentials.
    #[error("{message}")]
    Rejected {
        /// Backend message, unmodified.
        message: String,
    },

    /// The backend could not be reached.
    #[error("{0}")]
    Backend(#[from] BackendError),
}

/// Dashboard errors surfaced to the caller
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The admin gate is not in the authenticated state.
    #[error("Dashboard requires an authenticated admin session")]
    NotAuthenticated,
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
