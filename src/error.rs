//! Error types for the event registrar.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Dialog error: {0}")]
    Dialog(#[from] DialogError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence errors. A failed snapshot write is a hard error and is
/// never swallowed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to write snapshot {path}: {source}")]
    PersistenceFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Dialog-flow errors. None of these mutate state; each translates into a
/// re-prompt or a restart instruction for the user.
#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("No session for user {user_id}; /start required")]
    SessionNotFound { user_id: i64 },

    #[error("Validation failed for user {user_id}: {reason}")]
    ValidationError { user_id: i64, reason: String },

    #[error("Unknown option '{key}' from user {user_id}")]
    UnknownOption { user_id: i64, key: String },
}

/// External ledger errors. The matcher catches these and degrades to an
/// empty ledger snapshot instead of propagating.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger source unavailable: {0}")]
    ExternalSourceUnavailable(String),

    #[error("Ledger authentication failed: {0}")]
    AuthFailed(String),

    #[error("Ledger sheet not found: {0}")]
    NotFound(String),

    #[error("Malformed ledger row: {0}")]
    MalformedRow(String),
}

/// Transport (Telegram Bot API) errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send to chat {chat_id}: {reason}")]
    SendFailed { chat_id: i64, reason: String },

    #[error("Poll request failed: {0}")]
    PollFailed(String),

    #[error("Invalid update payload: {0}")]
    InvalidUpdate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
