//! Error types for the reminder engine.

/// Top-level error type for reminder scheduling.
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    /// Reminder persistence error (read, parse, write).
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Reminder input rejected during validation.
    #[error("invalid reminder: {0}")]
    InvalidReminder(String),

    /// No async runtime available to drive timers.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ReminderError>;
