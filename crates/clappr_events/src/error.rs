//! Error types for the event bus

/// Errors that can occur while handling an event.
///
/// Callbacks return these to report a failure. The bus never propagates them
/// to the code that triggered the event: they are logged and counted in
/// [`EventStats`](crate::EventStats) instead.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Handler execution failed
    #[error("Handler execution failed: {0}")]
    HandlerExecutionFailed(String),

    /// The payload did not carry a field the handler needs
    #[error("Missing payload field: {0}")]
    MissingField(String),

    /// The payload carried a field of the wrong type
    #[error("Invalid payload field {field}: expected {expected}")]
    InvalidField {
        /// Name of the offending field
        field: String,
        /// Human readable description of the expected type
        expected: &'static str,
    },

    /// Handler panicked while running
    #[error("Handler panicked: {0}")]
    Panicked(String),
}
