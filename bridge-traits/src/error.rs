use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Error reported by a playback engine. Code and message are passed to the
    /// host untouched.
    #[error("{message}")]
    Engine { code: String, message: String },
}

impl BridgeError {
    /// Shorthand for an engine-originated error.
    pub fn engine(code: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Engine {
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
