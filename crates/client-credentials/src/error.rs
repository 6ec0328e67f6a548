//! Error types for token acquisition

/// Errors from building a manager or acquiring a token.
///
/// None of these are retried internally. A failed `acquire()` leaves the
/// previously stored token in place.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed endpoint, pattern, or credentials.
    #[error("configuration error: {0}")]
    Config(String),

    /// The provider could not be reached or timed out.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-2xx status.
    #[error("transport error: token endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response body is not the expected JSON document.
    #[error("invalid token response ({source}), response body: {body}")]
    Decode {
        source: serde_json::Error,
        body: String,
    },

    /// The response decoded but the access token is empty or malformed.
    #[error("invalid token received ({reason}), response body: {body}")]
    Validation { reason: String, body: String },
}

impl Error {
    /// Short classification used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Transport(_) | Error::Status { .. } => "transport",
            Error::Decode { .. } => "decode",
            Error::Validation { .. } => "validation",
        }
    }

    /// Description safe for logs: never includes a response body, which may
    /// carry a usable access token.
    pub fn log_summary(&self) -> String {
        match self {
            Error::Config(msg) | Error::Transport(msg) => msg.clone(),
            Error::Status { status, .. } => format!("token endpoint returned {status}"),
            Error::Decode { source, .. } => format!(
                "{:?} error at line {} column {}",
                source.classify(),
                source.line(),
                source.column()
            ),
            Error::Validation { reason, .. } => reason.clone(),
        }
    }
}

/// Result alias for token operations.
pub type Result<T> = std::result::Result<T, Error>;
