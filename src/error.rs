use thiserror::Error;

/// Type alias for Result with CleanupError
pub type Result<T> = std::result::Result<T, CleanupError>;

/// HTTP statuses the remote service uses for failures that clear up on their own
pub const TRANSIENT_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Error types for the mailbox cleanup pipeline
#[derive(Error, Debug)]
pub enum CleanupError {
    /// Credential acquisition or refresh failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Configuration file missing, malformed, or invalid
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The mail API answered with a non-success HTTP status
    #[error("Gmail API error (HTTP {status}): {message}")]
    RemoteError { status: u16, message: String },

    /// Connection-level failure with no HTTP status attached
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The mail API answered but the payload was not what we expected
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// An operation was attempted from the wrong run phase
    #[error("Invalid run state: {0}")]
    InvalidState(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Coarse failure classes used for exit hints and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    TransientRemote,
    FatalRemote,
    Config,
    Local,
}

impl CleanupError {
    /// Build a remote error from a bare status code
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        CleanupError::RemoteError {
            status,
            message: message.into(),
        }
    }

    /// HTTP status of a remote failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            CleanupError::RemoteError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if the error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        self.status()
            .map(|status| TRANSIENT_STATUS_CODES.contains(&status))
            .unwrap_or(false)
    }

    /// Check if the error is permanent and should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CleanupError::AuthError(_) => ErrorKind::Auth,
            CleanupError::ConfigError(_) | CleanupError::YamlError(_) => ErrorKind::Config,
            CleanupError::RemoteError { .. } if self.is_transient() => ErrorKind::TransientRemote,
            CleanupError::RemoteError { .. }
            | CleanupError::NetworkError(_)
            | CleanupError::InvalidResponse(_) => ErrorKind::FatalRemote,
            CleanupError::InvalidState(_)
            | CleanupError::IoError(_)
            | CleanupError::SerializationError(_) => ErrorKind::Local,
        }
    }
}

/// Pull `error.code` / `error.message` out of a Google JSON error body
fn parse_api_error_body(body: &serde_json::Value) -> (u16, String) {
    let error = body.get("error");
    let status = error
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_u64())
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or(400);
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string());
    (status, message)
}

impl From<google_gmail1::Error> for CleanupError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            // Non-success response whose body could not be decoded
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                CleanupError::RemoteError {
                    status: status.as_u16(),
                    message: status.canonical_reason().unwrap_or("Unknown").to_string(),
                }
            }
            // Non-success response carrying a JSON error document
            google_gmail1::Error::BadRequest(ref body) => {
                let (status, message) = parse_api_error_body(body);
                CleanupError::RemoteError { status, message }
            }
            google_gmail1::Error::HttpError(ref err) => {
                CleanupError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => CleanupError::NetworkError(err.to_string()),
            google_gmail1::Error::MissingToken(err) => {
                CleanupError::AuthError(format!("Failed to obtain token: {}", err))
            }
            other => CleanupError::InvalidResponse(other.to_string()),
        }
    }
}
