use thiserror::Error;

/// Type alias for Result with AutoReplyError
pub type Result<T> = std::result::Result<T, AutoReplyError>;

/// Error types for the auto-responder
#[derive(Error, Debug)]
pub enum AutoReplyError {
    /// IO error (credential files, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authorization grant failed or produced no usable credential
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Gmail API returned a non-success response not covered below
    #[error("Gmail API error: {0}")]
    Api(String),

    /// Credential rejected by the API (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Rate limited (429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Connection issues, timeouts
    #[error("Network error: {0}")]
    Network(String),

    /// Message is missing data the reply decision needs
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// MIME composition failed
    #[error("Compose error: {0}")]
    Compose(String),
}

impl AutoReplyError {
    /// True for errors reported by the remote mail service
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AutoReplyError::Api(_)
                | AutoReplyError::Unauthorized(_)
                | AutoReplyError::NotFound(_)
                | AutoReplyError::BadRequest(_)
                | AutoReplyError::Forbidden(_)
                | AutoReplyError::RateLimited(_)
                | AutoReplyError::Server { .. }
                | AutoReplyError::Network(_)
        )
    }

    /// True when re-running the authorization grant is the likely fix
    pub fn needs_reauthorization(&self) -> bool {
        matches!(self, AutoReplyError::Auth(_) | AutoReplyError::Unauthorized(_))
    }
}

impl From<google_gmail1::Error> for AutoReplyError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                let status_code = status.as_u16();
                let message = format!(
                    "HTTP {}: {}",
                    status_code,
                    status.canonical_reason().unwrap_or("Unknown")
                );

                match status_code {
                    400 => AutoReplyError::BadRequest(message),
                    401 => AutoReplyError::Unauthorized(message),
                    403 => AutoReplyError::Forbidden(message),
                    404 => AutoReplyError::NotFound(message),
                    429 => AutoReplyError::RateLimited(message),
                    500..=599 => AutoReplyError::Server {
                        status: status_code,
                        message,
                    },
                    _ => AutoReplyError::Api(message),
                }
            }
            google_gmail1::Error::BadRequest(ref err) => {
                AutoReplyError::BadRequest(format!("{}", err))
            }
            google_gmail1::Error::HttpError(ref err) => {
                AutoReplyError::Network(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => AutoReplyError::Network(err.to_string()),
            // Token acquisition failures surface here when a stored refresh token is revoked
            google_gmail1::Error::MissingToken(ref err) => {
                AutoReplyError::Auth(format!("Failed to obtain access token: {}", err))
            }
            _ => AutoReplyError::Api(error.to_string()),
        }
    }
}
