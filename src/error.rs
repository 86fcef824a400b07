//! Console error types
use thiserror::Error;

/// Backend call failure, classified by the envelope code or the transport
#[derive(Debug, Clone)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // Any other non-200 envelope code
    Server { code: i32, message: String },

    // Connection refused, timeout, TLS
    Transport(String),

    // Response body did not match the expected shape
    Decode(String),

    // code 200 but no data where data was required
    EmptyPayload(String),
}

impl ApiError {
    /// Get status code (envelope code for server errors, 0 for client-side failures)
    pub fn status_code(&self) -> i32 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Server { code, .. } => *code,
            ApiError::Transport(_) => 0,
            ApiError::Decode(_) => 0,
            ApiError::EmptyPayload(_) => 0,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Server { message, .. } => message,
            ApiError::Transport(msg) => msg,
            ApiError::Decode(msg) => msg,
            ApiError::EmptyPayload(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Server { .. } => "SERVER_ERROR",
            ApiError::Transport(_) => "TRANSPORT_ERROR",
            ApiError::Decode(_) => "DECODE_ERROR",
            ApiError::EmptyPayload(_) => "EMPTY_PAYLOAD",
        }
    }

    /// Map a backend envelope code + message onto the taxonomy
    pub fn from_envelope(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            400 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            _ => ApiError::Server { code, message },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        ApiError::Transport(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        ApiError::Decode(message.into())
    }

    pub fn empty_payload(message: impl Into<String>) -> Self {
        ApiError::EmptyPayload(message.into())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::decode(err.to_string())
        } else {
            ApiError::transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::transport(format!("invalid endpoint url: {}", err))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.error_code())
    }
}

impl std::error::Error for ApiError {}

/// Route table mutation failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("route name already registered: {0}")]
    DuplicateName(String),

    #[error("parent route not found: {0}")]
    UnknownParent(String),
}

/// Persistence failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ThemeError {
    #[error("invalid color: {0}")]
    InvalidColor(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("navigation to {path} exceeded {limit} redirects")]
    TooManyRedirects { path: String, limit: usize },
}
