use thiserror::Error;

/// Errors that can occur while talking to the stack management API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API returned error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl ApiError {
    /// Returns true if retrying the same request may succeed.
    ///
    /// Timeouts, connection failures, throttling and server-side 5xx
    /// errors are transient. Client errors and undecodable bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout | ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::ParseError(_) => false,
        }
    }

    /// Returns true if the server says the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::ParseError(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::Timeout.is_transient());
        assert!(ApiError::Network("reset".into()).is_transient());
        assert!(ApiError::Status { status: 503, message: String::new() }.is_transient());
        assert!(ApiError::Status { status: 429, message: String::new() }.is_transient());
        assert!(!ApiError::Status { status: 404, message: String::new() }.is_transient());
        assert!(!ApiError::ParseError("bad json".into()).is_transient());
    }
}
