use thiserror::Error;

/// Error taxonomy for the conversion core.
///
/// Every public operation returns one of these; callers get exactly one
/// human-readable message per failure class, never a raw lower-level error.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conversion not possible: {0}")]
    Conversion(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cached data was corrupted and has been discarded: {0}")]
    Corruption(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ConvertError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    /// Classify a non-2xx provider response.
    /// 429 is rate limiting; everything else is a generic API error.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            429 => ConvertError::RateLimited,
            500..=599 => ConvertError::Api(format!("server error {}: {}", status, truncated)),
            _ => ConvertError::Api(format!("status {}: {}", status, truncated)),
        }
    }

    /// Whether the retry policy applies to this error.
    /// Validation and conversion failures are deterministic and never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConvertError::Network(_) | ConvertError::Api(_) | ConvertError::RateLimited
        )
    }
}

impl From<reqwest::Error> for ConvertError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ConvertError::Network(err.to_string())
        } else {
            ConvertError::Api(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classifies_rate_limit() {
        let err = ConvertError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, ConvertError::RateLimited));
    }

    #[test]
    fn test_from_status_classifies_server_error() {
        let err = ConvertError::from_status(reqwest::StatusCode::BAD_GATEWAY, "oops");
        assert!(matches!(err, ConvertError::Api(_)));
    }

    #[test]
    fn test_truncate_body_limits_length() {
        let long = "x".repeat(2000);
        let err = ConvertError::from_status(reqwest::StatusCode::NOT_FOUND, &long);
        let msg = err.to_string();
        assert!(msg.len() < 700, "error message should be truncated: {}", msg.len());
        assert!(msg.contains("truncated"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ConvertError::Network("down".into()).is_retryable());
        assert!(ConvertError::RateLimited.is_retryable());
        assert!(!ConvertError::Validation("bad code".into()).is_retryable());
        assert!(!ConvertError::Conversion("no rate".into()).is_retryable());
    }
}
