use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the Generative Language API
#[derive(Debug, Error)]
pub enum GeminiApiError {
    #[error("Invalid argument (400): {message}")]
    InvalidArgument { message: String },

    #[error("Failed precondition (400): {message}")]
    FailedPrecondition { message: String },

    #[error("Authentication error (401): {message}")]
    Unauthenticated { message: String },

    #[error("Permission denied (403): {message}")]
    PermissionDenied { message: String },

    #[error("Not found (404): {message}")]
    NotFound { message: String },

    #[error("Quota exhausted (429): {message}")]
    ResourceExhausted { message: String },

    #[error("Internal API error (500): {message}")]
    Internal { message: String },

    #[error("Service unavailable (503): {message}")]
    Unavailable { message: String },

    #[error("Deadline exceeded (504): {message}")]
    DeadlineExceeded { message: String },

    /// Catch-all for statuses we don't map
    #[error("Unexpected API error {status}: {message}")]
    Unexpected { status: String, message: String },
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiApiError {
    pub fn from_status(status: &str, message: impl Into<String>) -> Self {
        let message = message.into();

        match status {
            "INVALID_ARGUMENT" => Self::InvalidArgument { message },
            "FAILED_PRECONDITION" => Self::FailedPrecondition { message },
            "UNAUTHENTICATED" => Self::Unauthenticated { message },
            "PERMISSION_DENIED" => Self::PermissionDenied { message },
            "NOT_FOUND" => Self::NotFound { message },
            "RESOURCE_EXHAUSTED" => Self::ResourceExhausted { message },
            "INTERNAL" => Self::Internal { message },
            "UNAVAILABLE" => Self::Unavailable { message },
            "DEADLINE_EXCEEDED" => Self::DeadlineExceeded { message },
            other => Self::Unexpected {
                status: other.to_string(),
                message,
            },
        }
    }

    /// Builds the error from a non-success response body. Falls back to the
    /// raw body when it isn't the usual error envelope.
    pub fn from_body(http_status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope { error }) => {
                let status = error
                    .status
                    .unwrap_or_else(|| error.code.unwrap_or(http_status).to_string());
                Self::from_status(&status, error.message)
            }
            Err(_) => Self::Unexpected {
                status: http_status.to_string(),
                message: body.to_string(),
            },
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument { message }
            | Self::FailedPrecondition { message }
            | Self::Unauthenticated { message }
            | Self::PermissionDenied { message }
            | Self::NotFound { message }
            | Self::ResourceExhausted { message }
            | Self::Internal { message }
            | Self::Unavailable { message }
            | Self::DeadlineExceeded { message }
            | Self::Unexpected { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn envelope_is_mapped_by_status() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded for model", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = GeminiApiError::from_body(429, body);
        assert!(matches!(err, GeminiApiError::ResourceExhausted { .. }));
        assert_eq!(err.message(), "Quota exceeded for model");
    }

    #[test]
    fn non_json_body_is_kept_verbatim() {
        let err = GeminiApiError::from_body(502, "Bad Gateway");
        assert_eq!(err.to_string(), "Unexpected API error 502: Bad Gateway");
    }
}
