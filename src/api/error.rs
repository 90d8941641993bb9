//! API error taxonomy
//!
//! Every failure the admin backend can produce is folded into [`ApiError`]
//! at the network boundary, so controllers only ever handle one contract.

use reqwest::StatusCode;

/// Fallback text when the backend gives no usable message
pub const GENERIC_FAILURE: &str = "Request failed";

/// Errors surfaced by API calls and controller operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No usable token, or the backend answered 401
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Missing/invalid fields, caught client-side or reported as 400/422
    #[error("validation failed: {message}")]
    Validation { message: String, fields: Vec<String> },
    /// Target no longer exists server-side (404)
    #[error("not found: {0}")]
    NotFound(String),
    /// Transport failure, timeout, or malformed response body
    #[error("network error: {0}")]
    Network(String),
    /// Any other non-success response, including `success: false`
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl ApiError {
    /// Validation failure for a set of missing or blank fields
    pub fn missing_fields(fields: Vec<String>) -> Self {
        Self::Validation {
            message: format!("Missing required fields: {}", fields.join(", ")),
            fields,
        }
    }

    /// Map a failed HTTP status and optional body message to a variant
    pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Authentication(
                message.unwrap_or_else(|| "Session expired. Sign in again.".to_string()),
            ),
            StatusCode::NOT_FOUND => {
                Self::NotFound(message.unwrap_or_else(|| "Resource not found.".to_string()))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::Validation {
                message: message.unwrap_or_else(|| "Invalid request.".to_string()),
                fields: Vec::new(),
            },
            _ => Self::Server {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            },
        }
    }

    /// Text for the inline error notice
    pub fn user_message(&self) -> String {
        match self {
            Self::Authentication(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Validation { message, .. } | Self::Server { message, .. } => message.clone(),
            Self::Network(_) => format!("{}. Check your network connection and try again.", GENERIC_FAILURE),
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else if err.is_decode() {
            "malformed response body"
        } else {
            "transport failure"
        };
        // Security: the full reqwest error carries the URL, keep it out of user text
        tracing::debug!("reqwest error: {}", err);
        Self::Network(kind.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, None).is_authentication());
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, None),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, Some("bad".into())),
            ApiError::Validation { .. }
        ));
        assert_eq!(
            ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, None),
            ApiError::Server {
                status: 503,
                message: GENERIC_FAILURE.to_string()
            }
        );
    }

    #[test]
    fn test_user_message_prefers_body_message() {
        let err = ApiError::from_status(StatusCode::CONFLICT, Some("SKU already exists".into()));
        assert_eq!(err.user_message(), "SKU already exists");
    }

    #[test]
    fn test_missing_fields_message() {
        let err = ApiError::missing_fields(vec!["name".into(), "price".into()]);
        assert_eq!(err.user_message(), "Missing required fields: name, price");
    }
}
