//! Error hierarchy for the Coral CX client.
//!
//! Provides a structured error type system built on [`thiserror`]:
//!
//! - [`CoralError`]: Top-level enum covering all error domains
//! - [`ApiError`]: Non-2xx platform responses with the server-supplied
//!   status, error code, and tracing context preserved verbatim
//!
//! The receive loops swallow per-frame errors (logged, loop continues);
//! construction-time errors propagate to the caller as hard failures.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// CoralError: top-level error enum
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level error type for the Coral CX client.
#[derive(Debug, Error)]
pub enum CoralError {
    /// A required argument or field was absent.
    #[error("argument missing: {field}")]
    ArgumentMissing {
        /// Name of the missing field.
        field: &'static str,
    },

    /// An argument was present but malformed.
    #[error("argument invalid: {field} = {value:?}")]
    ArgumentInvalid {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A payload could not be decoded as JSON or had an unexpected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No registered topic variant matched the envelope's topic name.
    #[error("unrecognized topic: {topic_name}")]
    UnrecognizedTopic {
        /// The topic name that failed to match.
        topic_name: String,
    },

    /// The platform answered with a non-2xx status and an error body.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// A lookup by identifier found nothing.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of entity looked up (e.g. `"member"`).
        kind: &'static str,
        /// The identifier that missed.
        id: String,
    },

    /// Dial, read, or write failure on a connection.
    #[error("connection error: {message}")]
    Connection {
        /// Description of the failure.
        message: String,
    },

    /// HTTP transport failure, propagated unchanged from [`reqwest`].
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CoralError {
    /// Create a connection error from any displayable cause.
    #[must_use]
    pub fn connection(cause: impl fmt::Display) -> Self {
        Self::Connection {
            message: cause.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ApiError
// ─────────────────────────────────────────────────────────────────────────────

/// A non-2xx response from the platform API.
///
/// The server-supplied `code` and `context_id` are preserved verbatim so
/// callers can correlate failures with server-side traces.
#[derive(Clone, Debug, Error)]
#[error("API error {status} [{code}]: {message}")]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Machine-readable error code from the response body (e.g.
    /// `"bad.credentials"`).
    pub code: String,
    /// Human-readable message from the response body.
    pub message: String,
    /// Server-side tracing identifier, when supplied.
    pub context_id: Option<String>,
}

/// Error body shapes the platform emits.
///
/// REST endpoints use `{status, code, message, contextId}`; the OAuth token
/// endpoint uses `{error, description}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    code: Option<String>,
    error: Option<String>,
    message: Option<String>,
    description: Option<String>,
    context_id: Option<String>,
}

impl ApiError {
    /// Build an [`ApiError`] from an HTTP status and a raw error body.
    ///
    /// Unknown body shapes degrade to the raw text as the message; the
    /// status code is always preserved.
    #[must_use]
    pub fn from_body(status: u16, body: &str) -> Self {
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
        let code = parsed
            .code
            .or(parsed.error)
            .unwrap_or_else(|| "unknown".to_owned());
        let message = parsed
            .message
            .or(parsed.description)
            .unwrap_or_else(|| body.trim().to_owned());
        Self {
            status,
            code,
            message,
            context_id: parsed.context_id,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn argument_missing_display() {
        let err = CoralError::ArgumentMissing { field: "client_id" };
        assert_eq!(err.to_string(), "argument missing: client_id");
    }

    #[test]
    fn argument_invalid_display() {
        let err = CoralError::ArgumentInvalid {
            field: "conversation_id",
            value: "not-a-uuid".to_owned(),
        };
        assert!(err.to_string().contains("conversation_id"));
        assert!(err.to_string().contains("not-a-uuid"));
    }

    #[test]
    fn unrecognized_topic_display() {
        let err = CoralError::UnrecognizedTopic {
            topic_name: "v9.unknown.topic".to_owned(),
        };
        assert_eq!(err.to_string(), "unrecognized topic: v9.unknown.topic");
    }

    #[test]
    fn api_error_from_rest_body() {
        let body = r#"{"status":400,"code":"bad.credentials","message":"invalid client","contextId":"ctx-1234"}"#;
        let err = ApiError::from_body(400, body);
        assert_eq!(err.status, 400);
        assert_eq!(err.code, "bad.credentials");
        assert_eq!(err.message, "invalid client");
        assert_eq!(err.context_id.as_deref(), Some("ctx-1234"));
    }

    #[test]
    fn api_error_from_oauth_body() {
        let body = r#"{"error":"invalid_client","description":"authentication failed"}"#;
        let err = ApiError::from_body(401, body);
        assert_eq!(err.code, "invalid_client");
        assert_eq!(err.message, "authentication failed");
        assert!(err.context_id.is_none());
    }

    #[test]
    fn api_error_from_unparseable_body() {
        let err = ApiError::from_body(502, "bad gateway");
        assert_eq!(err.status, 502);
        assert_eq!(err.code, "unknown");
        assert_eq!(err.message, "bad gateway");
    }

    #[test]
    fn api_error_display() {
        let err = ApiError {
            status: 404,
            code: "not.found".to_owned(),
            message: "no such channel".to_owned(),
            context_id: None,
        };
        assert_eq!(err.to_string(), "API error 404 [not.found]: no such channel");
    }

    #[test]
    fn api_error_converts_to_coral_error() {
        let api = ApiError::from_body(400, "{}");
        let err = CoralError::from(api);
        assert_matches!(err, CoralError::Api(e) if e.status == 400);
    }

    #[test]
    fn json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = CoralError::from(json_err);
        assert_matches!(err, CoralError::Json(_));
    }

    #[test]
    fn connection_helper() {
        let err = CoralError::connection("dial tcp: refused");
        assert_eq!(err.to_string(), "connection error: dial tcp: refused");
    }

    #[test]
    fn coral_error_is_std_error() {
        let err = CoralError::NotFound {
            kind: "member",
            id: "m-1".to_owned(),
        };
        let _: &dyn std::error::Error = &err;
    }
}
