use reqwest::StatusCode;
use thiserror::Error;

use parley_types::api::ErrorBody;

use crate::permissions::PermissionError;

/// Fallback text when a rejection carries no readable message.
pub const GENERIC_FAILURE: &str = "An error occurred while fetching data";

/// Code the moderation layer attaches to refused messages.
pub const TOXIC_CONTENT: &str = "TOXIC_CONTENT";
pub const AUTH_FAILURE: &str = "Auth failure";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no session token")]
    Missing,

    #[error("invalid token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// The credential was refused. The root scope must end the session.
    #[error("authorization failure")]
    Unauthorized,

    /// Content moderation refused a message.
    #[error("{message}")]
    Moderation {
        message: String,
        toxicity_score: Option<f64>,
    },

    /// Any other non-success response.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Scope(#[from] PermissionError),
}

impl ApiError {
    /// Classify a non-success response from its status and (possibly
    /// empty or non-JSON) body.
    ///
    /// Only 401, or a 403 carrying the credential failure code, ends the
    /// session. Any other 403 is an ordinary refusal.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return ApiError::Unauthorized;
        }

        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
        if status == StatusCode::FORBIDDEN && parsed.code() == Some(AUTH_FAILURE) {
            return ApiError::Unauthorized;
        }
        Self::from_body(status.as_u16(), parsed)
    }

    pub fn from_body(status: u16, body: ErrorBody) -> Self {
        let is_toxic = body.code() == Some(TOXIC_CONTENT)
            || body
                .message
                .as_deref()
                .is_some_and(|m| m.to_lowercase().contains("toxic"));

        if is_toxic {
            return ApiError::Moderation {
                message: body
                    .message
                    .unwrap_or_else(|| "Message contains toxic content and cannot be sent".into()),
                toxicity_score: body.toxicity_score,
            };
        }

        let message = body
            .info()
            .map(str::to_string)
            .or(body.message)
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());

        ApiError::Rejected { status, message }
    }

    /// True when the failure means the session can no longer be trusted.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::Session(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_statuses() {
        assert!(matches!(
            ApiError::from_response(StatusCode::UNAUTHORIZED, b""),
            ApiError::Unauthorized
        ));
        assert!(
            ApiError::from_response(StatusCode::FORBIDDEN, br#"{"error":"Auth failure"}"#).is_auth_failure()
        );
    }

    #[test]
    fn missing_permission_is_a_refusal_not_logout() {
        let err = ApiError::from_response(
            StatusCode::FORBIDDEN,
            br#"{"error":{"info":"You cannot kick members"}}"#,
        );
        assert!(!err.is_auth_failure());
        assert!(matches!(err, ApiError::Rejected { status: 403, .. }));
        assert_eq!(err.to_string(), "You cannot kick members");

        assert!(!ApiError::from_response(StatusCode::FORBIDDEN, b"").is_auth_failure());
    }

    #[test]
    fn moderation_by_code_keeps_score() {
        let body = br#"{"error":"TOXIC_CONTENT","message":"Message rejected","toxicityScore":0.92}"#;
        match ApiError::from_response(StatusCode::BAD_REQUEST, body) {
            ApiError::Moderation { message, toxicity_score } => {
                assert_eq!(message, "Message rejected");
                assert_eq!(toxicity_score, Some(0.92));
            }
            other => panic!("expected moderation error, got {other:?}"),
        }
    }

    #[test]
    fn moderation_by_message_text() {
        let body = br#"{"message":"This message is Toxic"}"#;
        assert!(matches!(
            ApiError::from_response(StatusCode::UNPROCESSABLE_ENTITY, body),
            ApiError::Moderation { toxicity_score: None, .. }
        ));
    }

    #[test]
    fn rejected_prefers_info_then_message_then_generic() {
        let info = ApiError::from_response(
            StatusCode::NOT_FOUND,
            br#"{"error":{"info":"Guild not found"},"message":"ignored"}"#,
        );
        assert_eq!(info.to_string(), "Guild not found");

        let message = ApiError::from_response(StatusCode::CONFLICT, br#"{"message":"Already friends"}"#);
        assert_eq!(message.to_string(), "Already friends");

        let generic = ApiError::from_response(StatusCode::INTERNAL_SERVER_ERROR, b"<html>");
        assert_eq!(generic.to_string(), GENERIC_FAILURE);
        assert!(!generic.is_auth_failure());
    }
}
