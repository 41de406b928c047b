use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::{DomainError, FieldViolation};
use serde::Serialize;
use shared::jwt::JwtError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {} violation(s)", .0.len())]
    Validation(Vec<FieldViolation>),

    #[error("Rate limited")]
    RateLimited { retry_after_secs: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldViolation>>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidState(_) | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::NotFound(_) => "NotFound",
            ApiError::InvalidState(_) => "InvalidState",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Validation(_) => "ValidationError",
            ApiError::RateLimited { .. } => "RateLimited",
            ApiError::Internal(_) => "Internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let mut retry_after = None;

        let (message, details) = match self {
            ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::InvalidState(msg)
            | ApiError::Conflict(msg) => (msg, None),
            ApiError::Validation(violations) => {
                let message = match violations.as_slice() {
                    [single] => single.message.clone(),
                    many => format!("{} validation errors", many.len()),
                };
                (message, Some(violations))
            }
            ApiError::RateLimited { retry_after_secs } => {
                retry_after = Some(retry_after_secs);
                ("Too many requests. Please try again later.".to_string(), None)
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ("An internal error occurred".to_string(), None)
            }
        };

        let mut response = (
            status,
            Json(ErrorBody {
                kind,
                message,
                details,
            }),
        )
            .into_response();

        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(violations) => ApiError::Validation(violations),
            DomainError::Forbidden(msg) => ApiError::Forbidden(msg),
            DomainError::InvalidState(msg) => ApiError::InvalidState(msg),
            DomainError::NotFound(msg) => ApiError::NotFound(msg),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::Storage(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::from(err).into()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::from(errors).into()
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        let message = match err {
            JwtError::TokenExpired => "Token has expired",
            JwtError::InvalidKey(_) | JwtError::EncodingError(_) => {
                return ApiError::Internal(err.to_string());
            }
            _ => "Invalid or expired token",
        };
        ApiError::Unauthorized(message.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_domain_errors_map_to_status() {
        let cases = [
            (DomainError::Validation(vec![]), StatusCode::BAD_REQUEST),
            (DomainError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (DomainError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (DomainError::InvalidState("x".into()), StatusCode::CONFLICT),
            (DomainError::Conflict("x".into()), StatusCode::CONFLICT),
            (DomainError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn test_validation_body_lists_every_field() {
        let err = ApiError::Validation(vec![
            FieldViolation::new("mode", "required", "Permission mode is required"),
            FieldViolation::new("endDate", "date_order", "End date must not precede start date"),
        ]);
        let json = body_json(err.into_response()).await;

        assert_eq!(json["kind"], "ValidationError");
        assert_eq!(json["message"], "2 validation errors");
        assert_eq!(json["details"].as_array().unwrap().len(), 2);
        assert_eq!(json["details"][0]["field"], "mode");
    }

    #[tokio::test]
    async fn test_single_violation_uses_its_message() {
        let err = ApiError::Validation(vec![FieldViolation::new(
            "note",
            "required",
            "A note is required to reject a request",
        )]);
        let json = body_json(err.into_response()).await;
        assert_eq!(json["message"], "A note is required to reject a request");
    }

    #[tokio::test]
    async fn test_internal_message_is_masked() {
        let response = ApiError::Internal("connection refused on 10.0.0.3".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["kind"], "Internal");
        assert_eq!(json["message"], "An internal error occurred");
        assert!(json.get("details").is_none());
    }

    #[tokio::test]
    async fn test_invalid_state_kind() {
        let response = ApiError::from(DomainError::InvalidState(
            "Cannot approve a request in status APPROVED".into(),
        ))
        .into_response();
        let json = body_json(response).await;
        assert_eq!(json["kind"], "InvalidState");
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            retry_after_secs: 17,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "17");
    }

    #[test]
    fn test_jwt_errors() {
        assert!(matches!(
            ApiError::from(JwtError::TokenExpired),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(JwtError::InvalidToken),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(JwtError::InvalidKey("bad pem".into())),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let error: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, ApiError::NotFound(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ApiError::Unauthorized("test".into()).to_string(),
            "Unauthorized: test"
        );
        assert_eq!(
            ApiError::RateLimited {
                retry_after_secs: 1
            }
            .to_string(),
            "Rate limited"
        );
    }
}
