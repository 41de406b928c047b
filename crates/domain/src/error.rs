//! Domain error types.
//!
//! Core operations return these typed errors; the HTTP layer decides status
//! codes and user-facing wording.

use serde::Serialize;
use thiserror::Error;

/// A single violated constraint on an input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Serialisable error classification shared with API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ValidationError,
    Forbidden,
    InvalidState,
    NotFound,
    Conflict,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::InvalidState => "InvalidState",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Internal => "Internal",
        };
        write!(f, "{}", s)
    }
}

/// Errors raised by domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Every violated constraint of the input, not only the first one.
    #[error("Validation failed: {} violation(s)", .0.len())]
    Validation(Vec<FieldViolation>),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) => ErrorKind::ValidationError,
            DomainError::Forbidden(_) => ErrorKind::Forbidden,
            DomainError::InvalidState(_) => ErrorKind::InvalidState,
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for a validation error with a single violation.
    pub fn invalid_field(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        DomainError::Validation(vec![FieldViolation::new(field, code, message)])
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DomainError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => DomainError::Conflict("Resource already exists".to_string()),
                // foreign_key_violation
                Some("23503") => {
                    DomainError::NotFound("Referenced resource not found".to_string())
                }
                _ => DomainError::Storage(err.to_string()),
            },
            _ => DomainError::Storage(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut violations = Vec::new();
        collect_violations(&errors, "", &mut violations);
        violations.sort_by(|a, b| a.field.cmp(&b.field));
        DomainError::Validation(violations)
    }
}

/// Flattens nested errors into dotted paths such as `location.latitude`.
/// Struct-level errors are reported on the enclosing path.
fn collect_violations(
    errors: &validator::ValidationErrors,
    prefix: &str,
    out: &mut Vec<FieldViolation>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let field: &str = &**field;
        let path = match (field, prefix) {
            ("__all__", "") => "request".to_string(),
            ("__all__", _) => prefix.to_string(),
            (_, "") => camel_case(field),
            (_, _) => format!("{}.{}", prefix, camel_case(field)),
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| {
                    FieldViolation::new(
                        path.clone(),
                        e.code.to_string(),
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid value for {}", path)),
                    )
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_violations(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_violations(inner, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

/// Field names on the wire are camelCase.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            DomainError::Validation(vec![]).kind(),
            ErrorKind::ValidationError
        );
        assert_eq!(DomainError::Forbidden("x".into()).kind(), ErrorKind::Forbidden);
        assert_eq!(
            DomainError::InvalidState("x".into()).kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(DomainError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(DomainError::Conflict("x".into()).kind(), ErrorKind::Conflict);
        assert_eq!(DomainError::Storage("x".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::ValidationError.to_string(), "ValidationError");
        assert_eq!(ErrorKind::InvalidState.to_string(), "InvalidState");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DomainError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn test_pool_errors_map_to_storage() {
        let err: DomainError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_camel_case_field_names() {
        assert_eq!(camel_case("attachment_url"), "attachmentUrl");
        assert_eq!(camel_case("notes"), "notes");
    }

    #[derive(validator::Validate)]
    struct Point {
        #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
        latitude: f64,
    }

    #[derive(validator::Validate)]
    struct ClockIn {
        #[validate(length(max = 3))]
        site_name: String,
        #[validate(nested)]
        location: Option<Point>,
    }

    #[test]
    fn test_nested_violations_use_dotted_paths() {
        use validator::Validate;

        let input = ClockIn {
            site_name: "Cantiere Nord".to_string(),
            location: Some(Point { latitude: 120.0 }),
        };
        let err: DomainError = input.validate().unwrap_err().into();
        match err {
            DomainError::Validation(v) => {
                let fields: Vec<&str> = v.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(fields, vec!["location.latitude", "siteName"]);
                assert_eq!(v[0].message, "Latitude out of range");
                assert_eq!(v[1].message, "Invalid value for siteName");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_field_shorthand() {
        let err = DomainError::invalid_field("note", "required", "A note is required");
        match err {
            DomainError::Validation(v) => {
                assert_eq!(v.len(), 1);
                assert_eq!(v[0].field, "note");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
