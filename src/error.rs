//! Structured error types for store, assistant and API responses.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Expected outcomes, shown to the user as text
    ValidationError,
    Conflict,
    NotFound,
    AmbiguousMatch,

    // Credentials
    AuthFailure,

    // Boundaries
    ExternalServiceError,
    StorageUnavailable,
}

impl ErrorCode {
    /// Whether this outcome is an expected, user-facing result rather than a fault.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            ErrorCode::ValidationError
                | ErrorCode::Conflict
                | ErrorCode::NotFound
                | ErrorCode::AmbiguousMatch
        )
    }
}

/// Structured error shared by every layer of the crate.
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, reason).with_field(field)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::validation(field, format!("{} is required", field))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("Task not found: {}", task_id))
    }

    pub fn title_not_found(title: &str) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("I couldn't find any task matching the title '{}'.", title),
        )
    }

    pub fn ambiguous(titles: &[String]) -> Self {
        let quoted: Vec<String> = titles.iter().map(|t| format!("'{}'", t)).collect();
        Self::new(
            ErrorCode::AmbiguousMatch,
            format!(
                "I found multiple tasks that match: {}. Please be more specific.",
                quoted.join(", ")
            ),
        )
    }

    /// Credential failure. Deliberately identical for unknown users and wrong passwords.
    pub fn auth_failure() -> Self {
        Self::new(ErrorCode::AuthFailure, "Invalid username or password.")
    }

    /// Missing, unknown or expired session token.
    pub fn not_logged_in() -> Self {
        Self::new(ErrorCode::AuthFailure, "Not logged in or session expired.")
    }

    pub fn external(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ExternalServiceError, err.to_string())
    }

    pub fn storage(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::StorageUnavailable, err.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::storage(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::storage(format!("corrupt stored document: {}", err))
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app_err) => app_err,
            Err(err) => AppError::storage(err),
        }
    }
}

/// Result type for store and assistant operations.
pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_is_uniform() {
        let a = AppError::auth_failure();
        let b = AppError::auth_failure();
        assert_eq!(a.code, b.code);
        assert_eq!(a.message, b.message);
        assert!(a.field.is_none());
    }

    #[test]
    fn ambiguous_lists_titles() {
        let err = AppError::ambiguous(&["Gym".to_string(), "gym day".to_string()]);
        assert_eq!(err.code, ErrorCode::AmbiguousMatch);
        assert!(err.message.contains("'Gym', 'gym day'"));
    }

    #[test]
    fn serializes_code_in_screaming_snake_case() {
        let err = AppError::validation("title", "Title cannot be empty.");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["field"], "title");
    }

    #[test]
    fn anyhow_roundtrip_keeps_code() {
        let err: anyhow::Error = AppError::conflict("Username already exists.").into();
        let back: AppError = err.into();
        assert_eq!(back.code, ErrorCode::Conflict);
    }

    #[test]
    fn expected_codes() {
        assert!(ErrorCode::NotFound.is_expected());
        assert!(ErrorCode::AmbiguousMatch.is_expected());
        assert!(!ErrorCode::StorageUnavailable.is_expected());
        assert!(!ErrorCode::AuthFailure.is_expected());
    }
}
