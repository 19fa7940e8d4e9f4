//! Defines the app level error type and its conversion to JSON error responses.

use std::{collections::BTreeMap, fmt::Display};

use axum::{
    Json,
    http::{StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

/// Validation messages keyed by the name of the request field they refer to.
///
/// Serializes as a JSON object mapping field names to a list of messages, e.g.
/// `{"amount": ["Ensure this value is greater than or equal to 0.01."]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Create an empty set of field errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// Whether no errors have been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The messages recorded against `field`, if any.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Return `value` if no errors were recorded, otherwise a validation error.
    ///
    /// # Errors
    /// Returns [Error::Validation] holding these field errors if there are any.
    pub fn finish<T>(self, value: T) -> Result<T, Error> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;

        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }

        Ok(())
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request contained invalid input, e.g. a negative amount.
    ///
    /// No changes are made to stored data when this error is returned.
    #[error("invalid input: {0}")]
    Validation(FieldErrors),

    /// The user provided an email and password that do not match a registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The request did not include a valid access token.
    #[error("authentication credentials were not provided or are invalid")]
    Unauthenticated,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// A user tried to register with an email that already belongs to another user.
    #[error("the email is already registered")]
    DuplicateEmail,

    /// A user tried to register with a username that already belongs to another user.
    #[error("the username is already taken")]
    DuplicateUsername,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A JSON web token could not be created.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// The requested resource was not found.
    ///
    /// This error is also used for resources owned by another user, so that
    /// clients cannot find out whether another user's record exists.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl Error {
    /// Shortcut for a validation error with a single message for one field.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);

        Error::Validation(errors)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

const INVALID_INPUT_MESSAGE: &str = "Invalid input.";

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation(fields) => invalid_input_response(fields),
            Error::TooWeak(feedback) => {
                let mut fields = FieldErrors::new();
                fields.add("password", format!("This password is too weak. {feedback}").trim_end());
                invalid_input_response(fields)
            }
            Error::DuplicateEmail => {
                let mut fields = FieldErrors::new();
                fields.add("email", "A user with this email already exists.");
                invalid_input_response(fields)
            }
            Error::DuplicateUsername => {
                let mut fields = FieldErrors::new();
                fields.add("username", "A user with that username already exists.");
                invalid_input_response(fields)
            }
            Error::InvalidCredentials => error_response(
                StatusCode::UNAUTHORIZED,
                "No active account found with the given credentials.",
            ),
            Error::Unauthenticated => (
                [(WWW_AUTHENTICATE, "Bearer")],
                error_response(
                    StatusCode::UNAUTHORIZED,
                    "Authentication credentials were not provided or are invalid.",
                ),
            )
                .into_response(),
            Error::NotFound => error_response(StatusCode::NOT_FOUND, "Not found."),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred, check the server logs for more details.",
                )
            }
        }
    }
}

fn invalid_input_response(fields: FieldErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": INVALID_INPUT_MESSAGE,
            "fields": fields,
        })),
    )
        .into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use serde_json::{Value, json};

    use super::{Error, FieldErrors};

    async fn response_json(error: Error) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn field_errors_collect_messages_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("amount", "first");
        errors.add("amount", "second");
        errors.add("category", "third");

        assert_eq!(
            errors.get("amount"),
            Some(["first".to_owned(), "second".to_owned()].as_slice())
        );
        assert_eq!(
            errors.to_string(),
            "amount: first; amount: second; category: third"
        );
    }

    #[test]
    fn finish_returns_value_when_empty() {
        assert_eq!(FieldErrors::new().finish(1), Ok(1));
    }

    #[test]
    fn finish_returns_validation_error_when_not_empty() {
        let mut errors = FieldErrors::new();
        errors.add("title", "This field is required.");

        assert_eq!(errors.clone().finish(1), Err(Error::Validation(errors)));
    }

    #[test]
    fn no_rows_converts_to_not_found() {
        assert_eq!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::NotFound
        );
    }

    #[tokio::test]
    async fn validation_error_lists_fields() {
        let (status, body) =
            response_json(Error::validation("amount", "Amount must be greater than zero")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "error": "Invalid input.",
                "fields": {"amount": ["Amount must be greater than zero"]},
            })
        );
    }

    #[tokio::test]
    async fn unauthenticated_is_distinct_from_not_found() {
        let (unauthenticated, _) = response_json(Error::Unauthenticated).await;
        let (not_found, _) = response_json(Error::NotFound).await;

        assert_eq!(unauthenticated, StatusCode::UNAUTHORIZED);
        assert_eq!(not_found, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let (status, body) = response_json(Error::DatabaseLockError).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().contains("lock"));
    }
}
