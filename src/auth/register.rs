//! Registering new users.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    Error,
    auth::{AuthState, PasswordHash, ValidatedPassword},
    db::lock_connection,
    email::Email,
    error::FieldErrors,
    form::{parse_string, required},
    json::JsonBody,
    user::{NewUser, UserProfile, create_user},
};

/// The longest allowed username.
pub const MAX_USERNAME_LENGTH: usize = 150;
/// The longest allowed first or last name.
pub const MAX_NAME_LENGTH: usize = 30;

/// The body of a registration request.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    /// The email the user will log in with.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub email: Option<Value>,
    /// A unique display handle.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub username: Option<Value>,
    /// The user's given name.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub first_name: Option<Value>,
    /// The user's family name.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub last_name: Option<Value>,
    /// The password the user will log in with.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub password: Option<Value>,
    /// The password again, to catch typos.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub password_confirm: Option<Value>,
}

/// A registration form that has passed validation. The password is not hashed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRegistration {
    /// The user's email.
    pub email: Email,
    /// The user's username.
    pub username: String,
    /// The user's given name.
    pub first_name: String,
    /// The user's family name.
    pub last_name: String,
    /// The user's password.
    pub password: ValidatedPassword,
}

impl RegisterForm {
    /// Check every field of the form.
    ///
    /// # Errors
    /// Returns an [Error::Validation] listing every problem with the form,
    /// including a weak or mismatched password.
    pub fn validate(self) -> Result<ValidRegistration, Error> {
        let mut errors = FieldErrors::new();

        let email = required(self.email, "email", &mut errors)
            .and_then(|value| validate_email(&value, &mut errors));
        let username = required(self.username, "username", &mut errors)
            .and_then(|value| validate_username(&value, &mut errors));
        let first_name = required(self.first_name, "first_name", &mut errors)
            .and_then(|value| validate_name(&value, "first_name", &mut errors));
        let last_name = required(self.last_name, "last_name", &mut errors)
            .and_then(|value| validate_name(&value, "last_name", &mut errors));
        let password = required(self.password, "password", &mut errors)
            .and_then(|value| raw_password(&value, "password", &mut errors));
        let password_confirm = required(self.password_confirm, "password_confirm", &mut errors)
            .and_then(|value| raw_password(&value, "password_confirm", &mut errors));

        let password = match (password, password_confirm) {
            (Some(password), Some(confirm)) if password != confirm => {
                errors.add("password_confirm", "Passwords don't match.");
                None
            }
            (Some(password), Some(_)) => {
                let user_inputs: Vec<&str> = [
                    email.as_ref().map(Email::as_str),
                    username.as_deref(),
                    first_name.as_deref(),
                    last_name.as_deref(),
                ]
                .into_iter()
                .flatten()
                .collect();

                match ValidatedPassword::new(&password, &user_inputs) {
                    Ok(password) => Some(password),
                    Err(Error::TooWeak(feedback)) => {
                        errors.add(
                            "password",
                            format!("This password is too weak. {feedback}").trim_end(),
                        );
                        None
                    }
                    Err(error) => return Err(error),
                }
            }
            _ => None,
        };

        match (email, username, first_name, last_name, password) {
            (Some(email), Some(username), Some(first_name), Some(last_name), Some(password))
                if errors.is_empty() =>
            {
                Ok(ValidRegistration {
                    email,
                    username,
                    first_name,
                    last_name,
                    password,
                })
            }
            _ => Err(Error::Validation(errors)),
        }
    }
}

/// A route handler for registering a new user.
///
/// Responds with 201 Created, the new user's profile and a fresh token pair.
///
/// # Errors
/// Returns a validation error for invalid input or an email or username that
/// is already registered.
pub async fn register_endpoint(
    State(state): State<AuthState>,
    JsonBody(form): JsonBody<RegisterForm>,
) -> Result<Response, Error> {
    let registration = form.validate()?;
    let password_hash = PasswordHash::new(registration.password, state.password_hash_cost)?;

    let user = {
        let connection = lock_connection(&state.db_connection)?;

        create_user(
            NewUser {
                email: registration.email,
                username: registration.username,
                first_name: registration.first_name,
                last_name: registration.last_name,
                password_hash,
            },
            &connection,
        )?
    };

    tracing::info!("Registered user {}", user.id);
    let tokens = state.token_config.issue_tokens(user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": UserProfile::from(&user),
            "tokens": tokens,
        })),
    )
        .into_response())
}

/// Validate an email field, recording any problem in `errors`.
pub(crate) fn validate_email(value: &Value, errors: &mut FieldErrors) -> Option<Email> {
    let text = parse_string(value, "email", errors)?;

    Email::new(&text)
        .map_err(|error| errors.add("email", error.to_string()))
        .ok()
}

/// Validate a username field, recording any problem in `errors`.
pub(crate) fn validate_username(value: &Value, errors: &mut FieldErrors) -> Option<String> {
    let username = not_blank(value, "username", errors)?;

    if username.chars().count() > MAX_USERNAME_LENGTH {
        errors.add(
            "username",
            format!("Ensure this field has no more than {MAX_USERNAME_LENGTH} characters."),
        );
        return None;
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
        return None;
    }

    Some(username)
}

/// Validate a first or last name field, recording any problem in `errors`.
pub(crate) fn validate_name(value: &Value, field: &str, errors: &mut FieldErrors) -> Option<String> {
    let name = not_blank(value, field, errors)?;

    if name.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            field,
            format!("Ensure this field has no more than {MAX_NAME_LENGTH} characters."),
        );
        return None;
    }

    Some(name)
}

fn not_blank(value: &Value, field: &str, errors: &mut FieldErrors) -> Option<String> {
    let text = parse_string(value, field, errors)?;

    if text.is_empty() {
        errors.add(field, "This field may not be blank.");
        return None;
    }

    Some(text)
}

/// Passwords are not trimmed.
fn raw_password(value: &Value, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match value {
        Value::String(text) if text.is_empty() => {
            errors.add(field, "This field may not be blank.");
            None
        }
        Value::String(text) => Some(text.clone()),
        _ => {
            errors.add(field, "Not a valid string.");
            None
        }
    }
}
