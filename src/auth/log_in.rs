//! Logging in with an email and password, and exchanging refresh tokens.

use axum::{Json, extract::State};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Error,
    auth::{AuthState, TokenPair, TokenType},
    db::lock_connection,
    error::FieldErrors,
    form::{NOT_NULL, parse_string, required},
    json::JsonBody,
    user::{User, UserProfile, get_user_by_email},
};

/// The body of a log in or token request.
#[derive(Debug, Default, Deserialize)]
pub struct LogInForm {
    /// Email entered during log-in.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub email: Option<Value>,
    /// Password entered during log-in.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub password: Option<Value>,
}

impl LogInForm {
    fn credentials(self) -> Result<(String, String), Error> {
        let mut errors = FieldErrors::new();

        let email = required(self.email, "email", &mut errors)
            .and_then(|value| parse_string(&value, "email", &mut errors));
        let password = match required(self.password, "password", &mut errors) {
            Some(Value::String(password)) => Some(password),
            Some(Value::Null) => {
                errors.add("password", NOT_NULL);
                None
            }
            Some(_) => {
                errors.add("password", "Not a valid string.");
                None
            }
            None => None,
        };

        match (email, password) {
            (Some(email), Some(password)) if errors.is_empty() => Ok((email, password)),
            _ => Err(Error::Validation(errors)),
        }
    }
}

/// The response to a successful log in.
#[derive(Debug, Serialize)]
pub struct LogInResponse {
    message: &'static str,
    user: UserProfile,
    tokens: TokenPair,
}

/// The body of a token refresh request.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshForm {
    /// A refresh token from an earlier log in.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub refresh: Option<Value>,
}

/// A newly issued access token.
#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    access: String,
}

/// Check that `email` and `password` belong to a registered user.
///
/// # Errors
/// Returns [Error::InvalidCredentials] if no user has that email or the
/// password is wrong.
pub fn authenticate(email: &str, password: &str, connection: &Connection) -> Result<User, Error> {
    let user = match get_user_by_email(email, connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    if user.password_hash.verify(password)? {
        Ok(user)
    } else {
        Err(Error::InvalidCredentials)
    }
}

fn authenticate_form(state: &AuthState, form: LogInForm) -> Result<User, Error> {
    let (email, password) = form.credentials()?;
    let connection = lock_connection(&state.db_connection)?;

    authenticate(&email, &password, &connection)
}

/// A route handler for logging in, responds with the user's profile and a token pair.
///
/// # Errors
/// Returns an error if the credentials are missing or invalid.
pub async fn log_in_endpoint(
    State(state): State<AuthState>,
    JsonBody(form): JsonBody<LogInForm>,
) -> Result<Json<LogInResponse>, Error> {
    let user = authenticate_form(&state, form)?;
    let tokens = state.token_config.issue_tokens(user.id)?;

    tracing::info!("User {} logged in", user.id);

    Ok(Json(LogInResponse {
        message: "Login successful",
        user: UserProfile::from(&user),
        tokens,
    }))
}

/// A route handler that responds with a token pair for valid credentials.
///
/// # Errors
/// Returns an error if the credentials are missing or invalid.
pub async fn obtain_token_endpoint(
    State(state): State<AuthState>,
    JsonBody(form): JsonBody<LogInForm>,
) -> Result<Json<TokenPair>, Error> {
    let user = authenticate_form(&state, form)?;

    state.token_config.issue_tokens(user.id).map(Json)
}

/// A route handler that exchanges a refresh token for a new access token.
///
/// # Errors
/// Returns [Error::Unauthenticated] if the refresh token is invalid or expired.
pub async fn refresh_token_endpoint(
    State(state): State<AuthState>,
    JsonBody(form): JsonBody<RefreshForm>,
) -> Result<Json<AccessTokenResponse>, Error> {
    let mut errors = FieldErrors::new();
    let refresh = required(form.refresh, "refresh", &mut errors)
        .and_then(|value| parse_string(&value, "refresh", &mut errors));
    let refresh = errors.finish(refresh)?.unwrap_or_default();

    let user_id = state.token_config.verify(&refresh, TokenType::Refresh)?;
    let access = state.token_config.issue(user_id, TokenType::Access)?;

    Ok(Json(AccessTokenResponse { access }))
}
