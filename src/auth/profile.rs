//! Reading and updating the authenticated user's profile.

use axum::{Extension, Json, extract::State};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    Error,
    auth::{
        AuthState,
        register::{validate_email, validate_name, validate_username},
    },
    db::lock_connection,
    error::FieldErrors,
    json::JsonBody,
    user::{ProfileChanges, UserID, UserProfile, get_user_by_id, update_user_profile},
};

/// The body of a profile update. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    /// A new email.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub email: Option<Value>,
    /// A new username.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub username: Option<Value>,
    /// A new given name.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub first_name: Option<Value>,
    /// A new family name.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub last_name: Option<Value>,
}

impl ProfileForm {
    /// Validate the fields that were given.
    ///
    /// # Errors
    /// Returns an [Error::Validation] if any given field is invalid.
    pub fn validate(self) -> Result<ProfileChanges, Error> {
        let mut errors = FieldErrors::new();

        let changes = ProfileChanges {
            email: self
                .email
                .and_then(|value| validate_email(&value, &mut errors)),
            username: self
                .username
                .and_then(|value| validate_username(&value, &mut errors)),
            first_name: self
                .first_name
                .and_then(|value| validate_name(&value, "first_name", &mut errors)),
            last_name: self
                .last_name
                .and_then(|value| validate_name(&value, "last_name", &mut errors)),
        };

        errors.finish(changes)
    }
}

/// A route handler that responds with the authenticated user's profile.
///
/// # Errors
/// Returns [Error::Unauthenticated] if the token belongs to a user that no longer exists.
pub async fn get_profile_endpoint(
    State(state): State<AuthState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<UserProfile>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    match get_user_by_id(user_id, &connection) {
        Ok(user) => Ok(Json(UserProfile::from(&user))),
        Err(Error::NotFound) => Err(Error::Unauthenticated),
        Err(error) => Err(error),
    }
}

/// A route handler for `PUT` and `PATCH` requests that update the authenticated
/// user's profile. Only the fields present in the body are changed.
///
/// # Errors
/// Returns a validation error for invalid fields or an email or username that
/// belongs to another user.
pub async fn update_profile_endpoint(
    State(state): State<AuthState>,
    Extension(user_id): Extension<UserID>,
    JsonBody(form): JsonBody<ProfileForm>,
) -> Result<Json<UserProfile>, Error> {
    let changes = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    match update_user_profile(user_id, changes, &connection) {
        Ok(user) => {
            tracing::debug!("Updated profile of user {}", user.id);
            Ok(Json(UserProfile::from(&user)))
        }
        Err(Error::NotFound) => Err(Error::Unauthenticated),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        auth::TokenType,
        db::lock_connection,
        endpoints,
        test_utils::{create_test_user, get_test_server, get_test_state, get_test_token},
        user::UserID,
    };

    #[tokio::test]
    async fn get_profile_returns_authenticated_user() {
        let state = get_test_state();
        let token = get_test_token(&state, "test@example.com");
        let server = get_test_server(state);

        let response = server
            .get(endpoints::PROFILE)
            .authorization_bearer(token)
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["email"], "test@example.com");
        assert_eq!(body["full_name"], "Test User");
    }

    #[tokio::test]
    async fn get_profile_requires_token() {
        let server = get_test_server(get_test_state());

        server
            .get(endpoints::PROFILE)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn get_profile_of_deleted_user_is_unauthorized() {
        let state = get_test_state();
        let token = state
            .token_config
            .issue(UserID::new(999), TokenType::Access)
            .unwrap();
        let server = get_test_server(state);

        server
            .get(endpoints::PROFILE)
            .authorization_bearer(token)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn patch_profile_changes_only_given_fields() {
        let state = get_test_state();
        let token = get_test_token(&state, "test@example.com");
        let server = get_test_server(state);

        let response = server
            .patch(endpoints::PROFILE)
            .authorization_bearer(token)
            .json(&json!({"first_name": "Updated"}))
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["first_name"], "Updated");
        assert_eq!(body["last_name"], "User");
        assert_eq!(body["full_name"], "Updated User");
    }

    #[tokio::test]
    async fn put_profile_rejects_taken_email() {
        let state = get_test_state();
        create_test_user(
            &lock_connection(&state.db_connection).unwrap(),
            "other@example.com",
        );
        let token = get_test_token(&state, "test@example.com");
        let server = get_test_server(state);

        let response = server
            .put(endpoints::PROFILE)
            .authorization_bearer(token)
            .json(&json!({"email": "other@example.com"}))
            .await;

        response.assert_status_bad_request();
        assert_eq!(
            response.json::<Value>()["fields"]["email"][0],
            "A user with this email already exists."
        );
    }

    #[tokio::test]
    async fn put_profile_rejects_blank_name() {
        let state = get_test_state();
        let token = get_test_token(&state, "test@example.com");
        let server = get_test_server(state);

        let response = server
            .put(endpoints::PROFILE)
            .authorization_bearer(token)
            .json(&json!({"last_name": "  "}))
            .await;

        response.assert_status_bad_request();
        assert_eq!(
            response.json::<Value>()["fields"]["last_name"][0],
            "This field may not be blank."
        );
    }
}
