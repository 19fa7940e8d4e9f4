//! Helpers shared by the unit tests.

use axum_test::TestServer;
use rusqlite::Connection;

use crate::{
    AppState,
    auth::{PasswordHash, TokenType, ValidatedPassword},
    build_router,
    db::{initialize, lock_connection},
    email::Email,
    user::{NewUser, User, create_user},
};

/// The password of every user made by [create_test_user].
pub const TEST_PASSWORD: &str = "correct horse battery staple 42!";

/// Keeps bcrypt fast in tests.
const TEST_HASH_COST: u32 = 4;

/// An initialized in-memory database.
pub fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    initialize(&connection).expect("Could not initialize database.");
    connection
}

/// Insert a user named "Test User" with the password [TEST_PASSWORD].
///
/// The username is derived from `email` so each email gets a unique user.
pub fn create_test_user(connection: &Connection, email: &str) -> User {
    let username = email
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    create_user(
        NewUser {
            email: Email::new(email).expect("Invalid test email."),
            username,
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
            password_hash: PasswordHash::new(
                ValidatedPassword::new_unchecked(TEST_PASSWORD),
                TEST_HASH_COST,
            )
            .expect("Could not hash test password."),
        },
        connection,
    )
    .expect("Could not create test user.")
}

pub fn get_test_state() -> AppState {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");

    AppState::new(connection, "foobar", "Etc/UTC")
        .expect("Could not create app state.")
        .with_password_hash_cost(TEST_HASH_COST)
}

pub fn get_test_server(state: AppState) -> TestServer {
    TestServer::try_new(build_router(state)).expect("Could not create test server.")
}

/// Create a user with `email` and return an access token for them.
pub fn get_test_token(state: &AppState, email: &str) -> String {
    let user = create_test_user(
        &lock_connection(&state.db_connection).expect("Could not lock database."),
        email,
    );

    state
        .token_config
        .issue(user.id, TokenType::Access)
        .expect("Could not issue access token.")
}
