//! Code for creating the user table and reading and updating users in the database.

use std::fmt::Display;

use rusqlite::{Connection, Row, named_params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, auth::PasswordHash, email::Email};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The email the user logs in with. Unique across users, ignoring case.
    pub email: Email,
    /// The user's unique display handle.
    pub username: String,
    /// The user's given name.
    pub first_name: String,
    /// The user's family name.
    pub last_name: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// When the user registered.
    pub created_at: OffsetDateTime,
    /// When the user's profile was last changed.
    pub updated_at: OffsetDateTime,
}

impl User {
    /// The user's first and last name separated by a space.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// The public view of a user that is safe to send to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    /// The user's ID.
    pub id: UserID,
    /// The user's email.
    pub email: Email,
    /// The user's unique display handle.
    pub username: String,
    /// The user's given name.
    pub first_name: String,
    /// The user's family name.
    pub last_name: String,
    /// The user's first and last name.
    pub full_name: String,
    /// When the user registered.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            created_at: user.created_at,
        }
    }
}

/// The data needed to insert a new user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    /// The email the user will log in with.
    pub email: Email,
    /// The user's unique display handle.
    pub username: String,
    /// The user's given name.
    pub first_name: String,
    /// The user's family name.
    pub last_name: String,
    /// The hash of the user's password.
    pub password_hash: PasswordHash,
}

/// Changes to a user's profile. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    /// A new email.
    pub email: Option<Email>,
    /// A new username.
    pub username: Option<String>,
    /// A new given name.
    pub first_name: Option<String>,
    /// A new family name.
    pub last_name: Option<String>,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                username TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                password TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

const USER_COLUMNS: &str =
    "id, email, username, first_name, last_name, password, created_at, updated_at";

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateEmail] if the email is already registered,
/// - [Error::DuplicateUsername] if the username is taken,
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    let now = OffsetDateTime::now_utc();

    connection
        .prepare(&format!(
            "INSERT INTO user (email, username, first_name, last_name, password, created_at, updated_at)
             VALUES (:email, :username, :first_name, :last_name, :password, :created_at, :updated_at)
             RETURNING {USER_COLUMNS}"
        ))?
        .query_row(
            named_params! {
                ":email": new_user.email,
                ":username": new_user.username,
                ":first_name": new_user.first_name,
                ":last_name": new_user.last_name,
                ":password": new_user.password_hash.as_ref(),
                ":created_at": now,
                ":updated_at": now,
            },
            map_user_row,
        )
        .map_err(map_unique_violation)
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user ([Error::NotFound]),
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user WHERE id = :id"))?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user registered with `email`, ignoring case.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that email, or [Error::SqlError]
/// if some other SQL related error occurred.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user WHERE email = :email"
        ))?
        .query_row(&[(":email", &email.trim())], map_user_row)
        .map_err(|error| error.into())
}

/// Apply `changes` to the profile of the user with `user_id`.
///
/// # Errors
///
/// Returns a:
/// - [Error::NotFound] if the user does not exist,
/// - [Error::DuplicateEmail] or [Error::DuplicateUsername] if the new email or username is taken,
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn update_user_profile(
    user_id: UserID,
    changes: ProfileChanges,
    connection: &Connection,
) -> Result<User, Error> {
    connection
        .prepare(&format!(
            "UPDATE user SET
                email = COALESCE(:email, email),
                username = COALESCE(:username, username),
                first_name = COALESCE(:first_name, first_name),
                last_name = COALESCE(:last_name, last_name),
                updated_at = :updated_at
             WHERE id = :id
             RETURNING {USER_COLUMNS}"
        ))?
        .query_row(
            named_params! {
                ":email": changes.email,
                ":username": changes.username,
                ":first_name": changes.first_name,
                ":last_name": changes.last_name,
                ":updated_at": OffsetDateTime::now_utc(),
                ":id": user_id.as_i64(),
            },
            map_user_row,
        )
        .map_err(map_unique_violation)
}

fn map_unique_violation(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            Some(ref description),
        ) if description.ends_with("user.email") => Error::DuplicateEmail,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            Some(ref description),
        ) if description.ends_with("user.username") => Error::DuplicateUsername,
        error => error.into(),
    }
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(5)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        email: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
