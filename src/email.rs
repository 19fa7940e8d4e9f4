//! A validated email address type.

use std::{fmt::Display, str::FromStr};

use email_address::EmailAddress;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

/// The reason a string was rejected as an email address.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("Enter a valid email address.")]
pub struct EmailAddressError;

/// An email address that has passed syntax validation.
///
/// The domain part is lower-cased so that `Jane@Example.COM` and
/// `Jane@example.com` refer to the same account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Validate and normalize `raw_email`.
    ///
    /// # Errors
    /// Returns [EmailAddressError] if `raw_email` is not a syntactically valid address.
    pub fn new(raw_email: &str) -> Result<Self, EmailAddressError> {
        let address = EmailAddress::from_str(raw_email.trim()).map_err(|_| EmailAddressError)?;

        Ok(Self(format!(
            "{}@{}",
            address.local_part(),
            address.domain().to_lowercase()
        )))
    }

    /// Wrap an email that is already known to be valid, e.g. one read from the database.
    pub fn new_unchecked(raw_email: &str) -> Self {
        Self(raw_email.to_owned())
    }

    /// The email as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for Email {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for Email {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        String::column_result(value).map(Self)
    }
}
