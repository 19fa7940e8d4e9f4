//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, named_params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{Error, database_id::TransactionId, money::Amount, user::UserID};

// ============================================================================
// MODELS
// ============================================================================

/// The string was not one of the allowed choices.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("\"{0}\" is not a valid choice.")]
pub struct InvalidChoice(pub String);

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionType {
    /// The code used in requests, responses and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl FromStr for TransactionType {
    type Err = InvalidChoice;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(InvalidChoice(other.to_owned())),
        }
    }
}

/// What a transaction was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Groceries and eating out.
    Food,
    /// Rent or mortgage payments.
    Rent,
    /// Public transport, fuel and the like.
    Transport,
    /// Leisure spending.
    Entertainment,
    /// Medical and health costs.
    Health,
    /// Power, water, internet and so on.
    Utilities,
    /// Anything else.
    Other,
}

impl Category {
    /// Every category, in the order used by category breakdowns and to break ties.
    pub const ALL: [Category; 7] = [
        Category::Food,
        Category::Rent,
        Category::Transport,
        Category::Entertainment,
        Category::Health,
        Category::Utilities,
        Category::Other,
    ];

    /// The code used in requests, responses and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Rent => "rent",
            Category::Transport => "transport",
            Category::Entertainment => "entertainment",
            Category::Health => "health",
            Category::Utilities => "utilities",
            Category::Other => "other",
        }
    }

    /// The human readable name, e.g. "Food".
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Rent => "Rent",
            Category::Transport => "Transport",
            Category::Entertainment => "Entertainment",
            Category::Health => "Health",
            Category::Utilities => "Utilities",
            Category::Other => "Other",
        }
    }
}

impl FromStr for Category {
    type Err = InvalidChoice;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == text)
            .ok_or_else(|| InvalidChoice(text.to_owned()))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// How much money was earned or spent. Always greater than zero.
    pub amount: Amount,
    /// Whether the money was earned or spent.
    pub transaction_type: TransactionType,
    /// What the money was for.
    pub category: Category,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// The local date the transaction was recorded on. Never changes.
    pub date: Date,
    /// When the transaction was created.
    pub created_at: OffsetDateTime,
    /// When the transaction was last changed.
    pub updated_at: OffsetDateTime,
}

/// A transaction as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionView {
    id: TransactionId,
    amount: Amount,
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    category: Category,
    description: Option<String>,
    date: Date,
    formatted_amount: String,
    user_name: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl TransactionView {
    /// Build the view of `transaction`, labelled with its owner's full name.
    pub fn new(transaction: Transaction, user_name: &str) -> Self {
        Self {
            id: transaction.id,
            formatted_amount: transaction.amount.formatted(),
            amount: transaction.amount,
            transaction_type: transaction.transaction_type,
            category: transaction.category,
            description: transaction.description,
            date: transaction.date,
            user_name: user_name.to_owned(),
            created_at: transaction.created_at,
            updated_at: transaction.updated_at,
        }
    }
}

/// The validated, user editable fields of a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    /// How much money was earned or spent, at least 0.01.
    pub amount: Amount,
    /// Whether the money was earned or spent.
    pub transaction_type: TransactionType,
    /// What the money was for.
    pub category: Category,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            amount INTEGER NOT NULL CHECK (amount > 0 AND amount < 10000000000),
            type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
            category TEXT NOT NULL CHECK (category IN
                ('food', 'rent', 'transport', 'entertainment', 'health', 'utilities', 'other')),
            description TEXT,
            date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        (),
    )?;

    for (name, column) in [
        ("idx_transaction_user_date", "date"),
        ("idx_transaction_user_type", "type"),
        ("idx_transaction_user_category", "category"),
    ] {
        connection.execute(
            &format!("CREATE INDEX IF NOT EXISTS {name} ON \"transaction\"(user_id, {column})"),
            (),
        )?;
    }

    Ok(())
}

const TRANSACTION_COLUMNS: &str =
    "id, user_id, amount, type, category, description, date, created_at, updated_at";

/// Create a new transaction owned by `user_id`, recorded on `date`.
///
/// # Errors
/// Returns an [Error::SqlError] if `user_id` does not refer to a user, or for
/// any other SQL error.
pub fn create_transaction(
    user_id: UserID,
    draft: TransactionDraft,
    date: Date,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let now = OffsetDateTime::now_utc();

    connection
        .prepare(&format!(
            "INSERT INTO \"transaction\"
                (user_id, amount, type, category, description, date, created_at, updated_at)
             VALUES (:user_id, :amount, :type, :category, :description, :date, :now, :now)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            named_params! {
                ":user_id": user_id.as_i64(),
                ":amount": draft.amount,
                ":type": draft.transaction_type,
                ":category": draft.category,
                ":description": draft.description,
                ":date": date,
                ":now": now,
            },
            map_transaction_row,
        )
        .map_err(|error| error.into())
}

/// Get the transaction with `transaction_id` if it is owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs to another user.
pub fn get_transaction(
    transaction_id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            named_params! {":id": transaction_id, ":user_id": user_id.as_i64()},
            map_transaction_row,
        )
        .map_err(|error| error.into())
}

/// Get every transaction owned by `user_id`, most recent first.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn list_transactions(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE user_id = :user_id
             ORDER BY date DESC, created_at DESC, id DESC"
        ))?
        .query_map(named_params! {":user_id": user_id.as_i64()}, map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Replace the editable fields of the transaction with `transaction_id` owned by `user_id`.
///
/// The transaction's date is never changed.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs to another user.
pub fn update_transaction(
    transaction_id: TransactionId,
    user_id: UserID,
    draft: TransactionDraft,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "UPDATE \"transaction\" SET
                amount = :amount,
                type = :type,
                category = :category,
                description = :description,
                updated_at = :updated_at
             WHERE id = :id AND user_id = :user_id
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            named_params! {
                ":amount": draft.amount,
                ":type": draft.transaction_type,
                ":category": draft.category,
                ":description": draft.description,
                ":updated_at": OffsetDateTime::now_utc(),
                ":id": transaction_id,
                ":user_id": user_id.as_i64(),
            },
            map_transaction_row,
        )
        .map_err(|error| error.into())
}

/// Delete the transaction with `transaction_id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs to another user.
pub fn delete_transaction(
    transaction_id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = :id AND user_id = :user_id",
        named_params! {":id": transaction_id, ":user_id": user_id.as_i64()},
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        transaction_type: row.get(3)?,
        category: row.get(4)?,
        description: row.get(5)?,
        date: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod choice_tests {
    use super::{Category, InvalidChoice, TransactionType};

    #[test]
    fn parses_codes() {
        assert_eq!("income".parse(), Ok(TransactionType::Income));
        assert_eq!("expense".parse(), Ok(TransactionType::Expense));
        assert_eq!("utilities".parse(), Ok(Category::Utilities));
    }

    #[test]
    fn rejects_unknown_codes_and_display_names() {
        assert_eq!(
            "refund".parse::<TransactionType>(),
            Err(InvalidChoice("refund".to_owned()))
        );
        assert_eq!(
            "Food".parse::<Category>(),
            Err(InvalidChoice("Food".to_owned()))
        );
        assert_eq!(
            InvalidChoice("Food".to_owned()).to_string(),
            "\"Food\" is not a valid choice."
        );
    }

    #[test]
    fn every_category_round_trips_through_its_code() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse(), Ok(category));
        }
    }
}
