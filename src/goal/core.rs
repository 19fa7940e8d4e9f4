//! Defines the savings goal model, its derived values and the database queries for goals.

use rusqlite::{Connection, Row, named_params};
use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::GoalId,
    money::{Amount, AmountError, serialize_two_places},
    user::UserID,
};

// ============================================================================
// MODELS
// ============================================================================

/// A user's named savings target and how much has been saved towards it so far.
#[derive(Debug, Clone, PartialEq)]
pub struct SavingsGoal {
    /// The ID of the goal.
    pub id: GoalId,
    /// The user that owns the goal.
    pub user_id: UserID,
    /// What the user is saving for.
    pub title: String,
    /// The amount the user wants to save. Always greater than zero.
    pub target_amount: Amount,
    /// The amount saved so far. Never negative.
    pub current_amount: Amount,
    /// The date the user wants to reach the target by, if any.
    pub deadline: Option<Date>,
    /// Whether `current_amount` has reached `target_amount`.
    ///
    /// Maintained by the database on every write, see [GoalAmounts::is_completed].
    pub is_completed: bool,
    /// When the goal was created.
    pub created_at: OffsetDateTime,
    /// When the goal was last changed.
    pub updated_at: OffsetDateTime,
}

impl SavingsGoal {
    /// The target and saved amounts of the goal.
    pub fn amounts(&self) -> GoalAmounts {
        GoalAmounts {
            target_amount: self.target_amount,
            current_amount: self.current_amount,
        }
    }
}

/// The pair of amounts that all of a goal's derived state is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalAmounts {
    /// The amount to save.
    pub target_amount: Amount,
    /// The amount saved so far.
    pub current_amount: Amount,
}

impl GoalAmounts {
    /// A goal is completed once the saved amount reaches the target.
    ///
    /// The `is_completed` column of the `savings_goal` table is generated from
    /// the same comparison.
    pub fn is_completed(&self) -> bool {
        self.current_amount >= self.target_amount
    }

    /// How far the saved amount is towards the target, as a percentage in `[0, 100]`.
    ///
    /// The result is not rounded. A target of zero or less gives zero.
    pub fn progress_percentage(&self) -> Decimal {
        if !self.target_amount.is_positive() {
            return Decimal::ZERO;
        }

        let percentage = self.current_amount.as_decimal() / self.target_amount.as_decimal()
            * Decimal::ONE_HUNDRED;

        percentage.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
    }

    /// How much is left to save, never less than zero.
    pub fn remaining_amount(&self) -> Amount {
        self.target_amount.saturating_sub(self.current_amount)
    }
}

/// A savings goal together with its derived values, as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalView {
    id: GoalId,
    title: String,
    target_amount: Amount,
    current_amount: Amount,
    deadline: Option<Date>,
    is_completed: bool,
    #[serde(serialize_with = "serialize_two_places")]
    progress_percentage: Decimal,
    remaining_amount: Amount,
    formatted_target_amount: String,
    formatted_current_amount: String,
    formatted_remaining_amount: String,
    user_name: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl GoalView {
    /// Build the view of `goal`, labelled with its owner's full name.
    pub fn new(goal: SavingsGoal, user_name: &str) -> Self {
        let amounts = goal.amounts();
        let remaining_amount = amounts.remaining_amount();

        Self {
            id: goal.id,
            progress_percentage: amounts.progress_percentage(),
            formatted_target_amount: goal.target_amount.formatted(),
            formatted_current_amount: goal.current_amount.formatted(),
            formatted_remaining_amount: remaining_amount.formatted(),
            remaining_amount,
            title: goal.title,
            target_amount: goal.target_amount,
            current_amount: goal.current_amount,
            deadline: goal.deadline,
            is_completed: goal.is_completed,
            user_name: user_name.to_owned(),
            created_at: goal.created_at,
            updated_at: goal.updated_at,
        }
    }
}

/// The validated, user editable fields of a goal.
///
/// Produced by [crate::goal::form::GoalForm] and written as a whole by
/// [create_goal] and [update_goal].
#[derive(Debug, Clone, PartialEq)]
pub struct GoalDraft {
    /// What the user is saving for.
    pub title: String,
    /// The amount to save, greater than zero.
    pub target_amount: Amount,
    /// The amount saved so far, zero or more.
    pub current_amount: Amount,
    /// The date to reach the target by.
    pub deadline: Option<Date>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the savings goal table.
///
/// Amounts are stored as integer cents. `is_completed` is a generated column,
/// so it can never disagree with the stored amounts.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS savings_goal (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            target_amount INTEGER NOT NULL
                CHECK (target_amount > 0 AND target_amount < 10000000000),
            current_amount INTEGER NOT NULL DEFAULT 0
                CHECK (current_amount >= 0 AND current_amount < 10000000000),
            deadline TEXT,
            is_completed INTEGER GENERATED ALWAYS AS (current_amount >= target_amount) STORED,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_savings_goal_user_completed
         ON savings_goal(user_id, is_completed)",
        (),
    )?;

    Ok(())
}

const GOAL_COLUMNS: &str = "id, user_id, title, target_amount, current_amount, deadline, \
     is_completed, created_at, updated_at";

/// Create a new goal owned by `user_id`.
///
/// # Errors
/// Returns an [Error::SqlError] if `user_id` does not refer to a user, or for
/// any other SQL error.
pub fn create_goal(
    user_id: UserID,
    draft: GoalDraft,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    let now = OffsetDateTime::now_utc();

    connection
        .prepare(&format!(
            "INSERT INTO savings_goal
                (user_id, title, target_amount, current_amount, deadline, created_at, updated_at)
             VALUES (:user_id, :title, :target_amount, :current_amount, :deadline, :now, :now)
             RETURNING {GOAL_COLUMNS}"
        ))?
        .query_row(
            named_params! {
                ":user_id": user_id.as_i64(),
                ":title": draft.title,
                ":target_amount": draft.target_amount,
                ":current_amount": draft.current_amount,
                ":deadline": draft.deadline,
                ":now": now,
            },
            map_goal_row,
        )
        .map_err(|error| error.into())
}

/// Get the goal with `goal_id` if it is owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the goal does not exist or belongs to another user.
pub fn get_goal(
    goal_id: GoalId,
    user_id: UserID,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    connection
        .prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM savings_goal WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            named_params! {":id": goal_id, ":user_id": user_id.as_i64()},
            map_goal_row,
        )
        .map_err(|error| error.into())
}

/// Get the goals owned by `user_id`, newest first.
///
/// If `completed` is given, only goals with that completion status are returned.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn list_goals(
    user_id: UserID,
    completed: Option<bool>,
    connection: &Connection,
) -> Result<Vec<SavingsGoal>, Error> {
    connection
        .prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM savings_goal
             WHERE user_id = :user_id AND (:completed IS NULL OR is_completed = :completed)
             ORDER BY created_at DESC, id DESC"
        ))?
        .query_map(
            named_params! {":user_id": user_id.as_i64(), ":completed": completed},
            map_goal_row,
        )?
        .map(|maybe_goal| maybe_goal.map_err(Error::from))
        .collect()
}

/// Replace the editable fields of the goal with `goal_id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the goal does not exist or belongs to another user.
pub fn update_goal(
    goal_id: GoalId,
    user_id: UserID,
    draft: GoalDraft,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    connection
        .prepare(&format!(
            "UPDATE savings_goal SET
                title = :title,
                target_amount = :target_amount,
                current_amount = :current_amount,
                deadline = :deadline,
                updated_at = :updated_at
             WHERE id = :id AND user_id = :user_id
             RETURNING {GOAL_COLUMNS}"
        ))?
        .query_row(
            named_params! {
                ":title": draft.title,
                ":target_amount": draft.target_amount,
                ":current_amount": draft.current_amount,
                ":deadline": draft.deadline,
                ":updated_at": OffsetDateTime::now_utc(),
                ":id": goal_id,
                ":user_id": user_id.as_i64(),
            },
            map_goal_row,
        )
        .map_err(|error| error.into())
}

/// Set the saved amount of the goal with `goal_id` owned by `user_id`.
///
/// The caller must ensure `current_amount` is not negative.
///
/// # Errors
/// Returns [Error::NotFound] if the goal does not exist or belongs to another user.
pub fn set_goal_current_amount(
    goal_id: GoalId,
    user_id: UserID,
    current_amount: Amount,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    connection
        .prepare(&format!(
            "UPDATE savings_goal SET current_amount = :current_amount, updated_at = :updated_at
             WHERE id = :id AND user_id = :user_id
             RETURNING {GOAL_COLUMNS}"
        ))?
        .query_row(
            named_params! {
                ":current_amount": current_amount,
                ":updated_at": OffsetDateTime::now_utc(),
                ":id": goal_id,
                ":user_id": user_id.as_i64(),
            },
            map_goal_row,
        )
        .map_err(|error| error.into())
}

/// Add `delta` to the saved amount of the goal with `goal_id` owned by `user_id`.
///
/// The addition happens in a single `UPDATE` statement, so concurrent
/// increments cannot overwrite each other. The caller must ensure `delta` is
/// greater than zero.
///
/// # Errors
/// Returns:
/// - [Error::NotFound] if the goal does not exist or belongs to another user,
/// - [Error::Validation] if the new amount would have more than ten digits.
pub fn add_to_goal_current_amount(
    goal_id: GoalId,
    user_id: UserID,
    delta: Amount,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    connection
        .prepare(&format!(
            "UPDATE savings_goal SET
                current_amount = current_amount + :delta,
                updated_at = :updated_at
             WHERE id = :id AND user_id = :user_id
             RETURNING {GOAL_COLUMNS}"
        ))?
        .query_row(
            named_params! {
                ":delta": delta,
                ":updated_at": OffsetDateTime::now_utc(),
                ":id": goal_id,
                ":user_id": user_id.as_i64(),
            },
            map_goal_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_CHECK,
                },
                _,
            ) => Error::validation("amount", AmountError::TooManyDigits.to_string()),
            error => error.into(),
        })
}

/// Delete the goal with `goal_id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the goal does not exist or belongs to another user.
pub fn delete_goal(goal_id: GoalId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM savings_goal WHERE id = :id AND user_id = :user_id",
        named_params! {":id": goal_id, ":user_id": user_id.as_i64()},
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

fn map_goal_row(row: &Row) -> Result<SavingsGoal, rusqlite::Error> {
    Ok(SavingsGoal {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        title: row.get(2)?,
        target_amount: row.get(3)?,
        current_amount: row.get(4)?,
        deadline: row.get(5)?,
        is_completed: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
