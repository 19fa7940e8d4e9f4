//! Validation of the JSON bodies used to create and edit savings goals.

use serde::Deserialize;
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    Error,
    error::FieldErrors,
    form::{parse_amount, parse_string, required},
    goal::core::{GoalDraft, SavingsGoal},
    money::{Amount, AmountError},
    timezone::parse_iso_date,
};

/// The longest goal title allowed, counted in user perceived characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// The body of a request that creates or edits a goal.
///
/// Amounts may be given as JSON numbers or strings, e.g. `1000` or `"1000.00"`.
/// `deadline` is a `YYYY-MM-DD` string or `null` to clear it.
#[derive(Debug, Default, Deserialize)]
pub struct GoalForm {
    /// What the user is saving for.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub title: Option<Value>,
    /// The amount to save.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub target_amount: Option<Value>,
    /// The amount saved so far. Defaults to zero for new goals.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub current_amount: Option<Value>,
    /// The date to reach the target by.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub deadline: Option<Value>,
}

impl GoalForm {
    /// Validate the form as a complete goal, for creating or replacing a goal.
    ///
    /// # Errors
    /// Returns an [Error::Validation] listing every invalid or missing field.
    pub fn into_draft(self) -> Result<GoalDraft, Error> {
        self.validate(None)
    }

    /// Validate the form as changes to `goal`. Fields that are absent keep the value from `goal`.
    ///
    /// # Errors
    /// Returns an [Error::Validation] listing every invalid field.
    pub fn merge_into(self, goal: &SavingsGoal) -> Result<GoalDraft, Error> {
        self.validate(Some(goal))
    }

    fn validate(self, base: Option<&SavingsGoal>) -> Result<GoalDraft, Error> {
        let mut errors = FieldErrors::new();

        let title = match self.title {
            Some(value) => parse_title(&value, &mut errors),
            None => required(base.map(|goal| goal.title.clone()), "title", &mut errors),
        };

        let target_amount = match self.target_amount {
            Some(value) => parse_amount(&value, "target_amount", &mut errors),
            None => required(base.map(|goal| goal.target_amount), "target_amount", &mut errors),
        };

        let current_amount = match self.current_amount {
            Some(value) => parse_amount(&value, "current_amount", &mut errors),
            None => Some(base.map_or(Amount::ZERO, |goal| goal.current_amount)),
        };

        let deadline = match self.deadline {
            Some(Value::Null) => Some(None),
            Some(Value::String(text)) if text.trim().is_empty() => Some(None),
            Some(Value::String(text)) => match parse_iso_date(&text) {
                Some(date) => Some(Some(date)),
                None => {
                    errors.add("deadline", INVALID_DATE);
                    None
                }
            },
            Some(_) => {
                errors.add("deadline", INVALID_DATE);
                None
            }
            None => Some(base.and_then(|goal| goal.deadline)),
        };

        if target_amount.is_some_and(|amount| !amount.is_positive()) {
            errors.add("target_amount", "Target amount must be greater than zero");
        }

        if current_amount.is_some_and(|amount| amount.is_negative()) {
            errors.add("current_amount", "Current amount cannot be negative");
        }

        match (title, target_amount, current_amount, deadline) {
            (Some(title), Some(target_amount), Some(current_amount), Some(deadline))
                if errors.is_empty() =>
            {
                Ok(GoalDraft {
                    title,
                    target_amount,
                    current_amount,
                    deadline,
                })
            }
            _ => Err(Error::Validation(errors)),
        }
    }
}

/// The body of a request that sets a goal's saved amount.
#[derive(Debug, Default, Deserialize)]
pub struct CurrentAmountForm {
    /// The new saved amount.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub current_amount: Option<Value>,
}

impl CurrentAmountForm {
    /// Validate the new saved amount, returning `None` if it was not given.
    ///
    /// # Errors
    /// Returns an [Error::Validation] if the amount is not a valid, non-negative amount.
    pub fn validate(self) -> Result<Option<Amount>, Error> {
        let Some(value) = self.current_amount else {
            return Ok(None);
        };

        let mut errors = FieldErrors::new();
        let amount = parse_amount(&value, "current_amount", &mut errors);

        if amount.is_some_and(|amount| amount.is_negative()) {
            errors.add("current_amount", "Current amount cannot be negative");
        }

        errors.finish(amount)
    }
}

/// The body of a request that adds money to a goal.
#[derive(Debug, Default, Deserialize)]
pub struct AddAmountForm {
    /// The amount to add.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub amount: Option<Value>,
}

impl AddAmountForm {
    /// Validate the amount to add.
    ///
    /// # Errors
    /// Returns an [Error::Validation] if the amount is missing, malformed, or not greater than zero.
    pub fn validate(self) -> Result<Amount, Error> {
        let value = match self.amount {
            None | Some(Value::Null) => return Err(Error::validation("amount", "Amount is required")),
            Some(Value::String(text)) if text.trim().is_empty() => {
                return Err(Error::validation("amount", "Amount is required"));
            }
            Some(value) => value,
        };

        let amount = Amount::from_json(&value).map_err(|error| match error {
            AmountError::NotANumber => {
                Error::validation("amount", "Invalid amount format")
            }
            error => Error::validation("amount", error.to_string()),
        })?;

        if !amount.is_positive() {
            return Err(Error::validation("amount", "Amount must be greater than zero"));
        }

        Ok(amount)
    }
}

const INVALID_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

fn parse_title(value: &Value, errors: &mut FieldErrors) -> Option<String> {
    let title = parse_string(value, "title", errors)?;

    if title.is_empty() {
        errors.add("title", "This field may not be blank.");
        return None;
    }

    if title.graphemes(true).count() > MAX_TITLE_LENGTH {
        errors.add(
            "title",
            format!("Ensure this field has no more than {MAX_TITLE_LENGTH} characters."),
        );
        return None;
    }

    Some(title)
}
