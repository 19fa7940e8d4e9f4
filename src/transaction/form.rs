//! Validation of the JSON bodies used to create and edit transactions.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::{
    Error,
    error::FieldErrors,
    form::{NOT_NULL, parse_amount, required},
    money::Amount,
    transaction::core::{InvalidChoice, Transaction, TransactionDraft},
};

/// The smallest amount a transaction may have.
pub const MIN_TRANSACTION_AMOUNT: Amount = Amount::ONE_CENT;

/// The body of a request that creates or edits a transaction.
///
/// The transaction date is always set by the server, so a `date` in the body is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionForm {
    /// How much money was earned or spent, as a JSON number or string.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub amount: Option<Value>,
    /// `income` or `expense`.
    #[serde(rename = "type", default, deserialize_with = "crate::form::present")]
    pub transaction_type: Option<Value>,
    /// One of the category codes, e.g. `food`.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub category: Option<Value>,
    /// A text description, or `null` or a blank string for none.
    #[serde(default, deserialize_with = "crate::form::present")]
    pub description: Option<Value>,
}

impl TransactionForm {
    /// Validate the form as a complete transaction, for creating a transaction.
    ///
    /// # Errors
    /// Returns an [Error::Validation] listing every invalid or missing field.
    pub fn into_draft(self) -> Result<TransactionDraft, Error> {
        self.validate(None, false)
    }

    /// Validate the form as a full update of `transaction`.
    ///
    /// `amount`, `type` and `category` are required. An absent description
    /// keeps the stored one.
    ///
    /// # Errors
    /// Returns an [Error::Validation] listing every invalid or missing field.
    pub fn replace(self, transaction: &Transaction) -> Result<TransactionDraft, Error> {
        self.validate(Some(transaction), false)
    }

    /// Validate the form as changes to `transaction`. Absent fields keep their stored value.
    ///
    /// # Errors
    /// Returns an [Error::Validation] listing every invalid field.
    pub fn merge_into(self, transaction: &Transaction) -> Result<TransactionDraft, Error> {
        self.validate(Some(transaction), true)
    }

    fn validate(self, base: Option<&Transaction>, partial: bool) -> Result<TransactionDraft, Error> {
        let mut errors = FieldErrors::new();

        let amount = match self.amount {
            Some(value) => parse_amount(&value, "amount", &mut errors).and_then(|amount| {
                if amount < MIN_TRANSACTION_AMOUNT {
                    errors.add(
                        "amount",
                        "Ensure this value is greater than or equal to 0.01.",
                    );
                    None
                } else {
                    Some(amount)
                }
            }),
            None if partial => base.map(|transaction| transaction.amount),
            None => required(None, "amount", &mut errors),
        };

        let transaction_type = match self.transaction_type {
            Some(value) => parse_choice(&value, "type", &mut errors),
            None if partial => base.map(|transaction| transaction.transaction_type),
            None => required(None, "type", &mut errors),
        };

        let category = match self.category {
            Some(value) => parse_choice(&value, "category", &mut errors),
            None if partial => base.map(|transaction| transaction.category),
            None => required(None, "category", &mut errors),
        };

        let description = match self.description {
            Some(Value::Null) => Some(None),
            Some(Value::String(text)) if text.trim().is_empty() => Some(None),
            Some(Value::String(text)) => Some(Some(text.trim().to_owned())),
            Some(_) => {
                errors.add("description", "Not a valid string.");
                None
            }
            None => Some(base.and_then(|transaction| transaction.description.clone())),
        };

        match (amount, transaction_type, category, description) {
            (Some(amount), Some(transaction_type), Some(category), Some(description))
                if errors.is_empty() =>
            {
                Ok(TransactionDraft {
                    amount,
                    transaction_type,
                    category,
                    description,
                })
            }
            _ => Err(Error::Validation(errors)),
        }
    }
}

fn parse_choice<T>(value: &Value, field: &str, errors: &mut FieldErrors) -> Option<T>
where
    T: FromStr<Err = InvalidChoice>,
{
    let parsed = match value {
        Value::String(text) => text.parse(),
        Value::Null => {
            errors.add(field, NOT_NULL);
            return None;
        }
        other => Err(InvalidChoice(other.to_string())),
    };

    parsed.map_err(|error| errors.add(field, error.to_string())).ok()
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use time::{OffsetDateTime, macros::date};

    use crate::{
        Error,
        error::FieldErrors,
        money::Amount,
        transaction::core::{Category, Transaction, TransactionType},
        user::UserID,
    };

    use super::TransactionForm;

    fn form(body: Value) -> TransactionForm {
        serde_json::from_value(body).unwrap()
    }

    fn field_errors(result: Result<impl std::fmt::Debug, Error>) -> FieldErrors {
        match result {
            Err(Error::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn stored() -> Transaction {
        Transaction {
            id: 1,
            user_id: UserID::new(1),
            amount: Amount::from_cents(2_500),
            transaction_type: TransactionType::Expense,
            category: Category::Transport,
            description: Some("Bus pass".to_owned()),
            date: date!(2025 - 01 - 01),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn valid_form_becomes_draft() {
        let draft = form(json!({
            "amount": "12.50",
            "type": "expense",
            "category": "food",
            "description": " Lunch ",
        }))
        .into_draft()
        .unwrap();

        assert_eq!(draft.amount, Amount::from_cents(1_250));
        assert_eq!(draft.transaction_type, TransactionType::Expense);
        assert_eq!(draft.category, Category::Food);
        assert_eq!(draft.description.as_deref(), Some("Lunch"));
    }

    #[test]
    fn description_is_optional() {
        let draft = form(json!({"amount": 1000, "type": "income", "category": "other"}))
            .into_draft()
            .unwrap();

        assert_eq!(draft.description, None);
    }

    #[test]
    fn reports_missing_required_fields() {
        let errors = field_errors(form(json!({})).into_draft());

        for field in ["amount", "type", "category"] {
            assert_eq!(errors.get(field).unwrap(), ["This field is required."]);
        }
        assert!(errors.get("description").is_none());
    }

    #[test]
    fn rejects_amounts_below_one_cent() {
        for amount in [json!(0), json!("-5.00")] {
            let errors = field_errors(
                form(json!({"amount": amount, "type": "income", "category": "food"})).into_draft(),
            );

            assert_eq!(
                errors.get("amount").unwrap(),
                ["Ensure this value is greater than or equal to 0.01."]
            );
        }
    }

    #[test]
    fn rejects_three_decimal_places() {
        let errors = field_errors(
            form(json!({"amount": "1.005", "type": "income", "category": "food"})).into_draft(),
        );

        assert_eq!(
            errors.get("amount").unwrap(),
            ["Ensure that there are no more than 2 decimal places."]
        );
    }

    #[test]
    fn rejects_unknown_choices() {
        let errors = field_errors(
            form(json!({"amount": 1, "type": "refund", "category": "Food"})).into_draft(),
        );

        assert_eq!(
            errors.get("type").unwrap(),
            ["\"refund\" is not a valid choice."]
        );
        assert_eq!(
            errors.get("category").unwrap(),
            ["\"Food\" is not a valid choice."]
        );
    }

    #[test]
    fn replace_requires_all_fields_but_keeps_description() {
        let errors = field_errors(form(json!({"amount": 1})).replace(&stored()));
        assert!(errors.get("type").is_some());
        assert!(errors.get("category").is_some());

        let draft = form(json!({"amount": 1, "type": "income", "category": "food"}))
            .replace(&stored())
            .unwrap();
        assert_eq!(draft.description.as_deref(), Some("Bus pass"));
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let draft = form(json!({"category": "health", "description": null}))
            .merge_into(&stored())
            .unwrap();

        assert_eq!(draft.amount, Amount::from_cents(2_500));
        assert_eq!(draft.transaction_type, TransactionType::Expense);
        assert_eq!(draft.category, Category::Health);
        assert_eq!(draft.description, None);
    }

    #[test]
    fn blank_description_is_stored_as_none() {
        let draft = form(json!({
            "amount": 1,
            "type": "income",
            "category": "food",
            "description": "   ",
        }))
        .into_draft()
        .unwrap();

        assert_eq!(draft.description, None);
    }

    #[test]
    fn null_amount_is_not_treated_as_missing() {
        let errors = field_errors(
            form(json!({"amount": null, "type": "income", "category": "food"})).into_draft(),
        );

        assert_eq!(errors.get("amount").unwrap(), ["This field may not be null."]);
    }
}
