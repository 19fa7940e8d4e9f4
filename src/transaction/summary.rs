//! Monthly summaries and overall statistics of a user's transactions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use time::{Date, Month};

use crate::{
    Error,
    money::{Amount, serialize_two_places},
    transaction::core::{Category, Transaction, TransactionType},
};

/// Summed expenses per category, in [Category::ALL] order.
///
/// Only categories with expenses are included. Serializes as a JSON object
/// keyed by category display name, e.g. `{"Food": "300.00"}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoryBreakdown(Vec<(Category, Amount)>);

impl CategoryBreakdown {
    /// Sum the expenses in `transactions` per category.
    pub fn from_expenses<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut totals = [Amount::ZERO; Category::ALL.len()];

        for transaction in transactions {
            if transaction.transaction_type == TransactionType::Expense {
                totals[transaction.category as usize] =
                    totals[transaction.category as usize] + transaction.amount;
            }
        }

        Self(
            Category::ALL
                .into_iter()
                .zip(totals)
                .filter(|(_, total)| total.is_positive())
                .collect(),
        )
    }

    /// The expense total for `category`, if it has any expenses.
    pub fn get(&self, category: Category) -> Option<Amount> {
        self.0
            .iter()
            .find(|(other, _)| *other == category)
            .map(|(_, total)| *total)
    }

    /// The categories with expenses, in [Category::ALL] order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.0.iter().map(|(category, _)| *category)
    }
}

impl Serialize for CategoryBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (category, total) in &self.0 {
            map.serialize_entry(category.display_name(), total)?;
        }
        map.end()
    }
}

/// Income, expenses and category totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// The English name of the month, e.g. "March".
    pub month: String,
    /// The year.
    pub year: i32,
    /// The sum of income in the month.
    pub total_income: Amount,
    /// The sum of expenses in the month.
    pub total_expenses: Amount,
    /// Income minus expenses, may be negative.
    pub net_savings: Amount,
    /// The number of transactions in the month.
    pub transaction_count: usize,
    /// Expenses per category.
    pub category_breakdown: CategoryBreakdown,
}

/// Summarize the transactions in `transactions` dated in `month` of `year`.
///
/// Transactions outside the month are ignored.
pub fn monthly_summary(transactions: &[Transaction], month: Month, year: i32) -> MonthlySummary {
    let in_month: Vec<&Transaction> = transactions
        .iter()
        .filter(|transaction| transaction.date.month() == month && transaction.date.year() == year)
        .collect();

    let total_income = sum_of_type(in_month.iter().copied(), TransactionType::Income);
    let total_expenses = sum_of_type(in_month.iter().copied(), TransactionType::Expense);

    MonthlySummary {
        month: month.to_string(),
        year,
        total_income,
        total_expenses,
        net_savings: total_income - total_expenses,
        transaction_count: in_month.len(),
        category_breakdown: CategoryBreakdown::from_expenses(in_month),
    }
}

/// Totals over every one of a user's transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallStats {
    /// The number of transactions.
    pub total_transactions: usize,
    /// The sum of all income.
    pub total_income: Amount,
    /// The sum of all expenses.
    pub total_expenses: Amount,
    /// Income minus expenses, may be negative.
    pub net_total: Amount,
    /// The category with the most transactions, `None` if there are no transactions.
    pub most_used_category: Option<Category>,
    /// The mean transaction amount, regardless of type.
    #[serde(serialize_with = "serialize_two_places")]
    pub average_transaction_amount: Decimal,
}

/// Compute statistics over `transactions`.
///
/// Ties for the most used category go to the category that comes first in [Category::ALL].
pub fn overall_stats(transactions: &[Transaction]) -> OverallStats {
    let total_transactions = transactions.len();
    let total_income = sum_of_type(transactions, TransactionType::Income);
    let total_expenses = sum_of_type(transactions, TransactionType::Expense);

    let mut counts = [0usize; Category::ALL.len()];
    for transaction in transactions {
        counts[transaction.category as usize] += 1;
    }

    let mut most_used_category = None;
    let mut highest_count = 0;
    for (category, count) in Category::ALL.into_iter().zip(counts) {
        if count > highest_count {
            most_used_category = Some(category);
            highest_count = count;
        }
    }

    let average_transaction_amount = if total_transactions > 0 {
        (total_income + total_expenses).as_decimal() / Decimal::from(total_transactions)
    } else {
        Decimal::ZERO
    };

    OverallStats {
        total_transactions,
        total_income,
        total_expenses,
        net_total: total_income - total_expenses,
        most_used_category,
        average_transaction_amount,
    }
}

fn sum_of_type<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    transaction_type: TransactionType,
) -> Amount {
    transactions
        .into_iter()
        .filter(|transaction| transaction.transaction_type == transaction_type)
        .map(|transaction| transaction.amount)
        .sum()
}

/// The query string accepted by the monthly summary endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct MonthlySummaryQuery {
    /// The month number, 1 to 12.
    pub month: Option<String>,
    /// The year, e.g. 2025.
    pub year: Option<String>,
}

const INVALID_MONTH_OR_YEAR: &str = "Invalid month or year parameter";

impl MonthlySummaryQuery {
    /// The month and year to summarize, defaulting to those of `today`.
    ///
    /// # Errors
    /// Returns an [Error::Validation] if the month or year is not an integer,
    /// or the month is not between 1 and 12.
    pub fn resolve(&self, today: Date) -> Result<(Month, i32), Error> {
        let month = match &self.month {
            Some(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| Error::validation("month", INVALID_MONTH_OR_YEAR))?,
            None => i64::from(u8::from(today.month())),
        };

        let year = match &self.year {
            Some(text) => text
                .trim()
                .parse::<i32>()
                .map_err(|_| Error::validation("year", INVALID_MONTH_OR_YEAR))?,
            None => today.year(),
        };

        let month = u8::try_from(month)
            .ok()
            .and_then(|month| Month::try_from(month).ok())
            .ok_or_else(|| Error::validation("month", "Month must be between 1 and 12."))?;

        Ok((month, year))
    }
}
