//! Filtering a user's transactions by type, category and date range.

use std::str::FromStr;

use serde::Deserialize;
use time::Date;

use crate::{
    timezone::parse_iso_date,
    transaction::core::{Category, Transaction, TransactionType},
};

/// A filter on a field that only has a fixed set of values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ChoiceFilter<T> {
    /// Match every value.
    #[default]
    Any,
    /// Match only this value.
    Only(T),
    /// The filter value was not a valid choice, match nothing.
    Unknown,
}

impl<T: FromStr + PartialEq> ChoiceFilter<T> {
    /// Parse a query string value. Absent and empty values match everything.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => ChoiceFilter::Any,
            Some(text) => text.parse().map_or(ChoiceFilter::Unknown, ChoiceFilter::Only),
        }
    }

    /// Whether `value` passes the filter.
    pub fn matches(&self, value: &T) -> bool {
        match self {
            ChoiceFilter::Any => true,
            ChoiceFilter::Only(wanted) => wanted == value,
            ChoiceFilter::Unknown => false,
        }
    }
}

/// The query string accepted by the transaction list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionListQuery {
    /// `income` or `expense`.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// A category code, e.g. `food`.
    pub category: Option<String>,
    /// The earliest date to include, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// The latest date to include, `YYYY-MM-DD`.
    pub end_date: Option<String>,
}

/// Which transactions to keep when listing transactions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionFilter {
    /// Keep transactions of this type.
    pub transaction_type: ChoiceFilter<TransactionType>,
    /// Keep transactions in this category.
    pub category: ChoiceFilter<Category>,
    /// Keep transactions on or after this date.
    pub start_date: Option<Date>,
    /// Keep transactions on or before this date.
    pub end_date: Option<Date>,
}

impl From<TransactionListQuery> for TransactionFilter {
    /// Dates that cannot be parsed are ignored rather than rejected.
    fn from(query: TransactionListQuery) -> Self {
        Self {
            transaction_type: ChoiceFilter::parse(query.transaction_type.as_deref()),
            category: ChoiceFilter::parse(query.category.as_deref()),
            start_date: query.start_date.as_deref().and_then(parse_iso_date),
            end_date: query.end_date.as_deref().and_then(parse_iso_date),
        }
    }
}

impl TransactionFilter {
    /// Whether `transaction` passes every part of the filter.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.transaction_type.matches(&transaction.transaction_type)
            && self.category.matches(&transaction.category)
            && self.start_date.is_none_or(|start| transaction.date >= start)
            && self.end_date.is_none_or(|end| transaction.date <= end)
    }
}

/// Lazily keep the transactions that pass `filter`, in their original order.
pub fn filter_transactions<I>(
    transactions: I,
    filter: &TransactionFilter,
) -> impl Iterator<Item = Transaction>
where
    I: IntoIterator<Item = Transaction>,
{
    transactions
        .into_iter()
        .filter(move |transaction| filter.matches(transaction))
}
