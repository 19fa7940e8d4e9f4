//! Transactions.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model with its type and category
//! - Database functions for storing, querying and managing transactions
//! - Filtering and the aggregations behind monthly summaries and statistics
//! - Route handlers for the transaction API

mod core;
mod endpoints;
mod filter;
mod form;
mod summary;

pub use self::core::create_transaction_table;
pub use endpoints::{
    create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
    list_transactions_endpoint, monthly_summary_endpoint, patch_transaction_endpoint,
    transaction_stats_endpoint, update_transaction_endpoint,
};
