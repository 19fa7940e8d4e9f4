//! Savings goals.
//!
//! This module contains everything related to savings goals:
//! - The `SavingsGoal` model and its derived progress values
//! - Database functions for storing, querying and updating goals
//! - Validation of goal request bodies
//! - Route handlers for the goal API

mod core;
mod endpoints;
mod form;
mod summary;

pub use self::core::create_goal_table;
pub use endpoints::{
    add_to_goal_endpoint, create_goal_endpoint, delete_goal_endpoint, get_goal_endpoint,
    goal_summary_endpoint, list_goals_endpoint, patch_goal_amount_endpoint, patch_goal_endpoint,
    set_goal_amount_endpoint, update_goal_endpoint,
};
