//! Aggregate statistics over a user's savings goals.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    goal::core::SavingsGoal,
    money::{Amount, serialize_two_places},
};

/// Totals and progress across all of a user's goals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalSummary {
    /// The number of goals.
    pub total_goals: usize,
    /// The number of goals that have reached their target.
    pub completed_goals: usize,
    /// The number of goals that have not reached their target.
    pub active_goals: usize,
    /// The sum of all target amounts.
    pub total_target_amount: Amount,
    /// The sum of all saved amounts.
    pub total_saved_amount: Amount,
    /// How much is left to save overall, never less than zero.
    pub remaining_amount: Amount,
    /// Total saved as a percentage of total target.
    #[serde(serialize_with = "serialize_two_places")]
    pub overall_progress_percentage: Decimal,
    /// Completed goals as a percentage of all goals.
    #[serde(serialize_with = "serialize_two_places")]
    pub completion_rate: Decimal,
}

/// Summarize `goals`.
///
/// Percentages are exact here and rounded to two decimal places when serialized.
/// An empty slice gives a summary of zeros.
pub fn summarize_goals(goals: &[SavingsGoal]) -> GoalSummary {
    let total_goals = goals.len();
    let completed_goals = goals.iter().filter(|goal| goal.is_completed).count();
    let total_target_amount: Amount = goals.iter().map(|goal| goal.target_amount).sum();
    let total_saved_amount: Amount = goals.iter().map(|goal| goal.current_amount).sum();

    let overall_progress_percentage = if total_target_amount.is_positive() {
        total_saved_amount.as_decimal() / total_target_amount.as_decimal() * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    let completion_rate = if total_goals > 0 {
        Decimal::from(completed_goals) / Decimal::from(total_goals) * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    GoalSummary {
        total_goals,
        completed_goals,
        active_goals: total_goals - completed_goals,
        total_target_amount,
        total_saved_amount,
        remaining_amount: total_target_amount.saturating_sub(total_saved_amount),
        overall_progress_percentage,
        completion_rate,
    }
}
