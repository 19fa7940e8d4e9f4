//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/goals/{goal_id}', use [format_endpoint].

/// The route for registering a new user.
pub const REGISTER: &str = "/api/auth/register";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/auth/login";
/// The route for exchanging credentials for a token pair.
pub const TOKEN: &str = "/api/auth/token";
/// The route for exchanging a refresh token for a new access token.
pub const TOKEN_REFRESH: &str = "/api/auth/token/refresh";
/// The route for the authenticated user's profile.
pub const PROFILE: &str = "/api/auth/profile";

/// The route to list and create savings goals.
pub const GOALS: &str = "/api/goals";
/// The route for the summary of all of a user's goals.
pub const GOAL_SUMMARY: &str = "/api/goals/summary";
/// The route to access a single goal.
pub const GOAL: &str = "/api/goals/{goal_id}";
/// The route to set a goal's saved amount.
pub const GOAL_UPDATE_AMOUNT: &str = "/api/goals/{goal_id}/update-amount";
/// The route to add money to a goal.
pub const GOAL_ADD: &str = "/api/goals/{goal_id}/add";

/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route for statistics over all of a user's transactions.
pub const TRANSACTION_STATS: &str = "/api/transactions/stats";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for the summary of one calendar month of transactions.
pub const MONTHLY_SUMMARY: &str = "/api/summary/monthly";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter starts with a left brace and ends with a right brace.
/// For example, in the endpoint path '/api/goals/{goal_id}', '{goal_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains a single parameter.
/// If no parameter is found in `endpoint_path`, the original `endpoint_path` is returned.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |offset| param_start + offset + 1);

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
