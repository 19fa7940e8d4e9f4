//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};

use crate::{
    AppState, Error,
    auth::{
        auth_guard, get_profile_endpoint, log_in_endpoint, obtain_token_endpoint,
        refresh_token_endpoint, register_endpoint, update_profile_endpoint,
    },
    endpoints,
    goal::{
        add_to_goal_endpoint, create_goal_endpoint, delete_goal_endpoint, get_goal_endpoint,
        goal_summary_endpoint, list_goals_endpoint, patch_goal_amount_endpoint,
        patch_goal_endpoint, set_goal_amount_endpoint, update_goal_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
        list_transactions_endpoint, monthly_summary_endpoint, patch_transaction_endpoint,
        transaction_stats_endpoint, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::REGISTER, post(register_endpoint))
        .route(endpoints::LOG_IN, post(log_in_endpoint))
        .route(endpoints::TOKEN, post(obtain_token_endpoint))
        .route(endpoints::TOKEN_REFRESH, post(refresh_token_endpoint));

    let protected_routes = Router::new()
        .route(
            endpoints::PROFILE,
            get(get_profile_endpoint)
                .put(update_profile_endpoint)
                .patch(update_profile_endpoint),
        )
        .route(
            endpoints::GOALS,
            get(list_goals_endpoint).post(create_goal_endpoint),
        )
        .route(endpoints::GOAL_SUMMARY, get(goal_summary_endpoint))
        .route(
            endpoints::GOAL,
            get(get_goal_endpoint)
                .put(update_goal_endpoint)
                .patch(patch_goal_endpoint)
                .delete(delete_goal_endpoint),
        )
        .route(
            endpoints::GOAL_UPDATE_AMOUNT,
            put(set_goal_amount_endpoint).patch(patch_goal_amount_endpoint),
        )
        .route(endpoints::GOAL_ADD, post(add_to_goal_endpoint))
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(endpoints::TRANSACTION_STATS, get(transaction_stats_endpoint))
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(update_transaction_endpoint)
                .patch(patch_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(endpoints::MONTHLY_SUMMARY, get(monthly_summary_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        endpoints,
        test_utils::{get_test_server, get_test_state},
    };

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let server = get_test_server(get_test_state());

        let response = server.get("/api/does-not-exist").await;

        response.assert_status_not_found();
        assert_eq!(response.json::<Value>(), json!({"error": "Not found."}));
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let server = get_test_server(get_test_state());

        for path in [
            endpoints::PROFILE,
            endpoints::GOALS,
            endpoints::GOAL_SUMMARY,
            endpoints::TRANSACTIONS,
            endpoints::TRANSACTION_STATS,
            endpoints::MONTHLY_SUMMARY,
        ] {
            let response = server.get(path).await;

            response.assert_status(StatusCode::UNAUTHORIZED);
            assert_eq!(response.header("www-authenticate"), "Bearer");
        }
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let server = get_test_server(get_test_state());

        server
            .get(endpoints::GOALS)
            .authorization_bearer("not.a.token")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
